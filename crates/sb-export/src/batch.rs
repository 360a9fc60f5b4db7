//! Multi-scene video pipeline.
//!
//! A storyboard is a list of [`Scene`]s, each carrying its own draw-command
//! elements. Scenes are rendered one after another at the export fps and
//! their frames concatenated before a single encode.

use crate::encode::{Artifact, EncoderConfig, Frame, FrameEncoder};
use crate::error::{ExportError, ExportResult};
use crate::sequencer::{AbortHandle, feed, render_frame};
use crate::settings::ExportSettings;
use sb_core::template::import_commands;
use sb_core::{AnimationDescriptor, SceneGraph};
use sb_render::ImageCache;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Seconds on screen.
    pub duration: f64,
    // Title, narration and layout ride along for hosts; rendering ignores them.
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub narration: String,
    #[serde(default)]
    pub layout: Option<Value>,
    /// Draw-command records, as [`sb_core::import_template`] reads them.
    #[serde(default)]
    pub visual_elements: Vec<Value>,
    /// `animations[i]` replaces the animation of `visual_elements[i]`.
    #[serde(default)]
    pub animations: Vec<Option<AnimationDescriptor>>,
}

impl Scene {
    pub fn duration_ms(&self) -> f64 {
        self.duration * 1000.0
    }

    /// Frames this scene contributes at `fps`.
    pub fn frame_count(&self, fps: u32) -> usize {
        let n = (self.duration * f64::from(fps)).round();
        if n.is_finite() && n > 0.0 { n as usize } else { 0 }
    }

    /// Build the scene's graph with per-element animation overrides applied.
    pub fn graph(&self) -> ExportResult<SceneGraph> {
        let mut elements = import_commands(&self.visual_elements)
            .map_err(|e| ExportError::validation(format!("scene `{}`: {e}", self.id)))?;
        for (element, anim) in elements.iter_mut().zip(&self.animations) {
            if let Some(anim) = anim {
                element.animation = Some(*anim);
            }
        }
        SceneGraph::from_elements(elements)
            .map_err(|e| ExportError::validation(format!("scene `{}`: {e}", self.id)))
    }
}

/// Parse a storyboard: either a bare array of scenes or `{"scenes": [...]}`.
pub fn parse_scenes(json: &str) -> ExportResult<Vec<Scene>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Storyboard {
        List(Vec<Scene>),
        Wrapped { scenes: Vec<Scene> },
    }
    let board: Storyboard = serde_json::from_str(json)
        .map_err(|e| ExportError::validation(format!("storyboard: {e}")))?;
    Ok(match board {
        Storyboard::List(scenes) | Storyboard::Wrapped { scenes } => scenes,
    })
}

/// Frame `frame_index` of `frame_count` evenly spread over the scene.
pub fn render_scene(
    scene: &Scene,
    frame_index: usize,
    frame_count: usize,
    settings: &ExportSettings,
    images: &ImageCache,
) -> ExportResult<Frame> {
    render_scene_graph(&scene.graph()?, scene, frame_index, frame_count, settings, images)
}

fn render_scene_graph(
    graph: &SceneGraph,
    scene: &Scene,
    frame_index: usize,
    frame_count: usize,
    settings: &ExportSettings,
    images: &ImageCache,
) -> ExportResult<Frame> {
    if frame_count == 0 || frame_index >= frame_count {
        return Err(ExportError::validation(format!(
            "scene `{}`: frame {frame_index} out of {frame_count}",
            scene.id
        )));
    }
    let elapsed = frame_index as f64 / frame_count as f64 * scene.duration_ms();
    let delay = 1000.0 / f64::from(settings.fps);
    render_frame(graph, settings, images, frame_index, elapsed, delay)
}

/// Render every scene in order, then encode the concatenated frames once.
/// Frame indices run continuously across scenes.
pub fn render_scenes<E: FrameEncoder + ?Sized>(
    scenes: &[Scene],
    settings: &ExportSettings,
    images: &ImageCache,
    encoder: &mut E,
    abort: &AbortHandle,
) -> ExportResult<Artifact> {
    settings.validate()?;
    let mut frames = Vec::new();
    for scene in scenes {
        let graph = scene.graph()?;
        let count = scene.frame_count(settings.fps);
        if count == 0 {
            log::warn!("scene `{}` is too short to produce a frame; skipped", scene.id);
            continue;
        }
        log::debug!("batch: scene `{}` -> {count} frames", scene.id);
        for i in 0..count {
            if abort.is_aborted() {
                log::debug!("batch: aborted with {} frames discarded", frames.len());
                return Err(ExportError::Aborted);
            }
            let mut frame = render_scene_graph(&graph, scene, i, count, settings, images)?;
            frame.index = frames.len();
            frames.push(frame);
        }
    }
    if frames.is_empty() {
        return Err(ExportError::validation("storyboard produced no frames"));
    }

    let config = EncoderConfig {
        width: settings.width,
        height: settings.height,
        fps: settings.fps,
    };
    let result = feed(encoder, config, &frames);
    if result.is_err() {
        encoder.abort();
    }
    result
}
