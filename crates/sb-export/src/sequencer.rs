//! Frame sequencer.
//!
//! An [`ExportJob`] walks `Idle → Preloading → Rendering → Encoding` and
//! ends in `Finished`, `Aborted` or `Failed`. Each [`ExportJob::step`] does
//! one unit of work (one frame while rendering) and returns, so a host loop
//! can interleave other work between frames. Frames are rendered into a
//! fresh offscreen surface from a snapshot of the graph taken when the job
//! started; the encoder sees them only after the last one rendered.

use crate::encode::{Artifact, EncoderConfig, Frame, FrameEncoder};
use crate::error::{ExportError, ExportResult};
use crate::settings::ExportSettings;
use sb_core::SceneGraph;
use sb_render::{FrameTime, ImageCache, ImageLoader, PixmapSurface, RenderOptions, render};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Share of the progress bar spent rendering; encoding fills the rest.
const RENDER_SHARE: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    Preloading,
    Rendering,
    Encoding,
    Finished,
    Aborted,
    Failed,
}

impl ExportState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Aborted | Self::Failed)
    }
}

/// Progress callbacks. Every method defaults to doing nothing.
pub trait ExportObserver {
    /// Overall completion in `0.0..=1.0`; never decreases.
    fn on_progress(&mut self, _fraction: f64) {}
    fn on_frame(&mut self, _index: usize) {}
    fn on_finished(&mut self, _artifact: &Artifact) {}
    fn on_aborted(&mut self) {}
    fn on_failed(&mut self, _error: &ExportError) {}
}

impl ExportObserver for () {}

/// Shared cancel flag, checked between frames.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ─── Exporter ────────────────────────────────────────────────────────────

/// One per scene builder. Hands out at most one running job at a time.
#[derive(Debug, Default)]
pub struct Exporter {
    busy: Arc<AtomicBool>,
}

/// Proof that the exporter is reserved. Released on drop.
#[derive(Debug)]
pub struct ExportSlot {
    busy: Arc<AtomicBool>,
}

impl Drop for ExportSlot {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl Exporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Reserve the exporter, or fail with [`ExportError::Busy`].
    pub fn try_reserve(&self) -> ExportResult<ExportSlot> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ExportError::Busy)?;
        Ok(ExportSlot {
            busy: Arc::clone(&self.busy),
        })
    }

    /// Validate `settings`, snapshot `graph` and return a job ready to step.
    pub fn start<E: FrameEncoder>(
        &self,
        graph: &SceneGraph,
        settings: ExportSettings,
        encoder: E,
    ) -> ExportResult<ExportJob<E>> {
        settings.validate()?;
        let slot = self.try_reserve()?;
        log::debug!(
            "export: {} frames at {}x{}",
            settings.frame_count(),
            settings.width,
            settings.height
        );
        Ok(ExportJob {
            graph: graph.clone(),
            frame_count: settings.frame_count(),
            settings,
            encoder,
            images: ImageCache::new(),
            loader: None,
            abort: AbortHandle::new(),
            state: ExportState::Idle,
            frames: Vec::new(),
            artifact: None,
            failure: None,
            _slot: Some(slot),
        })
    }
}

// ─── Job ─────────────────────────────────────────────────────────────────

pub struct ExportJob<E> {
    graph: SceneGraph,
    settings: ExportSettings,
    frame_count: usize,
    encoder: E,
    images: ImageCache,
    loader: Option<Box<dyn ImageLoader>>,
    abort: AbortHandle,
    state: ExportState,
    frames: Vec<Frame>,
    artifact: Option<Artifact>,
    failure: Option<ExportError>,
    /// Held until the job reaches a terminal state.
    _slot: Option<ExportSlot>,
}

impl<E: FrameEncoder> ExportJob<E> {
    /// Resolve image sources with `loader` during preloading.
    pub fn with_loader(mut self, loader: impl ImageLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Start from an already populated cache.
    pub fn with_images(mut self, images: ImageCache) -> Self {
        self.images = images;
        self
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Frames rendered and not yet handed to the encoder.
    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn into_encoder(self) -> E {
        self.encoder
    }

    pub fn take_artifact(&mut self) -> Option<Artifact> {
        self.artifact.take()
    }

    /// Do one unit of work and return the new state. Terminal states are
    /// sticky.
    pub fn step(&mut self, observer: &mut dyn ExportObserver) -> ExportState {
        if self.state.is_terminal() {
            return self.state;
        }
        if let Err(e) = self.advance(observer) {
            log::warn!("export failed: {e}");
            observer.on_failed(&e);
            self.frames.clear();
            self.failure = Some(e);
            self.enter(ExportState::Failed);
        }
        self.state
    }

    /// Step until a terminal state.
    pub fn run(&mut self, observer: &mut dyn ExportObserver) -> ExportResult<Artifact> {
        while !self.step(observer).is_terminal() {}
        match self.state {
            ExportState::Finished => self
                .artifact
                .take()
                .ok_or_else(|| ExportError::encoder("artifact already taken")),
            ExportState::Aborted => Err(ExportError::Aborted),
            _ => Err(self
                .failure
                .take()
                .unwrap_or_else(|| ExportError::encoder("export failed"))),
        }
    }

    fn enter(&mut self, next: ExportState) {
        log::debug!("export: {:?} -> {next:?}", self.state);
        self.state = next;
        if next.is_terminal() {
            self._slot = None;
        }
    }

    fn advance(&mut self, observer: &mut dyn ExportObserver) -> ExportResult<()> {
        if self.abort.is_aborted() {
            return self.cancel(observer);
        }
        match self.state {
            ExportState::Idle => {
                observer.on_progress(0.0);
                self.enter(ExportState::Preloading);
            }
            ExportState::Preloading => {
                self.preload();
                self.enter(ExportState::Rendering);
            }
            ExportState::Rendering => {
                let k = self.frames.len();
                let frame = self.render_frame(k)?;
                self.frames.push(frame);
                observer.on_frame(k);
                observer.on_progress(RENDER_SHARE * (k + 1) as f64 / self.frame_count as f64);
                if self.frames.len() == self.frame_count {
                    self.enter(ExportState::Encoding);
                }
            }
            ExportState::Encoding => {
                let artifact = self.encode()?;
                observer.on_progress(1.0);
                observer.on_finished(&artifact);
                self.artifact = Some(artifact);
                self.enter(ExportState::Finished);
            }
            ExportState::Finished | ExportState::Aborted | ExportState::Failed => {}
        }
        Ok(())
    }

    fn cancel(&mut self, observer: &mut dyn ExportObserver) -> ExportResult<()> {
        log::debug!("export: aborted with {} frames discarded", self.frames.len());
        self.frames.clear();
        observer.on_aborted();
        self.enter(ExportState::Aborted);
        Ok(())
    }

    fn preload(&mut self) {
        let Some(loader) = self.loader.as_deref() else {
            return;
        };
        let sources: Vec<&str> = self.graph.iter().filter_map(|e| e.image_src()).collect();
        let failed = self.images.preload(sources, loader);
        if failed > 0 {
            log::warn!("export: {failed} image(s) failed to load; drawing placeholders");
        }
    }

    fn render_frame(&self, k: usize) -> ExportResult<Frame> {
        let s = &self.settings;
        render_frame(&self.graph, s, &self.images, k, s.sample_time(k), s.frame_delay_ms())
    }

    fn encode(&mut self) -> ExportResult<Artifact> {
        let config = EncoderConfig {
            width: self.settings.width,
            height: self.settings.height,
            fps: self.settings.fps,
        };
        let frames = std::mem::take(&mut self.frames);
        let result = feed(&mut self.encoder, config, &frames);
        if result.is_err() {
            self.encoder.abort();
        }
        result
    }
}

/// Render `graph` at `elapsed_ms` into a fresh surface of the export size.
pub(crate) fn render_frame(
    graph: &SceneGraph,
    settings: &ExportSettings,
    images: &ImageCache,
    index: usize,
    elapsed_ms: f64,
    delay_ms: f64,
) -> ExportResult<Frame> {
    let mut surface = PixmapSurface::new(settings.width, settings.height)?;
    render(
        graph,
        Some(FrameTime::new(elapsed_ms, settings.stagger_ms)),
        images,
        &mut surface,
        &RenderOptions::export(settings.background),
    );
    log::trace!("export: rendered frame {index} at {elapsed_ms:.1} ms");
    Ok(Frame {
        index,
        width: settings.width,
        height: settings.height,
        rgba: surface.to_rgba8(),
        delay_ms,
    })
}

/// `begin`, every frame in order, `finish`.
pub(crate) fn feed<E: FrameEncoder + ?Sized>(
    encoder: &mut E,
    config: EncoderConfig,
    frames: &[Frame],
) -> ExportResult<Artifact> {
    encoder.begin(config)?;
    for frame in frames {
        encoder.add_frame(frame)?;
    }
    encoder.finish()
}

impl<E> std::fmt::Debug for ExportJob<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportJob")
            .field("state", &self.state)
            .field("frame_count", &self.frame_count)
            .field("rendered", &self.frames.len())
            .finish_non_exhaustive()
    }
}
