//! Host-owned application state.
//!
//! `AppState` bundles the store, controller and playhead. The host owns it
//! and passes it around; persistence is reached only through a [`SavePort`]
//! supplied at the call site.

use crate::controller::Controller;
use crate::input::InputEvent;
use crate::playback::Playback;
use crate::store::SceneStore;
use sb_core::{EditorConfig, Element, TimelineConfig};
use sb_render::{ImageCache, RenderOptions, Surface, render};

/// Opaque sink for the current elements (autosave, project storage, ...).
pub trait SavePort {
    fn on_save(&mut self, elements: &[Element]);
}

impl<F: FnMut(&[Element])> SavePort for F {
    fn on_save(&mut self, elements: &[Element]) {
        (self)(elements)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub store: SceneStore,
    pub controller: Controller,
    pub playback: Playback,
    pub timeline: TimelineConfig,
}

impl AppState {
    pub fn new(editor: EditorConfig, timeline: TimelineConfig) -> Self {
        Self {
            store: SceneStore::new(editor),
            controller: Controller::new(),
            playback: Playback::default(),
            timeline,
        }
    }

    /// Route an input event. Returns whether the view needs a redraw.
    pub fn handle_event(&mut self, event: &InputEvent) -> bool {
        self.controller.handle(&mut self.store, event)
    }

    /// Recompute the playback duration after the scene changed.
    pub fn refresh_duration(&mut self) {
        let fresh = Playback::for_scene(self.store.graph(), &self.timeline);
        self.playback.duration_ms = fresh.duration_ms;
        self.playback.seek(self.playback.playhead_ms);
    }

    /// Advance the playhead by `delta_ms`.
    pub fn tick(&mut self, delta_ms: f64) {
        self.playback = self.playback.tick(delta_ms);
    }

    /// Draw the interactive view at the current playhead.
    pub fn render_preview<S: Surface>(&self, images: &ImageCache, surface: &mut S) {
        let options = RenderOptions {
            view_offset: self.controller.view_offset(),
            ..RenderOptions::interactive(self.store.selection(), self.controller.marquee())
        };
        let time = self.playback.frame_time(&self.timeline);
        render(self.store.graph(), Some(time), images, surface, &options);
    }

    pub fn save(&self, port: &mut dyn SavePort) {
        log::debug!("save: {} elements", self.store.graph().len());
        port.on_save(self.store.graph().elements());
    }
}
