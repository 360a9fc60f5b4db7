//! Host-supplied settings shared by the editor, renderer and exporter.

use serde::{Deserialize, Serialize};

/// Editing behavior knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Snap drag positions and segment endpoints to this grid, if set.
    pub grid_size: Option<f64>,
    /// Maximum number of history snapshots kept.
    pub history_depth: usize,
    pub nudge_step: f64,
    /// Nudge distance while Shift is held.
    pub nudge_step_large: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_size: None,
            history_depth: 200,
            nudge_step: 1.0,
            nudge_step_large: 10.0,
        }
    }
}

impl EditorConfig {
    /// Round `v` to the configured grid; identity without one.
    pub fn snap(&self, v: f64) -> f64 {
        match self.grid_size {
            Some(g) if g > 0.0 => (v / g).round() * g,
            _ => v,
        }
    }
}

/// Timeline settings used identically by preview and export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineConfig {
    /// Extra delay per z-index step.
    pub stagger_ms: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self { stagger_ms: 150.0 }
    }
}
