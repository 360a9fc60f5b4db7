//! Export parameters and the derived frame schedule.

use crate::error::{ExportError, ExportResult};
use sb_core::{Color, TimelineConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Total duration `D` in milliseconds.
    pub duration_ms: f64,
    pub stagger_ms: f64,
    pub background: Color,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            duration_ms: 5000.0,
            stagger_ms: TimelineConfig::default().stagger_ms,
            background: Color::WHITE,
        }
    }
}

impl ExportSettings {
    /// Take the stagger from the preview timeline so both agree.
    pub fn with_timeline(mut self, timeline: &TimelineConfig) -> Self {
        self.stagger_ms = timeline.stagger_ms;
        self
    }

    pub fn validate(&self) -> ExportResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ExportError::validation("width/height must be non-zero"));
        }
        if self.fps == 0 {
            return Err(ExportError::validation("fps must be non-zero"));
        }
        if !self.duration_ms.is_finite() || self.duration_ms <= 0.0 {
            return Err(ExportError::validation(format!(
                "duration must be positive, got {} ms",
                self.duration_ms
            )));
        }
        if !self.stagger_ms.is_finite() || self.stagger_ms < 0.0 {
            return Err(ExportError::validation("stagger must be finite and >= 0"));
        }
        if self.frame_count() == 0 {
            return Err(ExportError::validation(format!(
                "{} ms at {} fps yields no frames",
                self.duration_ms, self.fps
            )));
        }
        Ok(())
    }

    /// `N = round(D / 1000 * fps)`.
    pub fn frame_count(&self) -> usize {
        let n = (self.duration_ms / 1000.0 * f64::from(self.fps)).round();
        if n.is_finite() && n > 0.0 { n as usize } else { 0 }
    }

    /// Display duration of every frame, `D / N`.
    pub fn frame_delay_ms(&self) -> f64 {
        match self.frame_count() {
            0 => 0.0,
            n => self.duration_ms / n as f64,
        }
    }

    /// Sample time of frame `k`, `k * D / N`.
    pub fn sample_time(&self, k: usize) -> f64 {
        k as f64 * self.frame_delay_ms()
    }

    pub fn timeline(&self) -> TimelineConfig {
        TimelineConfig {
            stagger_ms: self.stagger_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_for_two_seconds_at_thirty() {
        let s = ExportSettings {
            duration_ms: 2000.0,
            fps: 30,
            ..ExportSettings::default()
        };
        assert_eq!(s.frame_count(), 60);
        assert!((s.frame_delay_ms() - 33.333_333).abs() < 1e-4);
        assert_eq!(s.sample_time(0), 0.0);
        assert!((s.sample_time(30) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_empty_schedule() {
        let s = ExportSettings {
            duration_ms: 10.0,
            fps: 24,
            ..ExportSettings::default()
        };
        assert_eq!(s.frame_count(), 0);
        assert!(matches!(s.validate(), Err(ExportError::Validation(_))));
    }

    #[test]
    fn rejects_bad_dimensions() {
        let s = ExportSettings {
            width: 0,
            ..ExportSettings::default()
        };
        assert!(s.validate().is_err());
        assert!(ExportSettings::default().validate().is_ok());
    }

    #[test]
    fn loads_partial_json() {
        let s: ExportSettings =
            serde_json::from_str(r##"{"fps": 12, "durationMs": 1000, "background": "#000"}"##)
                .unwrap();
        assert_eq!(s.fps, 12);
        assert_eq!(s.width, 1280);
        assert_eq!(s.background, Color::BLACK);
        assert_eq!(s.frame_count(), 12);
    }
}
