//! Preview playhead.
//!
//! No timers live here: the host calls [`Playback::tick`] from whatever
//! loop it owns (animation frame, test harness, headless driver).

use sb_core::anim::timeline_end;
use sb_core::{SceneGraph, TimelineConfig};
use sb_render::FrameTime;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playback {
    pub playhead_ms: f64,
    pub playing: bool,
    /// Wrap to 0 at `duration_ms` instead of stopping.
    pub looping: bool,
    pub duration_ms: f64,
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            playhead_ms: 0.0,
            playing: false,
            looping: false,
            duration_ms: 0.0,
        }
    }
}

impl Playback {
    /// Paused at 0 with a duration covering every animation in `graph`.
    pub fn for_scene(graph: &SceneGraph, timeline: &TimelineConfig) -> Self {
        Self {
            duration_ms: timeline_end(graph.iter(), timeline.stagger_ms),
            ..Self::default()
        }
    }

    /// State after `delta_ms` of wall time. Paused playback is unchanged.
    #[must_use]
    pub fn tick(&self, delta_ms: f64) -> Playback {
        if !self.playing || delta_ms <= 0.0 {
            return *self;
        }
        let mut next = *self;
        let t = self.playhead_ms + delta_ms;
        if self.duration_ms <= 0.0 {
            next.playhead_ms = 0.0;
            next.playing = false;
        } else if t < self.duration_ms {
            next.playhead_ms = t;
        } else if self.looping {
            next.playhead_ms = t % self.duration_ms;
        } else {
            next.playhead_ms = self.duration_ms;
            next.playing = false;
        }
        next
    }

    /// Start playing; restarts from 0 if parked at the end.
    pub fn play(&mut self) {
        if self.playhead_ms >= self.duration_ms {
            self.playhead_ms = 0.0;
        }
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn seek(&mut self, ms: f64) {
        self.playhead_ms = ms.clamp(0.0, self.duration_ms.max(0.0));
    }

    pub fn frame_time(&self, timeline: &TimelineConfig) -> FrameTime {
        FrameTime::new(self.playhead_ms, timeline.stagger_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing(duration_ms: f64, looping: bool) -> Playback {
        Playback {
            playing: true,
            looping,
            duration_ms,
            ..Playback::default()
        }
    }

    #[test]
    fn tick_is_pure() {
        let p = playing(1000.0, false);
        let a = p.tick(16.0);
        let b = p.tick(16.0);
        assert_eq!(a, b);
        assert_eq!(p.playhead_ms, 0.0);
        assert_eq!(a.playhead_ms, 16.0);
    }

    #[test]
    fn stops_at_end_or_wraps() {
        let end = playing(1000.0, false).tick(1500.0);
        assert_eq!(end.playhead_ms, 1000.0);
        assert!(!end.playing);

        let wrapped = playing(1000.0, true).tick(1250.0);
        assert_eq!(wrapped.playhead_ms, 250.0);
        assert!(wrapped.playing);
    }

    #[test]
    fn paused_ignores_ticks() {
        let mut p = playing(1000.0, false);
        p.pause();
        assert_eq!(p.tick(100.0), p);
        p.seek(5000.0);
        assert_eq!(p.playhead_ms, 1000.0);
        p.play();
        assert_eq!(p.playhead_ms, 0.0);
    }
}
