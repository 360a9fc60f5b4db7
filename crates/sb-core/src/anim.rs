//! Timeline evaluation: `(element, elapsed) -> VisualState`.
//!
//! The evaluator is a pure function, so the live preview and every export
//! frame agree on what an element looks like at a given time.

use crate::model::{AnimationKind, Easing, Element};
use kurbo::{Affine, Point};
use std::f64::consts::PI;

/// Horizontal travel of `slideIn` (px); the element starts this far left.
pub const SLIDE_DISTANCE: f64 = 200.0;
/// Peak height of `bounce` (px).
pub const BOUNCE_HEIGHT: f64 = 40.0;

/// Transient per-frame visual transform of one element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualState {
    pub opacity: f64,
    pub dx: f64,
    pub dy: f64,
    pub scale: f64,
    /// Radians, clockwise in screen space.
    pub rotation: f64,
}

impl Default for VisualState {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl VisualState {
    pub const IDENTITY: VisualState = VisualState {
        opacity: 1.0,
        dx: 0.0,
        dy: 0.0,
        scale: 1.0,
        rotation: 0.0,
    };

    /// Whether painting this state would produce nothing.
    pub fn is_invisible(&self) -> bool {
        self.opacity <= 0.0 || self.scale <= 0.0
    }

    /// Translate × rotate-about-`center` × scale-about-`origin`.
    pub fn transform(&self, origin: (f64, f64), center: (f64, f64)) -> Affine {
        Affine::translate((self.dx, self.dy))
            * Affine::rotate_about(self.rotation, Point::new(center.0, center.1))
            * Affine::scale_about(self.scale, Point::new(origin.0, origin.1))
    }
}

/// Apply `easing` to a progress value in `[0, 1]`.
pub fn ease(easing: Easing, p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    match easing {
        Easing::Linear => p,
        Easing::EaseIn => p * p,
        Easing::EaseOut => 1.0 - (1.0 - p) * (1.0 - p),
        Easing::EaseInOut => {
            if p < 0.5 {
                2.0 * p * p
            } else {
                1.0 - (-2.0 * p + 2.0).powi(2) / 2.0
            }
        }
        Easing::Bounce => {
            if p < 0.5 {
                4.0 * p * p * p
            } else {
                1.0 + 4.0 * (p - 1.0).powi(3)
            }
        }
        Easing::Elastic => {
            if p == 0.0 || p == 1.0 {
                p
            } else {
                -(2f64.powf(10.0 * (p - 1.0))) * ((p - 1.1) * 5.0 * PI).sin()
            }
        }
    }
}

fn map_kind(kind: AnimationKind, e: f64) -> VisualState {
    let mut state = VisualState::IDENTITY;
    match kind {
        AnimationKind::FadeIn => state.opacity = e,
        AnimationKind::SlideIn => state.dx = -SLIDE_DISTANCE * (1.0 - e),
        AnimationKind::ZoomIn => state.scale = e,
        AnimationKind::Rotate => state.rotation = e * 2.0 * PI,
        AnimationKind::Bounce => state.dy = -BOUNCE_HEIGHT * (e * PI).sin().abs(),
        AnimationKind::None => {}
    }
    state
}

/// Visual state of `element` at `elapsed_ms` on its timeline.
pub fn evaluate(element: &Element, elapsed_ms: f64) -> VisualState {
    let Some(anim) = element.animation else {
        return VisualState::IDENTITY;
    };
    if anim.kind() == AnimationKind::None {
        return VisualState::IDENTITY;
    }
    if elapsed_ms < anim.delay_ms() {
        return VisualState {
            opacity: 0.0,
            ..map_kind(anim.kind(), 0.0)
        };
    }
    let progress = ((elapsed_ms - anim.delay_ms()) / anim.duration_ms()).clamp(0.0, 1.0);
    map_kind(anim.kind(), ease(anim.easing(), progress))
}

/// Time at which every element has settled, given a per-z-index stagger.
pub fn timeline_end<'a>(elements: impl IntoIterator<Item = &'a Element>, stagger_ms: f64) -> f64 {
    elements
        .into_iter()
        .enumerate()
        .filter_map(|(i, el)| {
            el.animation
                .filter(|a| a.kind() != AnimationKind::None)
                .map(|a| a.end_ms() + i as f64 * stagger_ms)
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnimationDescriptor, Color, ElementKind};
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn with_anim(kind: AnimationKind, duration: f64, delay: f64, easing: Easing) -> Element {
        Element::new(ElementKind::rect(100.0, 100.0, Color::BLACK), 200.0, 200.0)
            .animated(AnimationDescriptor::new(kind, duration, delay, easing).unwrap())
    }

    #[test]
    fn no_descriptor_is_identity() {
        let el = Element::new(ElementKind::circle(10.0, Color::BLACK), 0.0, 0.0);
        assert_eq!(evaluate(&el, 12345.0), VisualState::IDENTITY);
        let none = with_anim(AnimationKind::None, 1000.0, 0.0, Easing::Linear);
        assert_eq!(evaluate(&none, 0.0), VisualState::IDENTITY);
    }

    #[test]
    fn slide_in_ease_out_midpoint() {
        let el = with_anim(AnimationKind::SlideIn, 1000.0, 500.0, Easing::EaseOut);
        let at = evaluate(&el, 1000.0);
        assert!(close(at.dx, -50.0), "dx = {}", at.dx);
        assert_eq!(at.opacity, 1.0);

        let before = evaluate(&el, 499.0);
        assert_eq!(before.opacity, 0.0);
        assert!(close(before.dx, -200.0));

        let after = evaluate(&el, 1500.0);
        assert_eq!(after, VisualState::IDENTITY);
    }

    #[test]
    fn every_kind_settles_to_rest() {
        for kind in [
            AnimationKind::FadeIn,
            AnimationKind::SlideIn,
            AnimationKind::ZoomIn,
            AnimationKind::Bounce,
        ] {
            let el = with_anim(kind, 300.0, 0.0, Easing::Linear);
            let s = evaluate(&el, 10_000.0);
            assert!(close(s.opacity, 1.0) && close(s.scale, 1.0), "{kind:?}");
            assert!(close(s.dx, 0.0) && s.dy.abs() < 1e-9, "{kind:?}");
        }
        let spin = with_anim(AnimationKind::Rotate, 300.0, 0.0, Easing::Linear);
        assert!(close(evaluate(&spin, 10_000.0).rotation, 2.0 * PI));
    }

    #[test]
    fn zoom_before_delay_is_hidden() {
        let el = with_anim(AnimationKind::ZoomIn, 1000.0, 200.0, Easing::Linear);
        let s = evaluate(&el, 0.0);
        assert!(s.is_invisible());
        assert_eq!(s.scale, 0.0);
    }

    #[test]
    fn easing_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::EaseIn,
            Easing::EaseOut,
            Easing::EaseInOut,
            Easing::Bounce,
            Easing::Elastic,
        ] {
            assert!(close(ease(easing, 0.0), 0.0), "{easing:?} at 0");
            assert!(close(ease(easing, 1.0), 1.0), "{easing:?} at 1");
        }
        assert!(close(ease(Easing::EaseInOut, 0.25), 0.125));
        assert!(close(ease(Easing::Bounce, 0.75), 0.9375));
    }

    #[test]
    fn transform_scales_about_origin() {
        let state = VisualState {
            scale: 0.5,
            ..VisualState::IDENTITY
        };
        let t = state.transform((100.0, 100.0), (0.0, 0.0));
        let p = t * Point::new(200.0, 100.0);
        assert!(close(p.x, 150.0) && close(p.y, 100.0));
        assert!(close((t * Point::new(100.0, 100.0)).x, 100.0));
    }

    #[test]
    fn transform_rotates_about_center() {
        let state = VisualState {
            rotation: PI,
            dx: 10.0,
            ..VisualState::IDENTITY
        };
        let t = state.transform((0.0, 0.0), (50.0, 50.0));
        let p = t * Point::new(60.0, 50.0);
        assert!(close(p.x, 50.0) && close(p.y, 50.0), "{p:?}");
    }

    #[test]
    fn timeline_end_includes_stagger() {
        let a = with_anim(AnimationKind::FadeIn, 1000.0, 0.0, Easing::Linear);
        let b = with_anim(AnimationKind::FadeIn, 1000.0, 500.0, Easing::Linear);
        let still = Element::new(ElementKind::circle(5.0, Color::BLACK), 0.0, 0.0);
        assert!(close(timeline_end([&a, &b, &still], 150.0), 1650.0));
        assert_eq!(timeline_end([&still], 150.0), 0.0);
    }

    proptest! {
        #[test]
        fn evaluate_clamps_outside_the_window(
            duration in 1.0..5000.0f64,
            delay in 0.0..5000.0f64,
            before in 0.0..1.0f64,
            after in 0.0..10_000.0f64,
        ) {
            let el = with_anim(AnimationKind::FadeIn, duration, delay, Easing::EaseInOut);
            let pre = evaluate(&el, delay * before - 1e-3);
            prop_assert_eq!(pre.opacity, 0.0);
            let post = evaluate(&el, delay + duration + after);
            prop_assert!((post.opacity - 1.0).abs() < 1e-9);
        }

        #[test]
        fn evaluate_is_idempotent(t in -1000.0..10_000.0f64) {
            let el = with_anim(AnimationKind::Bounce, 800.0, 100.0, Easing::Elastic);
            prop_assert_eq!(evaluate(&el, t), evaluate(&el, t));
        }
    }
}
