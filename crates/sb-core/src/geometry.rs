//! Per-element bounding boxes, point containment and resize-handle math.
//!
//! Everything here is a pure function of an [`Element`]; nothing mutates
//! the scene. The interaction layer calls [`apply_resize`] with the element
//! as it was when the gesture started, so repeated pointer moves never
//! compound rounding error.

use crate::model::{Element, ElementKind, TextAlign};
use serde::{Deserialize, Serialize};

/// Approximate glyph advance as a fraction of the font size.
pub const TEXT_WIDTH_FACTOR: f64 = 0.55;
/// Max perpendicular distance (px) for a point to hit a line or arrow.
pub const LINE_HIT_TOLERANCE: f64 = 10.0;
/// Max distance (px) between the pointer and a handle center.
pub const HANDLE_TOLERANCE: f64 = 20.0;
/// Handles sit this far outside the bounding box.
pub const HANDLE_MARGIN: f64 = 4.0;
/// Smallest width/height a resize can produce.
pub const MIN_SIZE: f64 = 20.0;
pub const MIN_RADIUS: f64 = 10.0;
pub const MAX_RADIUS: f64 = 300.0;

/// Axis-aligned box in scene coordinates; `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box of `width × height` centered on `(cx, cy)`.
    pub fn centered(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    /// Normalized box spanning two arbitrary corners.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(x1.min(x2), y1.min(y2), (x2 - x1).abs(), (y2 - y1).abs())
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// AABB overlap test (touching edges count as overlap).
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x <= other.right()
            && self.right() >= other.x
            && self.y <= other.bottom()
            && self.bottom() >= other.y
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Bounds::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Grow by `pad` on every side.
    pub fn inflate(&self, pad: f64) -> Bounds {
        Bounds::new(
            self.x - pad,
            self.y - pad,
            self.width + 2.0 * pad,
            self.height + 2.0 * pad,
        )
    }
}

/// Approximate rendered width of a text run.
pub fn text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * TEXT_WIDTH_FACTOR
}

pub fn bounding_box(element: &Element) -> Bounds {
    let (x, y) = (element.x, element.y);
    match &element.kind {
        ElementKind::Text {
            text, size, align, ..
        } => {
            let w = text_width(text, *size);
            let left = match align {
                TextAlign::Left => x,
                TextAlign::Center => x - w / 2.0,
                TextAlign::Right => x - w,
            };
            Bounds::new(left, y - size / 2.0, w, *size)
        }
        ElementKind::Rect { width, height, .. }
        | ElementKind::Image { width, height, .. }
        | ElementKind::Group { width, height, .. } => Bounds::centered(x, y, *width, *height),
        ElementKind::Circle { radius, .. } => Bounds::centered(x, y, radius * 2.0, radius * 2.0),
        ElementKind::Line { end_x, end_y, .. } | ElementKind::Arrow { end_x, end_y, .. } => {
            Bounds::from_corners(x, y, *end_x, *end_y)
        }
    }
}

/// Distance from `(px, py)` to the segment `a → b`.
pub fn distance_to_segment(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return (px - ax).hypot(py - ay);
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
    (px - (ax + t * dx)).hypot(py - (ay + t * dy))
}

/// Whether `(px, py)` lies on the element's shape.
pub fn hit_test(element: &Element, px: f64, py: f64) -> bool {
    match &element.kind {
        ElementKind::Circle { radius, .. } => {
            (px - element.x).hypot(py - element.y) <= *radius
        }
        ElementKind::Line { end_x, end_y, .. } | ElementKind::Arrow { end_x, end_y, .. } => {
            distance_to_segment(px, py, element.x, element.y, *end_x, *end_y)
                <= LINE_HIT_TOLERANCE
        }
        _ => bounding_box(element).contains(px, py),
    }
}

// ─── Resize handles ──────────────────────────────────────────────────────

/// A grabbable control point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    Nw,
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    /// Segment start point `(x, y)`.
    Start,
    /// Segment end point `(endX, endY)`.
    End,
}

impl Handle {
    pub const BOX: [Handle; 8] = [
        Handle::Nw,
        Handle::N,
        Handle::Ne,
        Handle::E,
        Handle::Se,
        Handle::S,
        Handle::Sw,
        Handle::W,
    ];

    /// Position of a box handle on `b`, as fractions of width/height.
    fn box_fraction(self) -> Option<(f64, f64)> {
        Some(match self {
            Handle::Nw => (0.0, 0.0),
            Handle::N => (0.5, 0.0),
            Handle::Ne => (1.0, 0.0),
            Handle::E => (1.0, 0.5),
            Handle::Se => (1.0, 1.0),
            Handle::S => (0.5, 1.0),
            Handle::Sw => (0.0, 1.0),
            Handle::W => (0.0, 0.5),
            Handle::Start | Handle::End => return None,
        })
    }

    /// The handle diagonally/axially across from this one.
    pub fn opposite(self) -> Handle {
        match self {
            Handle::Nw => Handle::Se,
            Handle::N => Handle::S,
            Handle::Ne => Handle::Sw,
            Handle::E => Handle::W,
            Handle::Se => Handle::Nw,
            Handle::S => Handle::N,
            Handle::Sw => Handle::Ne,
            Handle::W => Handle::E,
            Handle::Start => Handle::End,
            Handle::End => Handle::Start,
        }
    }

    /// Point on `b` this handle is attached to (no margin).
    pub fn anchor_on(self, b: &Bounds) -> Option<(f64, f64)> {
        self.box_fraction()
            .map(|(fx, fy)| (b.x + b.width * fx, b.y + b.height * fy))
    }
}

/// Handles the element exposes, with their on-screen positions.
pub fn handle_positions(element: &Element) -> Vec<(Handle, f64, f64)> {
    match &element.kind {
        ElementKind::Line { end_x, end_y, .. } | ElementKind::Arrow { end_x, end_y, .. } => vec![
            (Handle::Start, element.x, element.y),
            (Handle::End, *end_x, *end_y),
        ],
        ElementKind::Rect { .. } | ElementKind::Image { .. } | ElementKind::Circle { .. } => {
            let b = bounding_box(element).inflate(HANDLE_MARGIN);
            Handle::BOX
                .iter()
                .filter_map(|h| h.anchor_on(&b).map(|(x, y)| (*h, x, y)))
                .collect()
        }
        ElementKind::Text { .. } | ElementKind::Group { .. } => Vec::new(),
    }
}

/// The handle within [`HANDLE_TOLERANCE`] of `(px, py)`, nearest first.
pub fn resize_handle(element: &Element, px: f64, py: f64) -> Option<Handle> {
    handle_positions(element)
        .into_iter()
        .map(|(h, hx, hy)| (h, (px - hx).hypot(py - hy)))
        .filter(|(_, d)| *d <= HANDLE_TOLERANCE)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(h, _)| h)
}

/// Outcome of a resize: the new payload and anchor position.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeResult {
    pub kind: ElementKind,
    pub x: f64,
    pub y: f64,
}

impl ResizeResult {
    /// Apply onto a copy of `original`, keeping id, animation and group link.
    pub fn applied_to(self, original: &Element) -> Element {
        Element {
            x: self.x,
            y: self.y,
            kind: self.kind,
            ..original.clone()
        }
    }
}

fn snap(v: f64, grid: Option<f64>) -> f64 {
    match grid {
        Some(g) if g > 0.0 => (v / g).round() * g,
        _ => v,
    }
}

/// Resize `original` by dragging `handle` to `(px, py)`.
///
/// Box handles keep the opposite anchor fixed and clamp each side to
/// [`MIN_SIZE`]; with `aspect_locked` the dependent side follows the
/// original aspect ratio. Circles take the pointer distance as the new
/// radius. Segment handles move only that endpoint, snapped to `grid`.
/// Returns `None` when the handle does not apply to the element.
pub fn apply_resize(
    original: &Element,
    handle: Handle,
    px: f64,
    py: f64,
    aspect_locked: bool,
    grid: Option<f64>,
) -> Option<ResizeResult> {
    let mut kind = original.kind.clone();
    match &mut kind {
        ElementKind::Line { end_x, end_y, .. } | ElementKind::Arrow { end_x, end_y, .. } => {
            let (sx, sy) = (snap(px, grid), snap(py, grid));
            match handle {
                Handle::Start => Some(ResizeResult {
                    kind,
                    x: sx,
                    y: sy,
                }),
                Handle::End => {
                    *end_x = sx;
                    *end_y = sy;
                    Some(ResizeResult {
                        kind,
                        x: original.x,
                        y: original.y,
                    })
                }
                _ => None,
            }
        }
        ElementKind::Circle { radius, .. } => {
            handle.box_fraction()?;
            *radius = (px - original.x)
                .hypot(py - original.y)
                .clamp(MIN_RADIUS, MAX_RADIUS);
            Some(ResizeResult {
                kind,
                x: original.x,
                y: original.y,
            })
        }
        ElementKind::Rect { width, height, .. } | ElementKind::Image { width, height, .. } => {
            let (fx, fy) = handle.box_fraction()?;
            let b = bounding_box(original);
            let (w, h, x, y) = resize_box(&b, fx, fy, px, py, aspect_locked);
            *width = w;
            *height = h;
            Some(ResizeResult { kind, x, y })
        }
        ElementKind::Text { .. } | ElementKind::Group { .. } => None,
    }
}

/// Box resize for a handle at fractional position `(fx, fy)` on `b`.
/// Returns `(width, height, center_x, center_y)`.
fn resize_box(b: &Bounds, fx: f64, fy: f64, px: f64, py: f64, locked: bool) -> (f64, f64, f64, f64) {
    let (left, top, right, bottom) = (b.x, b.y, b.right(), b.bottom());
    let (cx, cy) = b.center();
    let aspect = if b.height > 0.0 { b.width / b.height } else { 1.0 };

    let horizontal = fx != 0.5;
    let vertical = fy != 0.5;

    let mut w = if !horizontal {
        b.width
    } else if fx == 1.0 {
        (px - left).max(MIN_SIZE)
    } else {
        (right - px).max(MIN_SIZE)
    };
    let mut h = if !vertical {
        b.height
    } else if fy == 1.0 {
        (py - top).max(MIN_SIZE)
    } else {
        (bottom - py).max(MIN_SIZE)
    };

    if locked && aspect > 0.0 {
        if horizontal {
            h = (w / aspect).max(MIN_SIZE);
        } else {
            w = (h * aspect).max(MIN_SIZE);
        }
    }

    // Opposite anchor stays put; an untouched axis stays centered.
    let x = if !horizontal {
        cx
    } else if fx == 1.0 {
        left + w / 2.0
    } else {
        right - w / 2.0
    };
    let y = if !vertical {
        cy
    } else if fy == 1.0 {
        top + h / 2.0
    } else {
        bottom - h / 2.0
    };
    (w, h, x, y)
}
