//! Hit testing: point → element lookup over a whole scene.
//!
//! Walks the element list back to front (last painted = topmost) using the
//! per-shape tests from `sb_core::geometry`.

use sb_core::geometry::{Bounds, Handle, bounding_box, hit_test, resize_handle};
use sb_core::{ElementId, SceneGraph};

/// Find the topmost element at `(px, py)`, or `None` over background.
pub fn topmost_at(graph: &SceneGraph, px: f64, py: f64) -> Option<ElementId> {
    graph
        .iter()
        .rev()
        .find(|el| hit_test(el, px, py))
        .map(|el| el.id)
}

/// All elements whose bounding box overlaps `rect`, in z-order.
/// Used for marquee selection.
pub fn hit_test_rect(graph: &SceneGraph, rect: &Bounds) -> Vec<ElementId> {
    graph
        .iter()
        .filter(|el| bounding_box(el).intersects(rect))
        .map(|el| el.id)
        .collect()
}

/// A resize handle of one of the `selected` elements under `(px, py)`.
/// Topmost selected element wins.
pub fn handle_at(
    graph: &SceneGraph,
    selected: &[ElementId],
    px: f64,
    py: f64,
) -> Option<(ElementId, Handle)> {
    graph
        .iter()
        .rev()
        .filter(|el| selected.contains(&el.id))
        .find_map(|el| resize_handle(el, px, py).map(|h| (el.id, h)))
}
