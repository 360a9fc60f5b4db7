//! Scene graph → surface drawing calls.
//!
//! Walks elements in z-order. With a [`FrameTime`] each element is drawn
//! under its evaluated [`VisualState`]; interactive renders add selection
//! decorations and the marquee on top. Export frames never carry them.

use crate::images::{ImageCache, ImageState};
use crate::surface::{StrokeStyle, Surface, TextRun};
use kurbo::{Affine, BezPath, Circle, Line, Point, Rect, RoundedRect};
use sb_core::anim::{VisualState, evaluate};
use sb_core::geometry::{Bounds, bounding_box, handle_positions};
use sb_core::{Color, Element, ElementId, ElementKind, SceneGraph, TextAlign};
use std::f64::consts::PI;

/// Sample time for one render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    pub elapsed_ms: f64,
    /// Element `i` in z-order is evaluated at `elapsed_ms - i * stagger_ms`.
    pub stagger_ms: f64,
}

impl FrameTime {
    pub fn new(elapsed_ms: f64, stagger_ms: f64) -> Self {
        Self {
            elapsed_ms,
            stagger_ms,
        }
    }

    /// Local time for the element at z-index `index`.
    pub fn local(&self, index: usize) -> f64 {
        self.elapsed_ms - index as f64 * self.stagger_ms
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions<'a> {
    /// Draw selection decorations and the marquee.
    pub interactive: bool,
    pub selection: &'a [ElementId],
    pub marquee: Option<Bounds>,
    pub background: Color,
    /// Pan offset applied to the whole scene (interactive view).
    pub view_offset: (f64, f64),
}

impl Default for RenderOptions<'_> {
    fn default() -> Self {
        Self::export(Color::WHITE)
    }
}

impl<'a> RenderOptions<'a> {
    /// Options for an export frame: no decorations, no pan.
    pub fn export(background: Color) -> Self {
        Self {
            interactive: false,
            selection: &[],
            marquee: None,
            background,
            view_offset: (0.0, 0.0),
        }
    }

    pub fn interactive(selection: &'a [ElementId], marquee: Option<Bounds>) -> Self {
        Self {
            interactive: true,
            selection,
            marquee,
            background: Color::WHITE,
            view_offset: (0.0, 0.0),
        }
    }
}

const SELECTION_COLOR: Color = Color::rgba(0.31, 0.765, 0.969, 1.0);
const MARQUEE_FILL: Color = Color::rgba(0.31, 0.765, 0.969, 0.08);
const PLACEHOLDER_COLOR: Color = Color::rgba(0.525, 0.525, 0.545, 1.0);
const PLACEHOLDER_FILL: Color = Color::rgba(0.557, 0.557, 0.576, 0.08);
const HANDLE_SIZE: f64 = 8.0;
const OUTLINE_WIDTH: f64 = 2.0;

/// Paint `graph` onto `surface`.
pub fn render<S: Surface>(
    graph: &SceneGraph,
    time: Option<FrameTime>,
    images: &ImageCache,
    surface: &mut S,
    options: &RenderOptions<'_>,
) {
    surface.clear(options.background);
    surface.save();
    if options.view_offset != (0.0, 0.0) {
        surface.transform(Affine::translate(options.view_offset));
    }

    for (index, element) in graph.iter().enumerate() {
        let state = time
            .map(|t| evaluate(element, t.local(index)))
            .unwrap_or(VisualState::IDENTITY);
        if state.is_invisible() {
            log::trace!("skip {} (invisible)", element.id);
            continue;
        }
        let selected = options.selection.contains(&element.id);

        surface.save();
        let bounds = bounding_box(element);
        surface.transform(state.transform((element.x, element.y), bounds.center()));
        surface.multiply_alpha(state.opacity);
        paint_element(surface, element, images, options.interactive && selected);
        surface.restore();
    }

    if options.interactive {
        for element in graph.iter().filter(|e| options.selection.contains(&e.id)) {
            paint_selection(surface, element);
        }
        if let Some(rect) = options.marquee {
            paint_marquee(surface, &rect);
        }
    }
    surface.restore();
}

fn paint_element<S: Surface>(
    surface: &mut S,
    element: &Element,
    images: &ImageCache,
    selected_interactive: bool,
) {
    let b = bounding_box(element);
    match &element.kind {
        ElementKind::Text {
            text,
            size,
            color,
            font,
            weight,
            align,
        } => surface.draw_text(&TextRun {
            text,
            font,
            weight: *weight,
            size: *size,
            align: *align,
            color: *color,
            x: element.x,
            y: element.y,
        }),

        ElementKind::Rect {
            color,
            filled,
            border_radius,
            ..
        } => {
            let shape = RoundedRect::from_rect(to_rect(&b), border_radius.max(0.0));
            if *filled {
                surface.fill_shape(&shape, *color);
            } else {
                surface.stroke_shape(&shape, *color, StrokeStyle::solid(OUTLINE_WIDTH));
            }
        }

        ElementKind::Circle {
            radius,
            color,
            filled,
        } => {
            let shape = Circle::new((element.x, element.y), *radius);
            if *filled {
                surface.fill_shape(&shape, *color);
            } else {
                surface.stroke_shape(&shape, *color, StrokeStyle::solid(OUTLINE_WIDTH));
            }
        }

        ElementKind::Line {
            end_x,
            end_y,
            color,
            stroke_width,
        } => {
            let line = Line::new((element.x, element.y), (*end_x, *end_y));
            surface.stroke_shape(&line, *color, StrokeStyle::solid(*stroke_width));
        }

        ElementKind::Arrow {
            end_x,
            end_y,
            color,
            stroke_width,
            arrow_size,
        } => {
            let start = Point::new(element.x, element.y);
            let end = Point::new(*end_x, *end_y);
            surface.stroke_shape(&Line::new(start, end), *color, StrokeStyle::solid(*stroke_width));
            if start != end {
                surface.fill_path(&arrowhead(start, end, *arrow_size), *color);
            }
        }

        ElementKind::Image { src, .. } => match images.state(src) {
            ImageState::Ready(img) => surface.draw_image(&img, to_rect(&b)),
            _ => paint_placeholder(surface, &b, src),
        },

        ElementKind::Group { .. } => {
            if selected_interactive {
                surface.stroke_shape(
                    &to_rect(&b),
                    SELECTION_COLOR,
                    StrokeStyle::dashed(1.5, 6.0, 4.0),
                );
            }
        }
    }
}

fn to_rect(b: &Bounds) -> Rect {
    Rect::new(b.x, b.y, b.right(), b.bottom())
}

/// Filled triangle at `end`, wings at `angle ± π/6`.
fn arrowhead(start: Point, end: Point, size: f64) -> BezPath {
    let angle = (end.y - start.y).atan2(end.x - start.x);
    let wing = |a: f64| Point::new(end.x - size * a.cos(), end.y - size * a.sin());
    let mut path = BezPath::new();
    path.move_to(end);
    path.line_to(wing(angle - PI / 6.0));
    path.line_to(wing(angle + PI / 6.0));
    path.close_path();
    path
}

/// Dashed box with a label, shown while an image is missing.
fn paint_placeholder<S: Surface>(surface: &mut S, b: &Bounds, src: &str) {
    let rect = to_rect(b);
    surface.fill_shape(&rect, PLACEHOLDER_FILL);
    surface.stroke_shape(&rect, PLACEHOLDER_COLOR, StrokeStyle::dashed(1.0, 4.0, 4.0));
    let label = src.rsplit('/').next().unwrap_or(src);
    let (cx, cy) = b.center();
    surface.draw_text(&TextRun {
        text: if label.is_empty() { "image" } else { label },
        font: sb_core::DEFAULT_FONT_FAMILY,
        weight: sb_core::DEFAULT_FONT_WEIGHT,
        size: 12.0,
        align: TextAlign::Center,
        color: PLACEHOLDER_COLOR,
        x: cx,
        y: cy,
    });
}

// ─── Decorations ─────────────────────────────────────────────────────────

fn paint_selection<S: Surface>(surface: &mut S, element: &Element) {
    let b = bounding_box(element);
    if !element.kind.is_group() {
        surface.stroke_shape(&to_rect(&b), SELECTION_COLOR, StrokeStyle::solid(1.0));
    }
    for (_, hx, hy) in handle_positions(element) {
        if element.kind.is_segment() {
            let dot = Circle::new((hx, hy), HANDLE_SIZE / 2.0);
            surface.fill_shape(&dot, Color::WHITE);
            surface.stroke_shape(&dot, SELECTION_COLOR, StrokeStyle::solid(1.5));
        } else {
            let half = HANDLE_SIZE / 2.0;
            let square = Rect::new(hx - half, hy - half, hx + half, hy + half);
            surface.fill_shape(&square, Color::WHITE);
            surface.stroke_shape(&square, SELECTION_COLOR, StrokeStyle::solid(1.5));
        }
    }
}

/// Rubber-band selection rectangle.
fn paint_marquee<S: Surface>(surface: &mut S, rect: &Bounds) {
    if rect.width < 1.0 && rect.height < 1.0 {
        return;
    }
    let r = to_rect(rect);
    surface.fill_shape(&r, MARQUEE_FILL);
    surface.stroke_shape(&r, SELECTION_COLOR, StrokeStyle::dashed(1.0, 4.0, 4.0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::LoadedImage;
    use crate::surface::{DrawOp, PixmapSurface, RecordingSurface};
    use pretty_assertions::assert_eq;
    use sb_core::{AnimationDescriptor, AnimationKind, Easing};

    fn fade(delay: f64) -> AnimationDescriptor {
        AnimationDescriptor::new(AnimationKind::FadeIn, 1000.0, delay, Easing::Linear).unwrap()
    }

    fn fills(s: &RecordingSurface) -> Vec<(Color, f64)> {
        s.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Fill { color, alpha, .. } => Some((*color, *alpha)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn export_frame_has_no_decorations() {
        let rect = Element::new(ElementKind::rect(50.0, 50.0, Color::BLACK), 100.0, 100.0);
        let id = rect.id;
        let graph = SceneGraph::from_elements(vec![rect]).unwrap();
        let cache = ImageCache::new();
        let selection = [id];

        let mut export = RecordingSurface::new(200, 200);
        let mut opts = RenderOptions::export(Color::WHITE);
        opts.selection = &selection;
        render(&graph, None, &cache, &mut export, &opts);
        assert_eq!(export.ops.len(), 2, "{:?}", export.ops);

        let mut live = RecordingSurface::new(200, 200);
        let marquee = Some(Bounds::new(0.0, 0.0, 30.0, 30.0));
        render(&graph, None, &cache, &mut live, &RenderOptions::interactive(&selection, marquee));
        // rect + outline + 8 handles × 2 + marquee fill/stroke
        assert_eq!(live.ops.len(), 1 + 1 + 1 + 16 + 2);
        assert_eq!(live.depth(), 0);
    }

    #[test]
    fn stagger_offsets_each_element() {
        let a = Element::new(ElementKind::circle(5.0, Color::BLACK), 10.0, 10.0).animated(fade(0.0));
        let b = Element::new(ElementKind::circle(5.0, Color::WHITE), 30.0, 10.0).animated(fade(0.0));
        let graph = SceneGraph::from_elements(vec![a, b]).unwrap();
        let cache = ImageCache::new();

        let mut s = RecordingSurface::new(50, 50);
        render(&graph, Some(FrameTime::new(600.0, 200.0)), &cache, &mut s, &RenderOptions::default());
        let alphas: Vec<f64> = fills(&s).iter().map(|(_, a)| *a).collect();
        assert_eq!(alphas.len(), 2);
        assert!((alphas[0] - 0.6).abs() < 1e-9);
        assert!((alphas[1] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn hidden_elements_are_skipped() {
        let late = Element::new(ElementKind::rect(10.0, 10.0, Color::BLACK), 5.0, 5.0).animated(fade(500.0));
        let graph = SceneGraph::from_elements(vec![late]).unwrap();
        let mut s = RecordingSurface::new(20, 20);
        render(&graph, Some(FrameTime::new(100.0, 0.0)), &ImageCache::new(), &mut s, &RenderOptions::default());
        assert_eq!(s.ops, vec![DrawOp::Clear(Color::WHITE)]);
    }

    #[test]
    fn missing_image_draws_placeholder() {
        let img = Element::new(ElementKind::image("assets/logo.png", 40.0, 20.0), 50.0, 50.0);
        let graph = SceneGraph::from_elements(vec![img]).unwrap();
        let mut cache = ImageCache::new();

        let mut s = RecordingSurface::new(100, 100);
        render(&graph, None, &cache, &mut s, &RenderOptions::default());
        assert_eq!(s.texts(), vec!["logo.png"]);

        cache.request("assets/logo.png");
        cache.complete("assets/logo.png", Ok(LoadedImage::solid(4, 2, [0, 255, 0, 255])));
        let mut s = RecordingSurface::new(100, 100);
        render(&graph, None, &cache, &mut s, &RenderOptions::default());
        assert!(matches!(
            s.ops[1],
            DrawOp::Image { width: 4, height: 2, dest, .. } if dest == Rect::new(30.0, 40.0, 70.0, 60.0)
        ));
    }

    #[test]
    fn arrowhead_points_along_the_shaft() {
        let head = arrowhead(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 12.0);
        let bb = kurbo::Shape::bounding_box(&head);
        assert!((bb.x1 - 100.0).abs() < 1e-9);
        assert!((bb.x0 - (100.0 - 12.0 * (PI / 6.0).cos())).abs() < 1e-9);
        assert!((bb.height() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn pixmap_render_of_filled_rect() {
        let rect = Element::new(
            ElementKind::rect(20.0, 20.0, Color::from_rgba8(0, 0, 255, 255)),
            20.0,
            20.0,
        );
        let graph = SceneGraph::from_elements(vec![rect]).unwrap();
        let mut s = PixmapSurface::new(40, 40).unwrap();
        render(&graph, None, &ImageCache::new(), &mut s, &RenderOptions::default());
        assert_eq!(s.pixel(20, 20), Some([0, 0, 255, 255]));
        assert_eq!(s.pixel(2, 2), Some([255, 255, 255, 255]));
    }
}
