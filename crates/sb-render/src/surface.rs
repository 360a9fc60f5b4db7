//! Raster surface abstraction.
//!
//! The painter only talks to [`Surface`]: a save/restore stack of transform
//! and alpha, plus fill/stroke/text/image primitives. [`PixmapSurface`]
//! rasterizes on the CPU through tiny-skia; [`RecordingSurface`] keeps a
//! log of draw calls for tests and hosts that replay them elsewhere.

use crate::error::RenderError;
use crate::images::LoadedImage;
use kurbo::{Affine, BezPath, PathEl, Rect, Shape};
use resvg::tiny_skia;
use sb_core::{Color, TextAlign};
use std::sync::{Arc, LazyLock};

/// Stroke parameters for [`Surface::stroke_path`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub width: f64,
    /// `[on, off]` dash lengths.
    pub dash: Option<[f64; 2]>,
}

impl StrokeStyle {
    pub fn solid(width: f64) -> Self {
        Self { width, dash: None }
    }

    pub fn dashed(width: f64, on: f64, off: f64) -> Self {
        Self {
            width,
            dash: Some([on, off]),
        }
    }
}

/// A run of text anchored at `(x, y)`: `x` per `align`, `y` vertical center.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun<'a> {
    pub text: &'a str,
    pub font: &'a str,
    pub weight: u16,
    pub size: f64,
    pub align: TextAlign,
    pub color: Color,
    pub x: f64,
    pub y: f64,
}

pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Fill the whole surface, ignoring the transform stack.
    fn clear(&mut self, color: Color);

    fn save(&mut self);
    fn restore(&mut self);
    /// Post-multiply `affine` onto the current transform.
    fn transform(&mut self, affine: Affine);
    /// Multiply the current alpha by `alpha`.
    fn multiply_alpha(&mut self, alpha: f64);

    fn fill_path(&mut self, path: &BezPath, color: Color);
    fn stroke_path(&mut self, path: &BezPath, color: Color, style: StrokeStyle);
    fn draw_text(&mut self, run: &TextRun<'_>);
    /// Draw `image` scaled into `dest`.
    fn draw_image(&mut self, image: &LoadedImage, dest: Rect);

    fn fill_shape(&mut self, shape: &impl Shape, color: Color)
    where
        Self: Sized,
    {
        self.fill_path(&shape.to_path(0.1), color);
    }

    fn stroke_shape(&mut self, shape: &impl Shape, color: Color, style: StrokeStyle)
    where
        Self: Sized,
    {
        self.stroke_path(&shape.to_path(0.1), color, style);
    }
}

#[derive(Debug, Clone, Copy)]
struct State {
    transform: Affine,
    alpha: f64,
}

const ROOT_STATE: State = State {
    transform: Affine::IDENTITY,
    alpha: 1.0,
};

// ─── tiny-skia backend ───────────────────────────────────────────────────

/// System font database shared by every surface in the process.
static FONTS: LazyLock<Arc<usvg::fontdb::Database>> = LazyLock::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    log::debug!("loaded {} font faces", db.len());
    Arc::new(db)
});

/// CPU raster target.
pub struct PixmapSurface {
    pixmap: tiny_skia::Pixmap,
    state: State,
    stack: Vec<State>,
}

impl PixmapSurface {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        let pixmap =
            tiny_skia::Pixmap::new(width, height).ok_or(RenderError::Allocate { width, height })?;
        Ok(Self {
            pixmap,
            state: ROOT_STATE,
            stack: Vec::new(),
        })
    }

    pub fn pixmap(&self) -> &tiny_skia::Pixmap {
        &self.pixmap
    }

    /// Straight (non-premultiplied) RGBA8 pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixmap.pixel(x, y).map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
    }

    /// Straight RGBA8 copy of the whole surface, row-major.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixmap.data().len());
        for p in self.pixmap.pixels() {
            let c = p.demultiply();
            out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }

    fn ts_transform(&self) -> tiny_skia::Transform {
        to_ts_transform(self.state.transform)
    }

    fn paint(&self, color: Color) -> tiny_skia::Paint<'static> {
        let [r, g, b, a] = color
            .with_alpha_factor(self.state.alpha as f32)
            .to_rgba8();
        let mut paint = tiny_skia::Paint::default();
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;
        paint
    }
}

fn to_ts_transform(a: Affine) -> tiny_skia::Transform {
    let [sx, ky, kx, sy, tx, ty] = a.as_coeffs();
    tiny_skia::Transform::from_row(
        sx as f32, ky as f32, kx as f32, sy as f32, tx as f32, ty as f32,
    )
}

fn to_ts_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = tiny_skia::PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// One-element SVG document for a text run, shaped by usvg.
fn text_svg(run: &TextRun<'_>, alpha: f64, width: u32, height: u32) -> String {
    let anchor = match run.align {
        TextAlign::Left => "start",
        TextAlign::Center => "middle",
        TextAlign::Right => "end",
    };
    let color = Color { a: 1.0, ..run.color };
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}"><text x="{x}" y="{y}" font-family="{font}, sans-serif" font-weight="{weight}" font-size="{size}" fill="{fill}" fill-opacity="{opacity}" text-anchor="{anchor}" dominant-baseline="central">{text}</text></svg>"#,
        x = run.x,
        y = run.y,
        font = escape_xml(run.font),
        weight = run.weight,
        size = run.size,
        fill = color.to_hex(),
        opacity = (run.color.a as f64 * alpha).clamp(0.0, 1.0),
        text = escape_xml(run.text),
    )
}

impl Surface for PixmapSurface {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn clear(&mut self, color: Color) {
        let [r, g, b, a] = color.to_rgba8();
        self.pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, a));
    }

    fn save(&mut self) {
        self.stack.push(self.state);
    }

    fn restore(&mut self) {
        self.state = self.stack.pop().unwrap_or(ROOT_STATE);
    }

    fn transform(&mut self, affine: Affine) {
        self.state.transform *= affine;
    }

    fn multiply_alpha(&mut self, alpha: f64) {
        self.state.alpha *= alpha.clamp(0.0, 1.0);
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) {
        let Some(path) = to_ts_path(path) else { return };
        let paint = self.paint(color);
        let ts = self.ts_transform();
        self.pixmap
            .fill_path(&path, &paint, tiny_skia::FillRule::Winding, ts, None);
    }

    fn stroke_path(&mut self, path: &BezPath, color: Color, style: StrokeStyle) {
        let Some(path) = to_ts_path(path) else { return };
        let paint = self.paint(color);
        let ts = self.ts_transform();
        let stroke = tiny_skia::Stroke {
            width: style.width as f32,
            line_cap: tiny_skia::LineCap::Round,
            line_join: tiny_skia::LineJoin::Round,
            dash: style
                .dash
                .and_then(|[on, off]| tiny_skia::StrokeDash::new(vec![on as f32, off as f32], 0.0)),
            ..Default::default()
        };
        self.pixmap.stroke_path(&path, &paint, &stroke, ts, None);
    }

    fn draw_text(&mut self, run: &TextRun<'_>) {
        if run.text.is_empty() {
            return;
        }
        let svg = text_svg(run, self.state.alpha, self.width(), self.height());
        let opts = usvg::Options {
            fontdb: Arc::clone(&FONTS),
            ..Default::default()
        };
        match usvg::Tree::from_str(&svg, &opts) {
            Ok(tree) => resvg::render(&tree, self.ts_transform(), &mut self.pixmap.as_mut()),
            Err(e) => log::warn!("skipping text {:?}: {}", run.text, RenderError::Text(e.to_string())),
        }
    }

    fn draw_image(&mut self, image: &LoadedImage, dest: Rect) {
        let Some(size) = tiny_skia::IntSize::from_wh(image.width, image.height) else {
            return;
        };
        let Some(src) = tiny_skia::Pixmap::from_vec(image.rgba8_premul.to_vec(), size) else {
            log::warn!("image buffer does not match {}x{}", image.width, image.height);
            return;
        };
        let fit = Affine::translate((dest.x0, dest.y0))
            * Affine::scale_non_uniform(
                dest.width() / image.width as f64,
                dest.height() / image.height as f64,
            );
        let paint = tiny_skia::PixmapPaint {
            opacity: self.state.alpha as f32,
            quality: tiny_skia::FilterQuality::Bilinear,
            ..Default::default()
        };
        let ts = to_ts_transform(self.state.transform * fit);
        self.pixmap.draw_pixmap(0, 0, src.as_ref(), &paint, ts, None);
    }
}

// ─── Recording backend ───────────────────────────────────────────────────

/// One recorded draw call, with the state it was issued under.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear(Color),
    Fill {
        color: Color,
        alpha: f64,
        /// Device-space bounds of the path.
        bounds: Rect,
    },
    Stroke {
        color: Color,
        alpha: f64,
        width: f64,
        dashed: bool,
        bounds: Rect,
    },
    Text {
        text: String,
        alpha: f64,
        transform: Affine,
    },
    Image {
        width: u32,
        height: u32,
        alpha: f64,
        dest: Rect,
    },
}

/// Surface that records calls instead of drawing.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    state: State,
    stack: Vec<State>,
    pub ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            state: ROOT_STATE,
            stack: Vec::new(),
            ops: Vec::new(),
        }
    }

    /// Texts drawn so far, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self, color: Color) {
        self.ops.push(DrawOp::Clear(color));
    }

    fn save(&mut self) {
        self.stack.push(self.state);
    }

    fn restore(&mut self) {
        self.state = self.stack.pop().unwrap_or(ROOT_STATE);
    }

    fn transform(&mut self, affine: Affine) {
        self.state.transform *= affine;
    }

    fn multiply_alpha(&mut self, alpha: f64) {
        self.state.alpha *= alpha.clamp(0.0, 1.0);
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) {
        self.ops.push(DrawOp::Fill {
            color,
            alpha: self.state.alpha,
            bounds: (self.state.transform * path.clone()).bounding_box(),
        });
    }

    fn stroke_path(&mut self, path: &BezPath, color: Color, style: StrokeStyle) {
        self.ops.push(DrawOp::Stroke {
            color,
            alpha: self.state.alpha,
            width: style.width,
            dashed: style.dash.is_some(),
            bounds: (self.state.transform * path.clone()).bounding_box(),
        });
    }

    fn draw_text(&mut self, run: &TextRun<'_>) {
        self.ops.push(DrawOp::Text {
            text: run.text.to_string(),
            alpha: self.state.alpha,
            transform: self.state.transform,
        });
    }

    fn draw_image(&mut self, image: &LoadedImage, dest: Rect) {
        self.ops.push(DrawOp::Image {
            width: image.width,
            height: image.height,
            alpha: self.state.alpha,
            dest: self.state.transform.transform_rect_bbox(dest),
        });
    }
}
