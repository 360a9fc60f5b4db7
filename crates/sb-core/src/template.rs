//! Template import: ordered draw-command records to canonical elements.
//!
//! A template is a JSON array of `{type, x, y, ...}` records, or an object
//! whose `commands` field holds that array. Every record is parsed before
//! anything is returned, so a single malformed record rejects the whole
//! template and the caller's scene is never partially mutated.

use crate::error::TemplateError;
use crate::model::{
    AnimationDescriptor, Color, DEFAULT_FONT_FAMILY, DEFAULT_FONT_WEIGHT, Element, ElementKind,
    TextAlign,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse a template document into elements, in record order.
pub fn import_template(json: &str) -> Result<Vec<Element>, TemplateError> {
    let root: Value = serde_json::from_str(json)?;
    let records = match root {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("commands") {
            Some(Value::Array(items)) => items,
            _ => return Err(TemplateError::NotAList),
        },
        _ => return Err(TemplateError::NotAList),
    };
    import_commands(&records)
}

/// Convert already-parsed records. Record `i` gets the default
/// `fadeIn` descriptor delayed by `i * 500 ms` unless it carries its own
/// `animation`.
pub fn import_commands(records: &[Value]) -> Result<Vec<Element>, TemplateError> {
    let elements = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let cmd = DrawCommand::deserialize(record)
                .map_err(|e| TemplateError::record(index, e.to_string()))?;
            Ok(cmd.into_element(index))
        })
        .collect::<Result<Vec<_>, TemplateError>>()?;
    log::debug!("imported {} draw commands", elements.len());
    Ok(elements)
}

// ─── Records ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrawCommand {
    x: f64,
    y: f64,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    animation: Option<AnimationDescriptor>,
    #[serde(flatten)]
    shape: Shape,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Shape {
    #[serde(rename_all = "camelCase")]
    Text {
        text: String,
        #[serde(default = "default_text_size", alias = "fontSize")]
        size: f64,
        #[serde(default = "default_color")]
        color: Color,
        #[serde(default = "default_font", alias = "fontFamily")]
        font: String,
        #[serde(
            default = "default_weight",
            alias = "fontWeight",
            deserialize_with = "de_weight"
        )]
        weight: u16,
        #[serde(default)]
        align: TextAlign,
    },
    #[serde(rename_all = "camelCase")]
    Rect {
        #[serde(default = "default_box_side")]
        width: f64,
        #[serde(default = "default_box_side")]
        height: f64,
        #[serde(default = "default_color")]
        color: Color,
        #[serde(default = "default_true")]
        filled: bool,
        #[serde(default)]
        border_radius: f64,
    },
    Circle {
        #[serde(default = "default_radius")]
        radius: f64,
        #[serde(default = "default_color")]
        color: Color,
        #[serde(default = "default_true")]
        filled: bool,
    },
    #[serde(rename_all = "camelCase")]
    Line {
        end_x: f64,
        end_y: f64,
        #[serde(default = "default_color")]
        color: Color,
        #[serde(default = "default_stroke", alias = "lineWidth")]
        stroke_width: f64,
    },
    #[serde(rename_all = "camelCase")]
    Arrow {
        end_x: f64,
        end_y: f64,
        #[serde(default = "default_color")]
        color: Color,
        #[serde(default = "default_stroke", alias = "lineWidth")]
        stroke_width: f64,
        #[serde(default = "default_arrow_size")]
        arrow_size: f64,
    },
    Image {
        src: String,
        #[serde(default = "default_image_width")]
        width: f64,
        #[serde(default = "default_image_height")]
        height: f64,
    },
}

fn default_text_size() -> f64 {
    24.0
}
fn default_color() -> Color {
    Color::BLACK
}
fn default_font() -> String {
    DEFAULT_FONT_FAMILY.into()
}
fn default_weight() -> u16 {
    DEFAULT_FONT_WEIGHT
}
fn default_box_side() -> f64 {
    100.0
}
fn default_true() -> bool {
    true
}
fn default_radius() -> f64 {
    50.0
}
fn default_stroke() -> f64 {
    2.0
}
fn default_arrow_size() -> f64 {
    12.0
}
fn default_image_width() -> f64 {
    200.0
}
fn default_image_height() -> f64 {
    150.0
}

/// CSS font weight: a number in 100..=900, `"normal"` or `"bold"`.
fn de_weight<'de, D: Deserializer<'de>>(d: D) -> Result<u16, D::Error> {
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Weight {
        Num(f64),
        Name(String),
    }

    let w = match Weight::deserialize(d)? {
        Weight::Num(n) => n,
        Weight::Name(s) => match s.trim().to_ascii_lowercase().as_str() {
            "normal" => 400.0,
            "bold" => 700.0,
            other => other
                .parse::<f64>()
                .map_err(|_| D::Error::custom(format!("unknown font weight `{s}`")))?,
        },
    };
    if !(100.0..=900.0).contains(&w) {
        return Err(D::Error::custom(format!("font weight {w} outside 100..=900")));
    }
    Ok(w.round() as u16)
}

impl DrawCommand {
    fn into_element(self, index: usize) -> Element {
        let kind = match self.shape {
            Shape::Text {
                text,
                size,
                color,
                font,
                weight,
                align,
            } => ElementKind::Text {
                text,
                size,
                color,
                font,
                weight,
                align,
            },
            Shape::Rect {
                width,
                height,
                color,
                filled,
                border_radius,
            } => ElementKind::Rect {
                width,
                height,
                color,
                filled,
                border_radius,
            },
            Shape::Circle {
                radius,
                color,
                filled,
            } => ElementKind::Circle {
                radius,
                color,
                filled,
            },
            Shape::Line {
                end_x,
                end_y,
                color,
                stroke_width,
            } => ElementKind::Line {
                end_x,
                end_y,
                color,
                stroke_width,
            },
            Shape::Arrow {
                end_x,
                end_y,
                color,
                stroke_width,
                arrow_size,
            } => ElementKind::Arrow {
                end_x,
                end_y,
                color,
                stroke_width,
                arrow_size,
            },
            Shape::Image { src, width, height } => ElementKind::Image { src, width, height },
        };
        let mut element = match self.id {
            Some(id) => Element::with_id(crate::ElementId::intern(&id), kind, self.x, self.y),
            None => Element::new(kind, self.x, self.y),
        };
        element.animation = Some(
            self.animation
                .unwrap_or_else(|| AnimationDescriptor::template_default(index)),
        );
        element
    }
}
