//! Core scene data model.
//!
//! A scene is an ordered list of [`Element`]s: list order is paint order
//! (index 0 is painted first, the last element is topmost). Groups are
//! synthetic elements that reference their children by id; children point
//! back through `group_id`. Animations are attached per element as a
//! declarative [`AnimationDescriptor`].

use crate::error::ModelError;
use crate::geometry::{Bounds, bounding_box};
use crate::id::ElementId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Parse a hex color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
    /// The string may optionally start with `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        match bytes.len() {
            3 | 4 => {
                let mut ch = [15u8; 4];
                for (slot, byte) in ch.iter_mut().zip(bytes) {
                    *slot = hex_val(*byte)?;
                }
                Some(Self::from_rgba8(ch[0] * 17, ch[1] * 17, ch[2] * 17, ch[3] * 17))
            }
            6 | 8 => {
                let mut ch = [255u8; 4];
                for (slot, pair) in ch.iter_mut().zip(bytes.chunks_exact(2)) {
                    *slot = hex_val(pair[0])? << 4 | hex_val(pair[1])?;
                }
                Some(Self::from_rgba8(ch[0], ch[1], ch[2], ch[3]))
            }
            _ => None,
        }
    }

    /// Parse a hex color or one of a handful of CSS color names.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let named = match s.to_ascii_lowercase().as_str() {
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "transparent" => Some(Self::TRANSPARENT),
            "red" => Some(Self::from_rgba8(255, 0, 0, 255)),
            "green" => Some(Self::from_rgba8(0, 128, 0, 255)),
            "blue" => Some(Self::from_rgba8(0, 0, 255, 255)),
            "yellow" => Some(Self::from_rgba8(255, 255, 0, 255)),
            "orange" => Some(Self::from_rgba8(255, 165, 0, 255)),
            "purple" => Some(Self::from_rgba8(128, 0, 128, 255)),
            "gray" | "grey" => Some(Self::from_rgba8(128, 128, 128, 255)),
            _ => None,
        };
        named.or_else(|| {
            if s.starts_with('#') {
                Self::from_hex(s)
            } else {
                None
            }
        })
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Emit as shortest valid hex string (`#RRGGBB` when opaque).
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }

    /// Same color with its alpha multiplied by `factor`.
    pub fn with_alpha_factor(self, factor: f32) -> Self {
        Self {
            a: self.a * factor.clamp(0.0, 1.0),
            ..self
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color `{s}`")))
    }
}

// ─── Text ────────────────────────────────────────────────────────────────

/// Horizontal text alignment relative to the text element's `x` anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

pub const DEFAULT_FONT_FAMILY: &str = "Arial";
pub const DEFAULT_FONT_WEIGHT: u16 = 400;

// ─── Animation ───────────────────────────────────────────────────────────

/// The effect an animation applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnimationKind {
    FadeIn,
    SlideIn,
    ZoomIn,
    Rotate,
    Bounce,
    /// No effect. Unknown effect names also land here.
    #[default]
    #[serde(other)]
    None,
}

/// Easing function applied to normalized progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    Bounce,
    Elastic,
}

/// Effect, timing and easing attached to an element.
///
/// `duration_ms` is always strictly positive and `delay_ms` non-negative;
/// both constructors and deserialization enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAnimation", rename_all = "camelCase")]
pub struct AnimationDescriptor {
    #[serde(rename = "type")]
    kind: AnimationKind,
    #[serde(rename = "duration")]
    duration_ms: f64,
    #[serde(rename = "delay")]
    delay_ms: f64,
    easing: Easing,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnimation {
    #[serde(rename = "type", default)]
    kind: AnimationKind,
    #[serde(alias = "durationMs")]
    duration: f64,
    #[serde(alias = "delayMs", default)]
    delay: f64,
    #[serde(default)]
    easing: Easing,
}

impl TryFrom<RawAnimation> for AnimationDescriptor {
    type Error = ModelError;

    fn try_from(raw: RawAnimation) -> Result<Self, Self::Error> {
        AnimationDescriptor::new(raw.kind, raw.duration, raw.delay, raw.easing)
    }
}

impl AnimationDescriptor {
    pub fn new(
        kind: AnimationKind,
        duration_ms: f64,
        delay_ms: f64,
        easing: Easing,
    ) -> Result<Self, ModelError> {
        if !(duration_ms.is_finite() && duration_ms > 0.0) {
            return Err(ModelError::animation(format!(
                "duration must be > 0, got {duration_ms}"
            )));
        }
        if !(delay_ms.is_finite() && delay_ms >= 0.0) {
            return Err(ModelError::animation(format!(
                "delay must be >= 0, got {delay_ms}"
            )));
        }
        Ok(Self {
            kind,
            duration_ms,
            delay_ms,
            easing,
        })
    }

    /// The descriptor template import attaches to the record at `index`.
    pub fn template_default(index: usize) -> Self {
        Self {
            kind: AnimationKind::FadeIn,
            duration_ms: 1000.0,
            delay_ms: index as f64 * 500.0,
            easing: Easing::EaseOut,
        }
    }

    pub fn kind(&self) -> AnimationKind {
        self.kind
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn delay_ms(&self) -> f64 {
        self.delay_ms
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    /// Time at which the animation has fully settled.
    pub fn end_ms(&self) -> f64 {
        self.delay_ms + self.duration_ms
    }
}

// ─── Elements ────────────────────────────────────────────────────────────

/// Per-type element payload. Each variant carries only the fields valid for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    #[serde(rename_all = "camelCase")]
    Text {
        text: String,
        size: f64,
        color: Color,
        font: String,
        weight: u16,
        align: TextAlign,
    },

    #[serde(rename_all = "camelCase")]
    Rect {
        width: f64,
        height: f64,
        color: Color,
        filled: bool,
        border_radius: f64,
    },

    Circle {
        radius: f64,
        color: Color,
        filled: bool,
    },

    #[serde(rename_all = "camelCase")]
    Line {
        end_x: f64,
        end_y: f64,
        color: Color,
        stroke_width: f64,
    },

    #[serde(rename_all = "camelCase")]
    Arrow {
        end_x: f64,
        end_y: f64,
        color: Color,
        stroke_width: f64,
        arrow_size: f64,
    },

    Image {
        src: String,
        width: f64,
        height: f64,
    },

    /// Synthetic container. `children` are element ids in paint order.
    Group {
        width: f64,
        height: f64,
        children: SmallVec<[ElementId; 4]>,
    },
}

impl ElementKind {
    /// Lowercase type tag (`rect`, `circle`, ...), also used as the id prefix.
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementKind::Text { .. } => "text",
            ElementKind::Rect { .. } => "rect",
            ElementKind::Circle { .. } => "circle",
            ElementKind::Line { .. } => "line",
            ElementKind::Arrow { .. } => "arrow",
            ElementKind::Image { .. } => "image",
            ElementKind::Group { .. } => "group",
        }
    }

    pub fn is_segment(&self) -> bool {
        matches!(self, ElementKind::Line { .. } | ElementKind::Arrow { .. })
    }

    pub fn is_group(&self) -> bool {
        matches!(self, ElementKind::Group { .. })
    }

    pub fn text(text: impl Into<String>, size: f64, color: Color) -> Self {
        ElementKind::Text {
            text: text.into(),
            size,
            color,
            font: DEFAULT_FONT_FAMILY.into(),
            weight: DEFAULT_FONT_WEIGHT,
            align: TextAlign::default(),
        }
    }

    pub fn rect(width: f64, height: f64, color: Color) -> Self {
        ElementKind::Rect {
            width,
            height,
            color,
            filled: true,
            border_radius: 0.0,
        }
    }

    pub fn circle(radius: f64, color: Color) -> Self {
        ElementKind::Circle {
            radius,
            color,
            filled: true,
        }
    }

    pub fn line(end_x: f64, end_y: f64, color: Color) -> Self {
        ElementKind::Line {
            end_x,
            end_y,
            color,
            stroke_width: 2.0,
        }
    }

    pub fn arrow(end_x: f64, end_y: f64, color: Color) -> Self {
        ElementKind::Arrow {
            end_x,
            end_y,
            color,
            stroke_width: 2.0,
            arrow_size: 12.0,
        }
    }

    pub fn image(src: impl Into<String>, width: f64, height: f64) -> Self {
        ElementKind::Image {
            src: src.into(),
            width,
            height,
        }
    }
}

/// One drawable primitive or group in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<ElementId>,
    #[serde(flatten)]
    pub kind: ElementKind,
}

impl Element {
    /// Create an element with a fresh id derived from its type.
    pub fn new(kind: ElementKind, x: f64, y: f64) -> Self {
        Self::with_id(ElementId::with_prefix(kind.type_name()), kind, x, y)
    }

    pub fn with_id(id: ElementId, kind: ElementKind, x: f64, y: f64) -> Self {
        Self {
            id,
            x,
            y,
            animation: None,
            group_id: None,
            kind,
        }
    }

    #[must_use]
    pub fn animated(mut self, animation: AnimationDescriptor) -> Self {
        self.animation = Some(animation);
        self
    }

    /// Move by `(dx, dy)`. Segments move both endpoints.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
        if let ElementKind::Line { end_x, end_y, .. } | ElementKind::Arrow { end_x, end_y, .. } =
            &mut self.kind
        {
            *end_x += dx;
            *end_y += dy;
        }
    }

    /// Image source referenced by this element, if any.
    pub fn image_src(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Image { src, .. } => Some(src),
            _ => None,
        }
    }

    pub fn bounds(&self) -> Bounds {
        bounding_box(self)
    }

    fn check(&self) -> Result<(), ModelError> {
        let invalid = |reason: &str| ModelError::InvalidElement {
            id: self.id,
            reason: reason.into(),
        };
        if !(self.x.is_finite() && self.y.is_finite()) {
            return Err(invalid("position must be finite"));
        }
        match &self.kind {
            ElementKind::Text { size, .. } if !(*size > 0.0) => Err(invalid("text size must be > 0")),
            ElementKind::Rect { width, height, .. }
            | ElementKind::Image { width, height, .. }
            | ElementKind::Group { width, height, .. }
                if !(*width >= 0.0 && *height >= 0.0) =>
            {
                Err(invalid("width/height must be >= 0"))
            }
            ElementKind::Circle { radius, .. } if !(*radius >= 0.0) => {
                Err(invalid("radius must be >= 0"))
            }
            _ => Ok(()),
        }
    }
}

// ─── Scene Graph ─────────────────────────────────────────────────────────

/// Ordered collection of elements; order is z-order.
///
/// Serialized as a bare element array. Deserializing runs the same checks
/// as [`SceneGraph::from_elements`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Vec<Element>")]
pub struct SceneGraph {
    elements: Vec<Element>,
}

impl TryFrom<Vec<Element>> for SceneGraph {
    type Error = ModelError;

    fn try_from(elements: Vec<Element>) -> Result<Self, Self::Error> {
        Self::from_elements(elements)
    }
}

impl Serialize for SceneGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.elements.serialize(serializer)
    }
}

/// Padding added on every side of the union box when grouping.
pub const GROUP_PADDING: f64 = 50.0;

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from elements, checking every invariant.
    pub fn from_elements(elements: Vec<Element>) -> Result<Self, ModelError> {
        let graph = Self { elements };
        graph.validate()?;
        Ok(graph)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn ids(&self) -> Vec<ElementId> {
        self.elements.iter().map(|e| e.id).collect()
    }

    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id == id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    /// Append an element on top of the z-order.
    ///
    /// The element must be free-standing: groups are built with [`Self::group`].
    pub fn push(&mut self, element: Element) -> Result<(), ModelError> {
        if self.contains(element.id) {
            return Err(ModelError::DuplicateId(element.id));
        }
        if let Some(group) = element.group_id {
            return Err(ModelError::DanglingGroupRef {
                child: element.id,
                group,
            });
        }
        if element.kind.is_group() {
            return Err(ModelError::InvalidElement {
                id: element.id,
                reason: "groups are created from a selection".into(),
            });
        }
        element.check()?;
        self.elements.push(element);
        Ok(())
    }

    /// Replace an element's payload and position, keeping its id and group links.
    pub fn replace(&mut self, element: Element) -> Result<(), ModelError> {
        element.check()?;
        let slot = self
            .get_mut(element.id)
            .ok_or(ModelError::UnknownId(element.id))?;
        if slot.kind.is_group() != element.kind.is_group() {
            return Err(ModelError::InvalidElement {
                id: element.id,
                reason: "cannot change an element into or out of a group".into(),
            });
        }
        let group_id = slot.group_id;
        let children = match &slot.kind {
            ElementKind::Group { children, .. } => Some(children.clone()),
            _ => None,
        };
        *slot = element;
        slot.group_id = group_id;
        if let (Some(kept), ElementKind::Group { children, .. }) = (children, &mut slot.kind) {
            *children = kept;
        }
        Ok(())
    }

    /// Delete elements by id.
    ///
    /// Surviving children of a deleted group lose their back-reference;
    /// deleted children are dropped from their group, and a group left
    /// empty is removed too. Returns the removed elements in z-order.
    pub fn remove(&mut self, ids: &[ElementId]) -> Vec<Element> {
        let mut doomed: HashSet<ElementId> = ids.iter().copied().collect();

        // Groups emptied by this deletion go with it.
        for element in &self.elements {
            if let ElementKind::Group { children, .. } = &element.kind
                && !children.is_empty()
                && children.iter().all(|c| doomed.contains(c))
            {
                doomed.insert(element.id);
            }
        }

        let (removed, kept): (Vec<Element>, Vec<Element>) = std::mem::take(&mut self.elements)
            .into_iter()
            .partition(|e| doomed.contains(&e.id));
        self.elements = kept;

        for element in &mut self.elements {
            if let Some(group) = element.group_id
                && doomed.contains(&group)
            {
                element.group_id = None;
            }
            if let ElementKind::Group { children, .. } = &mut element.kind {
                children.retain(|c| !doomed.contains(c));
            }
        }
        removed
    }

    /// Create a synthetic group around `ids` and return its id.
    ///
    /// Needs at least two free-standing, non-group elements. The group box
    /// is the union of the members' bounding boxes padded by
    /// [`GROUP_PADDING`]; member geometry is untouched.
    pub fn group(&mut self, ids: &[ElementId]) -> Result<ElementId, ModelError> {
        let mut members: Vec<ElementId> = Vec::new();
        for element in &self.elements {
            if ids.contains(&element.id) && !members.contains(&element.id) {
                members.push(element.id);
            }
        }
        if let Some(missing) = ids.iter().find(|id| !self.contains(**id)) {
            return Err(ModelError::UnknownId(*missing));
        }
        if members.len() < 2 {
            return Err(ModelError::GroupTooSmall(members.len()));
        }

        let mut union: Option<Bounds> = None;
        for id in &members {
            let element = self.get(*id).ok_or(ModelError::UnknownId(*id))?;
            if element.kind.is_group() || element.group_id.is_some() {
                return Err(ModelError::InvalidElement {
                    id: *id,
                    reason: "element already belongs to a group".into(),
                });
            }
            let b = element.bounds();
            union = Some(match union {
                Some(u) => u.union(&b),
                None => b,
            });
        }
        let Some(union) = union else {
            return Err(ModelError::GroupTooSmall(0));
        };
        let padded = union.inflate(GROUP_PADDING);
        let (cx, cy) = padded.center();

        let group = Element::new(
            ElementKind::Group {
                width: padded.width,
                height: padded.height,
                children: members.iter().copied().collect(),
            },
            cx,
            cy,
        );
        let group_id = group.id;
        for id in &members {
            if let Some(child) = self.get_mut(*id) {
                child.group_id = Some(group_id);
            }
        }
        self.elements.push(group);
        Ok(group_id)
    }

    /// Dissolve groups. Children keep their geometry and lose `group_id`.
    /// Returns the ids of the freed children. Non-group ids are ignored.
    pub fn ungroup(&mut self, group_ids: &[ElementId]) -> Vec<ElementId> {
        let mut freed = Vec::new();
        let groups: HashSet<ElementId> = group_ids
            .iter()
            .copied()
            .filter(|id| self.get(*id).is_some_and(|e| e.kind.is_group()))
            .collect();
        if groups.is_empty() {
            return freed;
        }
        self.elements.retain(|e| !groups.contains(&e.id));
        for element in &mut self.elements {
            if let Some(g) = element.group_id
                && groups.contains(&g)
            {
                element.group_id = None;
                freed.push(element.id);
            }
        }
        freed
    }

    /// Children of a group in paint order (empty for non-groups).
    pub fn children_of(&self, id: ElementId) -> Vec<ElementId> {
        match self.get(id).map(|e| &e.kind) {
            Some(ElementKind::Group { children, .. }) => children.to_vec(),
            _ => Vec::new(),
        }
    }

    // ─── Z-order ─────────────────────────────────────────────────────────

    /// Move one step backward in z-order. Returns true if the order changed.
    pub fn send_backward(&mut self, id: ElementId) -> bool {
        match self.index_of(id) {
            Some(pos) if pos > 0 => self.move_to(pos, pos - 1),
            _ => false,
        }
    }

    /// Move one step forward in z-order. Returns true if the order changed.
    pub fn bring_forward(&mut self, id: ElementId) -> bool {
        match self.index_of(id) {
            Some(pos) if pos + 1 < self.elements.len() => self.move_to(pos, pos + 1),
            _ => false,
        }
    }

    pub fn send_to_back(&mut self, id: ElementId) -> bool {
        match self.index_of(id) {
            Some(pos) if pos > 0 => self.move_to(pos, 0),
            _ => false,
        }
    }

    pub fn bring_to_front(&mut self, id: ElementId) -> bool {
        let last = self.elements.len().saturating_sub(1);
        match self.index_of(id) {
            Some(pos) if pos < last => self.move_to(pos, last),
            _ => false,
        }
    }

    fn move_to(&mut self, from: usize, to: usize) -> bool {
        let element = self.elements.remove(from);
        self.elements.insert(to, element);
        true
    }

    // ─── Invariants ──────────────────────────────────────────────────────

    /// Check id uniqueness, group links and element payloads.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut by_id: HashMap<ElementId, &Element> = HashMap::with_capacity(self.elements.len());
        for element in &self.elements {
            if by_id.insert(element.id, element).is_some() {
                return Err(ModelError::DuplicateId(element.id));
            }
            element.check()?;
        }

        for element in &self.elements {
            if let ElementKind::Group { children, .. } = &element.kind {
                for child_id in children {
                    let child = by_id.get(child_id).ok_or(ModelError::MissingChild {
                        group: element.id,
                        child: *child_id,
                    })?;
                    if child.group_id != Some(element.id) {
                        return Err(ModelError::BackReference {
                            group: element.id,
                            child: *child_id,
                            found: child.group_id,
                        });
                    }
                }
            }
            if let Some(group_id) = element.group_id {
                let is_member = match by_id.get(&group_id).map(|g| &g.kind) {
                    Some(ElementKind::Group { children, .. }) => children.contains(&element.id),
                    _ => false,
                };
                if !is_member {
                    return Err(ModelError::DanglingGroupRef {
                        child: element.id,
                        group: group_id,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rect_at(x: f64, y: f64) -> Element {
        Element::new(ElementKind::rect(100.0, 50.0, Color::BLACK), x, y)
    }

    #[test]
    fn color_hex_roundtrip() {
        let c = Color::from_hex("#6C5CE7").unwrap();
        assert_eq!(c.to_hex(), "#6C5CE7");

        let short = Color::from_hex("#F00").unwrap();
        assert_eq!(short.to_hex(), "#FF0000");

        let alpha = Color::from_hex("#00000080").unwrap();
        assert_eq!(alpha.to_hex(), "#00000080");

        assert!(Color::from_hex("#12345").is_none());
        assert_eq!(Color::parse("Red").unwrap().to_hex(), "#FF0000");
        assert!(Color::parse("not-a-color").is_none());
    }

    #[test]
    fn animation_rejects_non_positive_duration() {
        assert!(AnimationDescriptor::new(AnimationKind::FadeIn, 0.0, 0.0, Easing::Linear).is_err());
        assert!(AnimationDescriptor::new(AnimationKind::FadeIn, 10.0, -1.0, Easing::Linear).is_err());

        let json = r#"{"type":"fadeIn","duration":0,"delay":0,"easing":"linear"}"#;
        assert!(serde_json::from_str::<AnimationDescriptor>(json).is_err());
    }

    #[test]
    fn animation_unknown_type_is_none() {
        let json = r#"{"type":"sparkle","duration":500,"easing":"ease-in-out"}"#;
        let anim: AnimationDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(anim.kind(), AnimationKind::None);
        assert_eq!(anim.easing(), Easing::EaseInOut);
        assert_eq!(anim.delay_ms(), 0.0);
    }

    #[test]
    fn element_json_shape() {
        let el = Element::with_id(
            ElementId::intern("box"),
            ElementKind::Rect {
                width: 200.0,
                height: 100.0,
                color: Color::from_hex("#3366FF").unwrap(),
                filled: false,
                border_radius: 8.0,
            },
            600.0,
            400.0,
        );
        let value = serde_json::to_value(&el).unwrap();
        assert_eq!(value["type"], "rect");
        assert_eq!(value["borderRadius"], 8.0);
        assert_eq!(value["color"], "#3366FF");
        assert!(value.get("groupId").is_none());

        let back: Element = serde_json::from_value(value).unwrap();
        assert_eq!(back, el);
    }

    #[test]
    fn push_rejects_duplicates() {
        let mut g = SceneGraph::new();
        let el = rect_at(0.0, 0.0);
        g.push(el.clone()).unwrap();
        assert_eq!(g.push(el.clone()), Err(ModelError::DuplicateId(el.id)));
    }

    #[test]
    fn group_sets_back_references() {
        let mut g = SceneGraph::new();
        let a = rect_at(100.0, 100.0);
        let b = rect_at(300.0, 200.0);
        let (ida, idb) = (a.id, b.id);
        g.push(a).unwrap();
        g.push(b).unwrap();

        let gid = g.group(&[idb, ida]).unwrap();
        assert_eq!(g.children_of(gid), vec![ida, idb]);
        assert_eq!(g.get(ida).unwrap().group_id, Some(gid));
        assert_eq!(g.elements().last().unwrap().id, gid);
        g.validate().unwrap();
    }

    #[test]
    fn group_needs_two_members() {
        let mut g = SceneGraph::new();
        let a = rect_at(0.0, 0.0);
        let id = a.id;
        g.push(a).unwrap();
        assert!(g.group(&[id]).is_err());
        assert!(g.group(&[id, ElementId::intern("ghost")]).is_err());
    }

    #[test]
    fn deleting_group_keeps_children() {
        let mut g = SceneGraph::new();
        let a = rect_at(0.0, 0.0);
        let b = rect_at(200.0, 0.0);
        let (ida, idb) = (a.id, b.id);
        g.push(a).unwrap();
        g.push(b).unwrap();
        let gid = g.group(&[ida, idb]).unwrap();

        let removed = g.remove(&[gid]);
        assert_eq!(removed.len(), 1);
        assert!(g.get(ida).unwrap().group_id.is_none());
        assert!(g.get(idb).unwrap().group_id.is_none());
        g.validate().unwrap();
    }

    #[test]
    fn deleting_all_children_drops_group() {
        let mut g = SceneGraph::new();
        let a = rect_at(0.0, 0.0);
        let b = rect_at(200.0, 0.0);
        let (ida, idb) = (a.id, b.id);
        g.push(a).unwrap();
        g.push(b).unwrap();
        let gid = g.group(&[ida, idb]).unwrap();

        g.remove(&[ida]);
        assert_eq!(g.children_of(gid), vec![idb]);
        g.validate().unwrap();

        g.remove(&[idb]);
        assert!(g.is_empty());
    }

    #[test]
    fn replace_keeps_group_links() {
        let mut g = SceneGraph::new();
        let a = rect_at(0.0, 0.0);
        let b = rect_at(200.0, 0.0);
        let (ida, idb) = (a.id, b.id);
        g.push(a.clone()).unwrap();
        g.push(b).unwrap();
        let gid = g.group(&[ida, idb]).unwrap();

        let mut moved = a;
        moved.x = 42.0;
        g.replace(moved).unwrap();
        assert_eq!(g.get(ida).unwrap().x, 42.0);
        assert_eq!(g.get(ida).unwrap().group_id, Some(gid));
        g.validate().unwrap();
    }

    #[test]
    fn z_order_moves() {
        let mut g = SceneGraph::new();
        let els: Vec<Element> = (0..3).map(|i| rect_at(i as f64, 0.0)).collect();
        let ids: Vec<ElementId> = els.iter().map(|e| e.id).collect();
        for e in els {
            g.push(e).unwrap();
        }

        assert!(g.bring_to_front(ids[0]));
        assert_eq!(g.ids(), vec![ids[1], ids[2], ids[0]]);
        assert!(!g.bring_forward(ids[0]));
        assert!(g.send_backward(ids[0]));
        assert_eq!(g.ids(), vec![ids[1], ids[0], ids[2]]);
        assert!(g.send_to_back(ids[2]));
        assert_eq!(g.ids(), vec![ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn validate_catches_broken_back_reference() {
        let a = rect_at(0.0, 0.0);
        let mut b = rect_at(10.0, 0.0);
        b.group_id = Some(a.id);
        let err = SceneGraph::from_elements(vec![a, b]).unwrap_err();
        assert!(matches!(err, ModelError::DanglingGroupRef { .. }));
    }
}
