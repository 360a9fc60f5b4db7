use crate::id::ElementId;

/// Violations of the scene-graph invariants.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("duplicate element id {0}")]
    DuplicateId(ElementId),

    #[error("unknown element id {0}")]
    UnknownId(ElementId),

    #[error("group {group} lists missing child {child}")]
    MissingChild { group: ElementId, child: ElementId },

    #[error("child {child} of group {group} has groupId {found:?}")]
    BackReference {
        group: ElementId,
        child: ElementId,
        found: Option<ElementId>,
    },

    #[error("element {child} points at {group}, which is not a group containing it")]
    DanglingGroupRef { child: ElementId, group: ElementId },

    #[error("grouping needs at least two elements, got {0}")]
    GroupTooSmall(usize),

    #[error("invalid animation: {0}")]
    Animation(String),

    #[error("invalid element {id}: {reason}")]
    InvalidElement { id: ElementId, reason: String },
}

impl ModelError {
    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }
}

/// Rejection of a template payload. No element is created when this is returned.
#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    #[error("template is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("template root must be an array of draw commands (or an object with a `commands` array)")]
    NotAList,

    #[error("draw command #{index}: {reason}")]
    Record { index: usize, reason: String },
}

impl TemplateError {
    pub fn record(index: usize, reason: impl Into<String>) -> Self {
        Self::Record {
            index,
            reason: reason.into(),
        }
    }
}
