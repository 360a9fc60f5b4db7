use sb_core::{ModelError, TemplateError};

#[derive(thiserror::Error, Debug)]
pub enum EditError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("template import rejected: {0}")]
    Template(#[from] TemplateError),

    #[error("a gesture is in progress")]
    GestureActive,
}
