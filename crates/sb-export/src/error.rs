use sb_render::RenderError;

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("an export is already running")]
    Busy,

    #[error("export aborted")]
    Aborted,

    #[error("invalid export: {0}")]
    Validation(String),

    #[error("encoder failed: {0}")]
    Encoder(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Render(#[from] RenderError),
}

pub type ExportResult<T> = Result<T, ExportError>;

impl ExportError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn encoder(msg: impl std::fmt::Display) -> Self {
        Self::Encoder(msg.to_string())
    }
}

impl From<image::ImageError> for ExportError {
    fn from(e: image::ImageError) -> Self {
        Self::encoder(e)
    }
}
