#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("cannot allocate a {width}x{height} surface")]
    Allocate { width: u32, height: u32 },

    #[error("image `{src}`: {reason}")]
    Image { src: String, reason: String },

    #[error("text layout failed: {0}")]
    Text(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    pub fn image(src: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Image {
            src: src.into(),
            reason: reason.to_string(),
        }
    }
}
