pub mod error;
pub mod hit;
pub mod images;
pub mod paint;
pub mod surface;

pub use error::RenderError;
pub use images::{FsImageLoader, ImageCache, ImageLoader, ImageState, LoadedImage};
pub use paint::{FrameTime, RenderOptions, render};
pub use surface::{DrawOp, PixmapSurface, RecordingSurface, StrokeStyle, Surface, TextRun};
