pub mod anim;
pub mod config;
pub mod error;
pub mod geometry;
pub mod id;
pub mod model;
pub mod template;

pub use anim::{VisualState, evaluate};
pub use config::{EditorConfig, TimelineConfig};
pub use error::{ModelError, TemplateError};
pub use geometry::{Bounds, Handle, bounding_box, hit_test};
pub use id::ElementId;
pub use model::*;
pub use template::import_template;
