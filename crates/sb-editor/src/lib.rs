pub mod app;
pub mod controller;
pub mod error;
pub mod history;
pub mod input;
pub mod playback;
pub mod shortcuts;
pub mod store;

pub use app::{AppState, SavePort};
pub use controller::{Controller, GestureState};
pub use error::EditError;
pub use history::History;
pub use input::{Button, InputEvent, Modifiers};
pub use playback::Playback;
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use store::SceneStore;
