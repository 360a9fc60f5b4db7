//! Time-sampled export of a scene.
//!
//! [`Exporter::start`] snapshots a graph and returns an [`ExportJob`] that
//! renders `N = round(D/1000 * fps)` frames and hands them to a
//! [`FrameEncoder`]. [`batch`] does the same for a list of scenes.

pub mod batch;
pub mod encode;
pub mod error;
pub mod sequencer;
pub mod settings;

pub use batch::{Scene, parse_scenes, render_scene, render_scenes};
pub use encode::{
    Artifact, EncoderConfig, FfmpegEncoder, Frame, FrameEncoder, GifEncoder, InMemoryEncoder,
    PngSequenceEncoder,
};
pub use error::{ExportError, ExportResult};
pub use sequencer::{AbortHandle, ExportJob, ExportObserver, ExportSlot, ExportState, Exporter};
pub use settings::ExportSettings;
