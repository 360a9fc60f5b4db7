//! Encoder collaborators.
//!
//! The sequencer hands an encoder the complete ordered frame list only after
//! every frame rendered: `begin`, one `add_frame` per frame in index order,
//! then `finish`. If any of those fails the sequencer calls `abort`, after
//! which the encoder must leave no artifact behind.

mod ffmpeg;
mod gif;
mod png_seq;

pub use ffmpeg::{FfmpegEncoder, VIDEO_CODECS, is_ffmpeg_on_path};
pub use gif::GifEncoder;
pub use png_seq::PngSequenceEncoder;

use crate::error::ExportResult;
use std::path::PathBuf;

/// Stream parameters given to [`FrameEncoder::begin`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// One rendered frame: straight RGBA8, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    /// How long this frame stays on screen.
    pub delay_ms: f64,
}

/// What a finished encode produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// Encoded bytes held in memory.
    Bytes { mime: &'static str, data: Vec<u8> },
    File(PathBuf),
    /// A directory of numbered frame images.
    Directory { path: PathBuf, frames: usize },
}

impl Artifact {
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Artifact::Bytes { .. } => None,
            Artifact::File(p) | Artifact::Directory { path: p, .. } => Some(p),
        }
    }
}

pub trait FrameEncoder {
    fn begin(&mut self, config: EncoderConfig) -> ExportResult<()>;
    fn add_frame(&mut self, frame: &Frame) -> ExportResult<()>;
    fn finish(&mut self) -> ExportResult<Artifact>;
    /// Drop everything written so far.
    fn abort(&mut self);
}

/// Name of the `k`-th staged frame, `frame_%06d.png`.
pub(crate) fn frame_file_name(index: usize) -> String {
    format!("frame_{index:06}.png")
}

pub(crate) fn check_frame(config: Option<&EncoderConfig>, frame: &Frame) -> ExportResult<()> {
    use crate::error::ExportError;
    let Some(config) = config else {
        return Err(ExportError::encoder("add_frame called before begin"));
    };
    if frame.width != config.width || frame.height != config.height {
        return Err(ExportError::encoder(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width, frame.height, config.width, config.height
        )));
    }
    if frame.rgba.len() != (frame.width as usize) * (frame.height as usize) * 4 {
        return Err(ExportError::encoder("frame data size mismatch with width*height*4"));
    }
    Ok(())
}

// ─── In-memory ───────────────────────────────────────────────────────────

/// Records every call. Used by tests and by hosts that upload frames
/// themselves.
#[derive(Debug, Default)]
pub struct InMemoryEncoder {
    pub config: Option<EncoderConfig>,
    pub frames: Vec<Frame>,
    pub finished: bool,
    pub aborted: bool,
    /// Every method called, in order.
    pub calls: Vec<&'static str>,
    /// Fail `add_frame` for this index.
    pub fail_at: Option<usize>,
}

impl InMemoryEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    pub fn was_invoked(&self) -> bool {
        !self.calls.is_empty()
    }
}

impl FrameEncoder for InMemoryEncoder {
    fn begin(&mut self, config: EncoderConfig) -> ExportResult<()> {
        self.calls.push("begin");
        self.config = Some(config);
        self.frames.clear();
        Ok(())
    }

    fn add_frame(&mut self, frame: &Frame) -> ExportResult<()> {
        self.calls.push("add_frame");
        check_frame(self.config.as_ref(), frame)?;
        if self.fail_at == Some(frame.index) {
            return Err(crate::error::ExportError::encoder(format!(
                "refusing frame {}",
                frame.index
            )));
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> ExportResult<Artifact> {
        self.calls.push("finish");
        self.finished = true;
        let data = self.frames.iter().flat_map(|f| f.rgba.iter().copied()).collect();
        Ok(Artifact::Bytes {
            mime: "application/octet-stream",
            data,
        })
    }

    fn abort(&mut self) {
        self.calls.push("abort");
        self.aborted = true;
        self.frames.clear();
    }
}
