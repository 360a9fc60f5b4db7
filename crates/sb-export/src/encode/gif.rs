use super::{Artifact, EncoderConfig, Frame, FrameEncoder, check_frame};
use crate::error::{ExportError, ExportResult};
use image::codecs::gif::{GifEncoder as ImageGifEncoder, Repeat};
use image::{Delay, RgbaImage};
use std::path::PathBuf;

/// Animated GIF, looping forever.
///
/// Frames are buffered and the file is produced only by `finish`; nothing
/// touches disk before every frame encoded.
#[derive(Debug)]
pub struct GifEncoder {
    quality: u8,
    out: Option<PathBuf>,
    config: Option<EncoderConfig>,
    frames: Vec<(RgbaImage, f64)>,
}

impl GifEncoder {
    /// `quality` 1 (best) ..= 30 (fastest); out-of-range values are clamped.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 30),
            out: None,
            config: None,
            frames: Vec::new(),
        }
    }

    /// Write the finished GIF to `path` instead of returning the bytes.
    pub fn to_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.out = Some(path.into());
        self
    }

    /// Quantizer speed handed to the codec.
    pub fn speed(&self) -> i32 {
        i32::from(self.quality)
    }

    fn encode(&mut self) -> ExportResult<Vec<u8>> {
        let mut bytes = Vec::new();
        {
            let mut enc = ImageGifEncoder::new_with_speed(&mut bytes, self.speed());
            enc.set_repeat(Repeat::Infinite)?;
            let mut timeline = CentisecondClock::default();
            for (img, delay_ms) in self.frames.drain(..) {
                let delay = Delay::from_numer_denom_ms(timeline.advance(delay_ms) * 10, 1);
                enc.encode_frame(image::Frame::from_parts(img, 0, 0, delay))?;
            }
        }
        Ok(bytes)
    }
}

/// GIF delays are whole hundredths of a second. Each frame gets the
/// difference of its rounded start and end times, so rounding error never
/// accumulates: the total stays within 10 ms of the summed delays.
#[derive(Debug, Default)]
struct CentisecondClock {
    elapsed_ms: f64,
}

impl CentisecondClock {
    fn advance(&mut self, delay_ms: f64) -> u32 {
        let start = (self.elapsed_ms / 10.0).round();
        self.elapsed_ms += delay_ms.max(0.0);
        let end = (self.elapsed_ms / 10.0).round();
        (end - start) as u32
    }
}

impl Default for GifEncoder {
    fn default() -> Self {
        Self::new(10)
    }
}

impl FrameEncoder for GifEncoder {
    fn begin(&mut self, config: EncoderConfig) -> ExportResult<()> {
        log::debug!(
            "gif: {}x{} @ {} fps, speed {}",
            config.width,
            config.height,
            config.fps,
            self.speed()
        );
        self.config = Some(config);
        self.frames.clear();
        Ok(())
    }

    fn add_frame(&mut self, frame: &Frame) -> ExportResult<()> {
        check_frame(self.config.as_ref(), frame)?;
        let img = RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone())
            .ok_or_else(|| ExportError::encoder("frame buffer does not match its size"))?;
        self.frames.push((img, frame.delay_ms));
        Ok(())
    }

    fn finish(&mut self) -> ExportResult<Artifact> {
        if self.config.is_none() {
            return Err(ExportError::encoder("finish called before begin"));
        }
        let data = self.encode()?;
        log::debug!("gif: encoded {} bytes", data.len());
        match &self.out {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, &data)?;
                Ok(Artifact::File(path.clone()))
            }
            None => Ok(Artifact::Bytes {
                mime: "image/gif",
                data,
            }),
        }
    }

    fn abort(&mut self) {
        self.frames.clear();
        self.config = None;
    }
}
