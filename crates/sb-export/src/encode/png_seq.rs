use super::{Artifact, EncoderConfig, Frame, FrameEncoder, check_frame, frame_file_name};
use crate::error::{ExportError, ExportResult};
use image::RgbaImage;
use std::path::{Path, PathBuf};

/// Numbered PNG files (`frame_000000.png`, ...) in one directory.
#[derive(Debug)]
pub struct PngSequenceEncoder {
    dir: PathBuf,
    config: Option<EncoderConfig>,
    written: Vec<PathBuf>,
}

impl PngSequenceEncoder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            config: None,
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Save one frame as `dir/frame_%06d.png`.
pub(crate) fn write_png(dir: &Path, frame: &Frame) -> ExportResult<PathBuf> {
    let path = dir.join(frame_file_name(frame.index));
    let img = RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone())
        .ok_or_else(|| ExportError::encoder("frame buffer does not match its size"))?;
    img.save_with_format(&path, image::ImageFormat::Png)?;
    Ok(path)
}

impl FrameEncoder for PngSequenceEncoder {
    fn begin(&mut self, config: EncoderConfig) -> ExportResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        log::debug!("png sequence: writing into {}", self.dir.display());
        self.config = Some(config);
        self.written.clear();
        Ok(())
    }

    fn add_frame(&mut self, frame: &Frame) -> ExportResult<()> {
        check_frame(self.config.as_ref(), frame)?;
        let path = write_png(&self.dir, frame)?;
        self.written.push(path);
        Ok(())
    }

    fn finish(&mut self) -> ExportResult<Artifact> {
        if self.config.take().is_none() {
            return Err(ExportError::encoder("finish called before begin"));
        }
        let frames = std::mem::take(&mut self.written).len();
        Ok(Artifact::Directory {
            path: self.dir.clone(),
            frames,
        })
    }

    fn abort(&mut self) {
        for path in self.written.drain(..) {
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!("could not remove {}: {e}", path.display());
            }
        }
        self.config = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: usize) -> Frame {
        Frame {
            index,
            width: 2,
            height: 2,
            rgba: vec![200; 16],
            delay_ms: 40.0,
        }
    }

    fn config() -> EncoderConfig {
        EncoderConfig {
            width: 2,
            height: 2,
            fps: 25,
        }
    }

    #[test]
    fn writes_numbered_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut enc = PngSequenceEncoder::new(dir.path().join("frames"));
        enc.begin(config()).unwrap();
        enc.add_frame(&frame(0)).unwrap();
        enc.add_frame(&frame(1)).unwrap();
        let artifact = enc.finish().unwrap();
        assert_eq!(
            artifact,
            Artifact::Directory {
                path: dir.path().join("frames"),
                frames: 2
            }
        );
        assert!(dir.path().join("frames/frame_000001.png").exists());
    }

    #[test]
    fn abort_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut enc = PngSequenceEncoder::new(dir.path());
        enc.begin(config()).unwrap();
        enc.add_frame(&frame(0)).unwrap();
        enc.abort();
        assert!(!dir.path().join("frame_000000.png").exists());
    }
}
