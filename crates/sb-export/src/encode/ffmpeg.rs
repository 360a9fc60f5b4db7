use super::png_seq::write_png;
use super::{Artifact, EncoderConfig, Frame, FrameEncoder, check_frame};
use crate::error::{ExportError, ExportResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Codecs tried in order until one encodes.
pub const VIDEO_CODECS: &[&str] = &["libx264", "libopenh264", "mpeg4"];

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// MP4 through the system `ffmpeg` binary.
///
/// Frames are staged as PNGs in a temporary directory. `finish` runs
/// `ffmpeg -y -r <fps> -i frame_%06d.png -c:v <codec> -pix_fmt yuv420p <out>`
/// once per codec in [`VIDEO_CODECS`] until one succeeds. The staging
/// directory is removed afterwards either way.
#[derive(Debug)]
pub struct FfmpegEncoder {
    program: PathBuf,
    out: PathBuf,
    codecs: Vec<String>,
    config: Option<EncoderConfig>,
    staging: Option<tempfile::TempDir>,
}

impl FfmpegEncoder {
    pub fn new(out: impl Into<PathBuf>) -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            out: out.into(),
            codecs: VIDEO_CODECS.iter().map(|c| c.to_string()).collect(),
            config: None,
            staging: None,
        }
    }

    /// Use a different ffmpeg executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_codecs<I, S>(mut self, codecs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.codecs = codecs.into_iter().map(Into::into).collect();
        self
    }

    pub fn out_path(&self) -> &Path {
        &self.out
    }

    fn staging_dir(&self) -> ExportResult<&Path> {
        self.staging
            .as_ref()
            .map(|d| d.path())
            .ok_or_else(|| ExportError::encoder("ffmpeg encoder used before begin"))
    }

    fn run_codec(&self, codec: &str, fps: u32, staging: &Path) -> ExportResult<()> {
        let output = Command::new(&self.program)
            .arg("-y")
            .args(["-loglevel", "error"])
            .args(["-r", &fps.to_string()])
            .arg("-i")
            .arg(staging.join("frame_%06d.png"))
            .args(["-an", "-c:v", codec, "-pix_fmt", "yuv420p"])
            .arg(&self.out)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                ExportError::encoder(format!(
                    "failed to spawn {} (is it installed and on PATH?): {e}",
                    self.program.display()
                ))
            })?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ExportError::encoder(format!(
            "{codec}: ffmpeg exited with {}: {}",
            output.status,
            stderr.trim()
        )))
    }

    fn remove_output(&self) {
        if self.out.exists()
            && let Err(e) = std::fs::remove_file(&self.out)
        {
            log::warn!("could not remove {}: {e}", self.out.display());
        }
    }

    fn close_staging(&mut self) {
        if let Some(dir) = self.staging.take()
            && let Err(e) = dir.close()
        {
            log::warn!("could not remove staging dir: {e}");
        }
    }
}

impl FrameEncoder for FfmpegEncoder {
    fn begin(&mut self, config: EncoderConfig) -> ExportResult<()> {
        if !config.width.is_multiple_of(2) || !config.height.is_multiple_of(2) {
            return Err(ExportError::validation(
                "video width/height must be even (required for yuv420p output)",
            ));
        }
        if config.fps == 0 {
            return Err(ExportError::validation("video fps must be non-zero"));
        }
        if let Some(parent) = self.out.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let staging = tempfile::Builder::new().prefix("sb-export-").tempdir()?;
        log::debug!("ffmpeg: staging frames in {}", staging.path().display());
        self.staging = Some(staging);
        self.config = Some(config);
        Ok(())
    }

    fn add_frame(&mut self, frame: &Frame) -> ExportResult<()> {
        check_frame(self.config.as_ref(), frame)?;
        write_png(self.staging_dir()?, frame)?;
        Ok(())
    }

    fn finish(&mut self) -> ExportResult<Artifact> {
        let Some(config) = self.config.take() else {
            return Err(ExportError::encoder("finish called before begin"));
        };
        let staging = self.staging_dir()?.to_path_buf();

        let mut last_err = ExportError::encoder("no video codec configured");
        let mut done = false;
        for codec in &self.codecs {
            match self.run_codec(codec, config.fps, &staging) {
                Ok(()) => {
                    log::debug!("ffmpeg: encoded {} with {codec}", self.out.display());
                    done = true;
                    break;
                }
                Err(e) => {
                    log::warn!("ffmpeg: {e}; trying next codec");
                    self.remove_output();
                    last_err = e;
                }
            }
        }
        self.close_staging();

        if done {
            Ok(Artifact::File(self.out.clone()))
        } else {
            Err(last_err)
        }
    }

    fn abort(&mut self) {
        self.config = None;
        self.close_staging();
        self.remove_output();
    }
}
