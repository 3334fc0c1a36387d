//! External transcoding into the mono 16-bit PCM the streaming call expects.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::*;
use tokio::process::Command;

use super::PcmFile;
use crate::error::{Error, ErrorKind};

/// Turns an arbitrary audio file into headerless mono s16le at `sample_rate`.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn normalize(&self, input: &Path, sample_rate: u32) -> Result<PcmFile, Error>;
}

/// Runs the `ffmpeg` binary into a transient file.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
        }
    }
}

impl FfmpegTranscoder {
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self, input: &Path, output: &Path, sample_rate: u32) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(input)
            .args(["-vn", "-af", "aresample=resampler=soxr", "-ar"])
            .arg(sample_rate.to_string())
            .args(["-ac", "1", "-f", "s16le"])
            .arg(output)
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn normalize(&self, input: &Path, sample_rate: u32) -> Result<PcmFile, Error> {
        let output = tempfile::Builder::new()
            .prefix("speech-")
            .suffix(".pcm")
            .tempfile()?
            .into_temp_path();

        debug!(
            "Transcoding {} to {} Hz mono PCM",
            input.display(),
            sample_rate
        );
        let result = self
            .command(input, &output, sample_rate)
            .output()
            .await
            .map_err(|e| {
                warn!("Failed to run {}: {:?}", self.binary.display(), e);
                Error::from(e)
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            error!("ffmpeg failed on {}: {}", input.display(), stderr.trim());
            return Err(Error::new(
                ErrorKind::Io,
                format!("ffmpeg exited with {}: {}", result.status, stderr.trim()),
            ));
        }

        PcmFile::open_temp(output).await
    }
}
