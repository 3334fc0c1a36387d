//! Normalized PCM audio read from disk.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use log::*;
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::Error;

/// An open audio file, optionally a transient one that is removed when this is dropped.
pub struct PcmFile {
    file: File,
    path: PathBuf,
    temp: Option<TempPath>,
}

impl PcmFile {
    /// Open a caller-owned file; it is left in place afterwards.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await?;
        Ok(Self {
            file,
            path,
            temp: None,
        })
    }

    /// Open a transient file and take over its removal.
    pub async fn open_temp(temp: TempPath) -> Result<Self, Error> {
        let path = temp.to_path_buf();
        let file = File::open(&path).await?;
        Ok(Self {
            file,
            path,
            temp: Some(temp),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_transient(&self) -> bool {
        self.temp.is_some()
    }

    /// Remove a transient file now and report failures. Dropping does the same silently.
    pub fn close(mut self) -> Result<(), Error> {
        if let Some(temp) = self.temp.take() {
            debug!("Removing transient audio {}", self.path.display());
            temp.close()?;
        }
        Ok(())
    }
}

impl AsyncRead for PcmFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().file).poll_read(cx, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::io::AsyncReadExt;

    fn temp_audio(data: &[u8]) -> TempPath {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.into_temp_path()
    }

    #[tokio::test]
    async fn test_reads_contents() {
        let mut pcm = PcmFile::open_temp(temp_audio(b"samples")).await.unwrap();
        let mut contents = Vec::new();
        pcm.read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, b"samples");
    }

    #[tokio::test]
    async fn test_transient_file_removed_on_drop() {
        let pcm = PcmFile::open_temp(temp_audio(b"x")).await.unwrap();
        let path = pcm.path().to_path_buf();
        assert!(pcm.is_transient());
        assert!(path.exists());

        drop(pcm);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_transient_file_removed_on_close() {
        let pcm = PcmFile::open_temp(temp_audio(b"x")).await.unwrap();
        let path = pcm.path().to_path_buf();

        pcm.close().unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_caller_file_left_in_place() {
        let temp = temp_audio(b"x");
        let pcm = PcmFile::open(&temp).await.unwrap();
        assert!(!pcm.is_transient());

        pcm.close().unwrap();
        assert!(temp.exists());
    }
}
