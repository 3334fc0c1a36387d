//! Multipart body for batch submission, produced while the request is being sent.

use std::io;
use std::path::Path;

use bytes::{Bytes, BytesMut};
use log::*;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{Error, ErrorKind};
use crate::types::{AudioSource, RecognitionConfig, DEFAULT_AUDIO_FILENAME};

const CHUNK_SIZE: usize = 64 * 1024;
/// Chunks buffered between the file reader and the connection.
const CHUNK_BUFFER: usize = 4;
const AUDIO_MIME: &str = "application/octet-stream";

/// Handle on the task streaming a file into the request body.
///
/// The task reports exactly once on a single-slot channel, so it never blocks on its
/// outcome even if nobody reads it.
#[derive(Debug)]
pub(crate) struct BodyWriter {
    outcome: mpsc::Receiver<Result<(), Error>>,
}

impl BodyWriter {
    /// Wait for the writer's outcome.
    ///
    /// Only call once the request body has been consumed or dropped, otherwise the
    /// writer may still be waiting for room in the chunk buffer.
    pub async fn finish(mut self) -> Result<(), Error> {
        match self.outcome.recv().await {
            Some(outcome) => outcome,
            None => Err(Error::new(
                ErrorKind::Io,
                "upload writer stopped without reporting",
            )),
        }
    }

    /// Failure already reported by the writer, if any, without waiting.
    pub fn reported_failure(&mut self) -> Option<Error> {
        match self.outcome.try_recv() {
            Ok(Err(err)) => Some(err),
            _ => None,
        }
    }
}

/// Build the `config` + `file` form. File audio is read by a spawned writer task.
pub(crate) async fn multipart_form(
    config: &RecognitionConfig,
    source: AudioSource,
) -> Result<(Form, Option<BodyWriter>), Error> {
    let config_json = serde_json::to_string(config)?;
    let form = Form::new().text("config", config_json);

    match source {
        AudioSource::Content(content) => {
            let length = content.len() as u64;
            let part = Part::stream_with_length(content, length)
                .file_name(DEFAULT_AUDIO_FILENAME)
                .mime_str(AUDIO_MIME)?;
            Ok((form.part("file", part), None))
        }
        AudioSource::FilePath(path) => {
            let file = File::open(&path).await.map_err(|e| {
                warn!("Failed to open audio file {}: {:?}", path.display(), e);
                Error::from(e)
            })?;
            let length = file.metadata().await?.len();

            let (chunks_tx, chunks_rx) = mpsc::channel(CHUNK_BUFFER);
            let (outcome_tx, outcome_rx) = mpsc::channel(1);
            tokio::spawn(write_file(file, chunks_tx, outcome_tx));

            let body = Body::wrap_stream(ReceiverStream::new(chunks_rx));
            let part = Part::stream_with_length(body, length)
                .file_name(file_name(&path))
                .mime_str(AUDIO_MIME)?;
            Ok((
                form.part("file", part),
                Some(BodyWriter {
                    outcome: outcome_rx,
                }),
            ))
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_AUDIO_FILENAME.to_string())
}

async fn write_file(
    mut file: File,
    chunks: mpsc::Sender<Result<Bytes, io::Error>>,
    outcome: mpsc::Sender<Result<(), Error>>,
) {
    let result = pump(&mut file, &chunks).await;
    if let Err(e) = &result {
        error!("Upload writer failed: {}", e);
    }
    let _ = outcome.send(result).await;
}

async fn pump(
    file: &mut File,
    chunks: &mpsc::Sender<Result<Bytes, io::Error>>,
) -> Result<(), Error> {
    let mut sent: u64 = 0;
    loop {
        let mut buf = BytesMut::with_capacity(CHUNK_SIZE);
        let read = match file.read_buf(&mut buf).await {
            Ok(read) => read,
            Err(e) => {
                // Fail the body too so the request does not complete with a truncated file.
                let _ = chunks
                    .send(Err(io::Error::new(e.kind(), e.to_string())))
                    .await;
                return Err(e.into());
            }
        };
        if read == 0 {
            debug!("Upload writer finished after {} bytes", sent);
            return Ok(());
        }
        sent += read as u64;
        if chunks.send(Ok(buf.freeze())).await.is_err() {
            // The request was dropped or failed; its own error is the one to report.
            debug!("Request body dropped after {} bytes", sent);
            return Ok(());
        }
    }
}
