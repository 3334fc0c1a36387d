//! Speech recognition client for batch and streaming transcription.
//!
//! - [`batch`] submits a multipart job and polls for its result under a bounded policy
//! - [`streaming`] runs a paced, bidirectional decode call with ordered transcript events
//! - [`audio`] adapts local files (and an external transcoder) into streamable PCM
//!
//! Both engines authorize every call through a shared [`speech_auth::TokenSource`].

pub mod audio;
pub mod batch;
pub mod error;
pub mod streaming;
pub mod types;

// Re-export commonly used types
pub use batch::{BatchClient, PollPolicy};
pub use error::{Error, ErrorKind, StreamErrorKind};
pub use streaming::{StreamSession, StreamingClient, StreamingConfig, TranscriptEvent};
pub use types::{
    AudioSource, JobId, RecognitionAudio, RecognitionConfig, RecognizeRequest,
    RecognizeResponse, Status,
};
