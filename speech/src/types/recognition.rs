//! Recognition request types for batch submission.

use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{invalid_request, Error};

/// Multipart filename used when the audio is supplied in memory.
pub const DEFAULT_AUDIO_FILENAME: &str = "rtzr-default-audiofile";

/// Recognition configuration sent as the `config` part of a batch submission.
///
/// Every field is optional and serialized only when set, so the service applies its
/// own default for anything left unset. `Some(false)` is sent explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    /// Required by multilingual models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_diarization: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diarization: Option<DiarizationConfig>,
    /// Inverse text normalization (numbers, units, English words).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_itn: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_disfluency_filter: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_profanity_filter: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_paragraph_splitter: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph_splitter: Option<ParagraphSplitterConfig>,
    /// `GENERAL` or `CALL`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_word_timestamp: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

/// Known speaker count for diarization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiarizationConfig {
    pub spk_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParagraphSplitterConfig {
    pub max: u32,
}

/// Where the audio of a batch job comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSource {
    /// Audio already held in memory.
    Content(Bytes),
    /// Audio read from a local file while the request is sent.
    FilePath(PathBuf),
}

/// Optional-field form of the audio source.
///
/// Exactly one of `content` and `file_path` must be set; anything else is rejected by
/// [`RecognitionAudio::validate`] before any I/O happens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionAudio {
    pub content: Option<Bytes>,
    pub file_path: Option<PathBuf>,
}

impl RecognitionAudio {
    pub fn from_content(content: impl Into<Bytes>) -> Self {
        Self {
            content: Some(content.into()),
            file_path: None,
        }
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            content: None,
            file_path: Some(path.into()),
        }
    }

    pub fn validate(&self) -> Result<AudioSource, Error> {
        match (&self.content, &self.file_path) {
            (Some(_), Some(_)) => Err(invalid_request(
                "both content and file path are provided; provide only one",
            )),
            (None, None) => Err(invalid_request(
                "neither content nor file path is provided; provide one",
            )),
            (Some(content), None) => Ok(AudioSource::Content(content.clone())),
            (None, Some(path)) if path.as_os_str().is_empty() => {
                Err(invalid_request("file path is empty"))
            }
            (None, Some(path)) => Ok(AudioSource::FilePath(path.clone())),
        }
    }
}

impl From<AudioSource> for RecognitionAudio {
    fn from(source: AudioSource) -> Self {
        match source {
            AudioSource::Content(content) => Self::from_content(content),
            AudioSource::FilePath(path) => Self::from_file(path),
        }
    }
}

/// A batch recognition job: configuration plus audio.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognizeRequest {
    pub config: RecognitionConfig,
    pub audio: RecognitionAudio,
}

impl RecognizeRequest {
    pub fn new(config: RecognitionConfig, audio: impl Into<RecognitionAudio>) -> Self {
        Self {
            config,
            audio: audio.into(),
        }
    }

    /// Check the audio invariant and return the selected source.
    pub fn validate(&self) -> Result<AudioSource, Error> {
        self.audio.validate()
    }
}
