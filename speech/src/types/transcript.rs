//! Batch job identifiers and results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned handle for one batch recognition job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Processing status of a batch job.
///
/// Only the service moves a job out of `Transcribing`. Unknown values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    #[default]
    Transcribing,
    Completed,
    Failed,
    Other(String),
}

impl Status {
    pub fn is_completed(&self) -> bool {
        matches!(self, Status::Completed)
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        match value.as_str() {
            "transcribing" => Status::Transcribing,
            "completed" => Status::Completed,
            "failed" => Status::Failed,
            _ => Status::Other(value),
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Transcribing => "transcribing".to_string(),
            Status::Completed => "completed".to_string(),
            Status::Failed => "failed".to_string(),
            Status::Other(value) => value,
        }
    }
}

/// Word with its timing, present when word timestamps were requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampWord {
    pub start_at: i64,
    pub duration: i64,
    pub text: String,
}

/// One transcribed speech segment with speaker and timing metadata (milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub start_at: i64,
    pub duration: i64,
    pub msg: String,
    #[serde(default)]
    pub spk: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spk_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<TimestampWord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Results {
    #[serde(default)]
    pub utterances: Vec<Utterance>,
    #[serde(default)]
    pub verified: bool,
}

impl Results {
    /// Utterance texts joined with spaces.
    pub fn text(&self) -> String {
        self.utterances
            .iter()
            .map(|u| u.msg.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Body of the batch result endpoint. `results` is present only once completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizeResponse {
    #[serde(default)]
    pub id: Option<JobId>,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Results>,
}

/// Body of the batch submit endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct SubmitResponse {
    pub id: JobId,
}
