pub mod recognition;
pub mod transcript;

pub use recognition::{
    AudioSource, DiarizationConfig, ParagraphSplitterConfig, RecognitionAudio,
    RecognitionConfig, RecognizeRequest, DEFAULT_AUDIO_FILENAME,
};
pub use transcript::{JobId, RecognizeResponse, Results, Status, TimestampWord, Utterance};
pub(crate) use transcript::SubmitResponse;
