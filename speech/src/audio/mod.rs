//! Audio sources for streaming: normalized PCM files and the external transcoder.

mod pcm;
mod transcode;

pub use pcm::PcmFile;
pub use transcode::{FfmpegTranscoder, Transcoder};
