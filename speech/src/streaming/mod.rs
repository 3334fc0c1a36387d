//! Streaming recognition over a bidirectional decode call.
//!
//! The configuration message always goes first. Audio frames follow at playback pace
//! from a producer task while a consumer task forwards transcript events in receipt order.

mod client;
mod config;
mod pacing;
pub mod proto;
mod session;
mod transport;

pub use client::StreamingClient;
pub use config::{Encoding, StreamingConfig};
pub use pacing::{Pacing, DEFAULT_FRAME_BYTES};
pub use session::{SessionState, SessionSummary, StreamSession, StreamUtterance, TranscriptEvent};
pub use transport::{DecoderTransport, GrpcTransport, InboundStream, DEFAULT_CONNECT_TIMEOUT};
