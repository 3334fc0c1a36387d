//! Real-time pacing of outgoing audio frames.

use std::time::Duration;

use super::StreamingConfig;

/// Default frame size read from the source per message.
pub const DEFAULT_FRAME_BYTES: usize = 1024;

/// Keeps the producer from sending faster than the audio would play.
///
/// Each frame is followed by `frame_bytes / bytes_per_ms` milliseconds of delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub frame_bytes: usize,
    bytes_per_second: u64,
}

impl Pacing {
    pub fn new(frame_bytes: usize, bytes_per_second: u64) -> Self {
        Self {
            frame_bytes,
            bytes_per_second,
        }
    }

    pub fn for_config(config: &StreamingConfig, frame_bytes: usize) -> Self {
        Self::new(frame_bytes, config.bytes_per_second())
    }

    /// No delay between frames.
    pub fn unpaced(frame_bytes: usize) -> Self {
        Self::new(frame_bytes, 0)
    }

    pub fn bytes_per_ms(&self) -> f64 {
        self.bytes_per_second as f64 / 1000.0
    }

    pub fn frame_delay(&self) -> Duration {
        if self.bytes_per_second == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.frame_bytes as u64 * 1_000_000_000 / self.bytes_per_second)
    }
}
