//! Batch recognition: multipart submission and bounded result polling.

mod client;
mod polling;
mod upload;

pub use client::BatchClient;
pub use polling::PollPolicy;
