//! Process-level configuration and logging for the speech client binary.

pub mod config;
pub mod logging;
