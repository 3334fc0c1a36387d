//! Bounded polling for batch results.

use std::future::Future;
use std::time::Duration;

use log::*;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{invalid_request, Error, ErrorKind};

/// Delay and bounds for polling a batch job.
///
/// At least one of `max_attempts` and `deadline` must be set so a stuck job cannot be
/// polled forever.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Fixed delay before every fetch, including the first.
    pub interval: Duration,
    /// Give up with `ResultNotReady` after this many fetches.
    pub max_attempts: Option<u32>,
    /// Give up with `Timeout` once this much time has passed since polling started.
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(4),
            max_attempts: Some(10),
            deadline: None,
        }
    }
}

impl PollPolicy {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        match (self.max_attempts, self.deadline) {
            (None, None) => Err(invalid_request(
                "poll policy needs a max attempt count or a deadline",
            )),
            (Some(0), _) => Err(invalid_request("max poll attempts must be at least 1")),
            _ => Ok(()),
        }
    }
}

/// Sleep, fetch, repeat until `fetch` returns anything other than `ResultNotReady`.
///
/// Cancellation and the deadline are checked against both the sleep and the in-flight
/// fetch, which is dropped as soon as either fires.
pub(crate) async fn poll_until_ready<T, F, Fut>(
    policy: &PollPolicy,
    cancel: &CancellationToken,
    mut fetch: F,
) -> Result<T, Error>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    policy.validate()?;
    let deadline = policy.deadline.map(|d| Instant::now() + d);
    let mut attempt = 0;

    loop {
        if policy.max_attempts.is_some_and(|max| attempt >= max) {
            return Err(Error::new(
                ErrorKind::ResultNotReady,
                format!("result still not ready after {} attempts", attempt),
            ));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            _ = deadline_passed(deadline) => return Err(timed_out()),
            _ = tokio::time::sleep(policy.interval) => {}
        }

        attempt += 1;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            _ = deadline_passed(deadline) => return Err(timed_out()),
            outcome = fetch(attempt) => outcome,
        };

        match outcome {
            Err(err) if err.is_not_ready() => debug!("Poll attempt {} not ready yet", attempt),
            other => return other,
        }
    }
}

async fn deadline_passed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn cancelled() -> Error {
    Error::new(ErrorKind::Cancelled, "polling cancelled")
}

fn timed_out() -> Error {
    Error::new(ErrorKind::Timeout, "poll deadline exceeded")
}
