//! Minimum spacing between outbound requests of one client.

use crate::{Error, Result};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// The smallest request interval a client accepts.
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(200);

/// The request interval used when none is configured.
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(250);

/// Enforces a minimum wall-clock gap between dispatches.
///
/// The timestamp of the last dispatch lives here, so pacing is scoped to
/// the owning client: two clients never wait on each other.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    sleep_after_request: bool,
    last_request: Mutex<Option<Instant>>,
}

impl Pacer {
    /// Creates a pacer.
    ///
    /// With `sleep_after_request`, every dispatch is followed by an extra
    /// pause of [`MIN_REQUEST_INTERVAL`], regardless of `interval`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `interval` is below
    /// [`MIN_REQUEST_INTERVAL`].
    pub fn new(interval: Duration, sleep_after_request: bool) -> Result<Self> {
        Ok(Self {
            interval: validate_interval(interval)?,
            sleep_after_request,
            last_request: Mutex::new(None),
        })
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether dispatches are followed by an extra pause.
    pub fn sleeps_after_request(&self) -> bool {
        self.sleep_after_request
    }

    /// When the last request was dispatched, if any.
    pub fn last_request(&self) -> Option<Instant> {
        *self.last_request.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits until the interval since the previous dispatch has elapsed,
    /// then records now as the dispatch time. Returns how long it waited.
    pub async fn wait_turn(&self) -> Duration {
        let wait = self
            .last_request()
            .map(|last| self.interval.saturating_sub(last.elapsed()))
            .unwrap_or(Duration::ZERO);

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        *self.last_request.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        wait
    }

    /// The optional post-dispatch pause.
    pub async fn after_dispatch(&self) {
        if self.sleep_after_request {
            tokio::time::sleep(MIN_REQUEST_INTERVAL).await;
        }
    }
}

/// Checks a request interval against [`MIN_REQUEST_INTERVAL`].
pub fn validate_interval(interval: Duration) -> Result<Duration> {
    if interval < MIN_REQUEST_INTERVAL {
        tracing::error!(
            interval_ms = interval.as_millis() as u64,
            min_ms = MIN_REQUEST_INTERVAL.as_millis() as u64,
            "Rejected request interval"
        );
        return Err(Error::Configuration(format!(
            "Request interval must be at least {} ms",
            MIN_REQUEST_INTERVAL.as_millis()
        )));
    }
    Ok(interval)
}
