//! Rate limit hints carried by error responses.
//!
//! Servers that throttle usually say when to come back. These hints are
//! parsed from the response headers and attached to [`crate::Error::Api`];
//! the client only acts on them when `respect_retry_after` is configured.

use http::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const RESET_HEADERS: [&str; 2] = ["x-ratelimit-reset", "ratelimit-reset"];

/// Information extracted from rate limit headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// How long to wait before retrying (from `Retry-After`).
    pub retry_after: Option<Duration>,

    /// When the current window resets (`X-RateLimit-Reset` or `RateLimit-Reset`).
    pub reset_at: Option<SystemTime>,

    /// Requests remaining in the current window (`X-RateLimit-Remaining`).
    pub remaining: Option<u64>,
}

impl RateLimitInfo {
    /// Extracts rate limit information from response headers.
    ///
    /// `Retry-After` may be given in seconds or as an HTTP date; reset
    /// headers are Unix timestamps.
    ///
    /// # Examples
    ///
    /// ```
    /// use restbind::rate_limit::RateLimitInfo;
    /// use http::HeaderMap;
    /// use std::time::Duration;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("retry-after", "30".parse().unwrap());
    ///
    /// let info = RateLimitInfo::from_headers(&headers);
    /// assert_eq!(info.retry_after, Some(Duration::from_secs(30)));
    /// ```
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            retry_after: header_str(headers, "retry-after").and_then(parse_retry_after),
            reset_at: RESET_HEADERS
                .iter()
                .find_map(|name| header_str(headers, name)?.parse::<u64>().ok())
                .map(|secs| UNIX_EPOCH + Duration::from_secs(secs)),
            remaining: header_str(headers, "x-ratelimit-remaining").and_then(|v| v.parse().ok()),
        }
    }

    /// Returns `true` if any of the hints were present.
    pub fn is_present(&self) -> bool {
        self.retry_after.is_some() || self.reset_at.is_some() || self.remaining.is_some()
    }

    /// The wait the server asked for, capped at `max_wait`.
    ///
    /// `Retry-After` wins over the reset timestamp. Returns `None` when no
    /// usable hint exists or the reset time already passed.
    pub fn wait_hint(&self, max_wait: Duration) -> Option<Duration> {
        let wait = match (self.retry_after, self.reset_at) {
            (Some(retry_after), _) => retry_after,
            (None, Some(reset_at)) => reset_at.duration_since(SystemTime::now()).ok()?,
            (None, None) => return None,
        };
        Some(wait.min(max_wait))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    httpdate::parse_http_date(value)
        .ok()?
        .duration_since(SystemTime::now())
        .ok()
}
