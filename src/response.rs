//! Successful responses.
//!
//! A [`Response`] keeps the raw body together with the HTTP details and the
//! timing of the request, so the body can be decoded, bound or logged later.

use crate::Result;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// A response with status < 400.
///
/// # Examples
///
/// ```no_run
/// use restbind::{Client, RequestOptions};
///
/// # async fn example() -> Result<(), restbind::Error> {
/// let client = Client::builder().base_url("https://api.example.com")?.build()?;
///
/// let response = client.get("/status", RequestOptions::new()).await?;
/// println!("{} after {:?} ({} attempts)", response.status, response.latency, response.attempts);
/// let status: serde_json::Value = response.json()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The raw response body.
    pub body: String,

    /// Time from the first dispatch until this response, including any
    /// pacing and retry waits in between.
    pub latency: Duration,

    /// The number of transport calls it took.
    pub attempts: u32,
}

impl Response {
    /// Creates a new `Response`.
    pub fn new(
        status: StatusCode,
        headers: HeaderMap,
        body: String,
        latency: Duration,
        attempts: u32,
    ) -> Self {
        Self {
            status,
            headers,
            body,
            latency,
            attempts,
        }
    }

    /// Decodes the body as JSON into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Returns `true` if the request required retries.
    ///
    /// # Examples
    ///
    /// ```
    /// # use restbind::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(StatusCode::OK, HeaderMap::new(), String::new(), Duration::ZERO, 2);
    /// assert!(response.was_retried());
    /// ```
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}
