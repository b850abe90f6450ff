//! Error types for the request pipeline and the binding engine.
//!
//! Remote failures are classified by HTTP status into an [`ApiErrorKind`],
//! and every error can tell the retry loop whether it is worth another
//! attempt through [`Error::retry_class`].

use crate::rate_limit::RateLimitInfo;
use http::{HeaderMap, StatusCode};
use std::fmt;

/// The taxonomy of remote API failures, keyed by HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 402
    PaymentRequired,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 405
    MethodNotAllowed,
    /// 406
    NotAcceptable,
    /// 408
    RequestTimeout,
    /// 409
    Conflict,
    /// 415
    UnsupportedMediaType,
    /// 422
    UnprocessableEntity,
    /// 429
    TooManyRequests,
    /// 500
    InternalServerError,
    /// 502
    BadGateway,
    /// 503
    ServiceUnavailable,
    /// 504
    GatewayTimeout,
    /// Any other status >= 400.
    Other,
}

impl ApiErrorKind {
    /// Maps a status code to its error kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use restbind::ApiErrorKind;
    /// use http::StatusCode;
    ///
    /// assert_eq!(ApiErrorKind::from_status(StatusCode::NOT_FOUND), ApiErrorKind::NotFound);
    /// assert_eq!(ApiErrorKind::from_status(StatusCode::IM_A_TEAPOT), ApiErrorKind::Other);
    /// ```
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            402 => Self::PaymentRequired,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            405 => Self::MethodNotAllowed,
            406 => Self::NotAcceptable,
            408 => Self::RequestTimeout,
            409 => Self::Conflict,
            415 => Self::UnsupportedMediaType,
            422 => Self::UnprocessableEntity,
            429 => Self::TooManyRequests,
            500 => Self::InternalServerError,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            504 => Self::GatewayTimeout,
            _ => Self::Other,
        }
    }

    /// Human readable description of the failure.
    pub fn message(self) -> &'static str {
        match self {
            Self::BadRequest => "Bad request",
            Self::Unauthorized => "Unauthorized",
            Self::PaymentRequired => "Payment required",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Resource not found",
            Self::MethodNotAllowed => "Method not allowed",
            Self::NotAcceptable => "Not acceptable",
            Self::RequestTimeout => "Request timeout",
            Self::Conflict => "Conflict",
            Self::UnsupportedMediaType => "Unsupported media type",
            Self::UnprocessableEntity => "Unprocessable entity",
            Self::TooManyRequests => "Too many requests, consider a longer request interval",
            Self::InternalServerError => "Internal server error",
            Self::BadGateway => "Bad gateway",
            Self::ServiceUnavailable => "Service unavailable",
            Self::GatewayTimeout => "Gateway timeout",
            Self::Other => "Unexpected response status",
        }
    }

    /// Only rate limiting and temporary unavailability are worth retrying.
    pub fn retry_class(self) -> RetryClass {
        match self {
            Self::TooManyRequests | Self::ServiceUnavailable | Self::GatewayTimeout => {
                RetryClass::Transient
            }
            _ => RetryClass::Fatal,
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Whether the retry loop may try a failed request again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Expected to resolve on its own; retried up to the configured budget.
    Transient,
    /// Surfaced immediately.
    Fatal,
}

/// The main error type of the crate.
///
/// # Examples
///
/// ```no_run
/// use restbind::{ApiErrorKind, Client, Error, RequestOptions};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder().base_url("https://api.example.com")?.build()?;
///
/// match client.get("/users/1", RequestOptions::new()).await {
///     Ok(response) => println!("{}", response.body),
///     Err(Error::Api { kind: ApiErrorKind::NotFound, .. }) => println!("no such user"),
///     Err(e) => eprintln!("request failed: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An invalid tuning value or otherwise unusable configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The server answered with a status >= 400.
    #[error("{kind} (status {status}): {body}")]
    Api {
        /// Classification of the status code
        kind: ApiErrorKind,
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        body: String,
        /// The response headers
        headers: HeaderMap,
        /// Rate limit hints parsed from the headers, if any were present
        rate_limit: Option<RateLimitInfo>,
    },

    /// An endpoint received a status other than the one it expects.
    #[error("Unexpected response status {status} (expected {expected})")]
    UnexpectedStatus {
        /// The status the endpoint expected
        expected: StatusCode,
        /// The status that was received
        status: StatusCode,
        /// The raw response body
        body: String,
    },

    /// A network-level error reported by reqwest.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A failure reported by a custom transport.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Raw input could not be bound to a declared field.
    #[error("Cannot bind `{field}` as {target}: {message}")]
    Binding {
        /// The field (or element) being bound
        field: String,
        /// The declared target type
        target: String,
        /// What went wrong
        message: String,
    },

    /// Attempted to mutate a read-only value or collection.
    #[error("Cannot modify read-only {0}")]
    ReadOnly(String),

    /// Aggregated validation failures, `path: message` pairs joined by `; `.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Builds the classified error for a response with status >= 400.
    pub fn api(status: StatusCode, body: String, headers: HeaderMap) -> Self {
        let info = RateLimitInfo::from_headers(&headers);
        Error::Api {
            kind: ApiErrorKind::from_status(status),
            status,
            body,
            rate_limit: info.is_present().then_some(info),
            headers,
        }
    }

    pub(crate) fn binding(
        field: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Binding {
            field: field.into(),
            target: target.into(),
            message: message.into(),
        }
    }

    /// Returns the API error kind, if this is a classified remote failure.
    pub fn kind(&self) -> Option<ApiErrorKind> {
        match self {
            Error::Api { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Transient for rate limiting, service unavailable and gateway timeout;
    /// everything else, including transport failures, is fatal.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Error::Api { kind, .. } => kind.retry_class(),
            _ => RetryClass::Fatal,
        }
    }

    /// Shorthand for `retry_class() == RetryClass::Transient`.
    ///
    /// # Examples
    ///
    /// ```
    /// use restbind::Error;
    /// use http::{HeaderMap, StatusCode};
    ///
    /// let err = Error::api(StatusCode::SERVICE_UNAVAILABLE, String::new(), HeaderMap::new());
    /// assert!(err.is_retryable());
    ///
    /// let err = Error::api(StatusCode::INTERNAL_SERVER_ERROR, String::new(), HeaderMap::new());
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        self.retry_class() == RetryClass::Transient
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Api { status, .. } | Error::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn body(&self) -> Option<&str> {
        match self {
            Error::Api { body, .. } | Error::UnexpectedStatus { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns the response headers of a classified remote failure.
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            Error::Api { headers, .. } => Some(headers),
            _ => None,
        }
    }

    /// Returns rate limit information if the response carried any.
    pub fn rate_limit_info(&self) -> Option<&RateLimitInfo> {
        match self {
            Error::Api { rate_limit, .. } => rate_limit.as_ref(),
            _ => None,
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
