//! Per-call request options.

use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::time::Duration;

/// Options for a single request: headers, query parameters, a JSON body and
/// an optional timeout override.
///
/// Per-call headers override the client's default headers of the same name;
/// per-call query parameters override default query parameters with the
/// same key.
///
/// # Examples
///
/// ```
/// use restbind::RequestOptions;
///
/// let options = RequestOptions::new()
///     .with_header("Accept", "application/json")
///     .unwrap()
///     .with_query_param("page", "2");
/// assert_eq!(options.query, vec![("page".to_string(), "2".to_string())]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Additional headers for this request.
    pub headers: HeaderMap,

    /// Query parameters for this request, in order.
    pub query: Vec<(String, String)>,

    /// JSON body, if any.
    pub json: Option<serde_json::Value>,

    /// Overrides the client's timeout for this request.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Adds multiple query parameters to the request.
    pub fn with_query_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Serializes `body` as the JSON payload.
    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.json = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Uses an already built JSON value as the payload.
    pub fn with_json_value(mut self, body: serde_json::Value) -> Self {
        self.json = Some(body);
        self
    }

    /// Overrides the client timeout for this request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::try_from(name)
        .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
    let value = HeaderValue::try_from(value)
        .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
    Ok((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invalid_header_is_configuration_error() {
        let result = RequestOptions::new().with_header("bad header", "x");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_json_body() {
        #[derive(Serialize)]
        struct Body {
            name: &'static str,
        }

        let options = RequestOptions::new().with_json(&Body { name: "a" }).unwrap();
        assert_eq!(options.json, Some(json!({"name": "a"})));
    }

    #[test]
    fn test_query_params_keep_order() {
        let options = RequestOptions::new()
            .with_query_param("b", "2")
            .with_query_params([("a", "1"), ("c", "3")]);

        let keys: Vec<&str> = options.query.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }
}
