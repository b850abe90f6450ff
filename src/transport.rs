//! The HTTP transport boundary.
//!
//! The client never talks to the network directly. It hands a fully
//! composed [`TransportRequest`] to a [`Transport`] and expects every
//! response back, whatever its status: classifying non-2xx responses is the
//! client's job, not the transport's.

use crate::{Error, Result};
use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use url::Url;

/// A request as it leaves the client.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: Method,
    /// The absolute URL, without the query parameters below.
    pub url: Url,
    /// Fully composed headers (defaults, per-call, auth, user agent).
    pub headers: HeaderMap,
    /// Query parameters to append.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub json: Option<serde_json::Value>,
    /// Total request timeout.
    pub timeout: Option<Duration>,
    /// Connection establishment timeout.
    pub connect_timeout: Option<Duration>,
    /// Proxy URL for all schemes.
    pub proxy: Option<String>,
    /// Whether TLS certificates are verified.
    pub verify_tls: bool,
}

/// A buffered response. The body is read once and can be inspected any
/// number of times afterwards.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The raw response body.
    pub body: String,
}

/// Sends requests on behalf of a [`crate::Client`].
///
/// Implementations must return non-2xx responses as `Ok`; an `Err` means
/// the exchange itself failed (connection refused, timeout, ...).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request and buffers the response.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConnectionSettings {
    connect_timeout: Option<Duration>,
    proxy: Option<String>,
    verify_tls: bool,
}

/// The default transport, backed by `reqwest`.
///
/// Connect timeout, proxy and TLS verification are client-level settings
/// in reqwest, so one `reqwest::Client` is kept per distinct combination.
#[derive(Debug, Default)]
pub struct ReqwestTransport {
    clients: Mutex<HashMap<ConnectionSettings, reqwest::Client>>,
}

impl ReqwestTransport {
    /// Creates a transport with no pooled clients yet.
    pub fn new() -> Self {
        Self::default()
    }

    fn client_for(&self, settings: ConnectionSettings) -> Result<reqwest::Client> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(&settings) {
            return Ok(client.clone());
        }

        let mut builder = reqwest::Client::builder().danger_accept_invalid_certs(!settings.verify_tls);
        if let Some(connect_timeout) = settings.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(proxy) = &settings.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str()).map_err(|e| {
                Error::Configuration(format!("Invalid proxy {}: {}", proxy, e))
            })?);
        }
        let client = builder.build().map_err(|e| {
            Error::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;

        clients.insert(settings, client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let client = self.client_for(ConnectionSettings {
            connect_timeout: request.connect_timeout,
            proxy: request.proxy,
            verify_tls: request.verify_tls,
        })?;

        let mut builder = client.request(request.method, request.url).headers(request.headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(json) = &request.json {
            builder = builder.json(json);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
