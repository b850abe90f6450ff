//! The request pipeline.
//!
//! [`Client`] paces outbound calls, composes headers, hands the request to
//! its [`Transport`], classifies failures and retries the transient ones.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    auth::AuthProvider,
    error::RetryClass,
    options::{parse_header, RequestOptions},
    pacing::{Pacer, DEFAULT_REQUEST_INTERVAL},
    retry::{RetryPolicy, RetryState},
    transport::{ReqwestTransport, Transport, TransportRequest},
    Error, Response, Result,
};
use http::{header::USER_AGENT, HeaderMap, HeaderValue, Method};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// A client for one REST API.
///
/// Cloning is cheap and clones share everything, including the pacing
/// state: all clones together keep the configured request interval.
/// Calls on one client are expected to be issued one after another.
///
/// # Examples
///
/// ```no_run
/// use restbind::{auth::BearerAuth, Client, RequestOptions};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), restbind::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com/v1")?
///     .request_interval(Duration::from_millis(500))?
///     .max_retries(5)?
///     .authentication(Arc::new(BearerAuth::new("token")))
///     .build()?;
///
/// let response = client
///     .get("users", RequestOptions::new().with_query_param("page", "1"))
///     .await?;
/// println!("{}", response.body);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    base_url: Option<Url>,
    default_headers: HeaderMap,
    default_query: Vec<(String, String)>,
    user_agent: Option<HeaderValue>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    proxy: Option<String>,
    verify_tls: bool,
    pacer: Pacer,
    retry_policy: RetryPolicy,
    retry_after_cap: Option<Duration>,
    authentication: RwLock<Option<Arc<dyn AuthProvider>>>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The retry policy requests are sent with.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.retry_policy
    }

    /// The minimum gap between two dispatches.
    pub fn request_interval(&self) -> Duration {
        self.inner.pacer.interval()
    }

    /// The base URL relative URIs are resolved against.
    pub fn base_url(&self) -> Option<&Url> {
        self.inner.base_url.as_ref()
    }

    /// The current authentication provider.
    pub fn authentication(&self) -> Option<Arc<dyn AuthProvider>> {
        self.inner
            .authentication
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces (or removes) the authentication provider for all clones.
    pub fn set_authentication(&self, authentication: Option<Arc<dyn AuthProvider>>) {
        if let Some(auth) = &authentication {
            tracing::debug!(auth_type = auth.auth_type(), "Authentication set");
        }
        *self
            .inner
            .authentication
            .write()
            .unwrap_or_else(PoisonError::into_inner) = authentication;
    }

    /// Sends a request, retrying rate limited and temporarily unavailable
    /// responses.
    ///
    /// Transient failures are retried until the policy's attempt budget is
    /// spent; the last transient error is then returned unchanged. Any
    /// other failure is returned right away.
    pub async fn execute(
        &self,
        method: Method,
        uri: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        let start_time = Instant::now();
        let mut state = RetryState::new(self.inner.retry_policy);

        loop {
            let error = match self.dispatch(method.clone(), uri, options.clone()).await {
                Ok(mut response) => {
                    response.attempts = state.attempts();
                    response.latency = start_time.elapsed();
                    return Ok(response);
                }
                Err(e) => e,
            };

            if error.retry_class() == RetryClass::Fatal {
                tracing::error!(
                    error = %error,
                    attempts = state.attempts(),
                    method = %method,
                    uri = uri,
                    "Request failed"
                );
                return Err(error);
            }

            let attempt = state.attempts();
            let Some(backoff) = state.record_failure() else {
                tracing::error!(
                    error = %error,
                    attempts = attempt,
                    method = %method,
                    uri = uri,
                    "Max retries reached"
                );
                return Err(error);
            };

            let delay = self.retry_after_hint(&error).unwrap_or(backoff);
            tracing::warn!(
                error = %error,
                attempt = attempt,
                max_retries = state.policy().max_retries(),
                delay_ms = delay.as_millis() as u64,
                "Retrying request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Sends a request exactly once: pacing, header composition, transport
    /// call and status classification, but no retries.
    pub async fn dispatch(
        &self,
        method: Method,
        uri: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        let url = self.resolve(uri)?;
        let headers = self.compose_headers(&options.headers)?;
        let query = self.compose_query(options.query);

        let waited = self.inner.pacer.wait_turn().await;
        tracing::debug!(
            method = %method,
            url = %url,
            waited_ms = waited.as_millis() as u64,
            "Sending request"
        );

        let start_time = Instant::now();
        let response = self
            .inner
            .transport
            .send(TransportRequest {
                method,
                url,
                headers,
                query,
                json: options.json,
                timeout: options.timeout.or(self.inner.timeout),
                connect_timeout: self.inner.connect_timeout,
                proxy: self.inner.proxy.clone(),
                verify_tls: self.inner.verify_tls,
            })
            .await?;
        let latency = start_time.elapsed();
        self.inner.pacer.after_dispatch().await;

        if response.status.as_u16() >= 400 {
            tracing::error!(
                status = response.status.as_u16(),
                response = %response.body,
                "API error response"
            );
            return Err(Error::api(response.status, response.body, response.headers));
        }

        tracing::debug!(
            status = response.status.as_u16(),
            latency_ms = latency.as_millis() as u64,
            "Received response"
        );
        Ok(Response::new(
            response.status,
            response.headers,
            response.body,
            latency,
            1,
        ))
    }

    /// Sends a GET request with retries.
    pub async fn get(&self, uri: &str, options: RequestOptions) -> Result<Response> {
        self.execute(Method::GET, uri, options).await
    }

    /// Sends a POST request with retries.
    pub async fn post(&self, uri: &str, options: RequestOptions) -> Result<Response> {
        self.execute(Method::POST, uri, options).await
    }

    /// Sends a PUT request with retries.
    pub async fn put(&self, uri: &str, options: RequestOptions) -> Result<Response> {
        self.execute(Method::PUT, uri, options).await
    }

    /// Sends a PATCH request with retries.
    pub async fn patch(&self, uri: &str, options: RequestOptions) -> Result<Response> {
        self.execute(Method::PATCH, uri, options).await
    }

    /// Sends a DELETE request with retries.
    pub async fn delete(&self, uri: &str, options: RequestOptions) -> Result<Response> {
        self.execute(Method::DELETE, uri, options).await
    }

    fn retry_after_hint(&self, error: &Error) -> Option<Duration> {
        let cap = self.inner.retry_after_cap?;
        let hint = error.rate_limit_info()?.wait_hint(cap)?;
        tracing::info!(delay_ms = hint.as_millis() as u64, "Server asked to wait before retrying");
        Some(hint)
    }

    fn resolve(&self, uri: &str) -> Result<Url> {
        match Url::parse(uri) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.inner.base_url.as_ref().ok_or_else(|| {
                    Error::Configuration(format!("Relative URI `{}` requires a base URL", uri))
                })?;
                let joined = format!(
                    "{}/{}",
                    base.as_str().trim_end_matches('/'),
                    uri.trim_start_matches('/')
                );
                Ok(Url::parse(&joined)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Defaults, then per-call headers, then authentication, then the user
    /// agent; each layer replaces same-named headers of the previous ones.
    fn compose_headers(&self, per_call: &HeaderMap) -> Result<HeaderMap> {
        let mut headers = self.inner.default_headers.clone();
        overlay(&mut headers, per_call);

        if let Some(auth) = self.authentication().filter(|auth| auth.is_valid()) {
            let mut auth_headers = HeaderMap::new();
            for (name, value) in auth.auth_headers() {
                let (name, value) = parse_header(&name, &value)?;
                auth_headers.insert(name, value);
            }
            overlay(&mut headers, &auth_headers);
        }

        if let Some(user_agent) = &self.inner.user_agent {
            headers.insert(USER_AGENT, user_agent.clone());
        }
        Ok(headers)
    }

    fn compose_query(&self, per_call: Vec<(String, String)>) -> Vec<(String, String)> {
        let mut query: Vec<(String, String)> = self
            .inner
            .default_query
            .iter()
            .filter(|(key, _)| !per_call.iter().any(|(k, _)| k == key))
            .cloned()
            .collect();
        query.extend(per_call);
        query
    }
}

fn overlay(target: &mut HeaderMap, layer: &HeaderMap) {
    for name in layer.keys() {
        target.remove(name);
    }
    for (name, value) in layer {
        target.append(name.clone(), value.clone());
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// Every tuning setter validates its argument immediately.
///
/// # Examples
///
/// ```no_run
/// use restbind::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), restbind::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(30))
///     .base_retry_delay(Duration::from_secs(2))?
///     .exponential_backoff(false)
///     .user_agent("my-app/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    base_url: Option<Url>,
    default_headers: HeaderMap,
    default_query: Vec<(String, String)>,
    user_agent: Option<HeaderValue>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    proxy: Option<String>,
    verify_tls: bool,
    request_interval: Duration,
    sleep_after_request: bool,
    retry_policy: RetryPolicy,
    retry_after_cap: Option<Duration>,
    authentication: Option<Arc<dyn AuthProvider>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            transport: None,
            base_url: None,
            default_headers: HeaderMap::new(),
            default_query: Vec::new(),
            user_agent: None,
            timeout: None,
            connect_timeout: None,
            proxy: None,
            verify_tls: true,
            request_interval: DEFAULT_REQUEST_INTERVAL,
            sleep_after_request: false,
            retry_policy: RetryPolicy::default(),
            retry_after_cap: None,
            authentication: None,
        }
    }

    /// Sets the base URL relative URIs are resolved against.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sends requests through a custom transport instead of reqwest.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Adds a query parameter sent with every request.
    pub fn default_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_query.push((key.into(), value.into()));
        self
    }

    /// Sets the `User-Agent`, overriding any default or per-call value.
    pub fn user_agent(mut self, user_agent: impl AsRef<str>) -> Result<Self> {
        let value = HeaderValue::try_from(user_agent.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid user agent: {}", e)))?;
        self.user_agent = Some(value);
        Ok(self)
    }

    /// Sets the total request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Routes all requests through a proxy.
    pub fn proxy(mut self, proxy: impl AsRef<str>) -> Result<Self> {
        Url::parse(proxy.as_ref())?;
        self.proxy = Some(proxy.as_ref().to_string());
        Ok(self)
    }

    /// Turns TLS certificate verification on or off (on by default).
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Sets the minimum gap between two requests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] below
    /// [`crate::pacing::MIN_REQUEST_INTERVAL`].
    pub fn request_interval(mut self, interval: Duration) -> Result<Self> {
        self.request_interval = crate::pacing::validate_interval(interval)?;
        Ok(self)
    }

    /// Pauses for the minimum interval after every request, on top of the
    /// request interval.
    pub fn sleep_after_request(mut self, enabled: bool) -> Self {
        self.sleep_after_request = enabled;
        self
    }

    /// Sets the number of transport calls per request (at least 1).
    pub fn max_retries(mut self, max_retries: u32) -> Result<Self> {
        self.retry_policy = self.retry_policy.with_max_retries(max_retries)?;
        Ok(self)
    }

    /// Sets the base delay between retries (at least 1 second).
    pub fn base_retry_delay(mut self, delay: Duration) -> Result<Self> {
        self.retry_policy = self.retry_policy.with_base_delay(delay)?;
        Ok(self)
    }

    /// Doubles the retry delay with every attempt (on by default).
    pub fn exponential_backoff(mut self, enabled: bool) -> Self {
        self.retry_policy = self.retry_policy.with_exponential(enabled);
        self
    }

    /// Replaces the whole retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Waits as long as a rate limited response asks (`Retry-After` or a
    /// reset header), capped at `max_wait`, instead of the computed backoff.
    pub fn respect_retry_after(mut self, max_wait: Duration) -> Self {
        self.retry_after_cap = Some(max_wait);
        self
    }

    /// Sets the authentication provider.
    pub fn authentication(mut self, authentication: Arc<dyn AuthProvider>) -> Self {
        self.authentication = Some(authentication);
        self
    }

    /// Builds the configured `Client`.
    pub fn build(self) -> Result<Client> {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));
        let pacer = Pacer::new(self.request_interval, self.sleep_after_request)?;

        let client = Client {
            inner: Arc::new(ClientInner {
                transport,
                base_url: self.base_url,
                default_headers: self.default_headers,
                default_query: self.default_query,
                user_agent: self.user_agent,
                timeout: self.timeout,
                connect_timeout: self.connect_timeout,
                proxy: self.proxy,
                verify_tls: self.verify_tls,
                pacer,
                retry_policy: self.retry_policy,
                retry_after_cap: self.retry_after_cap,
                authentication: RwLock::new(None),
            }),
        };
        client.set_authentication(self.authentication);
        Ok(client)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ApiKeyAuth, BearerAuth};

    fn client(builder: ClientBuilder) -> Client {
        builder.build().unwrap()
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let client = client(Client::builder().base_url("https://api.test/v1/").unwrap());

        assert_eq!(
            client.resolve("/users/1").unwrap().as_str(),
            "https://api.test/v1/users/1"
        );
        assert_eq!(
            client.resolve("https://other.test/x").unwrap().as_str(),
            "https://other.test/x"
        );
    }

    #[test]
    fn test_relative_uri_without_base_is_configuration_error() {
        let client = client(Client::builder());
        assert!(matches!(client.resolve("users"), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_header_layers_override_in_order() {
        let client = client(
            Client::builder()
                .default_header("Accept", "text/plain")
                .unwrap()
                .default_header("X-API-Key", "default")
                .unwrap()
                .default_header("User-Agent", "default-agent")
                .unwrap()
                .user_agent("pinned/1.0")
                .unwrap()
                .authentication(Arc::new(ApiKeyAuth::new("from-auth"))),
        );

        let per_call = RequestOptions::new()
            .with_header("Accept", "application/json")
            .unwrap()
            .with_header("X-API-Key", "per-call")
            .unwrap()
            .with_header("User-Agent", "per-call-agent")
            .unwrap();
        let headers = client.compose_headers(&per_call.headers).unwrap();

        assert_eq!(headers["accept"], "application/json");
        assert_eq!(headers["x-api-key"], "from-auth");
        assert_eq!(headers["user-agent"], "pinned/1.0");
    }

    #[test]
    fn test_invalid_auth_is_skipped() {
        let client = client(Client::builder().authentication(Arc::new(BearerAuth::new(""))));

        let headers = client.compose_headers(&HeaderMap::new()).unwrap();
        assert!(headers.get("authorization").is_none());

        client.set_authentication(Some(Arc::new(BearerAuth::new("t"))));
        let headers = client.compose_headers(&HeaderMap::new()).unwrap();
        assert_eq!(headers["authorization"], "Bearer t");
    }

    #[test]
    fn test_per_call_query_overrides_default() {
        let client = client(
            Client::builder()
                .default_query("lang", "de")
                .default_query("format", "json"),
        );

        let query = client.compose_query(vec![("lang".to_string(), "en".to_string())]);
        assert_eq!(
            query,
            vec![
                ("format".to_string(), "json".to_string()),
                ("lang".to_string(), "en".to_string()),
            ]
        );
    }

    #[test]
    fn test_builder_rejects_invalid_tuning() {
        assert!(Client::builder().request_interval(Duration::from_millis(100)).is_err());
        assert!(Client::builder().max_retries(0).is_err());
        assert!(Client::builder().base_retry_delay(Duration::ZERO).is_err());
        assert!(Client::builder().proxy("not a url").is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let client = client(Client::builder());
        assert_eq!(client.request_interval(), DEFAULT_REQUEST_INTERVAL);
        assert_eq!(client.retry_policy(), RetryPolicy::default());
        assert!(client.authentication().is_none());
        assert!(client.base_url().is_none());
    }
}
