//! Endpoint accessors.
//!
//! An [`Endpoint`] addresses one resource of an API (`prefix/name`) through
//! a [`Client`]. Every verb expects exactly one status code; anything else
//! that is not already an API error is reported as
//! [`Error::UnexpectedStatus`]. Retrying is left to the client.

use crate::collection::Collection;
use crate::options::RequestOptions;
use crate::record::{Bound, Record};
use crate::schema::{CollectionSchema, Schema};
use crate::{Client, Error, Result};
use http::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// What an endpoint call returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// The raw response body.
    Body(String),
    /// A 204 response; no body is read.
    NoContent,
}

impl Content {
    /// The body, or `"success"` for [`Content::NoContent`].
    pub fn as_str(&self) -> &str {
        match self {
            Content::Body(body) => body,
            Content::NoContent => "success",
        }
    }

    pub fn is_no_content(&self) -> bool {
        matches!(self, Content::NoContent)
    }

    /// The body decoded as JSON; `null` for [`Content::NoContent`].
    pub fn to_value(&self) -> Result<Value> {
        match self {
            Content::Body(body) if body.trim().is_empty() => Ok(Value::Null),
            Content::Body(body) => Ok(serde_json::from_str(body)?),
            Content::NoContent => Ok(Value::Null),
        }
    }
}

/// Per-call parameters of an endpoint request.
#[derive(Debug, Clone, Default)]
pub struct EndpointRequest {
    suffix: Option<String>,
    options: RequestOptions,
    expected: Option<StatusCode>,
}

impl EndpointRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a path below the endpoint, e.g. an id.
    pub fn path(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options = self.options.with_query_param(key, value);
        self
    }

    pub fn query_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.options = self.options.with_query_params(params);
        self
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        self.options = self.options.with_header(name, value)?;
        Ok(self)
    }

    /// Serializes `body` as the JSON body.
    pub fn body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.options = self.options.with_json(body)?;
        Ok(self)
    }

    pub fn body_value(mut self, body: Value) -> Self {
        self.options = self.options.with_json_value(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_timeout(timeout);
        self
    }

    /// Overrides the status the verb expects.
    pub fn expect(mut self, status: StatusCode) -> Self {
        self.expected = Some(status);
        self
    }
}

/// One resource of an API.
///
/// # Examples
///
/// ```no_run
/// use restbind::endpoint::{Endpoint, EndpointRequest};
/// use restbind::Client;
///
/// # async fn example() -> Result<(), restbind::Error> {
/// let client = Client::builder().base_url("https://api.example.com")?.build()?;
/// let users = Endpoint::new(client, "users").with_prefix("v2/");
///
/// let body = users.fetch(EndpointRequest::new().path("42")).await?;
/// println!("{}", body.as_str());
///
/// let deleted = users.remove(EndpointRequest::new().path("42")).await?;
/// assert_eq!(deleted.as_str(), "success");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Endpoint {
    client: Client,
    prefix: String,
    name: String,
}

impl Endpoint {
    pub fn new(client: Client, name: impl Into<String>) -> Self {
        Self {
            client,
            prefix: String::new(),
            name: name.into(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// `prefix/name/suffix` with empty segments left out.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when the endpoint name is empty.
    pub fn url(&self, suffix: Option<&str>) -> Result<String> {
        let name = self.name.trim_matches('/');
        if name.is_empty() {
            return Err(Error::Configuration("The endpoint name must be set".to_string()));
        }

        let prefix = self.prefix.trim_end_matches('/');
        let mut url = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        };

        if let Some(suffix) = suffix.map(|s| s.trim_start_matches('/')).filter(|s| !s.is_empty()) {
            url.push('/');
            url.push_str(suffix);
        }

        Ok(url)
    }

    /// GET, expecting 200.
    pub async fn fetch(&self, request: EndpointRequest) -> Result<Content> {
        self.call(Method::GET, StatusCode::OK, request).await
    }

    /// POST, expecting 201.
    pub async fn create(&self, request: EndpointRequest) -> Result<Content> {
        self.call(Method::POST, StatusCode::CREATED, request).await
    }

    /// PUT, expecting 200.
    pub async fn update(&self, request: EndpointRequest) -> Result<Content> {
        self.call(Method::PUT, StatusCode::OK, request).await
    }

    /// PATCH, expecting 200.
    pub async fn patch(&self, request: EndpointRequest) -> Result<Content> {
        self.call(Method::PATCH, StatusCode::OK, request).await
    }

    /// DELETE, expecting 204.
    pub async fn remove(&self, request: EndpointRequest) -> Result<Content> {
        self.call(Method::DELETE, StatusCode::NO_CONTENT, request).await
    }

    async fn call(
        &self,
        method: Method,
        default_status: StatusCode,
        request: EndpointRequest,
    ) -> Result<Content> {
        let url = self.url(request.suffix.as_deref())?;
        let expected = request.expected.unwrap_or(default_status);

        let response = self.client.execute(method.clone(), &url, request.options).await?;

        if response.status != expected {
            return Err(Error::UnexpectedStatus {
                expected,
                status: response.status,
                body: response.body,
            });
        }

        debug!(
            method = %method,
            url = %url,
            status = response.status.as_u16(),
            "Endpoint call succeeded"
        );

        if response.status == StatusCode::NO_CONTENT {
            return Ok(Content::NoContent);
        }
        Ok(Content::Body(response.body))
    }

    /// GETs and binds the body as `T`.
    pub async fn fetch_entity<T: Bound>(&self, request: EndpointRequest) -> Result<T> {
        let content = self.fetch(request).await?;
        T::from_value(&content.to_value()?)
    }

    /// GETs and binds the body against `schema`.
    pub async fn fetch_record(
        &self,
        schema: &'static Schema,
        request: EndpointRequest,
    ) -> Result<Record> {
        let content = self.fetch(request).await?;
        Record::from_value(schema, &content.to_value()?)
    }

    /// GETs and binds the body as a collection.
    pub async fn fetch_collection(
        &self,
        schema: &'static CollectionSchema,
        request: EndpointRequest,
    ) -> Result<Collection> {
        let content = self.fetch(request).await?;
        Collection::from_value(schema, &content.to_value()?)
    }

    /// Every item of the resource.
    pub async fn list(&self, schema: &'static CollectionSchema) -> Result<Collection> {
        self.fetch_collection(schema, EndpointRequest::new()).await
    }

    /// The items matching the given query parameters.
    pub async fn search<K, V>(
        &self,
        schema: &'static CollectionSchema,
        query: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Collection>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.fetch_collection(schema, EndpointRequest::new().query_params(query))
            .await
    }

    /// POSTs the entity's mapping representation.
    pub async fn create_entity<T: Bound>(
        &self,
        entity: &T,
        request: EndpointRequest,
    ) -> Result<Content> {
        self.create(request.body_value(entity.to_value())).await
    }

    /// PUTs the entity's mapping representation.
    pub async fn update_entity<T: Bound>(
        &self,
        entity: &T,
        request: EndpointRequest,
    ) -> Result<Content> {
        self.update(request.body_value(entity.to_value())).await
    }
}
