//! Authentication header strategies.
//!
//! An [`AuthProvider`] turns credentials into request headers. The client
//! asks it on every dispatch and applies the headers only while
//! [`AuthProvider::is_valid`] holds.

use base64::{engine::general_purpose, Engine as _};
use std::fmt;

/// Produces authentication headers for outgoing requests.
pub trait AuthProvider: Send + Sync + fmt::Debug {
    /// Header name/value pairs; later pairs win over earlier ones.
    fn auth_headers(&self) -> Vec<(String, String)>;

    /// A short name for the scheme, used in logs.
    fn auth_type(&self) -> &str;

    /// Whether the credentials are usable at all.
    fn is_valid(&self) -> bool;
}

/// An API key sent in a single header (`X-API-Key` unless configured).
///
/// # Examples
///
/// ```
/// use restbind::auth::{ApiKeyAuth, AuthProvider};
///
/// let auth = ApiKeyAuth::new("secret").with_header_name("X-Token");
/// assert_eq!(auth.auth_headers(), vec![("X-Token".to_string(), "secret".to_string())]);
/// ```
#[derive(Clone)]
pub struct ApiKeyAuth {
    key: String,
    header_name: String,
}

impl ApiKeyAuth {
    /// The header used when none is configured.
    pub const DEFAULT_HEADER: &'static str = "X-API-Key";

    /// Creates a provider sending `key` in [`Self::DEFAULT_HEADER`].
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            header_name: Self::DEFAULT_HEADER.to_string(),
        }
    }

    /// Sends the key in a different header.
    pub fn with_header_name(mut self, header_name: impl Into<String>) -> Self {
        self.header_name = header_name.into();
        self
    }

    /// The header the key is sent in.
    pub fn header_name(&self) -> &str {
        &self.header_name
    }
}

impl AuthProvider for ApiKeyAuth {
    fn auth_headers(&self) -> Vec<(String, String)> {
        vec![(self.header_name.clone(), self.key.clone())]
    }

    fn auth_type(&self) -> &str {
        "ApiKey"
    }

    fn is_valid(&self) -> bool {
        !self.key.is_empty()
    }
}

impl fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyAuth")
            .field("header_name", &self.header_name)
            .field("key", &"***")
            .finish()
    }
}

/// `Authorization: Bearer <token>`, optionally with extra headers.
#[derive(Clone)]
pub struct BearerAuth {
    token: String,
    additional_headers: Vec<(String, String)>,
}

impl BearerAuth {
    /// Creates a provider for `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            additional_headers: Vec::new(),
        }
    }

    /// Adds a header sent along with the token, replacing one of the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.additional_headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.additional_headers.push((name, value.into()));
        self
    }

    /// Drops an additional header.
    pub fn without_header(mut self, name: &str) -> Self {
        self.additional_headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self
    }
}

impl AuthProvider for BearerAuth {
    fn auth_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Authorization".to_string(), format!("Bearer {}", self.token))];
        headers.extend(self.additional_headers.iter().cloned());
        headers
    }

    fn auth_type(&self) -> &str {
        "Bearer"
    }

    fn is_valid(&self) -> bool {
        !self.token.is_empty()
    }
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth")
            .field("token", &"***")
            .field("additional_headers", &self.additional_headers)
            .finish()
    }
}

/// HTTP basic authentication.
#[derive(Clone)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    /// Creates a provider for the given credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The configured username.
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl AuthProvider for BasicAuth {
    fn auth_headers(&self) -> Vec<(String, String)> {
        let credentials =
            general_purpose::STANDARD.encode(format!("{}:{}", self.username, self.password));
        vec![("Authorization".to_string(), format!("Basic {}", credentials))]
    }

    fn auth_type(&self) -> &str {
        "Basic"
    }

    // An empty password is legitimate for some APIs.
    fn is_valid(&self) -> bool {
        !self.username.is_empty()
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
