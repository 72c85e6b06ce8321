//! Credential and authentication material types.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

/// Username and password pair.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// A bearer token together with its local validity window.
#[derive(Clone)]
pub struct IssuedToken {
    access_token: SecretString,
    issued_at: DateTime<Utc>,
    lifetime: Duration,
}

impl IssuedToken {
    pub fn new(access_token: impl Into<String>, lifetime: Duration) -> Self {
        Self::issued_at(access_token, Utc::now(), lifetime)
    }

    pub fn issued_at(
        access_token: impl Into<String>,
        issued_at: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            issued_at,
            lifetime,
        }
    }

    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    pub fn issued(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() - self.issued_at >= self.lifetime
    }
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("access_token", &"[redacted]")
            .field("issued_at", &self.issued_at)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// What a strategy attaches to outbound requests.
#[derive(Clone, Default)]
pub enum AuthMaterial {
    /// Nothing attached.
    #[default]
    None,
    /// Pre-encoded `user:password` for the Basic scheme.
    Basic(SecretString),
    /// Raw bearer token.
    Bearer(SecretString),
    /// The session cookie jar carries authentication.
    Cookies,
}

impl AuthMaterial {
    pub fn basic(username: &str, password: &str) -> Self {
        let encoded = STANDARD.encode(format!("{}:{}", username, password));
        Self::Basic(SecretString::from(encoded))
    }

    pub fn bearer(token: &SecretString) -> Self {
        Self::Bearer(token.clone())
    }

    /// `Authorization` header value, marked sensitive.
    pub fn header_value(&self) -> Option<HeaderValue> {
        let raw = match self {
            AuthMaterial::Basic(encoded) => format!("Basic {}", encoded.expose_secret()),
            AuthMaterial::Bearer(token) => format!("Bearer {}", token.expose_secret()),
            AuthMaterial::None | AuthMaterial::Cookies => return None,
        };
        let mut value = HeaderValue::from_str(&raw).ok()?;
        value.set_sensitive(true);
        Some(value)
    }

    /// Set `Authorization` in `headers`, replacing any value already there.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if let Some(value) = self.header_value() {
            headers.insert(AUTHORIZATION, value);
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AuthMaterial::None => "none",
            AuthMaterial::Basic(_) => "basic",
            AuthMaterial::Bearer(_) => "bearer",
            AuthMaterial::Cookies => "cookies",
        }
    }
}

impl fmt::Debug for AuthMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMaterial::None | AuthMaterial::Cookies => write!(f, "AuthMaterial::{}", self.kind()),
            _ => write!(f, "AuthMaterial::{}([redacted])", self.kind()),
        }
    }
}
