//! Login page (cookie + CSRF) authentication strategy.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use regex::Regex;
use secrecy::ExposeSecret;

use super::AuthStrategy;
use crate::auth::{AuthMaterial, Credentials};
use crate::client::{RawResponse, Session, SessionRequest};
use crate::{Error, Result};

/// Text the login form shows after a rejected password.
pub const BAD_CREDENTIALS_MARKER: &str = "Unable to verify email or password. Please try again.";

static INPUT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<input\b[^>]*>").expect("valid input tag regex"));

static TAG_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#)
        .expect("valid attribute regex")
});

/// Value of the `<input>` named `field`, if the page has one with a value.
pub fn extract_csrf_token(html: &str, field: &str) -> Option<String> {
    INPUT_TAG.find_iter(html).find_map(|tag| {
        let mut name = None;
        let mut value = None;
        for caps in TAG_ATTRIBUTE.captures_iter(tag.as_str()) {
            let attr_value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str());
            match caps[1].to_ascii_lowercase().as_str() {
                "name" => name = attr_value,
                "value" => value = attr_value,
                _ => {}
            }
        }
        match name {
            Some(name) if name == field => value.map(str::to_string),
            _ => None,
        }
    })
}

/// Logs in through `GET /login` + `POST /login.do`; the session cookie jar
/// then carries the authenticated session.
#[derive(Debug)]
pub struct LoginPageStrategy {
    session: Session,
    credentials: Credentials,
    csrf_field: String,
    logged_in: AtomicBool,
}

impl LoginPageStrategy {
    pub fn new(session: Session, credentials: Credentials, csrf_field: impl Into<String>) -> Self {
        Self {
            session,
            credentials,
            csrf_field: csrf_field.into(),
            logged_in: AtomicBool::new(false),
        }
    }

    fn login_url(&self, path: &str) -> String {
        format!("{}/{}", self.session.base_url().trim_end_matches('/'), path)
    }

    async fn fetch_csrf_token(&self) -> Result<Option<String>> {
        let url = self.login_url("login");
        let request = SessionRequest::get(&url).describe("Authenticate: get login form");
        let response = self.session.send_raw(request, &AuthMaterial::None).await?;
        if !response.is_ok() {
            return Err(login_failure(&url, &response));
        }

        let token = extract_csrf_token(&response.text(), &self.csrf_field);
        if token.is_none() {
            tracing::debug!(field = %self.csrf_field, "login form has no CSRF field");
        }
        Ok(token)
    }
}

fn login_failure(url: &str, response: &RawResponse) -> Error {
    Error::Auth {
        message: format!("login at {} failed", url),
        status: Some(response.status().as_u16()),
        body: Some(response.text().into_owned()),
    }
}

#[async_trait]
impl AuthStrategy for LoginPageStrategy {
    fn name(&self) -> &'static str {
        "login_page"
    }

    async fn authenticated(&self) -> bool {
        self.logged_in.load(Ordering::Acquire)
    }

    async fn authenticate(&self) -> Result<AuthMaterial> {
        let mut form = vec![
            ("username".to_string(), self.credentials.username.clone()),
            (
                "password".to_string(),
                self.credentials.password.expose_secret().to_string(),
            ),
        ];
        if let Some(token) = self.fetch_csrf_token().await? {
            form.push((self.csrf_field.clone(), token));
        }

        let url = self.login_url("login.do");
        let request = SessionRequest::post(&url)
            .form(form)
            .describe("Authenticate user");
        let response = self.session.send_raw(request, &AuthMaterial::None).await?;

        if !response.is_ok() || response.text().contains(BAD_CREDENTIALS_MARKER) {
            tracing::warn!(
                username = %self.credentials.username,
                status = response.status().as_u16(),
                "login page rejected credentials"
            );
            return Err(login_failure(&url, &response));
        }

        self.logged_in.store(true, Ordering::Release);
        tracing::info!(username = %self.credentials.username, "logged in through login page");
        Ok(AuthMaterial::Cookies)
    }

    async fn material(&self) -> AuthMaterial {
        if self.logged_in.load(Ordering::Acquire) {
            AuthMaterial::Cookies
        } else {
            AuthMaterial::None
        }
    }

    fn session(&self) -> &Session {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELD: &str = "X-Uaa-Csrf";

    #[test]
    fn test_extract_csrf_token() {
        let html = r#"<form method="post">
            <input type="hidden" name="X-Uaa-Csrf" value="abc123"/>
            <input name="username" type="text">
        </form>"#;
        assert_eq!(extract_csrf_token(html, FIELD), Some("abc123".to_string()));
    }

    #[test]
    fn test_extract_csrf_token_attribute_order() {
        let html = r#"<INPUT value='xyz' type=hidden name='X-Uaa-Csrf'>"#;
        assert_eq!(extract_csrf_token(html, FIELD), Some("xyz".to_string()));
    }

    #[test]
    fn test_extract_csrf_token_absent() {
        let html = r#"<form><input name="username"><input name="password"></form>"#;
        assert_eq!(extract_csrf_token(html, FIELD), None);
    }

    #[test]
    fn test_extract_csrf_token_without_value() {
        let html = r#"<input type="hidden" name="X-Uaa-Csrf">"#;
        assert_eq!(extract_csrf_token(html, FIELD), None);
    }
}
