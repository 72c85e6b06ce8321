//! HTTP session: one `reqwest` client with a cookie jar plus request logging.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart;
use reqwest::{Method, StatusCode, redirect};
use tracing::Instrument;

use super::request::{FilePart, RequestBody};
use super::response::{Payload, RawResponse};
use crate::auth::AuthMaterial;
use crate::config::{ClientCertConfig, ClientConfiguration, PlatformSettings, ProxyConfig};
use crate::observability::{LogBodyLimit, RequestLog, SpanContext, log_request, log_response, mask_form};
use crate::{Error, Result};

/// Response handling mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionMode {
    /// Redirects are followed; bodies are decoded.
    #[default]
    Standard,
    /// Redirects are not followed and `307` responses are returned raw.
    Webhdfs,
}

/// Everything needed to build a [`Session`].
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub base_url: String,
    pub mode: SessionMode,
    /// Logged with every request.
    pub client_name: Option<String>,
    pub ssl_validation: bool,
    pub proxies: Option<ProxyConfig>,
    pub certificate: Option<ClientCertConfig>,
    /// Default timeout for every call; a request's own timeout wins.
    pub timeout: Option<Duration>,
    pub log_body_limit: LogBodyLimit,
}

impl SessionOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            mode: SessionMode::Standard,
            client_name: None,
            ssl_validation: false,
            proxies: None,
            certificate: None,
            timeout: None,
            log_body_limit: LogBodyLimit::default(),
        }
    }

    pub fn from_configuration(
        configuration: &ClientConfiguration,
        settings: &PlatformSettings,
    ) -> Self {
        Self {
            base_url: configuration.base_url().to_string(),
            mode: SessionMode::Standard,
            client_name: configuration.username().map(str::to_string),
            ssl_validation: settings.ssl_validation,
            proxies: configuration.proxies().cloned(),
            certificate: configuration.certificate().cloned(),
            timeout: settings.request_timeout,
            log_body_limit: settings.log_body_limit,
        }
    }

    pub fn with_mode(mut self, mode: SessionMode) -> Self {
        self.mode = mode;
        self
    }
}

/// A single wire-level request.
#[derive(Clone, Debug)]
pub struct SessionRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub params: Vec<(String, String)>,
    pub body: RequestBody,
    pub raw_response: bool,
    pub timeout: Option<Duration>,
    pub description: Option<String>,
}

impl SessionRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            params: Vec::new(),
            body: RequestBody::Empty,
            raw_response: false,
            timeout: None,
            description: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn raw(mut self, raw_response: bool) -> Self {
        self.raw_response = raw_response;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

pub struct Session {
    http: reqwest::Client,
    options: SessionOptions,
    spans: SpanContext,
}

impl Session {
    pub async fn new(options: SessionOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!options.ssl_validation);

        if options.mode == SessionMode::Webhdfs {
            builder = builder.redirect(redirect::Policy::none());
        }
        if let Some(ref proxies) = options.proxies {
            builder = proxies.apply_to_builder(builder)?;
        }
        if let Some(ref certificate) = options.certificate {
            builder = certificate.apply_to_builder(builder).await?;
        }

        let http = builder.build()?;
        let spans = SpanContext::new(options.base_url.clone());
        Ok(Self {
            http,
            options,
            spans,
        })
    }

    /// Session that hands `307` redirects back to the caller.
    pub async fn webhdfs(options: SessionOptions) -> Result<Self> {
        Self::new(options.with_mode(SessionMode::Webhdfs)).await
    }

    pub fn base_url(&self) -> &str {
        &self.options.base_url
    }

    pub fn mode(&self) -> SessionMode {
        self.options.mode
    }

    pub fn client_name(&self) -> Option<&str> {
        self.options.client_name.as_deref()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn spans(&self) -> &SpanContext {
        &self.spans
    }

    /// Send and decode.
    ///
    /// Returns [`Payload::Raw`] when the request asked for it or, in WebHDFS
    /// mode, for a `307`. Other statuses of 400 and above fail with
    /// [`Error::UnexpectedResponse`].
    pub async fn request(&self, request: SessionRequest, auth: &AuthMaterial) -> Result<Payload> {
        let raw_requested = request.raw_response;
        let raw = self.execute(request, auth).await?;

        if raw_requested {
            return Ok(Payload::Raw(raw));
        }
        if self.options.mode == SessionMode::Webhdfs
            && raw.status() == StatusCode::TEMPORARY_REDIRECT
        {
            return Ok(Payload::Raw(raw));
        }
        if !raw.is_ok() {
            return Err(Error::UnexpectedResponse {
                status: raw.status().as_u16(),
                body: raw.text().into_owned(),
                url: raw.url().to_string(),
            });
        }
        Ok(Payload::decode(raw.bytes()))
    }

    /// Send and return the buffered response whatever its status.
    pub async fn send_raw(&self, request: SessionRequest, auth: &AuthMaterial) -> Result<RawResponse> {
        self.execute(request, auth).await
    }

    async fn execute(&self, request: SessionRequest, auth: &AuthMaterial) -> Result<RawResponse> {
        let call_span = self.spans.http_call_span(&request.method, &request.url);
        let span = call_span.span().clone();

        let result = async move {
            let logged_body = describe_body(&request.body);
            let description = request.description.clone();

            let mut headers = request.headers;
            auth.apply(&mut headers);
            let mut builder = self
                .http
                .request(request.method.clone(), &request.url)
                .headers(headers);
            if !request.params.is_empty() {
                builder = builder.query(&request.params);
            }
            builder = attach_body(builder, request.body)?;
            if let Some(timeout) = request.timeout.or(self.options.timeout) {
                builder = builder.timeout(timeout);
            }

            let http_request = builder.build()?;
            log_request(
                http_request.method(),
                http_request.url().as_str(),
                http_request.headers(),
                &RequestLog {
                    description: description.as_deref(),
                    client_name: self.client_name(),
                    body: logged_body.as_deref(),
                },
            );

            let response = self.http.execute(http_request).await?;
            let status = response.status();
            let headers = response.headers().clone();
            let url = response.url().to_string();
            let body = response.bytes().await?;

            log_response(
                status,
                &headers,
                &String::from_utf8_lossy(&body),
                self.options.log_body_limit,
            );

            Ok::<_, Error>(RawResponse::new(status, headers, url, body))
        }
        .instrument(span)
        .await;

        if let Ok(ref raw) = result {
            call_span.record_status(raw.status().as_u16());
        }
        call_span.finish();
        result
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.options.base_url)
            .field("mode", &self.options.mode)
            .field("client_name", &self.options.client_name)
            .finish()
    }
}

fn attach_body(builder: reqwest::RequestBuilder, body: RequestBody) -> Result<reqwest::RequestBuilder> {
    Ok(match body {
        RequestBody::Empty => builder,
        RequestBody::Json(value) => builder.json(&value),
        RequestBody::Form(fields) => builder.form(&fields),
        RequestBody::Multipart { fields, files } => builder.multipart(multipart_form(fields, files)?),
    })
}

fn multipart_form(fields: Vec<(String, String)>, files: Vec<FilePart>) -> Result<multipart::Form> {
    let mut form = multipart::Form::new();
    for (name, value) in fields {
        form = form.text(name, value);
    }
    for file in files {
        let mime = file.mime_type();
        let part = multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name)
            .mime_str(&mime)?;
        form = form.part(file.field, part);
    }
    Ok(form)
}

fn describe_body(body: &RequestBody) -> Option<String> {
    match body {
        RequestBody::Empty => None,
        RequestBody::Json(value) => Some(value.to_string()),
        RequestBody::Form(fields) => Some(
            mask_form(fields)
                .into_iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&"),
        ),
        RequestBody::Multipart { fields, files } => {
            let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
            Some(format!(
                "multipart: {} field(s), files [{}]",
                fields.len(),
                names.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientType;

    #[test]
    fn test_options_from_configuration() {
        let configuration = ClientConfiguration::new(ClientType::HttpBasic, "http://api.example")
            .unwrap()
            .with_credentials("admin", "secret");
        let settings = PlatformSettings::new()
            .with_ssl_validation(true)
            .with_request_timeout(Duration::from_secs(30));

        let options = SessionOptions::from_configuration(&configuration, &settings);
        assert_eq!(options.base_url, "http://api.example");
        assert_eq!(options.client_name.as_deref(), Some("admin"));
        assert!(options.ssl_validation);
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
        assert_eq!(options.mode, SessionMode::Standard);
    }

    #[test]
    fn test_describe_body_masks_password() {
        let body = RequestBody::Form(vec![
            ("username".to_string(), "admin".to_string()),
            ("password".to_string(), "hunter2".to_string()),
        ]);
        let described = describe_body(&body).unwrap();
        assert!(described.contains("username=admin"));
        assert!(!described.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_webhdfs_session_mode() {
        let session = Session::webhdfs(SessionOptions::new("http://localhost:1234"))
            .await
            .unwrap();
        assert_eq!(session.mode(), SessionMode::Webhdfs);
        assert_eq!(session.base_url(), "http://localhost:1234");
    }
}
