//! WebHDFS operations.
//!
//! Metadata operations answer directly. `OPEN` answers with a `307` to the
//! data node holding the file, which [`open_and_read`] follows through the
//! registry's redirect handler.

mod redirect;

use std::fmt;

use reqwest::{Method, StatusCode};

pub use redirect::{
    ALLOWED_REDIRECTION_LIMIT, RedirectLocation, RedirectionCounter, WebhdfsRedirect,
    WebhdfsRedirector,
};

use crate::client::{ApiRequest, Client, ClientRegistry, Payload};
use crate::{Error, Result};

pub const DEFAULT_USER: &str = "hdfs";

pub const DEFAULT_PORT: u16 = 50070;

/// Local end of redirect tunnels.
pub const TUNNEL_LOCAL_HOST: &str = "localhost";

/// Tunnel port used when the redirect location has none.
pub const TUNNEL_LOCAL_PORT: u16 = 1234;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WebhdfsOperation {
    GetContentSummary,
    Open,
    GetFileStatus,
    ListStatus,
}

impl WebhdfsOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhdfsOperation::GetContentSummary => "GETCONTENTSUMMARY",
            WebhdfsOperation::Open => "OPEN",
            WebhdfsOperation::GetFileStatus => "GETFILESTATUS",
            WebhdfsOperation::ListStatus => "LISTSTATUS",
        }
    }
}

impl fmt::Display for WebhdfsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// REST root of a WebHDFS endpoint.
pub fn webhdfs_url(host: &str, port: u16) -> String {
    format!("http://{}:{}/webhdfs/v1", host, port)
}

/// `op` and `user.name` query parameters.
pub fn operation_params(operation: WebhdfsOperation) -> Vec<(String, String)> {
    vec![
        ("op".to_string(), operation.as_str().to_string()),
        ("user.name".to_string(), DEFAULT_USER.to_string()),
    ]
}

async fn call(client: &Client, operation: WebhdfsOperation, path: &str) -> Result<Payload> {
    client
        .request(ApiRequest::get(path).params(operation_params(operation)))
        .await
}

pub async fn get_content_summary(client: &Client, path: &str) -> Result<Payload> {
    call(client, WebhdfsOperation::GetContentSummary, path).await
}

pub async fn get_file_status(client: &Client, path: &str) -> Result<Payload> {
    call(client, WebhdfsOperation::GetFileStatus, path).await
}

pub async fn list_directory(client: &Client, path: &str) -> Result<Payload> {
    call(client, WebhdfsOperation::ListStatus, path).await
}

/// Read a file, following the data-node redirect when the name node sends one.
pub async fn open_and_read(
    registry: &ClientRegistry,
    client: &Client,
    path: &str,
) -> Result<Payload> {
    let params = operation_params(WebhdfsOperation::Open);
    let payload = client
        .request(ApiRequest::get(path).params(params.clone()))
        .await?;

    let location = match payload {
        Payload::Raw(ref raw) if raw.status() == StatusCode::TEMPORARY_REDIRECT => raw
            .location()
            .ok_or_else(|| Error::InvalidRequest("redirect without Location header".to_string()))?
            .to_string(),
        other => return Ok(other),
    };

    let redirect = WebhdfsRedirect::new(Method::GET, path, location).params(params);
    registry.follow_webhdfs_redirect(redirect).await
}
