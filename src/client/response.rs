//! Response payload types.

use std::borrow::Cow;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LOCATION};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::Result;

/// Body the login-page backed service returns once its session timed out.
pub const SESSION_EXPIRED: &str = "session_expired";

/// Fully buffered HTTP response.
#[derive(Clone, Debug)]
pub struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    url: String,
    body: Bytes,
}

impl RawResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, url: impl Into<String>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            url: url.into(),
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Status below 400.
    pub fn is_ok(&self) -> bool {
        self.status.as_u16() < 400
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// `Location` header, if present and valid UTF-8.
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }
}

/// Result of a request.
#[derive(Clone, Debug)]
pub enum Payload {
    /// Body decoded as JSON.
    Json(Value),
    /// Body that is not valid JSON, unchanged.
    Text(String),
    /// Undecoded response, for raw requests and WebHDFS redirects.
    Raw(RawResponse),
}

impl Payload {
    /// Decode a successful body: JSON when it parses, text otherwise.
    pub fn decode(body: &[u8]) -> Self {
        match serde_json::from_slice(body) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(String::from_utf8_lossy(body).into_owned()),
        }
    }

    /// Whether this is the session-expiry sentinel, either as text or as a
    /// JSON string.
    pub fn is_session_expired(&self) -> bool {
        match self {
            Payload::Text(text) => text == SESSION_EXPIRED,
            Payload::Json(Value::String(text)) => text == SESSION_EXPIRED,
            _ => false,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&RawResponse> {
        match self {
            Payload::Raw(raw) => Some(raw),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_raw(self) -> Option<RawResponse> {
        match self {
            Payload::Raw(raw) => Some(raw),
            _ => None,
        }
    }

    /// Deserialize a JSON payload into `T`.
    pub fn parse<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Payload::Json(value) => Ok(serde_json::from_value(value)?),
            Payload::Text(text) => Ok(serde_json::from_str(&text)?),
            Payload::Raw(raw) => raw.json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_json() {
        let payload = Payload::decode(br#"{"name": "app"}"#);
        assert_eq!(payload.as_json(), Some(&json!({"name": "app"})));
    }

    #[test]
    fn test_decode_text_fallback() {
        let payload = Payload::decode(b"plain text body");
        assert_eq!(payload.as_text(), Some("plain text body"));

        let payload = Payload::decode(b"");
        assert_eq!(payload.as_text(), Some(""));
    }

    #[test]
    fn test_session_expired_sentinel() {
        assert!(Payload::decode(b"session_expired").is_session_expired());
        assert!(Payload::decode(br#""session_expired""#).is_session_expired());
        assert!(!Payload::decode(b"session_expired ").is_session_expired());
        assert!(!Payload::decode(br#"{"error": "session_expired"}"#).is_session_expired());
    }

    #[test]
    fn test_raw_response() {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, "http://node1:50075/webhdfs/v1/f".parse().unwrap());
        let raw = RawResponse::new(
            StatusCode::TEMPORARY_REDIRECT,
            headers,
            "http://nn:50070/webhdfs/v1/f",
            Bytes::new(),
        );
        assert!(raw.is_ok());
        assert_eq!(raw.location(), Some("http://node1:50075/webhdfs/v1/f"));

        let raw = RawResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), "u", Bytes::new());
        assert!(!raw.is_ok());
    }

    #[test]
    fn test_parse() {
        #[derive(serde::Deserialize)]
        struct App {
            name: String,
        }
        let app: App = Payload::decode(br#"{"name": "app"}"#).parse().unwrap();
        assert_eq!(app.name, "app");
    }
}
