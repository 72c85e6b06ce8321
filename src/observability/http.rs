//! Request and response log lines.

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};

/// `tracing` target for all HTTP traffic logs.
pub const HTTP_LOG_TARGET: &str = "platform_client::http";

/// Request bodies are cut to this many characters before logging.
pub const MAX_LOGGED_REQUEST_BODY: usize = 5000;

const ELLIPSIS: &str = "[...]";
const MASK: &str = "*****";
const MASKED_FORM_KEYS: &[&str] = &["password", "client_secret"];

/// How much of a response body to log.
///
/// `0` logs only a placeholder, a negative value logs the full body, and a
/// positive `n` keeps the first and last `n / 2` characters of bodies longer
/// than `n`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogBodyLimit(i64);

impl LogBodyLimit {
    pub const DEFAULT: i64 = 1024;

    pub fn new(limit: i64) -> Self {
        Self(limit)
    }

    pub fn unlimited() -> Self {
        Self(-1)
    }

    pub fn get(&self) -> i64 {
        self.0
    }

    /// Shape `body` for the response log.
    pub fn shape<'a>(&self, body: &'a str) -> std::borrow::Cow<'a, str> {
        use std::borrow::Cow;

        let limit = self.0;
        if limit == 0 {
            return Cow::Borrowed(ELLIPSIS);
        }
        if limit < 0 {
            return Cow::Borrowed(body);
        }

        let len = body.chars().count();
        if len as i64 <= limit {
            return Cow::Borrowed(body);
        }

        let half = (limit / 2) as usize;
        let head: String = body.chars().take(half).collect();
        let tail: String = body.chars().skip(len - half).collect();
        Cow::Owned(format!("{} {} {}", head, ELLIPSIS, tail))
    }
}

impl Default for LogBodyLimit {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Request-side log context.
#[derive(Debug, Default)]
pub struct RequestLog<'a> {
    pub description: Option<&'a str>,
    pub client_name: Option<&'a str>,
    pub body: Option<&'a str>,
}

/// Replace secret values in `key=value` pairs with a mask.
pub fn mask_form(pairs: &[(String, String)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| {
            if MASKED_FORM_KEYS.contains(&k.as_str()) {
                (k.clone(), MASK.to_string())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

fn truncate_chars(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

pub fn log_request(method: &Method, url: &str, headers: &HeaderMap, log: &RequestLog<'_>) {
    let body = log
        .body
        .map(|b| truncate_chars(b, MAX_LOGGED_REQUEST_BODY))
        .unwrap_or_default();
    tracing::debug!(
        target: HTTP_LOG_TARGET,
        description = log.description.unwrap_or_default(),
        client = log.client_name.unwrap_or_default(),
        %method,
        url,
        ?headers,
        body,
        "request"
    );
}

pub fn log_response(status: StatusCode, headers: &HeaderMap, body: &str, limit: LogBodyLimit) {
    tracing::debug!(
        target: HTTP_LOG_TARGET,
        status = status.as_u16(),
        ?headers,
        body = %limit.shape(body),
        "response"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_limit_hides_body() {
        assert_eq!(LogBodyLimit::new(0).shape("anything"), "[...]");
    }

    #[test]
    fn test_negative_limit_keeps_body() {
        let body = "x".repeat(5000);
        assert_eq!(LogBodyLimit::unlimited().shape(&body), body);
    }

    #[test]
    fn test_positive_limit_keeps_head_and_tail() {
        let limit = LogBodyLimit::new(4);
        assert_eq!(limit.shape("abcdefgh"), "ab [...] gh");
        assert_eq!(limit.shape("abcd"), "abcd");
    }

    #[test]
    fn test_shape_respects_char_boundaries() {
        let limit = LogBodyLimit::new(2);
        assert_eq!(limit.shape("żółw"), "ż [...] w");
    }

    #[test]
    fn test_mask_form() {
        let pairs = vec![
            ("username".to_string(), "admin".to_string()),
            ("password".to_string(), "hunter2".to_string()),
        ];
        let masked = mask_form(&pairs);
        assert_eq!(masked[0].1, "admin");
        assert_eq!(masked[1].1, MASK);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
    }
}
