//! Structured span definitions for tracing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use reqwest::Method;
use tracing::{Level, Span, field, span};

/// Per-session span context handing out request ids.
#[derive(Debug)]
pub struct SpanContext {
    session_name: String,
    request_id: AtomicU64,
}

impl SpanContext {
    pub fn new(session_name: impl Into<String>) -> Self {
        Self {
            session_name: session_name.into(),
            request_id: AtomicU64::new(0),
        }
    }

    pub fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn http_call_span(&self, method: &Method, url: &str) -> HttpCallSpan {
        HttpCallSpan::new(&self.session_name, self.next_request_id(), method, url)
    }

    pub fn authenticate_span(&self, strategy: &str) -> Span {
        span!(
            Level::INFO,
            "auth.authenticate",
            session = %self.session_name,
            strategy = strategy,
        )
    }
}

/// Tracks one transport call.
pub struct HttpCallSpan {
    span: Span,
    start: Instant,
}

impl HttpCallSpan {
    pub fn new(session: &str, request_id: u64, method: &Method, url: &str) -> Self {
        let span = span!(
            Level::INFO,
            "http.request",
            session = session,
            request_id = request_id,
            method = %method,
            url = url,
            status = field::Empty,
            latency_ms = field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
        }
    }

    pub fn record_status(&self, status: u16) {
        self.span.record("status", status);
    }

    pub fn finish(self) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        self.span.record("latency_ms", latency_ms);
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}
