//! Observability for the HTTP layer.
//!
//! Every transport call is logged through `tracing` under the
//! `platform_client::http` target and runs inside an `http.request` span.
//! Response bodies are shaped by a [`LogBodyLimit`] so large payloads do not
//! flood test logs.
//!
//! Enable the `logging` feature to get a ready-made subscriber:
//!
//! ```toml
//! platform-client = { version = "0.1", features = ["logging"] }
//! ```
//!
//! ```rust,ignore
//! platform_client::observability::init_tracing("debug");
//! ```

mod http;
mod spans;

pub use http::{
    HTTP_LOG_TARGET, LogBodyLimit, MAX_LOGGED_REQUEST_BODY, RequestLog, log_request,
    log_response, mask_form,
};
pub use spans::{HttpCallSpan, SpanContext};

/// Install a global `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_level`. Does nothing if a subscriber is already installed.
#[cfg(feature = "logging")]
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
