//! Authentication for platform services.
//!
//! Provides one strategy per authentication protocol:
//! - **NoAuth**: nothing attached
//! - **HttpBasic**: static `Authorization: Basic` header
//! - **LoginPage**: cookie session from a login form with a CSRF field
//! - **Token**: bearer tokens from Cloud Foundry, UAA or the Kubernetes
//!   service login endpoint, tracked against a local lifetime

mod credential;
mod strategy;

pub use credential::{AuthMaterial, Credentials, IssuedToken};
pub use strategy::{
    AuthStrategy, BAD_CREDENTIALS_MARKER, ClientAuth, DEFAULT_TOKEN_LIFETIME_SECS,
    EXPIRES_IN_MARGIN_SECS, HttpBasicStrategy, LoginPageStrategy, NoAuthStrategy, TOKEN_FIELD,
    TokenFlavor, TokenStrategy, extract_csrf_token,
};
