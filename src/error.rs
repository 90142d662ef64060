//! Error types for authrelay
//!
//! This module defines all error types used throughout the relay,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for authrelay operations
///
/// This enum covers the four failure classes the relay distinguishes:
/// configuration errors, verification failures, protocol errors, and
/// upstream identity-provider errors, plus conversions from the libraries
/// the relay builds on.
#[derive(Error, Debug)]
pub enum AuthRelayError {
    /// Configuration-related errors (missing or malformed settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bearer token verification failures
    ///
    /// These never escape the token verifier; they are logged and turned
    /// into an absent identity.
    #[error("Token verification failed: {0}")]
    Verification(String),

    /// OAuth protocol errors (missing or malformed request parameters)
    #[error("Invalid request: {0}")]
    Protocol(String),

    /// Errors reported by the identity provider
    ///
    /// The message is the provider's own text, surfaced verbatim.
    #[error("{0}")]
    Provider(String),

    /// The identity provider refused the end user's session token
    /// (`401`/`403`), typically because it expired
    #[error("{0}")]
    SessionRejected(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// JWT decoding and signature errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Result type alias for authrelay operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation. Callers that
/// need to branch on the failure class use `downcast_ref::<AuthRelayError>()`.
pub type Result<T> = anyhow::Result<T>;
