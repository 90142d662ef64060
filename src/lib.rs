//! authrelay - OAuth relay and bearer-token verifier library
//!
//! This library brokers the OAuth authorization-code flow between a
//! third-party client application and an external identity provider, and
//! verifies the access tokens that provider issues.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: Bearer-token verification against the provider's remote key set
//! - `idp`: Identity provider API client and PKCE helpers
//! - `relay`: Authorize, consent and callback stages of the OAuth relay
//! - `server`: axum router, handlers and JSON views
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use authrelay::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     authrelay::server::serve(config).await
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod idp;
pub mod relay;
pub mod server;

// Re-export commonly used types
pub use auth::{AuthContext, TokenVerifier};
pub use config::Config;
pub use error::{AuthRelayError, Result};
