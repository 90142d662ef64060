/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `serve`: run the relay HTTP server
- `verify_token`: check a bearer token against the configured provider

Both are thin wrappers around the library's server and auth components.
*/

use crate::config::Config;
use crate::error::{AuthRelayError, Result};

// Server command handler
pub mod serve {
    //! Relay server handler.
    //!
    //! Checks that the identity provider is configured, then hands the
    //! configuration to the HTTP server and runs until shutdown.

    use super::*;

    /// Start the relay server
    ///
    /// # Arguments
    ///
    /// * `config` - Fully loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the identity provider URL is missing or the
    /// server cannot bind its address.
    pub async fn run_serve(config: Config) -> Result<()> {
        config.identity_provider.require_base_url()?;
        if config.identity_provider.anon_key.is_none() {
            tracing::warn!("AUTHRELAY_IDP_ANON_KEY is not set; consent and authorize approval will fail");
        }

        crate::server::serve(config).await
    }
}

// Token verification command handler
pub mod verify_token {
    //! One-shot bearer token check.
    //!
    //! Runs the same verification pipeline as the server and prints the
    //! resulting auth context as JSON.

    use super::*;
    use crate::auth::TokenVerifier;

    /// Verify `token` and print the auth context
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is not configured or the token does
    /// not yield a verified OAuth identity.
    pub async fn run_verify_token(config: Config, token: String) -> Result<()> {
        let verifier = TokenVerifier::new(config.identity_provider, reqwest::Client::new());

        match verifier.verify_token(token.trim()).await? {
            Some(ctx) => {
                let expires = chrono::DateTime::from_timestamp(ctx.expires_at, 0)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| ctx.expires_at.to_string());
                tracing::info!(client_id = %ctx.client_id, expires = %expires, "Token verified");
                println!("{}", serde_json::to_string_pretty(&ctx)?);
                Ok(())
            }
            None => Err(AuthRelayError::Verification(
                "token did not yield a verified OAuth identity (see logs)".to_string(),
            )
            .into()),
        }
    }
}
