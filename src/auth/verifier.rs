//! Bearer token verification
//!
//! [`TokenVerifier`] turns the `Authorization` header of an inbound request
//! into an optional [`AuthContext`]. It never fails for a bad token: every
//! verification failure is logged and reported as "no identity". The only
//! error it returns is a missing identity-provider configuration, which is a
//! deployment fault rather than a client fault.

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, decode_header, Validation};
use tokio::sync::OnceCell;

use crate::auth::claims::{AuthContext, TokenClaims};
use crate::auth::jwks::RemoteKeySet;
use crate::config::IdentityProviderConfig;
use crate::error::{AuthRelayError, Result};

/// Verifies identity-provider access tokens against the provider's
/// published key set
///
/// The remote key-set handle is created on first use and then shared by
/// every later call, so key fetching and caching happen once per process.
pub struct TokenVerifier {
    config: IdentityProviderConfig,
    http: reqwest::Client,
    key_set: OnceCell<Arc<RemoteKeySet>>,
}

impl TokenVerifier {
    /// Creates a verifier for the given identity provider
    ///
    /// The configuration is not checked here; a missing base URL surfaces
    /// on the first verification that gets past token extraction.
    pub fn new(config: IdentityProviderConfig, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            key_set: OnceCell::new(),
        }
    }

    /// Creates a verifier that uses an already-built key-set handle
    pub fn with_key_set(config: IdentityProviderConfig, key_set: Arc<RemoteKeySet>) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            key_set: OnceCell::new_with(Some(key_set)),
        }
    }

    /// Returns the shared key-set handle, creating it on first use
    ///
    /// # Errors
    ///
    /// Returns [`AuthRelayError::Config`] when the identity provider URL is
    /// not configured.
    pub async fn key_set(&self) -> Result<Arc<RemoteKeySet>> {
        let key_set = self
            .key_set
            .get_or_try_init(|| async {
                let jwks_url = self.config.jwks_url()?;
                tracing::info!(jwks_url = %jwks_url, "Initialized remote key set");
                Ok::<_, anyhow::Error>(Arc::new(RemoteKeySet::new(self.http.clone(), jwks_url)))
            })
            .await?;
        Ok(Arc::clone(key_set))
    }

    /// Verifies the bearer token of a request
    ///
    /// `bearer_token` takes precedence when non-empty; otherwise the token
    /// is read from the `Authorization: Bearer <token>` header.
    ///
    /// # Returns
    ///
    /// - `Ok(None)` when no token is present, or the token fails signature,
    ///   issuer or expiry checks, or it carries no `client_id` claim
    /// - `Ok(Some(ctx))` for a valid OAuth-issued token
    ///
    /// # Errors
    ///
    /// Returns [`AuthRelayError::Config`] when a token is present but the
    /// identity provider URL is not configured.
    pub async fn verify(
        &self,
        headers: &HeaderMap,
        bearer_token: Option<&str>,
    ) -> Result<Option<AuthContext>> {
        let token = match bearer_token.filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => match extract_bearer_token(headers) {
                Some(token) => token,
                None => return Ok(None),
            },
        };

        self.verify_token(token).await
    }

    /// Verifies a raw token string
    ///
    /// Same contract as [`Self::verify`], minus header extraction.
    pub async fn verify_token(&self, token: &str) -> Result<Option<AuthContext>> {
        let issuer = self.config.issuer().inspect_err(|e| {
            tracing::error!(error = %e, "Token verifier is not configured");
        })?;
        let key_set = self.key_set().await?;

        let claims = match decode_claims(token, &key_set, &issuer).await {
            Ok(claims) => claims,
            Err(e) => {
                tracing::error!(error = %e, "JWT verification failed");
                return Ok(None);
            }
        };

        let subject = claims.sub.clone();
        match AuthContext::from_claims(token, claims) {
            Some(ctx) => {
                tracing::debug!(sub = %ctx.extra.sub, client_id = %ctx.client_id, "Token verified");
                Ok(Some(ctx))
            }
            None => {
                tracing::warn!(sub = %subject, "Token has no client_id claim, not an OAuth token");
                Ok(None)
            }
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header
///
/// The scheme match is exact; any other scheme, or an empty token, yields
/// `None`.
///
/// # Examples
///
/// ```
/// use authrelay::auth::verifier::extract_bearer_token;
/// use axum::http::{HeaderMap, HeaderValue};
///
/// let mut headers = HeaderMap::new();
/// headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
/// assert_eq!(extract_bearer_token(&headers), Some("abc"));
///
/// headers.insert("authorization", HeaderValue::from_static("Basic abc"));
/// assert_eq!(extract_bearer_token(&headers), None);
/// ```
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
}

async fn decode_claims(token: &str, key_set: &RemoteKeySet, issuer: &str) -> Result<TokenClaims> {
    let header = decode_header(token)?;
    let keys = key_set.candidate_keys(&header).await?;

    let mut validation = Validation::new(header.alg);
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    // Provider tokens carry an audience the relay does not pin.
    validation.validate_aud = false;
    validation.leeway = 0;

    let mut last_error = None;
    for key in &keys {
        match decode::<TokenClaims>(token, key, &validation) {
            Ok(data) => return Ok(data.claims),
            Err(e) => last_error = Some(e),
        }
    }

    Err(match last_error {
        Some(e) => AuthRelayError::Jwt(e).into(),
        None => AuthRelayError::Verification("no candidate key".to_string()).into(),
    })
}
