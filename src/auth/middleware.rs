//! Request integration for bearer-token verification
//!
//! [`verify_bearer`] runs the [`TokenVerifier`] once per request and stores
//! the outcome in the request extensions. Handlers then pick it up through
//! one of two extractors:
//!
//! - [`MaybeAuth`] for endpoints that also serve anonymous callers
//! - [`RequireAuth`] for protected endpoints; rejects with `401` and a
//!   `WWW-Authenticate` challenge pointing at the protected-resource
//!   metadata document
//!
//! Both extractors fall back to verifying on their own when the middleware
//! is not installed on the route.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts, Request, State};
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::request::Parts;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::claims::AuthContext;
use crate::auth::verifier::TokenVerifier;

/// State the bearer-auth middleware and extractors need
#[derive(Clone)]
pub struct BearerAuthState {
    pub verifier: Arc<TokenVerifier>,

    /// Absolute URL of `/.well-known/oauth-protected-resource`, advertised
    /// in `401` challenges
    pub resource_metadata_url: String,
}

/// Outcome of verification, stored once per request
#[derive(Debug, Clone)]
struct VerifiedAuth(Option<AuthContext>);

/// Middleware that verifies the request's bearer token
///
/// Install with `axum::middleware::from_fn_with_state`. A misconfigured
/// verifier answers `500` instead of calling the inner service.
pub async fn verify_bearer(
    State(auth): State<BearerAuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    match auth.verifier.verify(request.headers(), None).await {
        Ok(ctx) => {
            request.extensions_mut().insert(VerifiedAuth(ctx));
            next.run(request).await
        }
        Err(e) => {
            tracing::error!(error = %e, "Bearer verification unavailable");
            AuthRejection::Misconfigured.into_response()
        }
    }
}

async fn resolve<S>(parts: &Parts, state: &S) -> Result<Option<AuthContext>, AuthRejection>
where
    S: Send + Sync,
    BearerAuthState: FromRef<S>,
{
    if let Some(VerifiedAuth(ctx)) = parts.extensions.get::<VerifiedAuth>() {
        return Ok(ctx.clone());
    }

    let auth = BearerAuthState::from_ref(state);
    auth.verifier.verify(&parts.headers, None).await.map_err(|e| {
        tracing::error!(error = %e, "Bearer verification unavailable");
        AuthRejection::Misconfigured
    })
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// Verified identity if the caller presented a valid OAuth token
#[derive(Debug, Clone)]
pub struct MaybeAuth(pub Option<AuthContext>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuth
where
    S: Send + Sync,
    BearerAuthState: FromRef<S>,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuth(resolve(parts, state).await?))
    }
}

/// Verified identity, required
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    BearerAuthState: FromRef<S>,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match resolve(parts, state).await? {
            Some(ctx) => Ok(RequireAuth(ctx)),
            None => Err(AuthRejection::Unauthenticated {
                resource_metadata_url: BearerAuthState::from_ref(state).resource_metadata_url,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Rejection
// ---------------------------------------------------------------------------

/// Why an auth extractor refused the request
#[derive(Debug, Clone)]
pub enum AuthRejection {
    /// No valid OAuth token was presented
    Unauthenticated { resource_metadata_url: String },

    /// The verifier cannot run (identity provider not configured)
    Misconfigured,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Unauthenticated {
                resource_metadata_url,
            } => {
                let body = Json(json!({
                    "error": "invalid_token",
                    "error_description": "Missing or invalid bearer token",
                }));
                let mut response = (StatusCode::UNAUTHORIZED, body).into_response();
                let challenge = format!("Bearer resource_metadata=\"{resource_metadata_url}\"");
                if let Ok(value) = HeaderValue::from_str(&challenge) {
                    response.headers_mut().insert(WWW_AUTHENTICATE, value);
                }
                response
            }
            AuthRejection::Misconfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "server_error",
                    "error_description": "Token verification is not configured",
                })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthenticated_rejection_sets_challenge() {
        let response = AuthRejection::Unauthenticated {
            resource_metadata_url: "https://relay.example.com/.well-known/oauth-protected-resource"
                .to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(WWW_AUTHENTICATE).unwrap(),
            "Bearer resource_metadata=\"https://relay.example.com/.well-known/oauth-protected-resource\""
        );
    }

    #[test]
    fn test_misconfigured_rejection_is_server_error() {
        let response = AuthRejection::Misconfigured.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(WWW_AUTHENTICATE).is_none());
    }
}
