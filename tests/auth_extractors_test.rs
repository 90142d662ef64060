//! Optional-auth extractor tests
//!
//! `MaybeAuth` never rejects a bad or missing token; it only reports whether
//! an OAuth identity was established. It works both behind `verify_bearer`
//! and on routes without it.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use authrelay::auth::middleware::verify_bearer;
use authrelay::auth::{BearerAuthState, MaybeAuth, TokenVerifier};
use authrelay::config::IdentityProviderConfig;

use common::{body_json, config_for, get as get_request, mint_token, oauth_claims, send, start_idp};

async fn whoami(MaybeAuth(ctx): MaybeAuth) -> Json<Value> {
    Json(json!({
        "client_id": ctx.as_ref().map(|c| c.client_id.clone()),
        "email_scope": ctx.as_ref().map(|c| c.has_scope("email")),
    }))
}

fn app(config: IdentityProviderConfig) -> Router {
    let state = BearerAuthState {
        verifier: Arc::new(TokenVerifier::new(config, reqwest::Client::new())),
        resource_metadata_url: "https://relay.example.com/.well-known/oauth-protected-resource"
            .to_string(),
    };

    Router::new()
        .route("/guarded", get(whoami))
        .route_layer(middleware::from_fn_with_state(state.clone(), verify_bearer))
        .route("/open", get(whoami))
        .with_state(state)
}

fn with_bearer(
    mut request: axum::http::Request<axum::body::Body>,
    token: &str,
) -> axum::http::Request<axum::body::Body> {
    request
        .headers_mut()
        .insert("authorization", format!("Bearer {token}").parse().unwrap());
    request
}

#[tokio::test]
async fn test_anonymous_caller_is_allowed() {
    let idp = start_idp().await;
    let app = app(config_for(&idp).identity_provider);

    for uri in ["/guarded", "/open"] {
        let response = send(&app, get_request(uri)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["client_id"], Value::Null);
    }
}

#[tokio::test]
async fn test_valid_token_is_resolved_with_and_without_middleware() {
    let idp = start_idp().await;
    let app = app(config_for(&idp).identity_provider);
    let token = mint_token(&oauth_claims(&idp, "u1", Some("c1")));

    for uri in ["/guarded", "/open"] {
        let response = send(&app, with_bearer(get_request(uri), &token)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["client_id"], "c1");
        assert_eq!(body["email_scope"], true);
    }
}

#[tokio::test]
async fn test_token_without_client_id_reads_as_anonymous() {
    let idp = start_idp().await;
    let app = app(config_for(&idp).identity_provider);
    let token = mint_token(&oauth_claims(&idp, "u1", None));

    let response = send(&app, with_bearer(get_request("/open"), &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["client_id"], Value::Null);
}

#[tokio::test]
async fn test_unconfigured_verifier_is_server_error() {
    let app = app(IdentityProviderConfig::default());

    for uri in ["/guarded", "/open"] {
        let response = send(&app, with_bearer(get_request(uri), "a.b.c")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
