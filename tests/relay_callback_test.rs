//! Callback receiver integration tests
//!
//! The three callback scenarios: code, provider error, and neither.

mod common;

use axum::http::StatusCode;
use wiremock::MockServer;

use common::{app_for, app_with, body_json, config_for, get, location, query_map, send};

#[tokio::test]
async fn test_code_and_state_are_relayed() {
    let idp = MockServer::start().await;
    let app = app_for(&idp);

    let response = send(&app, get("/oauth/callback?code=xyz&state=s1")).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response).as_str(),
        "https://chatgpt.com/connector_platform_oauth_redirect?code=xyz&state=s1"
    );
}

#[tokio::test]
async fn test_error_is_relayed_without_state() {
    let idp = MockServer::start().await;
    let app = app_for(&idp);

    let response = send(&app, get("/oauth/callback?error=access_denied")).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response).as_str(),
        "https://chatgpt.com/connector_platform_oauth_redirect?error=access_denied"
    );
}

#[tokio::test]
async fn test_error_with_description_and_state() {
    let idp = MockServer::start().await;
    let app = app_for(&idp);

    let response = send(
        &app,
        get("/oauth/callback?error=server_error&error_description=upstream%20down&state=s%2F1"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    let q = query_map(&location(&response));
    assert_eq!(q["error"], "server_error");
    assert_eq!(q["error_description"], "upstream down");
    assert_eq!(q["state"], "s/1");
    assert!(!q.contains_key("code"));
}

#[tokio::test]
async fn test_missing_code_is_bad_request() {
    let idp = MockServer::start().await;
    let app = app_for(&idp);

    let response = send(&app, get("/oauth/callback?state=s1")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get("location").is_none());
    let body = body_json(response).await;
    assert_eq!(body, serde_json::json!({ "error": "Missing authorization code" }));
}

#[tokio::test]
async fn test_configured_target_is_used() {
    let idp = MockServer::start().await;
    let mut config = config_for(&idp);
    config.relay.callback_redirect_uri = "https://client.example.com/oauth/done".to_string();
    let app = app_with(config);

    let response = send(&app, get("/oauth/callback?code=abc")).await;

    assert_eq!(
        location(&response).as_str(),
        "https://client.example.com/oauth/done?code=abc"
    );
}
