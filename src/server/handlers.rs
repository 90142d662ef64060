//! HTTP handlers for the relay endpoints

use axum::extract::{Form, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;

use crate::auth::RequireAuth;
use crate::error::AuthRelayError;
use crate::idp::ConsentAction;
use crate::relay::authorize::{resolve_decision, AuthorizeDecision};
use crate::relay::callback::callback_redirect_url;
use crate::relay::consent::{require_authorization_id, ConsentState, DecisionOutcome};
use crate::relay::params::{AuthorizationRequestParams, CallbackQuery, CallbackResult};
use crate::server::metadata::ProtectedResourceMetadata;
use crate::server::views::{found, FormContract, View};
use crate::server::AppState;

/// Cookie holding the provider session token
pub const SESSION_COOKIE: &str = "authrelay_session";

/// Cookie holding the PKCE verifier across the federated login hop
pub const PKCE_COOKIE: &str = "authrelay_pkce";

const AUTHORIZE_PATH: &str = "/oauth/authorize";
const CONSENT_PATH: &str = "/oauth/consent";

// ---------------------------------------------------------------------------
// Protected resource metadata
// ---------------------------------------------------------------------------

pub async fn protected_resource_metadata(State(state): State<AppState>) -> Response {
    match ProtectedResourceMetadata::from_config(&state.config) {
        Ok(meta) => Json(meta).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Cannot serve protected resource metadata");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "AUTHRELAY_IDP_URL is not configured" })),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Authorize
// ---------------------------------------------------------------------------

pub async fn authorize_prompt(Query(params): Query<AuthorizationRequestParams>) -> Response {
    let request = match params.validate() {
        Ok(request) => request,
        Err(e) => return protocol_error(e),
    };

    View::AuthorizePrompt {
        scopes: request.requested_scopes(),
        params: AuthorizationRequestParams::from(&request),
        client_id: request.client_id,
        redirect_uri: request.redirect_uri,
        form: FormContract::post(AUTHORIZE_PATH),
    }
    .with_status(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeForm {
    #[serde(flatten)]
    pub params: AuthorizationRequestParams,
    #[serde(default)]
    pub decision: Option<String>,
}

pub async fn authorize_decision(
    State(state): State<AppState>,
    Form(form): Form<AuthorizeForm>,
) -> Response {
    let request = match form.params.validate() {
        Ok(request) => request,
        Err(e) => return protocol_error(e),
    };

    let decision = match form.decision.as_deref() {
        Some("approve") => AuthorizeDecision::Approve,
        Some("deny") => AuthorizeDecision::Deny,
        _ => return View::invalid_request("Unknown decision.").with_status(StatusCode::BAD_REQUEST),
    };

    match resolve_decision(&state.config.identity_provider, &request, decision) {
        Ok(url) => {
            tracing::info!(client_id = %request.client_id, ?decision, "Authorize decision relayed");
            found(url.as_str())
        }
        Err(e) => {
            tracing::error!(client_id = %request.client_id, error = %e, "Authorize redirect failed");
            let status = match e.downcast_ref::<AuthRelayError>() {
                Some(AuthRelayError::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            };
            View::error(e.to_string()).with_status(status)
        }
    }
}

// ---------------------------------------------------------------------------
// Callback
// ---------------------------------------------------------------------------

pub async fn callback(State(state): State<AppState>, Query(query): Query<CallbackQuery>) -> Response {
    let result = match CallbackResult::from_query(query) {
        Ok(result) => result,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Missing authorization code" })),
            )
                .into_response();
        }
    };

    match callback_redirect_url(&state.config.relay.callback_redirect_uri, &result) {
        Ok(url) => {
            let outcome = match result {
                CallbackResult::Code { .. } => "code",
                CallbackResult::Error { .. } => "error",
            };
            tracing::info!(outcome, "Relaying provider callback");
            found(url.as_str())
        }
        Err(e) => {
            tracing::error!(error = %e, "Callback redirect target is invalid");
            View::error(e.to_string()).with_status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// ---------------------------------------------------------------------------
// Consent
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ConsentQuery {
    #[serde(default)]
    pub authorization_id: Option<String>,
    /// One-time code from federated login
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

pub async fn consent_page(
    State(state): State<AppState>,
    jar: CookieJar,
    uri: Uri,
    Query(query): Query<ConsentQuery>,
) -> Response {
    let authorization_id = match require_authorization_id(query.authorization_id.as_deref()) {
        Ok(id) => id.to_string(),
        Err(e) => return protocol_error(e),
    };
    let clean_url = consent_url(&state, &authorization_id);

    if let Some(error) = query.error.filter(|e| !e.is_empty()) {
        let message = query.error_description.filter(|d| !d.is_empty()).unwrap_or(error);
        tracing::warn!(authorization_id = %authorization_id, "Federated login failed");
        return View::error(message).with_status(StatusCode::BAD_GATEWAY);
    }

    if let Some(code) = query.code.filter(|c| !c.is_empty()) {
        let Some(verifier) = jar.get(PKCE_COOKIE).map(|c| c.value().to_string()) else {
            return View::error("Sign-in expired. Reload the consent page to try again.")
                .with_status(StatusCode::BAD_REQUEST);
        };

        return match state.consent.complete_login(&code, &verifier).await {
            Ok(session) => {
                let jar = jar
                    .remove(pkce_cookie(&state, String::new()))
                    .add(session_cookie(&state, session.access_token));
                (jar, found(&clean_url)).into_response()
            }
            Err(e) => {
                tracing::error!(authorization_id = %authorization_id, error = %e, "Login code exchange failed");
                View::error(e.to_string()).with_status(StatusCode::BAD_GATEWAY)
            }
        };
    }

    let current_url = match uri.path_and_query() {
        Some(pq) => format!("{}{}", state.config.server.public_base(), pq),
        None => clean_url,
    };
    let session = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    match state
        .consent
        .fetch(&authorization_id, session.as_deref(), &current_url)
        .await
    {
        ConsentState::AwaitingLogin {
            login_url,
            pkce_verifier,
        } => {
            let mut jar = jar.add(pkce_cookie(&state, pkce_verifier));
            if session.is_some() {
                jar = jar.remove(session_cookie(&state, String::new()));
            }
            (jar, found(login_url.as_str())).into_response()
        }
        ConsentState::ReadyForConsent(details) => View::Consent {
            details,
            form: FormContract::post(CONSENT_PATH),
        }
        .with_status(StatusCode::OK),
        ConsentState::ErrorTerminal { message } => {
            View::error(message).with_status(StatusCode::BAD_GATEWAY)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConsentForm {
    #[serde(default)]
    pub authorization_id: Option<String>,
    #[serde(default)]
    pub decision: Option<String>,
}

pub async fn consent_decision(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ConsentForm>,
) -> Response {
    let authorization_id = match require_authorization_id(form.authorization_id.as_deref()) {
        Ok(id) => id.to_string(),
        Err(e) => return protocol_error(e),
    };

    let action = match form.decision.as_deref() {
        Some("approve") => ConsentAction::Approve,
        Some("deny") => ConsentAction::Deny,
        _ => return View::invalid_request("Unknown decision.").with_status(StatusCode::BAD_REQUEST),
    };

    let session = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    match state
        .consent
        .decide(&authorization_id, session.as_deref(), action)
        .await
    {
        DecisionOutcome::Redirected(uri) => found(&uri),
        DecisionOutcome::Submitted => {
            View::ConsentSubmitted { authorization_id }.with_status(StatusCode::OK)
        }
        DecisionOutcome::Failed { message } => {
            View::retryable_error(message).with_status(StatusCode::BAD_GATEWAY)
        }
    }
}

// ---------------------------------------------------------------------------
// Protected API
// ---------------------------------------------------------------------------

/// Identity behind the presented bearer token
pub async fn me(RequireAuth(ctx): RequireAuth) -> Response {
    Json(json!({
        "clientId": ctx.client_id,
        "scopes": ctx.scopes,
        "expiresAt": ctx.expires_at,
        "user": ctx.user(),
    }))
    .into_response()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn protocol_error(e: anyhow::Error) -> Response {
    let message = match e.downcast_ref::<AuthRelayError>() {
        Some(AuthRelayError::Protocol(message)) => message.clone(),
        _ => e.to_string(),
    };
    View::invalid_request(message).with_status(StatusCode::BAD_REQUEST)
}

fn consent_url(state: &AppState, authorization_id: &str) -> String {
    let mut url = format!("{}{}", state.config.server.public_base(), CONSENT_PATH);
    url.push_str("?authorization_id=");
    url.extend(url::form_urlencoded::byte_serialize(authorization_id.as_bytes()));
    url
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/oauth")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.server.secure_cookies)
        .build()
}

fn pkce_cookie(state: &AppState, verifier: String) -> Cookie<'static> {
    Cookie::build((PKCE_COOKIE, verifier))
        .path(CONSENT_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.server.secure_cookies)
        .build()
}
