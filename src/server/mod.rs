//! HTTP surface of the relay
//!
//! Routes:
//!
//! | Method   | Path                                    | Handler                          |
//! |----------|-----------------------------------------|----------------------------------|
//! | GET      | `/.well-known/oauth-protected-resource` | protected-resource metadata      |
//! | GET/POST | `/oauth/authorize`                      | authorize prompt and decision    |
//! | GET      | `/oauth/callback`                       | provider callback relay          |
//! | GET/POST | `/oauth/consent`                        | consent mediator                 |
//! | GET      | `/api/me`                               | bearer-protected identity lookup |

pub mod handlers;
pub mod metadata;
pub mod views;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::middleware::{verify_bearer, BearerAuthState};
use crate::auth::TokenVerifier;
use crate::config::Config;
use crate::error::{AuthRelayError, Result};
use crate::idp::{GoTrueClient, IdentityProvider};
use crate::relay::consent::ConsentMediator;
use crate::server::metadata::{resource_metadata_url, PROTECTED_RESOURCE_PATH};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub verifier: Arc<TokenVerifier>,
    pub consent: ConsentMediator,
}

impl AppState {
    /// Builds the state for a configured identity provider
    ///
    /// # Errors
    ///
    /// Returns [`AuthRelayError::Config`] when the identity provider URL is
    /// missing, and an HTTP error if the client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("authrelay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let provider: Arc<dyn IdentityProvider> =
            Arc::new(GoTrueClient::new(http.clone(), &config.identity_provider)?);
        Ok(Self::with_provider(config, http, provider))
    }

    /// Builds the state around an existing provider client
    pub fn with_provider(
        config: Config,
        http: reqwest::Client,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let verifier = Arc::new(TokenVerifier::new(config.identity_provider.clone(), http));
        Self {
            config: Arc::new(config),
            verifier,
            consent: ConsentMediator::new(provider),
        }
    }
}

impl FromRef<AppState> for BearerAuthState {
    fn from_ref(state: &AppState) -> Self {
        BearerAuthState {
            verifier: Arc::clone(&state.verifier),
            resource_metadata_url: resource_metadata_url(state.config.server.public_base()),
        }
    }
}

/// Builds the relay router
pub fn router(state: AppState) -> Router {
    let metadata = Router::new()
        .route(
            PROTECTED_RESOURCE_PATH,
            get(handlers::protected_resource_metadata),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers([CONTENT_TYPE]),
        );

    let api = Router::new()
        .route("/api/me", get(handlers::me))
        .route_layer(middleware::from_fn_with_state(state.clone(), verify_bearer));

    Router::new()
        .route(
            "/oauth/authorize",
            get(handlers::authorize_prompt).post(handlers::authorize_decision),
        )
        .route("/oauth/callback", get(handlers::callback))
        .route(
            "/oauth/consent",
            get(handlers::consent_page).post(handlers::consent_decision),
        )
        .merge(metadata)
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the relay until Ctrl-C
///
/// # Errors
///
/// Returns an error when the configuration is incomplete or the bind
/// address cannot be used.
pub async fn serve(config: Config) -> Result<()> {
    let bind_address = config.server.bind_address.clone();
    let state = AppState::new(config)?;

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| AuthRelayError::Config(format!("cannot bind {bind_address}: {e}")))?;

    tracing::info!(
        bind_address = %bind_address,
        public_url = %state.config.server.public_base(),
        "authrelay listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("authrelay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
