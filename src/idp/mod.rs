//! Identity provider API
//!
//! The relay delegates sessions, consent records and credential issuance to
//! an external identity provider and talks to it only over HTTP. This
//! module defines the calls the relay makes ([`IdentityProvider`]), the data
//! they exchange, and a client for GoTrue-compatible providers.
//!
//! # Module Layout
//!
//! - [`gotrue`] -- HTTP client for the provider's `/auth/v1` API
//! - [`pkce`]   -- PKCE pairs for the federated-login round trip

pub mod gotrue;
pub mod pkce;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;
use crate::idp::pkce::PkceChallenge;

pub use gotrue::GoTrueClient;

// ---------------------------------------------------------------------------
// Provider data
// ---------------------------------------------------------------------------

/// Client application behind a pending authorization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Human-readable details of a pending authorization
///
/// The authorization itself is created, stored and resolved by the
/// provider; the relay only reads it by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

/// End-user decision on a pending authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentAction {
    Approve,
    Deny,
}

impl ConsentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentAction::Approve => "approve",
            ConsentAction::Deny => "deny",
        }
    }
}

/// Provider's answer to a consent decision
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConsentOutcome {
    /// Where the end user goes next, usually the relay's callback
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

/// Provider session obtained through federated login
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSession {
    pub access_token: String,

    #[serde(default)]
    pub token_type: Option<String>,

    /// Lifetime of `access_token` in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,

    #[serde(default)]
    pub refresh_token: Option<String>,
}

// ---------------------------------------------------------------------------
// IdentityProvider trait
// ---------------------------------------------------------------------------

/// Calls the relay makes against the identity provider
///
/// Every method performs at most one network call and never retries.
/// Provider-reported failures come back as
/// [`AuthRelayError::Provider`](crate::error::AuthRelayError::Provider)
/// carrying the provider's own message.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL of the provider's federated login, returning to `redirect_to`
    fn login_url(&self, redirect_to: &str, pkce: &PkceChallenge) -> Result<Url>;

    /// Redeems the one-time code from a federated login for a session
    async fn exchange_login_code(&self, auth_code: &str, code_verifier: &str)
        -> Result<ProviderSession>;

    /// Fetches the details of a pending authorization on behalf of the
    /// session's user
    async fn authorization_details(
        &self,
        session_token: &str,
        authorization_id: &str,
    ) -> Result<AuthorizationDetails>;

    /// Records the user's decision on a pending authorization
    async fn submit_consent(
        &self,
        session_token: &str,
        authorization_id: &str,
        action: ConsentAction,
    ) -> Result<ConsentOutcome>;
}
