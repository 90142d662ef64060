//! Consent mediator
//!
//! Sits between the provider's authorize endpoint and its callback. For a
//! provider-minted `authorization_id` it:
//!
//! 1. makes sure the end user has a provider session, sending them through
//!    federated login when not ([`ConsentState::AwaitingLogin`]);
//! 2. fetches what the client is asking for
//!    ([`ConsentState::ReadyForConsent`]);
//! 3. submits the user's approve/deny decision and follows the provider's
//!    redirect ([`DecisionOutcome`]).
//!
//! The details are fetched and shown every time, even when the user already
//! approved this client before. Nothing is retried; provider failures are
//! reported with the provider's own message.

use std::sync::Arc;

use serde::Serialize;
use url::Url;

use crate::error::{AuthRelayError, Result};
use crate::idp::pkce;
use crate::idp::{AuthorizationDetails, ConsentAction, IdentityProvider, ProviderSession};

/// Message shown when the consent URL carries no `authorization_id`
pub const MISSING_AUTHORIZATION_ID: &str = "Missing authorization_id parameter.";

/// Display name used when the provider does not name the client
pub const UNKNOWN_CLIENT_NAME: &str = "An application";

const NO_SESSION: &str = "No active session. Reload the consent page to sign in.";

/// Scopes shown when the provider reports none
pub fn default_scopes() -> Vec<String> {
    vec!["openid".to_string(), "email".to_string(), "profile".to_string()]
}

/// Checks the `authorization_id` query parameter
///
/// # Errors
///
/// Returns [`AuthRelayError::Protocol`] when it is missing or empty.
pub fn require_authorization_id(authorization_id: Option<&str>) -> Result<&str> {
    authorization_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AuthRelayError::Protocol(MISSING_AUTHORIZATION_ID.to_string()).into())
}

/// What the end user is asked to approve
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentDetails {
    pub authorization_id: String,
    pub client_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

impl ConsentDetails {
    fn from_provider(authorization_id: &str, details: AuthorizationDetails) -> Self {
        let client = details.client.unwrap_or_default();
        Self {
            authorization_id: authorization_id.to_string(),
            client_name: client
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNKNOWN_CLIENT_NAME.to_string()),
            client_id: client.client_id,
            scopes: details
                .scopes
                .filter(|s| !s.is_empty())
                .unwrap_or_else(default_scopes),
            redirect_uri: details.redirect_uri,
        }
    }
}

/// Where a consent page load ends up
#[derive(Debug, Clone)]
pub enum ConsentState {
    /// No usable session (none held, or the provider refused it): send the
    /// user to `login_url`, keeping `pkce_verifier` until they come back
    /// with a login code
    AwaitingLogin { login_url: Url, pkce_verifier: String },

    /// Show the details and wait for a decision
    ReadyForConsent(ConsentDetails),

    /// Show the message; nothing more happens on this load
    ErrorTerminal { message: String },
}

/// Result of submitting a decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// Provider accepted the decision and named the next hop
    Redirected(String),

    /// Provider accepted the decision without naming a next hop
    Submitted,

    /// Provider rejected the decision; the user may try again
    Failed { message: String },
}

/// Drives the consent flow against an [`IdentityProvider`]
#[derive(Clone)]
pub struct ConsentMediator {
    provider: Arc<dyn IdentityProvider>,
}

impl ConsentMediator {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Resolves a consent page load
    ///
    /// `consent_url` is the exact URL of this page; federated login returns
    /// there.
    pub async fn fetch(
        &self,
        authorization_id: &str,
        session_token: Option<&str>,
        consent_url: &str,
    ) -> ConsentState {
        let Some(session_token) = session_token.filter(|s| !s.is_empty()) else {
            tracing::info!(authorization_id, "No provider session, starting federated login");
            return self.start_login(consent_url);
        };

        match self
            .provider
            .authorization_details(session_token, authorization_id)
            .await
        {
            Ok(details) => {
                tracing::info!(authorization_id, "Showing consent details");
                ConsentState::ReadyForConsent(ConsentDetails::from_provider(
                    authorization_id,
                    details,
                ))
            }
            Err(e) => match e.downcast_ref::<AuthRelayError>() {
                Some(AuthRelayError::SessionRejected(reason)) => {
                    tracing::warn!(
                        authorization_id,
                        reason = %reason,
                        "Provider session rejected, starting federated login"
                    );
                    self.start_login(consent_url)
                }
                _ => {
                    tracing::error!(authorization_id, error = %e, "Failed to load authorization");
                    ConsentState::ErrorTerminal {
                        message: e.to_string(),
                    }
                }
            },
        }
    }

    fn start_login(&self, consent_url: &str) -> ConsentState {
        let pair = pkce::generate();
        match self.provider.login_url(consent_url, &pair) {
            Ok(login_url) => ConsentState::AwaitingLogin {
                login_url,
                pkce_verifier: pair.verifier,
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to build federated login URL");
                ConsentState::ErrorTerminal {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Redeems the code federated login returned with
    ///
    /// # Errors
    ///
    /// Returns the provider's error when the code or verifier is rejected.
    pub async fn complete_login(&self, auth_code: &str, code_verifier: &str) -> Result<ProviderSession> {
        let session = self
            .provider
            .exchange_login_code(auth_code, code_verifier)
            .await?;
        tracing::info!("Federated login completed");
        Ok(session)
    }

    /// Submits the user's decision
    pub async fn decide(
        &self,
        authorization_id: &str,
        session_token: Option<&str>,
        action: ConsentAction,
    ) -> DecisionOutcome {
        let Some(session_token) = session_token.filter(|s| !s.is_empty()) else {
            return DecisionOutcome::Failed {
                message: NO_SESSION.to_string(),
            };
        };

        match self
            .provider
            .submit_consent(session_token, authorization_id, action)
            .await
        {
            Ok(outcome) => match outcome.redirect_uri.filter(|u| !u.is_empty()) {
                Some(uri) => {
                    tracing::info!(authorization_id, action = action.as_str(), "Consent recorded");
                    DecisionOutcome::Redirected(uri)
                }
                None => {
                    tracing::info!(
                        authorization_id,
                        action = action.as_str(),
                        "Consent recorded without redirect"
                    );
                    DecisionOutcome::Submitted
                }
            },
            Err(e) => {
                tracing::error!(authorization_id, error = %e, "Consent submission failed");
                DecisionOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idp::pkce::PkceChallenge;
    use crate::idp::{ClientDescriptor, ConsentOutcome};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted provider recording the calls made against it
    #[derive(Default)]
    struct FakeProvider {
        details: Option<AuthorizationDetails>,
        outcome: Option<ConsentOutcome>,
        session_expired: bool,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        fn login_url(&self, redirect_to: &str, pkce: &PkceChallenge) -> Result<Url> {
            let mut url = Url::parse("https://idp.example.com/auth/v1/authorize")?;
            url.query_pairs_mut()
                .append_pair("redirect_to", redirect_to)
                .append_pair("code_challenge", &pkce.challenge);
            Ok(url)
        }

        async fn exchange_login_code(&self, auth_code: &str, _: &str) -> Result<ProviderSession> {
            self.calls.lock().unwrap().push(format!("exchange:{auth_code}"));
            Ok(ProviderSession {
                access_token: "session-1".to_string(),
                token_type: Some("bearer".to_string()),
                expires_in: Some(3600),
                refresh_token: None,
            })
        }

        async fn authorization_details(&self, _: &str, id: &str) -> Result<AuthorizationDetails> {
            self.calls.lock().unwrap().push(format!("details:{id}"));
            if self.session_expired {
                return Err(AuthRelayError::SessionRejected("token is expired".into()).into());
            }
            self.details
                .clone()
                .ok_or_else(|| AuthRelayError::Provider("authorization not found".into()).into())
        }

        async fn submit_consent(
            &self,
            _: &str,
            id: &str,
            action: ConsentAction,
        ) -> Result<ConsentOutcome> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("consent:{id}:{}", action.as_str()));
            self.outcome
                .clone()
                .ok_or_else(|| AuthRelayError::Provider("authorization expired".into()).into())
        }
    }

    fn mediator(provider: FakeProvider) -> (ConsentMediator, Arc<FakeProvider>) {
        let provider = Arc::new(provider);
        (ConsentMediator::new(provider.clone()), provider)
    }

    #[test]
    fn test_require_authorization_id() {
        assert_eq!(require_authorization_id(Some("a1")).unwrap(), "a1");
        let err = require_authorization_id(None).unwrap_err();
        assert!(err.to_string().contains(MISSING_AUTHORIZATION_ID));
        assert!(require_authorization_id(Some("")).is_err());
    }

    #[tokio::test]
    async fn test_fetch_without_session_awaits_login() {
        let (mediator, provider) = mediator(FakeProvider::default());
        let state = mediator
            .fetch("a1", None, "http://localhost:3000/oauth/consent?authorization_id=a1")
            .await;

        match state {
            ConsentState::AwaitingLogin {
                login_url,
                pkce_verifier,
            } => {
                let redirect_to = login_url
                    .query_pairs()
                    .find(|(k, _)| k == "redirect_to")
                    .map(|(_, v)| v.into_owned());
                assert_eq!(
                    redirect_to.as_deref(),
                    Some("http://localhost:3000/oauth/consent?authorization_id=a1")
                );
                assert_eq!(pkce_verifier.len(), 43);
            }
            other => panic!("expected AwaitingLogin, got {other:?}"),
        }
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_with_session_defaults_scopes() {
        let (mediator, _) = mediator(FakeProvider {
            details: Some(AuthorizationDetails {
                client: Some(ClientDescriptor {
                    name: Some("Chat App".to_string()),
                    client_id: Some("c1".to_string()),
                }),
                scopes: None,
                redirect_uri: None,
            }),
            ..Default::default()
        });

        match mediator.fetch("a1", Some("session-1"), "unused").await {
            ConsentState::ReadyForConsent(details) => {
                assert_eq!(details.client_name, "Chat App");
                assert_eq!(details.scopes, vec!["openid", "email", "profile"]);
            }
            other => panic!("expected ReadyForConsent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_unnamed_client() {
        let (mediator, _) = mediator(FakeProvider {
            details: Some(AuthorizationDetails::default()),
            ..Default::default()
        });

        match mediator.fetch("a1", Some("session-1"), "unused").await {
            ConsentState::ReadyForConsent(details) => {
                assert_eq!(details.client_name, UNKNOWN_CLIENT_NAME);
            }
            other => panic!("expected ReadyForConsent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_error_is_terminal_with_provider_message() {
        let (mediator, _) = mediator(FakeProvider::default());
        match mediator.fetch("a1", Some("session-1"), "unused").await {
            ConsentState::ErrorTerminal { message } => {
                assert_eq!(message, "authorization not found");
            }
            other => panic!("expected ErrorTerminal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_with_rejected_session_restarts_login() {
        let (mediator, provider) = mediator(FakeProvider {
            session_expired: true,
            ..Default::default()
        });

        let state = mediator
            .fetch("a1", Some("expired"), "http://localhost:3000/oauth/consent?authorization_id=a1")
            .await;

        assert!(matches!(state, ConsentState::AwaitingLogin { .. }));
        assert_eq!(*provider.calls.lock().unwrap(), vec!["details:a1"]);
    }

    #[tokio::test]
    async fn test_decide_follows_redirect() {
        let (mediator, provider) = mediator(FakeProvider {
            outcome: Some(ConsentOutcome {
                redirect_uri: Some("https://relay.example.com/oauth/callback?code=c".to_string()),
            }),
            ..Default::default()
        });

        let outcome = mediator
            .decide("a1", Some("session-1"), ConsentAction::Approve)
            .await;
        assert_eq!(
            outcome,
            DecisionOutcome::Redirected("https://relay.example.com/oauth/callback?code=c".to_string())
        );
        assert_eq!(*provider.calls.lock().unwrap(), vec!["consent:a1:approve"]);
    }

    #[tokio::test]
    async fn test_decide_without_redirect_is_submitted() {
        let (mediator, _) = mediator(FakeProvider {
            outcome: Some(ConsentOutcome::default()),
            ..Default::default()
        });
        let outcome = mediator.decide("a1", Some("session-1"), ConsentAction::Deny).await;
        assert_eq!(outcome, DecisionOutcome::Submitted);
    }

    #[tokio::test]
    async fn test_decide_failure_carries_provider_message() {
        let (mediator, _) = mediator(FakeProvider::default());
        let outcome = mediator.decide("a1", Some("session-1"), ConsentAction::Approve).await;
        assert_eq!(
            outcome,
            DecisionOutcome::Failed {
                message: "authorization expired".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_decide_without_session_never_calls_provider() {
        let (mediator, provider) = mediator(FakeProvider::default());
        let outcome = mediator.decide("a1", None, ConsentAction::Approve).await;
        assert!(matches!(outcome, DecisionOutcome::Failed { .. }));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_login_returns_session() {
        let (mediator, provider) = mediator(FakeProvider::default());
        let session = mediator.complete_login("login-code", "verifier").await.unwrap();
        assert_eq!(session.access_token, "session-1");
        assert_eq!(*provider.calls.lock().unwrap(), vec!["exchange:login-code"]);
    }
}
