//! HTTP client for GoTrue-compatible identity providers
//!
//! All calls go to `<base url>/auth/v1`. Calls made on behalf of an end user
//! carry the public `apikey` header and the user's session as a bearer
//! token.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::config::IdentityProviderConfig;
use crate::error::{AuthRelayError, Result};
use crate::idp::pkce::PkceChallenge;
use crate::idp::{
    AuthorizationDetails, ConsentAction, ConsentOutcome, IdentityProvider, ProviderSession,
};

/// Error-body fields that carry a human-readable message, in the order
/// they are preferred
const ERROR_MESSAGE_FIELDS: [&str; 4] = ["error_description", "msg", "message", "error"];

/// GoTrue API client
///
/// # Examples
///
/// ```
/// use authrelay::config::IdentityProviderConfig;
/// use authrelay::idp::GoTrueClient;
///
/// let config = IdentityProviderConfig {
///     base_url: Some("https://xyz.supabase.co/".to_string()),
///     anon_key: Some("anon".to_string()),
///     ..Default::default()
/// };
///
/// let client = GoTrueClient::new(reqwest::Client::new(), &config).unwrap();
/// assert_eq!(client.auth_base(), "https://xyz.supabase.co/auth/v1");
/// ```
#[derive(Debug, Clone)]
pub struct GoTrueClient {
    http: reqwest::Client,
    auth_base: String,
    anon_key: Option<String>,
    login_provider: String,
}

impl GoTrueClient {
    /// Creates a client for the configured provider
    ///
    /// # Errors
    ///
    /// Returns [`AuthRelayError::Config`] when no base URL is configured. A
    /// missing anonymous key is reported by the calls that need it.
    pub fn new(http: reqwest::Client, config: &IdentityProviderConfig) -> Result<Self> {
        Ok(Self {
            http,
            auth_base: config.issuer()?,
            anon_key: config.anon_key.clone().filter(|k| !k.is_empty()),
            login_provider: config.login_provider.clone(),
        })
    }

    /// Root of the provider's auth API, without a trailing slash
    pub fn auth_base(&self) -> &str {
        &self.auth_base
    }

    fn anon_key(&self) -> Result<&str> {
        self.anon_key.as_deref().ok_or_else(|| {
            AuthRelayError::Config("AUTHRELAY_IDP_ANON_KEY is not configured".to_string()).into()
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}{}", self.auth_base, path))?)
    }

    fn authorization_endpoint(&self, authorization_id: &str, suffix: &str) -> Result<Url> {
        let mut url = self.endpoint("/oauth/authorizations")?;
        url.path_segments_mut()
            .map_err(|_| AuthRelayError::Config("identity provider URL cannot be a base".into()))?
            .push(authorization_id);
        if !suffix.is_empty() {
            url.path_segments_mut()
                .map_err(|_| {
                    AuthRelayError::Config("identity provider URL cannot be a base".into())
                })?
                .push(suffix);
        }
        Ok(url)
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    fn login_url(&self, redirect_to: &str, pkce: &PkceChallenge) -> Result<Url> {
        let mut url = self.endpoint("/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", &self.login_provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", &pkce.method);
        Ok(url)
    }

    async fn exchange_login_code(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<ProviderSession> {
        let mut url = self.endpoint("/token")?;
        url.query_pairs_mut().append_pair("grant_type", "pkce");

        tracing::debug!("Exchanging federated login code for a provider session");

        let resp = self
            .http
            .post(url)
            .header("apikey", self.anon_key()?)
            .json(&serde_json::json!({
                "auth_code": auth_code,
                "code_verifier": code_verifier,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(provider_error(resp).await);
        }

        Ok(resp.json().await?)
    }

    async fn authorization_details(
        &self,
        session_token: &str,
        authorization_id: &str,
    ) -> Result<AuthorizationDetails> {
        let url = self.authorization_endpoint(authorization_id, "")?;

        tracing::debug!(authorization_id, "Fetching authorization details");

        let resp = self
            .http
            .get(url)
            .header("apikey", self.anon_key()?)
            .bearer_auth(session_token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(provider_error(resp).await);
        }

        Ok(resp.json().await?)
    }

    async fn submit_consent(
        &self,
        session_token: &str,
        authorization_id: &str,
        action: ConsentAction,
    ) -> Result<ConsentOutcome> {
        let url = self.authorization_endpoint(authorization_id, "consent")?;

        tracing::debug!(authorization_id, action = action.as_str(), "Submitting consent");

        let resp = self
            .http
            .post(url)
            .header("apikey", self.anon_key()?)
            .bearer_auth(session_token)
            .json(&serde_json::json!({ "action": action }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(provider_error(resp).await);
        }

        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(ConsentOutcome::default());
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Turns a non-success provider response into an error carrying the
/// provider's message
///
/// `401` and `403` mean the session token was refused and map to
/// [`AuthRelayError::SessionRejected`]; everything else is
/// [`AuthRelayError::Provider`].
async fn provider_error(resp: reqwest::Response) -> anyhow::Error {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    rejection(status, &body).into()
}

fn rejection(status: StatusCode, body: &str) -> AuthRelayError {
    let message = error_message(body)
        .unwrap_or_else(|| format!("identity provider returned {status}"));

    tracing::debug!(%status, "Identity provider rejected request");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AuthRelayError::SessionRejected(message),
        _ => AuthRelayError::Provider(message),
    }
}

/// Extracts the human-readable message from a provider error body
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ERROR_MESSAGE_FIELDS.iter().find_map(|field| {
        value
            .get(field)
            .and_then(Value::as_str)
            .filter(|msg| !msg.is_empty())
            .map(str::to_string)
    })
}
