//! Authorize initiator
//!
//! Takes a validated [`AuthorizationRequest`] and the end user's decision
//! and produces the next URL:
//!
//! - approve: the provider's `/auth/v1/authorize` endpoint, carrying every
//!   client parameter unchanged plus defaults for `response_type` and
//!   `scope`
//! - deny: the client's own `redirect_uri` with an `access_denied` error;
//!   the provider is never contacted

use serde::Deserialize;
use url::Url;

use crate::config::IdentityProviderConfig;
use crate::error::Result;
use crate::relay::params::AuthorizationRequest;
use crate::relay::set_query_params;

pub const ACCESS_DENIED: &str = "access_denied";
pub const ACCESS_DENIED_DESCRIPTION: &str = "User denied access";

/// End-user decision at the authorize prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizeDecision {
    Approve,
    Deny,
}

/// Resolves a decision into the URL the end user is sent to
///
/// # Errors
///
/// Returns an error when the client's `redirect_uri` cannot be parsed (deny)
/// or the provider is not configured (approve).
pub fn resolve_decision(
    idp: &IdentityProviderConfig,
    request: &AuthorizationRequest,
    decision: AuthorizeDecision,
) -> Result<Url> {
    match decision {
        AuthorizeDecision::Approve => provider_authorize_url(idp, request),
        AuthorizeDecision::Deny => denial_redirect_url(request),
    }
}

/// Provider authorize URL for an approved request
///
/// # Errors
///
/// Returns [`AuthRelayError::Config`](crate::error::AuthRelayError::Config)
/// when the provider URL or its anonymous key is not configured.
///
/// # Examples
///
/// ```
/// use authrelay::config::IdentityProviderConfig;
/// use authrelay::relay::authorize::provider_authorize_url;
/// use authrelay::relay::params::AuthorizationRequestParams;
///
/// let idp = IdentityProviderConfig {
///     base_url: Some("https://idp.example.com".to_string()),
///     anon_key: Some("anon".to_string()),
///     ..Default::default()
/// };
/// let request = AuthorizationRequestParams {
///     client_id: Some("c1".to_string()),
///     redirect_uri: Some("https://client.example.com/cb".to_string()),
///     ..Default::default()
/// }
/// .validate()
/// .unwrap();
///
/// let url = provider_authorize_url(&idp, &request).unwrap();
/// assert!(url.as_str().starts_with("https://idp.example.com/auth/v1/authorize?client_id=c1"));
/// ```
pub fn provider_authorize_url(
    idp: &IdentityProviderConfig,
    request: &AuthorizationRequest,
) -> Result<Url> {
    let issuer = idp.issuer()?;
    idp.require_anon_key()?;

    let mut url = Url::parse(&format!("{issuer}/authorize"))?;

    let mut params = vec![
        ("client_id", request.client_id.as_str()),
        ("redirect_uri", request.redirect_uri.as_str()),
        ("response_type", request.response_type_or_default()),
        ("scope", request.scope_or_default()),
    ];
    if let Some(state) = &request.state {
        params.push(("state", state.as_str()));
    }
    if let Some(challenge) = &request.code_challenge {
        params.push(("code_challenge", challenge.as_str()));
    }
    if let Some(method) = &request.code_challenge_method {
        params.push(("code_challenge_method", method.as_str()));
    }

    set_query_params(&mut url, &params);
    Ok(url)
}

/// Client redirect carrying an `access_denied` error
///
/// # Errors
///
/// Returns [`AuthRelayError::Url`](crate::error::AuthRelayError::Url) when
/// the client's `redirect_uri` is not an absolute URL.
pub fn denial_redirect_url(request: &AuthorizationRequest) -> Result<Url> {
    let mut url = Url::parse(&request.redirect_uri)?;

    let mut params = vec![
        ("error", ACCESS_DENIED),
        ("error_description", ACCESS_DENIED_DESCRIPTION),
    ];
    if let Some(state) = &request.state {
        params.push(("state", state.as_str()));
    }

    set_query_params(&mut url, &params);
    Ok(url)
}
