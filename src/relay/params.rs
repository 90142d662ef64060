//! OAuth parameters carried across relay hops

use serde::{Deserialize, Serialize};

use crate::error::{AuthRelayError, Result};

/// Scope requested from the provider when the client asked for none
pub const DEFAULT_SCOPE: &str = "openid email profile";

/// Response type requested from the provider when the client asked for none
pub const DEFAULT_RESPONSE_TYPE: &str = "code";

/// Message shown when a client omits `client_id` or `redirect_uri`
pub const MISSING_AUTHORIZE_PARAMS: &str =
    "Missing required OAuth parameters (client_id or redirect_uri).";

/// Raw authorize parameters as received from the client
///
/// Every field is optional at this stage; [`Self::validate`] enforces the
/// mandatory ones. Empty values count as absent. Serialized, it is the set
/// of form fields the decision post must carry back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequestParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,
}

/// Authorize request with its mandatory parameters present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub response_type: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl AuthorizationRequestParams {
    /// Checks for `client_id` and `redirect_uri`
    ///
    /// # Errors
    ///
    /// Returns [`AuthRelayError::Protocol`] when either is missing or empty.
    pub fn validate(self) -> Result<AuthorizationRequest> {
        match (present(self.client_id), present(self.redirect_uri)) {
            (Some(client_id), Some(redirect_uri)) => Ok(AuthorizationRequest {
                client_id,
                redirect_uri,
                response_type: present(self.response_type),
                scope: present(self.scope),
                state: present(self.state),
                code_challenge: present(self.code_challenge),
                code_challenge_method: present(self.code_challenge_method),
            }),
            _ => Err(AuthRelayError::Protocol(MISSING_AUTHORIZE_PARAMS.to_string()).into()),
        }
    }
}

impl From<&AuthorizationRequest> for AuthorizationRequestParams {
    fn from(request: &AuthorizationRequest) -> Self {
        Self {
            client_id: Some(request.client_id.clone()),
            redirect_uri: Some(request.redirect_uri.clone()),
            response_type: request.response_type.clone(),
            scope: request.scope.clone(),
            state: request.state.clone(),
            code_challenge: request.code_challenge.clone(),
            code_challenge_method: request.code_challenge_method.clone(),
        }
    }
}

impl AuthorizationRequest {
    /// Scopes the client asked for, split on spaces; empty when none
    pub fn requested_scopes(&self) -> Vec<String> {
        self.scope
            .as_deref()
            .map(|s| s.split(' ').filter(|s| !s.is_empty()).map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn response_type_or_default(&self) -> &str {
        self.response_type.as_deref().unwrap_or(DEFAULT_RESPONSE_TYPE)
    }

    pub fn scope_or_default(&self) -> &str {
        self.scope.as_deref().unwrap_or(DEFAULT_SCOPE)
    }
}

/// Query of the provider's redirect back to the relay
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Outcome the provider reported on its redirect back to the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResult {
    Code {
        code: String,
        state: Option<String>,
    },
    Error {
        error: String,
        error_description: Option<String>,
        state: Option<String>,
    },
}

impl CallbackResult {
    /// Classifies a callback query; an `error` wins over a `code`
    ///
    /// # Errors
    ///
    /// Returns [`AuthRelayError::Protocol`] with `Missing authorization code`
    /// when the query carries neither.
    pub fn from_query(query: CallbackQuery) -> Result<Self> {
        let state = present(query.state);

        if let Some(error) = present(query.error) {
            return Ok(CallbackResult::Error {
                error,
                error_description: present(query.error_description),
                state,
            });
        }

        match present(query.code) {
            Some(code) => Ok(CallbackResult::Code { code, state }),
            None => {
                Err(AuthRelayError::Protocol("Missing authorization code".to_string()).into())
            }
        }
    }

    pub fn state(&self) -> Option<&str> {
        match self {
            CallbackResult::Code { state, .. } | CallbackResult::Error { state, .. } => {
                state.as_deref()
            }
        }
    }
}
