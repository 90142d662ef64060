//! Token claims and the verified auth context
//!
//! [`TokenClaims`] is the decoded payload of an identity-provider access
//! token. [`AuthContext`] is what the relay hands to request handlers once a
//! token has passed verification and the OAuth claims gate.

use serde::{Deserialize, Serialize};

/// Scopes granted to every verified OAuth token
///
/// The relay authenticates but does not authorize per scope, so the set is
/// fixed and independent of any `scope` claim in the token.
pub const GRANTED_SCOPES: [&str; 3] = ["openid", "email", "profile"];

/// Decoded access-token payload as issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user) identifier
    pub sub: String,

    /// Issuer URL
    pub iss: String,

    /// Issued-at, seconds since the epoch
    #[serde(default)]
    pub iat: i64,

    /// Expiry, seconds since the epoch
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Explicit user id, preferred over `sub` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// OAuth client the token was issued to
    ///
    /// Only tokens minted through the OAuth flow carry this claim; its
    /// presence is what separates them from ordinary session tokens signed
    /// with the same keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Authentication assurance level (e.g. `aal1`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aal: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Normalized identity fields carried by an [`AuthContext`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthExtra {
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Explicit `user_id` claim when present, otherwise the subject
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Verified identity attached to a single inbound request
///
/// Produced only by
/// [`TokenVerifier::verify`](crate::auth::verifier::TokenVerifier::verify);
/// request handlers read it and never mutate it.
///
/// # Examples
///
/// ```
/// use authrelay::auth::claims::{AuthContext, TokenClaims};
///
/// let claims = TokenClaims {
///     sub: "u1".to_string(),
///     iss: "https://idp.example.com/auth/v1".to_string(),
///     iat: 0,
///     exp: 4_102_444_800,
///     email: None,
///     role: None,
///     user_id: None,
///     client_id: Some("c1".to_string()),
///     aal: None,
///     session_id: None,
/// };
///
/// let ctx = AuthContext::from_claims("raw-token", claims).unwrap();
/// assert_eq!(ctx.client_id, "c1");
/// assert_eq!(ctx.extra.user_id, "u1");
/// assert_eq!(ctx.scopes, vec!["openid", "email", "profile"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    pub token: String,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub expires_at: i64,
    pub extra: AuthExtra,
}

impl AuthContext {
    /// Builds the context from verified claims
    ///
    /// Returns `None` when the claims carry no `client_id`, i.e. the token
    /// was not issued through the OAuth flow.
    pub fn from_claims(token: &str, claims: TokenClaims) -> Option<Self> {
        let client_id = claims.client_id.filter(|id| !id.is_empty())?;

        let user_id = claims
            .user_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| claims.sub.clone());

        Some(Self {
            token: token.to_string(),
            client_id,
            scopes: GRANTED_SCOPES.iter().map(|s| s.to_string()).collect(),
            expires_at: claims.exp,
            extra: AuthExtra {
                sub: claims.sub,
                email: claims.email,
                user_id,
                role: claims.role,
                session_id: claims.session_id,
            },
        })
    }

    /// The authenticated user's normalized identity
    pub fn user(&self) -> &AuthExtra {
        &self.extra
    }

    /// Returns true if the context grants `scope`
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}
