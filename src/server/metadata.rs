//! OAuth 2.0 Protected Resource Metadata (RFC 9728)
//!
//! Clients discover which authorization server protects the relay's
//! resources from this document, usually after following the
//! `resource_metadata` parameter of a `401` challenge.

use serde::{Deserialize, Serialize};

use crate::auth::claims::GRANTED_SCOPES;
use crate::config::Config;
use crate::error::Result;

/// Well-known path the metadata document is served from
pub const PROTECTED_RESOURCE_PATH: &str = "/.well-known/oauth-protected-resource";

/// Metadata describing this relay as a protected resource
///
/// # Examples
///
/// ```
/// use authrelay::config::Config;
/// use authrelay::server::metadata::ProtectedResourceMetadata;
///
/// let mut config = Config::default();
/// config.identity_provider.base_url = Some("https://idp.example.com".to_string());
///
/// let meta = ProtectedResourceMetadata::from_config(&config).unwrap();
/// assert_eq!(meta.resource, "http://localhost:3000");
/// assert_eq!(meta.authorization_servers, vec!["https://idp.example.com/auth/v1"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    /// Public URL of this relay
    pub resource: String,

    /// Issuers whose tokens this relay accepts
    pub authorization_servers: Vec<String>,

    pub scopes_supported: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_documentation: Option<String>,
}

impl ProtectedResourceMetadata {
    /// Builds the document from configuration
    ///
    /// # Errors
    ///
    /// Returns [`AuthRelayError::Config`](crate::error::AuthRelayError::Config)
    /// when the identity provider URL is not configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let issuer = config.identity_provider.issuer()?;
        let base = config.server.public_base();

        Ok(Self {
            resource: base.to_string(),
            authorization_servers: vec![issuer],
            scopes_supported: GRANTED_SCOPES.iter().map(|s| s.to_string()).collect(),
            resource_documentation: Some(format!("{base}/docs")),
        })
    }
}

/// Absolute URL of the metadata document for a given public base URL
pub fn resource_metadata_url(public_base: &str) -> String {
    format!("{}{}", public_base.trim_end_matches('/'), PROTECTED_RESOURCE_PATH)
}
