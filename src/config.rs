//! Configuration management for authrelay
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{AuthRelayError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Path segment under which the identity provider exposes its auth API
pub const IDP_AUTH_PATH: &str = "/auth/v1";

/// Redirect target used by the callback receiver when none is configured
pub const DEFAULT_CALLBACK_REDIRECT_URI: &str =
    "https://chatgpt.com/connector_platform_oauth_redirect";

/// Main configuration structure for authrelay
///
/// Holds the identity-provider coordinates, the relay's redirect target,
/// and the HTTP server settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Identity provider settings
    #[serde(default)]
    pub identity_provider: IdentityProviderConfig,
    /// OAuth relay settings
    #[serde(default)]
    pub relay: RelayConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProviderConfig {
    /// Base URL of the identity provider (e.g. `https://xyz.supabase.co`)
    ///
    /// Required. Its absence is a fatal misconfiguration for token
    /// verification and for every relay stage that talks to the provider.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Public (anonymous) API key sent as the `apikey` header on provider
    /// API calls made on behalf of an end user
    #[serde(default)]
    pub anon_key: Option<String>,

    /// Federated login provider used when the consent mediator finds no
    /// session
    #[serde(default = "default_login_provider")]
    pub login_provider: String,
}

fn default_login_provider() -> String {
    "google".to_string()
}

impl Default for IdentityProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            anon_key: None,
            login_provider: default_login_provider(),
        }
    }
}

impl IdentityProviderConfig {
    /// Returns the configured base URL without a trailing slash
    ///
    /// # Errors
    ///
    /// Returns [`AuthRelayError::Config`] when no base URL is configured.
    pub fn require_base_url(&self) -> Result<String> {
        match self.base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url.trim_end_matches('/').to_string()),
            _ => Err(AuthRelayError::Config("AUTHRELAY_IDP_URL is not configured".to_string()).into()),
        }
    }

    /// Returns the configured anonymous API key
    ///
    /// # Errors
    ///
    /// Returns [`AuthRelayError::Config`] when no key is configured.
    pub fn require_anon_key(&self) -> Result<String> {
        match self.anon_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key.to_string()),
            _ => Err(
                AuthRelayError::Config("AUTHRELAY_IDP_ANON_KEY is not configured".to_string())
                    .into(),
            ),
        }
    }

    /// Issuer the provider stamps into the tokens it signs
    ///
    /// Always `<base_url>/auth/v1`; verification compares the `iss` claim
    /// against this value exactly.
    pub fn issuer(&self) -> Result<String> {
        Ok(format!("{}{}", self.require_base_url()?, IDP_AUTH_PATH))
    }

    /// Well-known location of the provider's JSON Web Key Set
    pub fn jwks_url(&self) -> Result<Url> {
        let raw = format!("{}/.well-known/jwks.json", self.issuer()?);
        Url::parse(&raw).map_err(|e| {
            AuthRelayError::Config(format!("invalid identity provider URL {raw}: {e}")).into()
        })
    }
}

/// OAuth relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Fixed third-party redirect target for the callback receiver
    ///
    /// The callback always redirects here, never to the dynamic
    /// `redirect_uri` supplied at the authorize step.
    #[serde(default = "default_callback_redirect_uri")]
    pub callback_redirect_uri: String,
}

fn default_callback_redirect_uri() -> String {
    DEFAULT_CALLBACK_REDIRECT_URI.to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            callback_redirect_uri: default_callback_redirect_uri(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the server listens on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Externally visible base URL of this service
    ///
    /// Used for protected-resource metadata and to rebuild the exact
    /// consent URL the identity provider should return to after login.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Whether session cookies carry the `Secure` attribute
    #[serde(default)]
    pub secure_cookies: bool,
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            public_url: default_public_url(),
            secure_cookies: false,
        }
    }
}

impl ServerConfig {
    /// Public URL without a trailing slash
    pub fn public_base(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AuthRelayError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| AuthRelayError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("AUTHRELAY_IDP_URL") {
            self.identity_provider.base_url = Some(base_url);
        }

        if let Ok(anon_key) = std::env::var("AUTHRELAY_IDP_ANON_KEY") {
            self.identity_provider.anon_key = Some(anon_key);
        }

        if let Ok(login_provider) = std::env::var("AUTHRELAY_IDP_LOGIN_PROVIDER") {
            self.identity_provider.login_provider = login_provider;
        }

        if let Ok(redirect_uri) = std::env::var("AUTHRELAY_CALLBACK_REDIRECT_URI") {
            self.relay.callback_redirect_uri = redirect_uri;
        }

        if let Ok(bind) = std::env::var("AUTHRELAY_BIND_ADDRESS") {
            self.server.bind_address = bind;
        }

        if let Ok(public_url) = std::env::var("AUTHRELAY_PUBLIC_URL") {
            self.server.public_url = public_url;
        }

        if let Ok(secure) = std::env::var("AUTHRELAY_SECURE_COOKIES") {
            match secure.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.server.secure_cookies = true,
                "0" | "false" | "no" => self.server.secure_cookies = false,
                other => {
                    tracing::warn!("Ignoring invalid AUTHRELAY_SECURE_COOKIES value: {}", other)
                }
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let crate::cli::Commands::Serve { bind: Some(bind) } = &cli.command {
            self.server.bind_address = bind.clone();
        }
    }

    /// Validate the configuration
    ///
    /// Checks that every configured URL parses and that the server has an
    /// address to bind. The identity provider URL may still be absent here;
    /// the components that need it report that when they are built.
    ///
    /// # Returns
    ///
    /// Returns Ok if configuration is valid
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if let Some(base_url) = &self.identity_provider.base_url {
            Url::parse(base_url).map_err(|e| {
                AuthRelayError::Config(format!("identity_provider.base_url is invalid: {e}"))
            })?;
        }

        if self.identity_provider.login_provider.trim().is_empty() {
            return Err(AuthRelayError::Config(
                "identity_provider.login_provider cannot be empty".to_string(),
            )
            .into());
        }

        Url::parse(&self.relay.callback_redirect_uri).map_err(|e| {
            AuthRelayError::Config(format!("relay.callback_redirect_uri is invalid: {e}"))
        })?;

        Url::parse(&self.server.public_url)
            .map_err(|e| AuthRelayError::Config(format!("server.public_url is invalid: {e}")))?;

        if self.server.bind_address.trim().is_empty() {
            return Err(
                AuthRelayError::Config("server.bind_address cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}
