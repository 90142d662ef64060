//! Remote JSON Web Key Set fetching and caching
//!
//! [`RemoteKeySet`] is the relay's handle on the identity provider's signing
//! keys. It is built once, shared by every verification call, and refreshes
//! its cached copy of the key set on its own:
//!
//! - the set is fetched lazily on first use;
//! - a cached set older than the maximum cache age is re-fetched;
//! - a token naming a `kid` missing from the cached set triggers one
//!   re-fetch, at most once per cooldown window, to pick up rotated keys.
//!
//! Only asymmetric signing keys are ever handed out. A key is a candidate
//! for a token when its `kid` matches (if the token names one), it is not
//! marked for encryption, and its key type fits the token's algorithm.

use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey, Header};
use tokio::sync::RwLock;
use url::Url;

use crate::error::{AuthRelayError, Result};

/// How long a fetched key set is trusted before it is re-fetched
pub const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_secs(600);

/// Minimum spacing between re-fetches triggered by an unknown `kid`
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Cached handle on the identity provider's remote key set
pub struct RemoteKeySet {
    http: reqwest::Client,
    jwks_url: Url,
    cache: RwLock<Option<CachedKeys>>,
    cache_max_age: Duration,
    cooldown: Duration,
}

impl RemoteKeySet {
    /// Creates a handle for the key set published at `jwks_url`
    ///
    /// Nothing is fetched until the first call to [`Self::candidate_keys`].
    pub fn new(http: reqwest::Client, jwks_url: Url) -> Self {
        Self {
            http,
            jwks_url,
            cache: RwLock::new(None),
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    /// Overrides the cache age and unknown-`kid` cooldown
    #[must_use]
    pub fn with_timing(mut self, cache_max_age: Duration, cooldown: Duration) -> Self {
        self.cache_max_age = cache_max_age;
        self.cooldown = cooldown;
        self
    }

    pub fn jwks_url(&self) -> &Url {
        &self.jwks_url
    }

    /// Returns the decoding keys that may have signed a token with `header`
    ///
    /// # Errors
    ///
    /// Returns [`AuthRelayError::Verification`] when the algorithm is not an
    /// asymmetric signature algorithm or no key in the set fits, and
    /// [`AuthRelayError::Http`] when the key set cannot be fetched.
    pub async fn candidate_keys(&self, header: &Header) -> Result<Vec<DecodingKey>> {
        if !is_asymmetric(header.alg) {
            return Err(AuthRelayError::Verification(format!(
                "unsupported token algorithm {:?}",
                header.alg
            ))
            .into());
        }

        if self.is_stale().await {
            self.refresh().await?;
        }

        let keys = self.select(header).await;
        if !keys.is_empty() {
            return Ok(keys);
        }

        if header.kid.is_some() && self.cooldown_elapsed().await {
            tracing::debug!(jwks_url = %self.jwks_url, "Unknown key id, re-fetching key set");
            self.refresh().await?;
            let keys = self.select(header).await;
            if !keys.is_empty() {
                return Ok(keys);
            }
        }

        Err(AuthRelayError::Verification("no matching key in key set".to_string()).into())
    }

    /// Fetches the key set and replaces the cached copy
    pub async fn refresh(&self) -> Result<()> {
        let keys = self.fetch().await?;
        let mut cache = self.cache.write().await;
        *cache = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
        Ok(())
    }

    async fn is_stale(&self) -> bool {
        match &*self.cache.read().await {
            Some(cached) => cached.fetched_at.elapsed() > self.cache_max_age,
            None => true,
        }
    }

    async fn cooldown_elapsed(&self) -> bool {
        match &*self.cache.read().await {
            Some(cached) => cached.fetched_at.elapsed() >= self.cooldown,
            None => true,
        }
    }

    async fn select(&self, header: &Header) -> Vec<DecodingKey> {
        let cache = self.cache.read().await;
        let Some(cached) = cache.as_ref() else {
            return Vec::new();
        };

        cached
            .keys
            .keys
            .iter()
            .filter(|jwk| match &header.kid {
                Some(kid) => jwk.common.key_id.as_deref() == Some(kid.as_str()),
                None => true,
            })
            .filter(|jwk| !matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)))
            .filter(|jwk| key_fits_algorithm(jwk, header.alg))
            .filter_map(|jwk| match DecodingKey::from_jwk(jwk) {
                Ok(key) => Some(key),
                Err(e) => {
                    tracing::debug!(kid = ?jwk.common.key_id, error = %e, "Skipping unusable JWK");
                    None
                }
            })
            .collect()
    }

    async fn fetch(&self) -> Result<JwkSet> {
        tracing::debug!(jwks_url = %self.jwks_url, "Fetching signing key set");

        let resp = self.http.get(self.jwks_url.clone()).send().await?;

        if !resp.status().is_success() {
            return Err(AuthRelayError::Verification(format!(
                "key set endpoint returned {}",
                resp.status()
            ))
            .into());
        }

        let keys: JwkSet = resp.json().await?;
        Ok(keys)
    }
}

fn is_asymmetric(alg: Algorithm) -> bool {
    !matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// Returns true if `jwk` can verify signatures made with `alg`
fn key_fits_algorithm(jwk: &Jwk, alg: Algorithm) -> bool {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => matches!(
            alg,
            Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512
        ),
        AlgorithmParameters::EllipticCurve(params) => matches!(
            (alg, &params.curve),
            (Algorithm::ES256, EllipticCurve::P256) | (Algorithm::ES384, EllipticCurve::P384)
        ),
        AlgorithmParameters::OctetKeyPair(params) => {
            alg == Algorithm::EdDSA && params.curve == EllipticCurve::Ed25519
        }
        AlgorithmParameters::OctetKey(_) => false,
    }
}
