//! PKCE S256 pairs for the consent mediator's federated login
//!
//! When the consent mediator finds no provider session it sends the end user
//! through the provider's federated login. That login returns a one-time
//! code which is only redeemable together with the verifier whose S256
//! challenge went out on the login URL (RFC 7636). The verifier travels in a
//! short-lived cookie between the two hops.

use base64::Engine as _;
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// PkceChallenge
// ---------------------------------------------------------------------------

/// A PKCE verifier and its derived S256 challenge
///
/// # Examples
///
/// ```
/// use authrelay::idp::pkce::{generate, s256_challenge};
///
/// let pkce = generate();
/// assert_eq!(pkce.method, "s256");
/// assert_eq!(pkce.verifier.len(), 43);
/// assert_eq!(s256_challenge(&pkce.verifier), pkce.challenge);
/// ```
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// 32 random bytes, base64url-encoded without padding (43 characters)
    pub verifier: String,

    /// base64url(SHA-256(verifier)), sent on the login URL
    pub challenge: String,

    /// Challenge method in the spelling the provider's login endpoint
    /// expects
    pub method: String,
}

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

/// Generates a fresh PKCE pair
pub fn generate() -> PkceChallenge {
    use rand::RngCore as _;

    let mut random_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut random_bytes);

    let verifier = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes);
    let challenge = s256_challenge(&verifier);

    PkceChallenge {
        verifier,
        challenge,
        method: "s256".to_string(),
    }
}

/// Computes the S256 challenge of `verifier`
///
/// `BASE64URL(SHA256(ASCII(code_verifier)))` per RFC 7636 section 4.2.
pub fn s256_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
