//! Bearer-token authentication
//!
//! The relay is a verifying relying party: it never issues tokens, it only
//! checks the ones the identity provider signed.
//!
//! # Module Layout
//!
//! - [`claims`]     -- token claims and the normalized [`AuthContext`]
//! - [`jwks`]       -- remote key-set fetching and caching
//! - [`middleware`] -- axum middleware and extractors exposing the context
//! - [`verifier`]   -- the verification pipeline itself

pub mod claims;
pub mod jwks;
pub mod middleware;
pub mod verifier;

pub use claims::{AuthContext, AuthExtra, TokenClaims};
pub use middleware::{BearerAuthState, MaybeAuth, RequireAuth};
pub use verifier::TokenVerifier;
