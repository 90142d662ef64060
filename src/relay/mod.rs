//! OAuth authorization-code relay
//!
//! Three stages sit between the third-party client and the identity
//! provider:
//!
//! - [`authorize`] -- forwards the client's request to the provider, or
//!   sends a denial straight back to the client
//! - [`consent`]   -- makes sure the end user is signed in with the
//!   provider, shows what is being granted, and submits the decision
//! - [`callback`]  -- relays the provider's code or error to the fixed
//!   third-party redirect target
//!
//! Every stage is stateless; the provider owns the pending authorization.

pub mod authorize;
pub mod callback;
pub mod consent;
pub mod params;

use url::Url;

/// Sets query parameters on `url`, replacing any existing values for the
/// same keys and leaving the rest of the query intact
pub(crate) fn set_query_params(url: &mut Url, params: &[(&str, &str)]) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .into_owned()
        .filter(|(key, _)| !params.iter().any(|(k, _)| k == key))
        .collect();

    let mut query = url.query_pairs_mut();
    query.clear();
    for (key, value) in &kept {
        query.append_pair(key, value);
    }
    for (key, value) in params {
        query.append_pair(key, value);
    }
}
