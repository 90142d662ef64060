//! Callback receiver
//!
//! The provider redirects here after the consent step. The result is passed
//! on to the fixed third-party redirect target, never to a URL taken from
//! the request.

use url::Url;

use crate::error::Result;
use crate::relay::params::CallbackResult;
use crate::relay::set_query_params;

/// Builds the redirect to `target` carrying the callback result
///
/// `state` is copied through unmodified whenever the provider sent one.
///
/// # Errors
///
/// Returns an error when `target` is not an absolute URL.
pub fn callback_redirect_url(target: &str, result: &CallbackResult) -> Result<Url> {
    let mut url = Url::parse(target)?;

    let mut params: Vec<(&str, &str)> = Vec::new();
    match result {
        CallbackResult::Code { code, .. } => params.push(("code", code.as_str())),
        CallbackResult::Error {
            error,
            error_description,
            ..
        } => {
            params.push(("error", error.as_str()));
            if let Some(description) = error_description {
                params.push(("error_description", description.as_str()));
            }
        }
    }
    if let Some(state) = result.state() {
        params.push(("state", state));
    }

    set_query_params(&mut url, &params);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CALLBACK_REDIRECT_URI;

    #[test]
    fn test_code_with_state() {
        let url = callback_redirect_url(
            DEFAULT_CALLBACK_REDIRECT_URI,
            &CallbackResult::Code {
                code: "xyz".to_string(),
                state: Some("s1".to_string()),
            },
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://chatgpt.com/connector_platform_oauth_redirect?code=xyz&state=s1"
        );
    }

    #[test]
    fn test_error_without_state() {
        let url = callback_redirect_url(
            DEFAULT_CALLBACK_REDIRECT_URI,
            &CallbackResult::Error {
                error: "access_denied".to_string(),
                error_description: None,
                state: None,
            },
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://chatgpt.com/connector_platform_oauth_redirect?error=access_denied"
        );
    }

    #[test]
    fn test_error_with_description_and_state() {
        let url = callback_redirect_url(
            "https://client.example.com/oauth",
            &CallbackResult::Error {
                error: "server_error".to_string(),
                error_description: Some("upstream failed".to_string()),
                state: Some("a b".to_string()),
            },
        )
        .unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("error".to_string(), "server_error".to_string()),
                ("error_description".to_string(), "upstream failed".to_string()),
                ("state".to_string(), "a b".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_target_is_error() {
        let result = CallbackResult::Code {
            code: "c".to_string(),
            state: None,
        };
        assert!(callback_redirect_url("not a url", &result).is_err());
    }
}
