//! JSON views returned by the relay's interactive endpoints
//!
//! Each view is a small JSON document tagged with a `view` field and sent
//! with a status code that reflects the flow's state. Navigation is never a
//! view; it is a `302 Found` built by [`found`].

use axum::http::header::LOCATION;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::relay::consent::ConsentDetails;
use crate::relay::params::AuthorizationRequestParams;

/// Decisions the end user can post back to an interactive form
pub const DECISIONS: [&str; 2] = ["approve", "deny"];

/// Form the end user submits to continue a flow
#[derive(Debug, Clone, Serialize)]
pub struct FormContract {
    pub method: &'static str,
    pub action: &'static str,
    pub decisions: [&'static str; 2],
}

impl FormContract {
    pub fn post(action: &'static str) -> Self {
        Self {
            method: "POST",
            action,
            decisions: DECISIONS,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    InvalidRequest {
        message: String,
    },
    Error {
        message: String,
        retryable: bool,
    },
    AuthorizePrompt {
        client_id: String,
        redirect_uri: String,
        scopes: Vec<String>,
        /// Fields the decision form posts back, alongside `decision`
        params: AuthorizationRequestParams,
        form: FormContract,
    },
    Consent {
        #[serde(flatten)]
        details: ConsentDetails,
        form: FormContract,
    },
    ConsentSubmitted {
        authorization_id: String,
    },
}

impl View {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        View::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        View::Error {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn retryable_error(message: impl Into<String>) -> Self {
        View::Error {
            message: message.into(),
            retryable: true,
        }
    }

    /// Pairs the view with a status code
    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// `302 Found` to `location`
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = StatusCode::FOUND.into_response();
            response.headers_mut().insert(LOCATION, value);
            response
        }
        Err(_) => View::error("Invalid redirect target").with_status(StatusCode::BAD_GATEWAY),
    }
}
