//! Shared helpers for integration tests
//!
//! Stands up a wiremock identity provider publishing the fixture signing
//! key, and mints tokens signed with either that key or a foreign one.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use authrelay::config::Config;

pub const KID: &str = "idp-key-1";

/// Key id the identity provider publishes the second fixture key under
/// after a key rotation
pub const ROTATED_KID: &str = "idp-key-2";

const IDP_KEY_PEM: &[u8] = include_bytes!("../fixtures/idp_signing_key.pem");
const FOREIGN_KEY_PEM: &[u8] = include_bytes!("../fixtures/foreign_signing_key.pem");

const IDP_KEY_N: &str = "wNabebumvlhznlekg2VJMzXczaTlQFo7jkap2P1D-9RyOQviIBVOQCCh5YNh0vncdMSaV09va1kz8z6VnQJ2miZeXz0GirB09_8ACS3CpnpR3IQWSTMO7ShM90wALBebBi_n5Om-WnLOXFDnG1JYxhHHwQdw4009CkBfDhkgilR4sR84fqgnYHKuhBMVF1zysFZvfmzDk-q6LEN7UsDAaJdSRjqToqcFU_JuYkWGxrNIYoGNZ65H1fnQUKR0KK80oNa3akyEZxlV-0cg4Haf8piGwdGk3iQ2V08QIzp6nNH78FvdK4oMVegCCogsSvT_t7mZMOebatzW62qG2sVBtQ";

const ROTATED_KEY_N: &str = "Y55pyL8Hu5qTnN2axIZkOI-EiyvA-o2SjFIcmNi1hRD_YcijmHSLpLB0c6ebW3MxCn8lSD7zkJMk82glJ2XglbWtNZaBNR7QAo1-tW84ATtFfuynOZLZOiwLO7_05V06mgxITmHAWuPQyhUOB1dcJwKZ_OReP36tWfJUciq_1-KafkLAVOmB5MXARBlGefqxSJ0fDtxyVSoIRxQb-jru4og5sFTKGDNCkMhDBkZyaAZgBqxB4RmYeCwmFeARdJybs4ncqbmcOmfTuNGtv66S8jcSgBw1CQLAFNZO0DZx8Uok2aFiq6QoOZ38HEx9Xb6f4P92kp9cKPQ6swqXbmG3fQ";

fn rsa_jwk(kid: &str, n: &str) -> Value {
    json!({
        "kty": "RSA",
        "kid": kid,
        "use": "sig",
        "alg": "RS256",
        "n": n,
        "e": "AQAB"
    })
}

/// JWKS document publishing the fixture signing key
#[allow(dead_code)]
pub fn jwks_body() -> Value {
    json!({ "keys": [rsa_jwk(KID, IDP_KEY_N)] })
}

/// JWKS document after rotation: the original key plus the second fixture
/// key under [`ROTATED_KID`]
#[allow(dead_code)]
pub fn rotated_jwks_body() -> Value {
    json!({ "keys": [rsa_jwk(KID, IDP_KEY_N), rsa_jwk(ROTATED_KID, ROTATED_KEY_N)] })
}

/// Starts a mock identity provider serving the JWKS document
#[allow(dead_code)]
pub async fn start_idp() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
        .mount(&server)
        .await;
    server
}

/// Relay configuration pointing at a mock identity provider
#[allow(dead_code)]
pub fn config_for(idp: &MockServer) -> Config {
    let mut config = Config::default();
    config.identity_provider.base_url = Some(idp.uri());
    config.identity_provider.anon_key = Some("test-anon-key".to_string());
    config.server.public_url = "https://relay.example.com".to_string();
    config
}

/// Claims of a fresh OAuth access token issued by `idp`
#[allow(dead_code)]
pub fn oauth_claims(idp: &MockServer, sub: &str, client_id: Option<&str>) -> Value {
    let now = chrono::Utc::now().timestamp();
    let mut claims = json!({
        "sub": sub,
        "iss": format!("{}/auth/v1", idp.uri()),
        "aud": "authenticated",
        "iat": now,
        "exp": now + 3600,
        "email": format!("{sub}@example.com"),
        "role": "authenticated",
        "aal": "aal1",
        "session_id": "sess-1",
    });
    if let Some(client_id) = client_id {
        claims["client_id"] = json!(client_id);
    }
    claims
}

/// Signs `claims` with the identity provider's key
#[allow(dead_code)]
pub fn mint_token(claims: &Value) -> String {
    sign(claims, IDP_KEY_PEM, KID)
}

/// Signs `claims` with a key the identity provider never published, under
/// the published key id
#[allow(dead_code)]
pub fn mint_foreign_token(claims: &Value) -> String {
    sign(claims, FOREIGN_KEY_PEM, KID)
}

/// Signs `claims` with the second fixture key under `kid`
#[allow(dead_code)]
pub fn mint_token_with_kid(claims: &Value, kid: &str) -> String {
    sign(claims, FOREIGN_KEY_PEM, kid)
}

#[allow(dead_code)]
fn sign(claims: &Value, pem: &[u8], kid: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(pem).expect("fixture key must parse");
    encode(&header, claims, &key).expect("token must encode")
}

// ---------------------------------------------------------------------------
// Router helpers
// ---------------------------------------------------------------------------

/// Relay router wired to a mock identity provider
#[allow(dead_code)]
pub fn app_for(idp: &MockServer) -> axum::Router {
    app_with(config_for(idp))
}

#[allow(dead_code)]
pub fn app_with(config: Config) -> axum::Router {
    let state = authrelay::server::AppState::new(config).expect("state must build");
    authrelay::server::router(state)
}

#[allow(dead_code)]
pub fn get(uri: &str) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub fn post_form(uri: &str, fields: &[(&str, &str)]) -> axum::http::Request<axum::body::Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish();
    axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(axum::body::Body::from(body))
        .unwrap()
}

/// Sends `request` through a clone of `app`
#[allow(dead_code)]
pub async fn send(
    app: &axum::Router,
    request: axum::http::Request<axum::body::Body>,
) -> axum::response::Response {
    use tower::ServiceExt;
    app.clone().oneshot(request).await.unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Parsed `Location` header of a redirect
#[allow(dead_code)]
pub fn location(response: &axum::response::Response) -> url::Url {
    let value = response
        .headers()
        .get("location")
        .expect("redirect must carry a Location header")
        .to_str()
        .unwrap();
    url::Url::parse(value).unwrap()
}

/// Decoded query parameters of `url`
#[allow(dead_code)]
pub fn query_map(url: &url::Url) -> std::collections::HashMap<String, String> {
    url.query_pairs().into_owned().collect()
}

/// Value of the `Set-Cookie` header for cookie `name`, if any
#[allow(dead_code)]
pub fn set_cookie(response: &axum::response::Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .map(str::to_string)
}
