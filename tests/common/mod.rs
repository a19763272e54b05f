//! Common test utilities for integration tests.

use jsonwebtoken::jwk::{AlgorithmParameters, CommonParameters, Jwk, JwkSet, OctetKeyParameters, OctetKeyType};
use jsonwebtoken::{encode, EncodingKey, Header};
use oidc_rp::OidcRp;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A fixed HS256 secret shared between the issued tokens and the mock JWKS
/// document — test fixture only, never used for anything production-shaped.
pub const TEST_HS256_SECRET: &[u8] = b"integration-test-shared-secret-0123456789";
pub const TEST_KID: &str = "k1";

pub fn test_jwk() -> Jwk {
    Jwk {
        common: CommonParameters {
            key_id: Some(TEST_KID.to_string()),
            ..Default::default()
        },
        algorithm: AlgorithmParameters::OctetKey(OctetKeyParameters {
            key_type: OctetKeyType::Octet,
            value: base64_url(TEST_HS256_SECRET),
        }),
    }
}

fn base64_url(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub fn test_jwks_json() -> Value {
    let set = JwkSet { keys: vec![test_jwk()] };
    serde_json::to_value(set).unwrap()
}

pub fn discovery_json(base_url: &str, issuer: &str) -> Value {
    json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{base_url}/authorize"),
        "token_endpoint": format!("{base_url}/token"),
        "jwks_uri": format!("{base_url}/jwks"),
        "userinfo_endpoint": format!("{base_url}/userinfo"),
        "introspection_endpoint": format!("{base_url}/introspect"),
        "revocation_endpoint": format!("{base_url}/revoke"),
        "token_endpoint_auth_methods_supported": ["client_secret_basic", "client_secret_post"],
        "id_token_signing_alg_values_supported": ["HS256"],
        "scopes_supported": ["openid", "email", "profile"],
    })
}

pub async fn mount_discovery(mock: &MockServer, issuer: &str) {
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(discovery_json(&mock.uri(), issuer)))
        .mount(mock)
        .await;
}

pub async fn mount_jwks(mock: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_jwks_json()))
        .mount(mock)
        .await;
}

/// Sign a token with the fixture HS256 secret and `TEST_KID`. `claims` is
/// mutated by the caller before signing via the closure.
pub fn sign_hs256(claims: &Value) -> String {
    let mut header = Header::new(jsonwebtoken::Algorithm::HS256);
    header.kid = Some(TEST_KID.to_string());
    encode(&header, claims, &EncodingKey::from_secret(TEST_HS256_SECRET)).unwrap()
}

pub fn id_token_claims(issuer: &str, client_id: &str, nonce: Option<&str>) -> Value {
    let now = chrono::Utc::now().timestamp();
    let mut claims = json!({
        "iss": issuer,
        "aud": client_id,
        "sub": "user-1",
        "exp": now + 3600,
        "iat": now,
    });
    if let Some(nonce) = nonce {
        claims["nonce"] = json!(nonce);
    }
    claims
}

/// Poll `GetProviderInfo` until `ready` or the timeout elapses.
pub async fn wait_until_ready(rp: &OidcRp, id: oidc_rp::types::ProviderId, timeout: Duration) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        if let Ok(info) = rp.get_provider_info(&id.into()) {
            if info.ready {
                return true;
            }
        }
        if std::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
