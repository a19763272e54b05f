mod common;

use common::{mount_discovery, mount_jwks, test_jwks_json, wait_until_ready};
use oidc_rp::OidcRp;
use std::time::Duration;
use wiremock::matchers::{body_string, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn ready_rp(mock: &MockServer) -> (OidcRp, oidc_rp::types::ProviderId) {
    let issuer = mock.uri();
    mount_discovery(mock, &issuer).await;
    mount_jwks(mock).await;

    let rp = OidcRp::new();
    let (id, _) = rp
        .add_provider(
            None,
            "Test IdP",
            "",
            "client-1",
            "secret-1",
            format!("{}/.well-known/openid-configuration", mock.uri()),
            "https://rp.example/callback",
            None,
        )
        .unwrap();
    assert!(wait_until_ready(&rp, id, Duration::from_secs(2)).await);
    (rp, id)
}

#[tokio::test]
async fn exchange_code_sends_basic_auth_header_and_expected_body() {
    let mock = MockServer::start().await;
    let (rp, id) = ready_rp(&mock).await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header_exists("Authorization"))
        .and(body_string(
            "grant_type=authorization_code&code=AUTH&redirect_uri=https%3A%2F%2Frp.example%2Fcallback",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "AT1",
            "token_type": "Bearer",
            "expires_in": 3600,
        })))
        .mount(&mock)
        .await;

    let body = rp.exchange_code("AUTH", None, &id.into()).await.unwrap();
    assert!(body.contains("AT1"));
}

#[tokio::test]
async fn extract_token_map_round_trips_access_token_byte_for_byte() {
    let mock = MockServer::start().await;
    let (rp, id) = ready_rp(&mock).await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "AT-exact-match",
            "token_type": "Bearer",
        })))
        .mount(&mock)
        .await;

    let body = rp.exchange_code("AUTH", None, &id.into()).await.unwrap();
    let bundle = oidc_rp::Validator::extract_token_map(&body).unwrap();
    assert_eq!(bundle.access.unwrap().token, "AT-exact-match");
}

#[tokio::test]
async fn revoke_without_discovered_endpoint_is_not_supported() {
    let mock = MockServer::start().await;
    // Discovery document with no revocation_endpoint.
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "issuer": mock.uri(),
            "authorization_endpoint": format!("{}/authorize", mock.uri()),
            "token_endpoint": format!("{}/token", mock.uri()),
            "jwks_uri": format!("{}/jwks", mock.uri()),
        })))
        .mount(&mock)
        .await;
    common::mount_jwks(&mock).await;

    let rp = OidcRp::new();
    let (id, _) = rp
        .add_provider(
            None,
            "No Revocation",
            "",
            "client-1",
            "secret-1",
            format!("{}/.well-known/openid-configuration", mock.uri()),
            "https://rp.example/callback",
            None,
        )
        .unwrap();
    assert!(wait_until_ready(&rp, id, Duration::from_secs(2)).await);

    let token = oidc_rp::types::TokenSource::from("AT1");
    let result = rp.revoke(&token, &id.into()).await;
    assert!(matches!(result, Err(oidc_rp::TokenError::NotSupported)));
}

#[tokio::test]
async fn introspect_reports_active_status() {
    let mock = MockServer::start().await;
    let (rp, id) = ready_rp(&mock).await;

    Mock::given(method("POST"))
        .and(path("/introspect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "active": true,
            "sub": "user-1",
        })))
        .mount(&mock)
        .await;

    let token = oidc_rp::types::TokenSource::from("AT1");
    let result = rp.introspect(&token, &id.into()).await.unwrap();
    assert!(result.active);
    assert_eq!(result.claims.get("sub").unwrap(), "user-1");
}

/// §4.4: introspection always authenticates via Basic, even when the
/// provider only advertises `client_secret_post` for the other endpoints.
#[tokio::test]
async fn introspect_always_uses_basic_auth_and_accept_header() {
    let mock = MockServer::start().await;
    let issuer = mock.uri();

    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "issuer": issuer,
            "authorization_endpoint": format!("{issuer}/authorize"),
            "token_endpoint": format!("{issuer}/token"),
            "jwks_uri": format!("{issuer}/jwks"),
            "introspection_endpoint": format!("{issuer}/introspect"),
            "token_endpoint_auth_methods_supported": ["client_secret_post"],
        })))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_jwks_json()))
        .mount(&mock)
        .await;

    let rp = OidcRp::new();
    let (id, _) = rp
        .add_provider(
            None,
            "Test IdP",
            "",
            "client-1",
            "secret-1",
            format!("{issuer}/.well-known/openid-configuration"),
            "https://rp.example/callback",
            None,
        )
        .unwrap();
    assert!(wait_until_ready(&rp, id, Duration::from_secs(2)).await);

    Mock::given(method("POST"))
        .and(path("/introspect"))
        .and(header_exists("Authorization"))
        .and(header("Accept", "application/json"))
        .and(body_string("token=AT1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "active": true,
        })))
        .mount(&mock)
        .await;

    let token = oidc_rp::types::TokenSource::from("AT1");
    let result = rp.introspect(&token, &id.into()).await.unwrap();
    assert!(result.active);
}
