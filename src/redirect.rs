//! Authorization URL construction (§4.3).

use crate::pkce::PkceParams;
use crate::provider::ProviderInfo;
use crate::types::Scopes;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum RedirectError {
    #[error("provider is not ready")]
    ProviderNotReady,

    #[error("invalid authorization endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Build the authorization redirect URL for `info`, per the exact
/// optional-key policy in §4.3: `response_type`/`client_id`/`redirect_uri`
/// always present; `state`/`nonce`/`scope`/`code_challenge`/
/// `code_challenge_method` present iff the corresponding input is non-empty.
pub fn build_redirect_url(
    info: &ProviderInfo,
    scopes: Option<Scopes>,
    state: Option<&str>,
    nonce: Option<&str>,
    pkce: Option<&PkceParams>,
) -> Result<String, RedirectError> {
    if !info.ready {
        return Err(RedirectError::ProviderNotReady);
    }
    let authorization_endpoint = info
        .authorization_endpoint
        .as_deref()
        .expect("ready provider has an authorization_endpoint (§3 invariant)");

    let mut url = Url::parse(authorization_endpoint)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("response_type", "code");
        query.append_pair("client_id", &info.client_id);
        query.append_pair("redirect_uri", &info.local_endpoint);

        if let Some(state) = state {
            if !state.is_empty() {
                query.append_pair("state", state);
            }
        }
        if let Some(nonce) = nonce {
            if !nonce.is_empty() {
                query.append_pair("nonce", nonce);
            }
        }
        if let Some(pkce) = pkce {
            query.append_pair("code_challenge", pkce.challenge.as_str());
            query.append_pair("code_challenge_method", pkce.method.as_wire_str());
        }
        if let Some(scopes) = &scopes {
            if !scopes.is_empty() {
                query.append_pair("scope", &scopes.to_wire_string());
            }
        }
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkce::{PkceChallenge, PkceMethod, PkceVerifier};
    use crate::types::ProviderId;
    use std::collections::HashSet;

    fn ready_info() -> ProviderInfo {
        ProviderInfo {
            id: ProviderId::new(),
            name: "Test".into(),
            description: "".into(),
            client_id: "abc".into(),
            client_secret: "shh".into(),
            config_endpoint: "https://op.example/.well-known/openid-configuration".into(),
            local_endpoint: "https://rp.example/callback".into(),
            ready: true,
            issuer: Some("https://op.example".into()),
            authorization_endpoint: Some("https://op.example/authorize".into()),
            token_endpoint: Some("https://op.example/token".into()),
            userinfo_endpoint: None,
            introspection_endpoint: None,
            revocation_endpoint: None,
            jwks_uri: Some("https://op.example/jwks".into()),
            jwks: jsonwebtoken::jwk::JwkSet { keys: vec![] },
            token_endpoint_auth_methods_supported: vec![],
            signing_algs_supported: vec![],
            request_scopes: None,
        }
    }

    fn query_keys(url: &str) -> HashSet<String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, _)| k.to_string())
            .collect()
    }

    #[test]
    fn not_ready_is_rejected() {
        let mut info = ready_info();
        info.ready = false;
        let result = build_redirect_url(&info, None, None, None, None);
        assert!(matches!(result, Err(RedirectError::ProviderNotReady)));
    }

    #[test]
    fn minimal_url_has_exactly_the_required_keys() {
        let info = ready_info();
        let url = build_redirect_url(&info, None, None, None, None).unwrap();
        let keys = query_keys(&url);
        let expected: HashSet<String> = ["response_type", "client_id", "redirect_uri"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn full_url_matches_scenario_2() {
        let info = ready_info();
        let verifier = PkceVerifier::new("verifier");
        let pkce = PkceParams::new(verifier, PkceChallenge::new("C"), PkceMethod::S256);
        let url = build_redirect_url(
            &info,
            Some(Scopes::from(vec!["openid".to_string(), "email".to_string()])),
            Some("s1"),
            Some("n1"),
            Some(&pkce),
        )
        .unwrap();

        let parsed = Url::parse(&url).unwrap();
        let pairs: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs.get("response_type").unwrap(), "code");
        assert_eq!(pairs.get("client_id").unwrap(), "abc");
        assert_eq!(pairs.get("redirect_uri").unwrap(), "https://rp.example/callback");
        assert_eq!(pairs.get("state").unwrap(), "s1");
        assert_eq!(pairs.get("nonce").unwrap(), "n1");
        assert_eq!(pairs.get("code_challenge").unwrap(), "C");
        assert_eq!(pairs.get("code_challenge_method").unwrap(), "S256");
        assert_eq!(pairs.get("scope").unwrap(), "openid email");
    }

    #[test]
    fn empty_state_and_nonce_are_omitted() {
        let info = ready_info();
        let url = build_redirect_url(&info, None, Some(""), Some(""), None).unwrap();
        let keys = query_keys(&url);
        assert!(!keys.contains("state"));
        assert!(!keys.contains("nonce"));
    }

    #[test]
    fn joined_scope_string_is_used_verbatim() {
        let info = ready_info();
        let url = build_redirect_url(&info, Some(Scopes::from("openid profile")), None, None, None)
            .unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs.get("scope").unwrap(), "openid profile");
    }
}
