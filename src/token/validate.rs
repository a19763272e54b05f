//! ID token extraction and OIDC Core §3.1.3.7 validation (§4.5).

use crate::error::ValidationError;
use crate::provider::registry::ProviderRegistry;
use crate::types::{
    AccessToken, AuthPolicy, ExpectedNonce, IdToken, JsonMap, ProviderRef, RefreshToken, TokenBundle,
};
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

/// `iat` is allowed to sit this far in the future before being rejected as
/// "not yet valid" (§4.5 rule 6).
const IAT_FUTURE_SKEW_SECS: i64 = 300;

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

pub struct Validator {
    registry: ProviderRegistry,
}

impl Validator {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Normalize a token-endpoint response into a `TokenBundle`. Accepts
    /// either a JSON object (the usual token-endpoint shape) or a bare
    /// compact JWS string, treated as a standalone id token.
    pub fn extract_token_map(raw: &str) -> ValidationResult<TokenBundle> {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') {
            let value: serde_json::Value =
                serde_json::from_str(trimmed).map_err(|_| ValidationError::Malformed)?;
            let obj = value.as_object().ok_or(ValidationError::Malformed)?;

            let id = match obj.get("id_token").and_then(|v| v.as_str()) {
                Some(compact) => Some(decode_unverified(compact)?),
                None => None,
            };
            let access = obj.get("access_token").and_then(|v| v.as_str()).map(|token| {
                let expires_at = obj
                    .get("expires_in")
                    .and_then(|v| v.as_i64())
                    .map(|secs| Utc::now() + chrono::Duration::seconds(secs));
                AccessToken {
                    token: token.to_string(),
                    expires_at,
                }
            });
            let refresh = obj
                .get("refresh_token")
                .and_then(|v| v.as_str())
                .map(|token| RefreshToken { token: token.to_string() });
            let scope = obj.get("scope").and_then(|v| v.as_str()).map(|s| s.to_string());
            let token_type = obj
                .get("token_type")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());

            Ok(TokenBundle {
                id,
                access,
                refresh,
                scope,
                token_type,
            })
        } else {
            let id = decode_unverified(trimmed)?;
            Ok(TokenBundle {
                id: Some(id),
                ..Default::default()
            })
        }
    }

    /// Apply OIDC Core §3.1.3.7 to the bundle's id token, returning the
    /// (unchanged) bundle on success. Any failure is reported as the first
    /// rule violated; there is no retry except the single unknown-`kid`
    /// JWKS refresh in rule 3.
    pub async fn validate(
        &self,
        bundle: TokenBundle,
        provider: &ProviderRef,
        expected_nonce: ExpectedNonce,
        policy: Option<&AuthPolicy>,
    ) -> ValidationResult<TokenBundle> {
        let id_token = bundle.id.as_ref().ok_or(ValidationError::Malformed)?;
        let provider = self.registry.resolve(provider).map_err(|_| ValidationError::Malformed)?;
        let info = provider.info();

        let header = decode_header(&id_token.token).map_err(|_| ValidationError::Malformed)?;
        let kid = header.kid.as_deref().ok_or(ValidationError::UnknownKey)?;

        let alg_name = format!("{:?}", header.alg);
        if !info.signing_algs_supported.is_empty() && !info.signing_algs_supported.iter().any(|a| a == &alg_name) {
            return Err(ValidationError::BadAlgorithm);
        }

        let mut jwk = provider.find_key(kid);
        if jwk.is_none() {
            // Unknown kid: the key set may have rotated under us. Refresh
            // once and retry before giving up (§4.5 rule 3).
            let _ = provider.refresh_keys_and_wait().await;
            jwk = provider.find_key(kid);
        }
        let jwk = jwk.ok_or(ValidationError::UnknownKey)?;

        let decoding_key = DecodingKey::from_jwk(&jwk).map_err(|_| ValidationError::BadSignature)?;
        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims.clear();
        validation.insecure_disable_signature_validation = false;

        let decoded = decode::<serde_json::Value>(&id_token.token, &decoding_key, &validation)
            .map_err(|_| ValidationError::BadSignature)?;
        let claims = decoded.claims.as_object().ok_or(ValidationError::Malformed)?;

        check_issuer(claims, &info.issuer)?;
        check_audience(claims, &info.client_id)?;
        check_exp(claims)?;
        check_iat(claims)?;
        check_nonce(claims, &expected_nonce)?;
        if let Some(policy) = policy {
            check_auth_policy(claims, policy)?;
        }

        Ok(bundle)
    }
}

fn check_issuer(claims: &JsonMap, issuer: &Option<String>) -> ValidationResult<()> {
    let expected = issuer.as_deref().ok_or(ValidationError::BadIssuer)?;
    let actual = claims.get("iss").and_then(|v| v.as_str()).ok_or(ValidationError::BadIssuer)?;
    if actual != expected {
        return Err(ValidationError::BadIssuer);
    }
    Ok(())
}

fn check_audience(claims: &JsonMap, client_id: &str) -> ValidationResult<()> {
    match claims.get("aud") {
        Some(serde_json::Value::String(s)) => {
            if s != client_id {
                return Err(ValidationError::BadAudience);
            }
        }
        Some(serde_json::Value::Array(values)) => {
            let audiences: Vec<&str> = values.iter().filter_map(|v| v.as_str()).collect();
            if !audiences.contains(&client_id) {
                return Err(ValidationError::BadAudience);
            }
            if audiences.len() > 1 {
                let azp = claims.get("azp").and_then(|v| v.as_str());
                if azp != Some(client_id) {
                    return Err(ValidationError::BadAudience);
                }
            }
        }
        _ => return Err(ValidationError::BadAudience),
    }
    Ok(())
}

fn check_exp(claims: &JsonMap) -> ValidationResult<()> {
    let exp = claims.get("exp").and_then(|v| v.as_i64()).ok_or(ValidationError::Malformed)?;
    if exp <= Utc::now().timestamp() {
        return Err(ValidationError::Expired);
    }
    Ok(())
}

fn check_iat(claims: &JsonMap) -> ValidationResult<()> {
    let iat = claims.get("iat").and_then(|v| v.as_i64()).ok_or(ValidationError::Malformed)?;
    if iat > Utc::now().timestamp() + IAT_FUTURE_SKEW_SECS {
        return Err(ValidationError::NotYetValid);
    }
    Ok(())
}

fn check_nonce(claims: &JsonMap, expected: &ExpectedNonce) -> ValidationResult<()> {
    match expected {
        ExpectedNonce::Unchecked => Ok(()),
        ExpectedNonce::Any => {
            if claims.get("nonce").and_then(|v| v.as_str()).is_some() {
                Ok(())
            } else {
                Err(ValidationError::BadNonce)
            }
        }
        ExpectedNonce::Exact(expected) => {
            let actual = claims.get("nonce").and_then(|v| v.as_str());
            if actual == Some(expected.as_str()) {
                Ok(())
            } else {
                Err(ValidationError::BadNonce)
            }
        }
    }
}

fn check_auth_policy(claims: &JsonMap, policy: &AuthPolicy) -> ValidationResult<()> {
    if let Some(required) = &policy.required_acr {
        let acr = claims.get("acr").and_then(|v| v.as_str());
        match acr {
            Some(acr) if required.iter().any(|r| r == acr) => {}
            _ => return Err(ValidationError::Malformed),
        }
    }
    if let Some(max_age) = policy.max_auth_age {
        let auth_time = claims.get("auth_time").and_then(|v| v.as_i64());
        match auth_time {
            Some(auth_time) => {
                if Utc::now().timestamp() - auth_time > max_age.num_seconds() {
                    return Err(ValidationError::Expired);
                }
            }
            None => return Err(ValidationError::Malformed),
        }
    }
    Ok(())
}

/// Split a compact JWS into its header/payload JSON without checking the
/// signature — used at extraction time, before a `Provider` handle (and
/// thus its JWKS) is necessarily available.
fn decode_unverified(compact: &str) -> ValidationResult<IdToken> {
    let mut parts = compact.split('.');
    let header_b64 = parts.next().ok_or(ValidationError::Malformed)?;
    let payload_b64 = parts.next().ok_or(ValidationError::Malformed)?;
    if parts.next().is_none() {
        return Err(ValidationError::Malformed);
    }

    let header_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| ValidationError::Malformed)?;
    let payload_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| ValidationError::Malformed)?;

    let header: JsonMap = serde_json::from_slice(&header_bytes).map_err(|_| ValidationError::Malformed)?;
    let claims: JsonMap = serde_json::from_slice(&payload_bytes).map_err(|_| ValidationError::Malformed)?;

    Ok(IdToken {
        token: compact.to_string(),
        claims,
        header,
    })
}

// `Algorithm` is re-exported so callers building custom `Validation` don't
// need a direct `jsonwebtoken` dependency for this one type.
pub use jsonwebtoken::Algorithm as SigningAlgorithm;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_token_map_from_json_pulls_access_token_verbatim() {
        let raw = r#"{"access_token":"AT123","token_type":"Bearer","scope":"openid email"}"#;
        let bundle = Validator::extract_token_map(raw).unwrap();
        assert_eq!(bundle.access.unwrap().token, "AT123");
        assert_eq!(bundle.scope.as_deref(), Some("openid email"));
    }

    #[test]
    fn extract_token_map_rejects_non_json_non_jws_garbage() {
        let result = Validator::extract_token_map("not json and not a jws");
        assert!(matches!(result, Err(ValidationError::Malformed)));
    }

    #[test]
    fn check_issuer_rejects_mismatch() {
        let mut claims = JsonMap::new();
        claims.insert("iss".into(), serde_json::json!("https://evil"));
        let result = check_issuer(&claims, &Some("https://op.example".to_string()));
        assert!(matches!(result, Err(ValidationError::BadIssuer)));
    }

    #[test]
    fn check_audience_requires_azp_for_multi_valued_aud() {
        let mut claims = JsonMap::new();
        claims.insert("aud".into(), serde_json::json!(["client", "other"]));
        assert!(matches!(
            check_audience(&claims, "client"),
            Err(ValidationError::BadAudience)
        ));

        claims.insert("azp".into(), serde_json::json!("client"));
        assert!(check_audience(&claims, "client").is_ok());
    }

    #[test]
    fn check_nonce_any_requires_presence_only() {
        let mut claims = JsonMap::new();
        assert!(matches!(
            check_nonce(&claims, &ExpectedNonce::Any),
            Err(ValidationError::BadNonce)
        ));
        claims.insert("nonce".into(), serde_json::json!("whatever"));
        assert!(check_nonce(&claims, &ExpectedNonce::Any).is_ok());
    }

    #[test]
    fn check_nonce_unchecked_ignores_absence() {
        let claims = JsonMap::new();
        assert!(check_nonce(&claims, &ExpectedNonce::Unchecked).is_ok());
    }

    #[test]
    fn check_nonce_exact_mismatch_is_bad_nonce() {
        let mut claims = JsonMap::new();
        claims.insert("nonce".into(), serde_json::json!("n2"));
        let result = check_nonce(&claims, &ExpectedNonce::Exact("n1".to_string()));
        assert!(matches!(result, Err(ValidationError::BadNonce)));
    }

    #[test]
    fn check_exp_rejects_expired_token() {
        let mut claims = JsonMap::new();
        claims.insert("exp".into(), serde_json::json!(Utc::now().timestamp() - 10));
        assert!(matches!(check_exp(&claims), Err(ValidationError::Expired)));
    }
}
