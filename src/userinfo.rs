//! UserInfo client (§4.6, OIDC Core §5.3).

use crate::error::{UserInfoError, UserInfoResult};
use crate::http::HttpError;
use crate::provider::registry::ProviderRegistry;
use crate::types::{JsonMap, ProviderRef, TokenSource};

#[derive(Clone)]
pub struct UserInfoClient {
    registry: ProviderRegistry,
}

impl UserInfoClient {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    /// `GET userinfo_endpoint` with `Authorization: Bearer <access>`. If
    /// `expected_subject` is `None` and `token` is a bundle, the bundle's
    /// `id.claims.sub` is used instead (§4.6 subject defaulting); a bare
    /// access token with no explicit `expected_subject` skips the check.
    pub async fn user_info(
        &self,
        token: &TokenSource,
        provider: &ProviderRef,
        expected_subject: Option<&str>,
    ) -> UserInfoResult<JsonMap> {
        let provider = self.registry.resolve(provider).map_err(to_userinfo_error)?;
        let info = provider.info();
        if !info.ready {
            return Err(UserInfoError::NotReady);
        }
        let endpoint = info
            .userinfo_endpoint
            .as_deref()
            .ok_or(UserInfoError::NotFound)?;
        let access_token = token.access_token().ok_or(UserInfoError::NotFound)?;

        let resp = provider
            .http()
            .get_bearer(endpoint, access_token)
            .await
            .map_err(map_http_err)?;
        if !resp.is_success() {
            return Err(UserInfoError::HttpStatus {
                status: resp.status,
                body: resp.body,
            });
        }
        let claims: JsonMap = serde_json::from_str(&resp.body)?;

        let expected = expected_subject
            .map(|s| s.to_string())
            .or_else(|| token.expected_subject());
        if let Some(expected) = expected {
            let actual = claims.get("sub").and_then(|v| v.as_str());
            if actual != Some(expected.as_str()) {
                return Err(UserInfoError::BadSubject);
            }
        }

        Ok(claims)
    }
}

fn map_http_err(e: HttpError) -> UserInfoError {
    match e {
        HttpError::Timeout => UserInfoError::Timeout,
        HttpError::Request(e) => UserInfoError::Http(e),
    }
}

fn to_userinfo_error(e: crate::error::RegistryError) -> UserInfoError {
    match e {
        crate::error::RegistryError::NotFound => UserInfoError::NotFound,
        crate::error::RegistryError::IdAlreadyUsed => UserInfoError::NotFound,
    }
}
