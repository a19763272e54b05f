//! Token endpoint operations: authorization-code exchange, refresh,
//! introspection (RFC 7662), and revocation (RFC 7009 supplement).
//!
//! Client authentication is negotiated once per call via
//! `AuthMethod::select` against the provider's
//! `token_endpoint_auth_methods_supported`, then applied either as a
//! `client_secret_basic` header or `client_secret_post` form fields —
//! never both.

use crate::error::{TokenError, TokenResult};
use crate::http::HttpError;
use crate::provider::registry::ProviderRegistry;
use crate::types::{AuthMethod, IntrospectionResponse, ProviderRef, TokenSource};
use base64::Engine;
use url::form_urlencoded;

/// Client credentials as they need to go out on the wire: either a
/// pre-built `Authorization: Basic ...` header, or extra form fields to
/// append to the body.
enum Credentials {
    Header(String),
    FormFields(Vec<(String, String)>),
}

/// RFC 6749 §2.3.1: each component is percent-encoded with the
/// `application/x-www-form-urlencoded` algorithm, concatenated with a
/// colon, *then* base64-encoded — not the same as HTTP Basic auth's raw
/// `user:pass`, and not the same as `reqwest::RequestBuilder::basic_auth`.
fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    let id: String = form_urlencoded::byte_serialize(client_id.as_bytes()).collect();
    let secret: String = form_urlencoded::byte_serialize(client_secret.as_bytes()).collect();
    let raw = format!("{id}:{secret}");
    let encoded = base64::engine::general_purpose::STANDARD.encode(raw);
    format!("Basic {encoded}")
}

fn credentials_for(method: AuthMethod, client_id: &str, client_secret: &str) -> Credentials {
    match method {
        AuthMethod::ClientSecretBasic => Credentials::Header(basic_auth_header(client_id, client_secret)),
        AuthMethod::ClientSecretPost => Credentials::FormFields(vec![
            ("client_id".to_string(), client_id.to_string()),
            ("client_secret".to_string(), client_secret.to_string()),
        ]),
        AuthMethod::None => Credentials::FormFields(vec![("client_id".to_string(), client_id.to_string())]),
    }
}

fn map_http_err(e: HttpError) -> TokenError {
    match e {
        HttpError::Timeout => TokenError::Timeout,
        HttpError::Request(e) => TokenError::Http(e),
    }
}

/// Thin wrapper around `ProviderRegistry` exposing the token-endpoint
/// operations in §4.4/§6. Holds no state of its own beyond the registry
/// handle, so it's cheap to construct per-call or keep around.
#[derive(Clone)]
pub struct TokenClient {
    registry: ProviderRegistry,
}

impl TokenClient {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    /// RFC 6749 §3.2: POST `grant_type=authorization_code&code=...&redirect_uri=...`
    /// (plus `code_verifier` when PKCE was used), authenticated per the
    /// provider's negotiated method. Returns the raw JSON response body —
    /// parsing into a `TokenBundle` is `Validator::extract_token_map`'s job.
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: Option<&str>,
        provider: &ProviderRef,
    ) -> TokenResult<String> {
        let provider = self.registry.resolve(provider).map_err(to_token_error)?;
        let info = provider.info();
        if !info.ready {
            return Err(TokenError::NotReady);
        }
        let token_endpoint = info.token_endpoint.as_deref().ok_or(TokenError::NotReady)?;

        let method = AuthMethod::select(&info.token_endpoint_auth_methods_supported);
        let credentials = credentials_for(method, &info.client_id, &info.client_secret);

        let mut form: Vec<(String, String)> = vec![
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("code".to_string(), code.to_string()),
            ("redirect_uri".to_string(), info.local_endpoint.clone()),
        ];
        if let Some(verifier) = pkce_verifier {
            form.push(("code_verifier".to_string(), verifier.to_string()));
        }

        let (headers, form) = apply_credentials(credentials, form);
        let form_refs: Vec<(&str, &str)> = form.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let header_refs: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

        let resp = provider
            .http()
            .post_form(token_endpoint, &form_refs, &header_refs)
            .await
            .map_err(map_http_err)?;
        if !resp.is_success() {
            return Err(TokenError::HttpStatus {
                status: resp.status,
                body: resp.body,
            });
        }
        Ok(resp.body)
    }

    /// RFC 6749 §6: refresh-token grant, same authentication negotiation as
    /// code exchange. `scopes`, if given, narrows the refreshed grant.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        scopes: Option<&str>,
        provider: &ProviderRef,
    ) -> TokenResult<String> {
        let provider = self.registry.resolve(provider).map_err(to_token_error)?;
        let info = provider.info();
        if !info.ready {
            return Err(TokenError::NotReady);
        }
        let token_endpoint = info.token_endpoint.as_deref().ok_or(TokenError::NotReady)?;

        let method = AuthMethod::select(&info.token_endpoint_auth_methods_supported);
        let credentials = credentials_for(method, &info.client_id, &info.client_secret);

        let mut form: Vec<(String, String)> = vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("refresh_token".to_string(), refresh_token.to_string()),
        ];
        if let Some(scope) = scopes {
            form.push(("scope".to_string(), scope.to_string()));
        }

        let (headers, form) = apply_credentials(credentials, form);
        let form_refs: Vec<(&str, &str)> = form.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let header_refs: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

        let resp = provider
            .http()
            .post_form(token_endpoint, &form_refs, &header_refs)
            .await
            .map_err(map_http_err)?;
        if !resp.is_success() {
            return Err(TokenError::HttpStatus {
                status: resp.status,
                body: resp.body,
            });
        }
        Ok(resp.body)
    }

    /// RFC 7662: POST `token=...` to `introspection_endpoint`. `not_supported`
    /// if the provider never advertised one.
    pub async fn introspect(
        &self,
        token: &TokenSource,
        provider: &ProviderRef,
    ) -> TokenResult<IntrospectionResponse> {
        let provider = self.registry.resolve(provider).map_err(to_token_error)?;
        let info = provider.info();
        if !info.ready {
            return Err(TokenError::NotReady);
        }
        let endpoint = info.introspection_endpoint.as_deref().ok_or(TokenError::NotSupported)?;
        let access_token = token.access_token().ok_or(TokenError::NotSupported)?;

        // §4.4: introspection is always client-authenticated via Basic,
        // unlike the other three endpoints, which negotiate per-provider.
        let credentials = credentials_for(AuthMethod::ClientSecretBasic, &info.client_id, &info.client_secret);
        let form = vec![("token".to_string(), access_token.to_string())];
        let (mut headers, form) = apply_credentials(credentials, form);
        headers.push(("Accept".to_string(), "application/json".to_string()));
        let form_refs: Vec<(&str, &str)> = form.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let header_refs: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

        let resp = provider
            .http()
            .post_form(endpoint, &form_refs, &header_refs)
            .await
            .map_err(map_http_err)?;
        if !resp.is_success() {
            return Err(TokenError::HttpStatus {
                status: resp.status,
                body: resp.body,
            });
        }
        let mut claims: crate::types::JsonMap = serde_json::from_str(&resp.body)?;
        let active = claims
            .remove("active")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        Ok(IntrospectionResponse { active, claims })
    }

    /// RFC 7009: POST `token=...` to `revocation_endpoint`. `not_supported`
    /// if absent from discovery (§9 open-question resolution: never guess
    /// the URL).
    pub async fn revoke(&self, token: &TokenSource, provider: &ProviderRef) -> TokenResult<()> {
        let provider = self.registry.resolve(provider).map_err(to_token_error)?;
        let info = provider.info();
        if !info.ready {
            return Err(TokenError::NotReady);
        }
        let endpoint = info.revocation_endpoint.as_deref().ok_or(TokenError::NotSupported)?;
        let access_token = token.access_token().ok_or(TokenError::NotSupported)?;

        let method = AuthMethod::select(&info.token_endpoint_auth_methods_supported);
        let credentials = credentials_for(method, &info.client_id, &info.client_secret);
        let form = vec![("token".to_string(), access_token.to_string())];
        let (headers, form) = apply_credentials(credentials, form);
        let form_refs: Vec<(&str, &str)> = form.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let header_refs: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

        let resp = provider
            .http()
            .post_form(endpoint, &form_refs, &header_refs)
            .await
            .map_err(map_http_err)?;
        // RFC 7009 §2.2: the server returns 200 even if the token was
        // already invalid or unknown; only genuine transport/status
        // failures are surfaced.
        if !resp.is_success() {
            return Err(TokenError::HttpStatus {
                status: resp.status,
                body: resp.body,
            });
        }
        Ok(())
    }
}

fn apply_credentials(
    credentials: Credentials,
    mut form: Vec<(String, String)>,
) -> (Vec<(String, String)>, Vec<(String, String)>) {
    match credentials {
        Credentials::Header(header) => (vec![("Authorization".to_string(), header)], form),
        Credentials::FormFields(fields) => {
            form.extend(fields);
            (Vec::new(), form)
        }
    }
}

fn to_token_error(e: crate::error::RegistryError) -> TokenError {
    match e {
        crate::error::RegistryError::NotFound => TokenError::NotFound,
        crate::error::RegistryError::IdAlreadyUsed => TokenError::NotFound,
    }
}
