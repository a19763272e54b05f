//! `oidc-rp`: relying-party library for the OpenID Connect authorization-code
//! flow — provider discovery, JWKS-backed ID token validation, and
//! token/userinfo/introspection/revocation clients.
//!
//! [`OidcRp`] is the single entry point a host embeds; it wires together a
//! [`ProviderRegistry`](provider::registry::ProviderRegistry), a
//! [`TokenClient`], a [`Validator`], a [`UserInfoClient`], and a
//! [`ModuleRegistry`](module::ModuleRegistry), implementing every operation
//! in the library's external-interface surface.

pub mod backoff;
pub mod error;
pub mod http;
pub mod jwks;
pub mod module;
pub mod pkce;
pub mod provider;
pub mod redirect;
pub mod session;
pub mod token;
pub mod types;
pub mod userinfo;

use provider::registry::ProviderRegistry;
use provider::{Provider, ProviderConfig, ProviderInfo};
use std::sync::Arc;
use types::{AuthPolicy, ExpectedNonce, IntrospectionResponse, ProviderId, ProviderRef, Scopes, TokenBundle, TokenSource};

pub use error::{
    ProviderError, ProviderResult, RegistryError, RegistryResult, TokenError, TokenResult, UserInfoError,
    UserInfoResult, ValidationError,
};
pub use module::{ClientModule, ModuleError, ModuleMetadata, ModuleRegistry};
pub use pkce::{PkceChallenge, PkceMethod, PkceParams, PkceVerifier};
pub use redirect::RedirectError;
pub use session::Session;
pub use token::{TokenClient, Validator};

/// Unifies every external-interface operation (§6) behind one owned handle.
/// Cheap to clone: every field is an `Arc`-backed handle over shared state.
#[derive(Clone)]
pub struct OidcRp {
    registry: ProviderRegistry,
    token_client: TokenClient,
    validator: Arc<Validator>,
    userinfo_client: userinfo::UserInfoClient,
    modules: ModuleRegistry,
}

impl OidcRp {
    pub fn new() -> Self {
        let registry = ProviderRegistry::new();
        Self {
            token_client: TokenClient::new(registry.clone()),
            validator: Arc::new(Validator::new(registry.clone())),
            userinfo_client: userinfo::UserInfoClient::new(registry.clone()),
            modules: ModuleRegistry::new(),
            registry,
        }
    }

    /// `AddProvider`: register a provider and kick off its async bootstrap.
    #[allow(clippy::too_many_arguments)]
    pub fn add_provider(
        &self,
        id: Option<ProviderId>,
        name: impl Into<String>,
        description: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        config_endpoint: impl Into<String>,
        local_endpoint: impl Into<String>,
        default_scopes: Option<Scopes>,
    ) -> RegistryResult<(ProviderId, Arc<Provider>)> {
        self.registry.add_provider(
            id,
            ProviderConfig {
                name: name.into(),
                description: description.into(),
                client_id: client_id.into(),
                client_secret: client_secret.into(),
                config_endpoint: config_endpoint.into(),
                local_endpoint: local_endpoint.into(),
                default_scopes,
            },
        )
    }

    /// `RemoveProvider`.
    pub fn remove_provider(&self, id: ProviderId) -> RegistryResult<()> {
        self.registry.remove_provider(id)
    }

    /// `FindByIssuer`.
    pub fn find_by_issuer(&self, issuer: &str) -> RegistryResult<Arc<Provider>> {
        self.registry.find_by_issuer(issuer)
    }

    /// `GetProviderInfo`.
    pub fn get_provider_info(&self, provider: &ProviderRef) -> RegistryResult<ProviderInfo> {
        self.registry.resolve(provider).map(|p| p.info())
    }

    /// `ListProviders`.
    pub fn list_providers(&self) -> Vec<(ProviderId, Arc<Provider>)> {
        self.registry.list()
    }

    /// `CreateRedirectUrl`.
    pub fn create_redirect_url(
        &self,
        provider: &ProviderRef,
        scopes: Option<Scopes>,
        state: Option<&str>,
        nonce: Option<&str>,
        pkce: Option<&PkceParams>,
    ) -> Result<String, RedirectError> {
        let provider = self
            .registry
            .resolve(provider)
            .map_err(|_| RedirectError::ProviderNotReady)?;
        redirect::build_redirect_url(&provider.info(), scopes, state, nonce, pkce)
    }

    /// `CreateRedirectForSession`: pulls every input from the session
    /// collaborator rather than taking them positionally.
    pub fn create_redirect_for_session(&self, session: &dyn Session) -> Result<String, RedirectError> {
        let provider_ref = session.provider();
        self.create_redirect_url(
            &provider_ref,
            session.scopes(),
            Some(session.id()),
            session.nonce(),
            session.pkce(),
        )
    }

    /// `ExchangeCode`.
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: Option<&str>,
        provider: &ProviderRef,
    ) -> TokenResult<String> {
        self.token_client.exchange_code(code, pkce_verifier, provider).await
    }

    /// `ParseAndValidate`: `ExtractTokenMap` followed by `Validate`.
    pub async fn parse_and_validate(
        &self,
        raw: &str,
        provider: &ProviderRef,
        expected_nonce: ExpectedNonce,
        policy: Option<&AuthPolicy>,
    ) -> Result<TokenBundle, ValidationError> {
        let bundle = Validator::extract_token_map(raw)?;
        self.validator.validate(bundle, provider, expected_nonce, policy).await
    }

    /// `UserInfo`.
    pub async fn user_info(
        &self,
        token: &TokenSource,
        provider: &ProviderRef,
        expected_subject: Option<&str>,
    ) -> UserInfoResult<types::JsonMap> {
        self.userinfo_client.user_info(token, provider, expected_subject).await
    }

    /// `RefreshToken`.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        scopes: Option<&str>,
        provider: &ProviderRef,
    ) -> TokenResult<String> {
        self.token_client.refresh_token(refresh_token, scopes, provider).await
    }

    /// `Introspect`.
    pub async fn introspect(
        &self,
        token: &TokenSource,
        provider: &ProviderRef,
    ) -> TokenResult<IntrospectionResponse> {
        self.token_client.introspect(token, provider).await
    }

    /// `Revoke`.
    pub async fn revoke(&self, token: &TokenSource, provider: &ProviderRef) -> TokenResult<()> {
        self.token_client.revoke(token, provider).await
    }

    /// `RegisterModule`.
    pub async fn register_module(&self, module: Arc<dyn ClientModule>) {
        self.modules.register(module).await;
    }

    pub async fn get_module(&self, id: &str) -> Option<Arc<dyn ClientModule>> {
        self.modules.get(id).await
    }
}

impl Default for OidcRp {
    fn default() -> Self {
        Self::new()
    }
}
