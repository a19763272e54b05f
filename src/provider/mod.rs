//! The provider entity: configuration, discovery, JWKS, and the
//! `Fetching-Config → Fetching-Keys → Ready` state machine (§4.1).
//!
//! Each provider owns a background `tokio::task` driving bootstrap and
//! retry; its queryable state is published through a single `ArcSwap` so
//! `GetConfig` never blocks and never observes a torn snapshot.

pub mod registry;

use crate::backoff::retry_delay;
use crate::error::ProviderError;
use crate::http::HttpClient;
use crate::jwks::JwksCache;
use crate::types::{ProviderId, Scopes};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Host-supplied configuration for a provider, fixed for its lifetime.
#[derive(Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub description: String,
    pub client_id: String,
    pub client_secret: String,
    pub config_endpoint: String,
    pub local_endpoint: String,
    pub default_scopes: Option<Scopes>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("config_endpoint", &self.config_endpoint)
            .field("local_endpoint", &self.local_endpoint)
            .finish()
    }
}

/// The OIDC Discovery 1.0 document, trimmed to the fields this crate uses.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    pub userinfo_endpoint: Option<String>,
    pub introspection_endpoint: Option<String>,
    pub revocation_endpoint: Option<String>,
    #[serde(default)]
    pub token_endpoint_auth_methods_supported: Vec<String>,
    #[serde(default)]
    pub id_token_signing_alg_values_supported: Vec<String>,
    #[serde(default)]
    pub scopes_supported: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderState {
    FetchingConfig,
    ConfigFailed,
    FetchingKeys,
    KeysFailed,
    Ready,
}

/// Mutable runtime state, published atomically as a whole. `discovered`
/// being `Some` implies discovery succeeded at least once; `ready` requires
/// both `discovered` and a non-empty JWKS.
struct RuntimeState {
    state: ProviderState,
    discovered: Option<DiscoveryDocument>,
    jwks: Option<Arc<JwksCache>>,
    ready: bool,
    last_refresh: Option<DateTime<Utc>>,
}

impl RuntimeState {
    fn initial() -> Self {
        Self {
            state: ProviderState::FetchingConfig,
            discovered: None,
            jwks: None,
            ready: false,
            last_refresh: None,
        }
    }
}

/// A registered provider: immutable config plus the live discovery/JWKS
/// state machine. Cheap to clone (an `Arc` internally via the registry).
pub struct Provider {
    pub id: ProviderId,
    pub config: ProviderConfig,
    http: HttpClient,
    state: ArcSwap<RuntimeState>,
    bootstrap_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    registry: registry::ProviderRegistry,
}

/// Snapshot returned by `GetConfig`/`GetProviderInfo` — never fails, always
/// reflects whatever has been published so far, including `ready=false`.
#[derive(Clone)]
pub struct ProviderInfo {
    pub id: ProviderId,
    pub name: String,
    pub description: String,
    pub client_id: String,
    pub client_secret: String,
    pub config_endpoint: String,
    pub local_endpoint: String,
    pub ready: bool,
    pub issuer: Option<String>,
    pub authorization_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub userinfo_endpoint: Option<String>,
    pub introspection_endpoint: Option<String>,
    pub revocation_endpoint: Option<String>,
    pub jwks_uri: Option<String>,
    pub jwks: jsonwebtoken::jwk::JwkSet,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub signing_algs_supported: Vec<String>,
    pub request_scopes: Option<Scopes>,
}

impl fmt::Debug for ProviderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("ready", &self.ready)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl Provider {
    /// Create a provider and spawn its bootstrap task. Returns immediately;
    /// `ready` starts `false` and becomes `true` once discovery and JWKS
    /// fetch both succeed.
    pub fn spawn(id: ProviderId, config: ProviderConfig, registry: registry::ProviderRegistry) -> Arc<Self> {
        let provider = Arc::new(Self {
            id,
            config,
            http: HttpClient::new(),
            state: ArcSwap::from_pointee(RuntimeState::initial()),
            bootstrap_task: std::sync::Mutex::new(None),
            registry,
        });

        let handle = {
            let provider = provider.clone();
            tokio::spawn(async move {
                provider.bootstrap_loop().await;
            })
        };
        *provider.bootstrap_task.lock().unwrap() = Some(handle);
        provider
    }

    /// Abort the background bootstrap/refresh task (called on removal).
    pub fn shutdown(&self) {
        if let Some(handle) = self.bootstrap_task.lock().unwrap().take() {
            handle.abort();
        }
    }

    async fn bootstrap_loop(self: Arc<Self>) {
        let mut attempt = 0u32;
        loop {
            match self.fetch_config().await {
                Ok(doc) => {
                    if let Err(e) = self.check_issuer_uniqueness(&doc.issuer) {
                        tracing::warn!(provider = %self.id, issuer = %doc.issuer, error = %e, "issuer already claimed by another provider");
                        self.publish_state(ProviderState::ConfigFailed);
                        return;
                    }
                    self.publish_discovered(doc.clone());
                    attempt = 0;
                    break;
                }
                Err(e) => {
                    tracing::warn!(provider = %self.id, error = %e, "discovery fetch failed");
                    self.publish_state(ProviderState::ConfigFailed);
                    tokio::time::sleep(retry_delay(attempt)).await;
                    attempt += 1;
                }
            }
        }

        attempt = 0;
        loop {
            match self.fetch_and_publish_keys().await {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!(provider = %self.id, error = %e, "jwks fetch failed");
                    self.publish_state(ProviderState::KeysFailed);
                    tokio::time::sleep(retry_delay(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn fetch_config(&self) -> Result<DiscoveryDocument, ProviderError> {
        let resp = self
            .http
            .get(&self.config.config_endpoint)
            .await
            .map_err(|e| match e {
                crate::http::HttpError::Timeout => ProviderError::Timeout,
                crate::http::HttpError::Request(e) => ProviderError::Http(e),
            })?;
        if resp.status != 200 {
            return Err(ProviderError::MalformedDiscovery(format!(
                "config endpoint returned status {}",
                resp.status
            )));
        }
        Ok(serde_json::from_str(&resp.body)?)
    }

    /// §3: issuer must be unique across providers once they're `Ready`.
    /// Checked against sibling entries in the same registry before this
    /// provider publishes its own discovery, so two providers racing to
    /// discover the same issuer can't both end up `Ready`.
    fn check_issuer_uniqueness(&self, issuer: &str) -> Result<(), ProviderError> {
        let collides = self.registry.list().into_iter().any(|(other_id, other)| {
            if other_id == self.id {
                return false;
            }
            let info = other.info();
            info.ready && info.issuer.as_deref() == Some(issuer)
        });
        if collides {
            Err(ProviderError::DuplicateIssuer)
        } else {
            Ok(())
        }
    }

    fn publish_discovered(&self, doc: DiscoveryDocument) {
        let jwks = Arc::new(JwksCache::new(doc.jwks_uri.clone()));
        self.state.rcu(|prev| {
            Arc::new(RuntimeState {
                state: ProviderState::FetchingKeys,
                discovered: Some(doc.clone()),
                jwks: Some(jwks.clone()),
                ready: false,
                last_refresh: prev.last_refresh,
            })
        });
    }

    fn publish_state(&self, state: ProviderState) {
        self.state.rcu(|prev| {
            Arc::new(RuntimeState {
                state: state.clone(),
                discovered: prev.discovered.clone(),
                jwks: prev.jwks.clone(),
                ready: prev.ready,
                last_refresh: prev.last_refresh,
            })
        });
    }

    async fn fetch_and_publish_keys(&self) -> Result<(), ProviderError> {
        let jwks = self
            .state
            .load()
            .jwks
            .clone()
            .expect("jwks cache created before FetchingKeys state");
        jwks.refresh(&self.http).await?;
        self.state.rcu(|prev| {
            Arc::new(RuntimeState {
                state: ProviderState::Ready,
                discovered: prev.discovered.clone(),
                jwks: prev.jwks.clone(),
                ready: true,
                last_refresh: Some(Utc::now()),
            })
        });
        Ok(())
    }

    /// Non-blocking trigger to re-fetch the JWKS (§4.1 `RefreshKeys`).
    /// Coalesced: if a refresh is already in flight, this call's spawned
    /// task waits on the same single-flight guard instead of racing it.
    pub fn refresh_keys(self: &Arc<Self>) {
        let provider = self.clone();
        tokio::spawn(async move {
            let jwks = provider.state.load().jwks.clone();
            if let Some(jwks) = jwks {
                if let Err(e) = jwks.refresh(&provider.http).await {
                    tracing::warn!(provider = %provider.id, error = %e, "refresh_keys failed");
                } else {
                    provider.state.rcu(|prev| {
                        Arc::new(RuntimeState {
                            state: prev.state.clone(),
                            discovered: prev.discovered.clone(),
                            jwks: prev.jwks.clone(),
                            ready: prev.ready,
                            last_refresh: Some(Utc::now()),
                        })
                    });
                }
            }
        });
    }

    /// Blocking (awaited) refresh, used internally by the validator's
    /// unknown-kid retry-once path (§4.5 rule 3), where the caller needs the
    /// refreshed keyset before retrying signature verification.
    pub async fn refresh_keys_and_wait(&self) -> Result<(), ProviderError> {
        let jwks = self.state.load().jwks.clone();
        match jwks {
            Some(jwks) => jwks.refresh(&self.http).await,
            None => Ok(()),
        }
    }

    /// Always-succeeding snapshot query (§4.1 `GetConfig`).
    pub fn info(&self) -> ProviderInfo {
        let s = self.state.load();
        let jwks_snapshot = s.jwks.as_ref().map(|j| j.load());
        ProviderInfo {
            id: self.id,
            name: self.config.name.clone(),
            description: self.config.description.clone(),
            client_id: self.config.client_id.clone(),
            client_secret: self.config.client_secret.clone(),
            config_endpoint: self.config.config_endpoint.clone(),
            local_endpoint: self.config.local_endpoint.clone(),
            ready: s.ready,
            issuer: s.discovered.as_ref().map(|d| d.issuer.clone()),
            authorization_endpoint: s.discovered.as_ref().map(|d| d.authorization_endpoint.clone()),
            token_endpoint: s.discovered.as_ref().map(|d| d.token_endpoint.clone()),
            userinfo_endpoint: s.discovered.as_ref().and_then(|d| d.userinfo_endpoint.clone()),
            introspection_endpoint: s
                .discovered
                .as_ref()
                .and_then(|d| d.introspection_endpoint.clone()),
            revocation_endpoint: s.discovered.as_ref().and_then(|d| d.revocation_endpoint.clone()),
            jwks_uri: s.discovered.as_ref().map(|d| d.jwks_uri.clone()),
            jwks: jwks_snapshot
                .map(|j| j.keys.clone())
                .unwrap_or(jsonwebtoken::jwk::JwkSet { keys: Vec::new() }),
            token_endpoint_auth_methods_supported: s
                .discovered
                .as_ref()
                .map(|d| d.token_endpoint_auth_methods_supported.clone())
                .unwrap_or_default(),
            signing_algs_supported: s
                .discovered
                .as_ref()
                .map(|d| d.id_token_signing_alg_values_supported.clone())
                .unwrap_or_default(),
            request_scopes: self.config.default_scopes.clone(),
        }
    }

    /// Find a JWK by `kid` in the current snapshot, if any.
    pub fn find_key(&self, kid: &str) -> Option<jsonwebtoken::jwk::Jwk> {
        self.state.load().jwks.as_ref().and_then(|j| j.find(kid))
    }

    pub(crate) fn http(&self) -> &HttpClient {
        &self.http
    }
}

impl Drop for Provider {
    fn drop(&mut self) {
        self.shutdown();
    }
}
