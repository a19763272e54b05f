//! Maps `ProviderId` → provider entity; lookup by issuer (§4.2).
//!
//! Backed by `DashMap` rather than a hand-written actor with its own message
//! queue: the only serialized operations are insert/get/remove, which a
//! sharded concurrent map already gives us without extra plumbing.

use crate::error::RegistryError;
use crate::provider::{Provider, ProviderConfig};
use crate::types::{ProviderId, ProviderRef};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Arc<DashMap<ProviderId, Arc<Provider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Arc::new(DashMap::new()),
        }
    }

    /// Register a provider and kick off its async bootstrap. If `id` is
    /// `None`, a fresh opaque id is generated; otherwise the caller's id is
    /// used, failing with `IdAlreadyUsed` if it collides.
    pub fn add_provider(
        &self,
        id: Option<ProviderId>,
        config: ProviderConfig,
    ) -> Result<(ProviderId, Arc<Provider>), RegistryError> {
        let id = id.unwrap_or_default();
        match self.providers.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(RegistryError::IdAlreadyUsed),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let provider = Provider::spawn(id, config, self.clone());
                slot.insert(provider.clone());
                Ok((id, provider))
            }
        }
    }

    /// Stop a provider's bootstrap task and drop it from the registry.
    pub fn remove_provider(&self, id: ProviderId) -> Result<(), RegistryError> {
        match self.providers.remove(&id) {
            Some((_, provider)) => {
                provider.shutdown();
                Ok(())
            }
            None => Err(RegistryError::NotFound),
        }
    }

    pub fn get_by_id(&self, id: ProviderId) -> Result<Arc<Provider>, RegistryError> {
        self.providers
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(RegistryError::NotFound)
    }

    /// First `ready` provider whose discovered issuer matches. Not-ready
    /// providers are skipped rather than erroring, since an unready provider
    /// has no issuer to compare against yet.
    pub fn find_by_issuer(&self, issuer: &str) -> Result<Arc<Provider>, RegistryError> {
        self.providers
            .iter()
            .map(|r| r.value().clone())
            .find(|p| {
                let info = p.info();
                info.ready && info.issuer.as_deref() == Some(issuer)
            })
            .ok_or(RegistryError::NotFound)
    }

    /// Turn either flavor of `ProviderRef` into the live provider it names.
    /// An `Info` ref is resolved back to the registry by issuer — it is a
    /// cached snapshot, not a handle, so callers that pass a stale one (an
    /// issuer no longer registered) get `NotFound` just as they would for an
    /// unknown id.
    pub fn resolve(&self, provider_ref: &ProviderRef) -> Result<Arc<Provider>, RegistryError> {
        match provider_ref {
            ProviderRef::Id(id) => self.get_by_id(*id),
            ProviderRef::Info(info) => match info.issuer.as_deref() {
                Some(issuer) => self.find_by_issuer(issuer),
                None => Err(RegistryError::NotFound),
            },
        }
    }

    /// Snapshot of all registered providers, ready or not.
    pub fn list(&self) -> Vec<(ProviderId, Arc<Provider>)> {
        self.providers
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect()
    }
}
