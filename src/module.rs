//! Client-module registry (§4.7): a process-wide record of host-supplied
//! post-auth handler modules. The library only remembers which modules are
//! registered; invoking their callbacks after a code exchange is the host's
//! job, not this crate's.

use crate::types::TokenBundle;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Metadata a registered module exposes. Kept minimal — the registry is a
/// bookkeeping surface, not a plugin execution engine.
#[derive(Debug, Clone)]
pub struct ModuleMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("module callback failed: {0}")]
    CallbackFailed(String),
}

/// Contract for a host-supplied post-auth handler. The library never calls
/// `on_authenticated` itself; it only stores the module so a host's web
/// layer can look it up by id and invoke the callback after a successful
/// code exchange.
#[async_trait]
pub trait ClientModule: Send + Sync {
    fn metadata(&self) -> &ModuleMetadata;

    async fn on_authenticated(&self, bundle: &TokenBundle) -> Result<(), ModuleError>;
}

/// Registry of registered modules, keyed by id. Duplicate registration
/// replaces the prior binding for that id rather than erroring — "last
/// registration wins" per §4.7.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: Arc<RwLock<HashMap<String, Arc<dyn ClientModule>>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            modules: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(&self, module: Arc<dyn ClientModule>) {
        let id = module.metadata().id.clone();
        self.modules.write().await.insert(id, module);
    }

    pub async fn get(&self, id: &str) -> Option<Arc<dyn ClientModule>> {
        self.modules.read().await.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<ModuleMetadata> {
        self.modules
            .read()
            .await
            .values()
            .map(|m| m.metadata().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub(ModuleMetadata);

    #[async_trait]
    impl ClientModule for Stub {
        fn metadata(&self) -> &ModuleMetadata {
            &self.0
        }

        async fn on_authenticated(&self, _bundle: &TokenBundle) -> Result<(), ModuleError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn duplicate_registration_replaces_prior_binding() {
        let registry = ModuleRegistry::new();
        registry
            .register(Arc::new(Stub(ModuleMetadata {
                id: "m1".into(),
                name: "first".into(),
                description: "".into(),
            })))
            .await;
        registry
            .register(Arc::new(Stub(ModuleMetadata {
                id: "m1".into(),
                name: "second".into(),
                description: "".into(),
            })))
            .await;

        assert_eq!(registry.list().await.len(), 1);
        assert_eq!(registry.get("m1").await.unwrap().metadata().name, "second");
    }

    #[tokio::test]
    async fn unregistered_id_is_none() {
        let registry = ModuleRegistry::new();
        assert!(registry.get("ghost").await.is_none());
    }
}
