//! JWKS fetch, atomic-swap cache, and kid-indexed lookup.
//!
//! Readers never take a lock (`ArcSwap::load`); a refresh publishes a whole
//! new snapshot in one atomic swap, so no observer ever sees a torn or empty
//! keyset (§5, §8 key-rotation atomicity). Concurrent `refresh()` callers
//! during an in-flight fetch are coalesced onto the first fetch's result
//! rather than issuing duplicate requests (§4.1 tie-break).

use crate::error::ProviderError;
use crate::http::HttpClient;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use jsonwebtoken::jwk::JwkSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct JwksSnapshot {
    pub keys: JwkSet,
    pub fetched_at: DateTime<Utc>,
}

impl JwksSnapshot {
    fn empty() -> Self {
        Self {
            keys: JwkSet { keys: Vec::new() },
            fetched_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.keys.is_empty()
    }
}

pub struct JwksCache {
    uri: String,
    current: ArcSwap<JwksSnapshot>,
    generation: AtomicU64,
    single_flight: Mutex<()>,
}

impl JwksCache {
    pub fn new(uri: String) -> Self {
        Self {
            uri,
            current: ArcSwap::from_pointee(JwksSnapshot::empty()),
            generation: AtomicU64::new(0),
            single_flight: Mutex::new(()),
        }
    }

    /// Current snapshot, lock-free.
    pub fn load(&self) -> Arc<JwksSnapshot> {
        self.current.load_full()
    }

    /// Find a key by `kid`. Returns `None` if the keyset is empty or the
    /// kid isn't present — callers (the validator) decide whether that
    /// warrants a refresh-and-retry.
    pub fn find(&self, kid: &str) -> Option<jsonwebtoken::jwk::Jwk> {
        self.load()
            .keys
            .keys
            .iter()
            .find(|k| k.common.key_id.as_deref() == Some(kid))
            .cloned()
    }

    /// Fetch the JWKS document and atomically publish it. Concurrent callers
    /// that arrive while a fetch is already in flight wait for it and then
    /// observe its result instead of starting a second HTTP request.
    pub async fn refresh(&self, http: &HttpClient) -> Result<(), ProviderError> {
        let generation_before = self.generation.load(Ordering::SeqCst);
        let _guard = self.single_flight.lock().await;

        // Someone else completed a refresh while we waited for the lock.
        if self.generation.load(Ordering::SeqCst) != generation_before {
            return Ok(());
        }

        let resp = http.get(&self.uri).await.map_err(|e| match e {
            crate::http::HttpError::Timeout => ProviderError::Timeout,
            crate::http::HttpError::Request(e) => ProviderError::Http(e),
        })?;
        if resp.status != 200 {
            return Err(ProviderError::MalformedDiscovery(format!(
                "jwks_uri returned status {}",
                resp.status
            )));
        }
        let keys: JwkSet = serde_json::from_str(&resp.body)?;
        self.current.store(Arc::new(JwksSnapshot {
            keys,
            fetched_at: Utc::now(),
        }));
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_has_no_keys() {
        let cache = JwksCache::new("https://op.example/jwks".to_string());
        assert!(cache.load().is_empty());
        assert!(cache.find("k1").is_none());
    }
}
