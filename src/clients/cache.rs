//! Model-client factory and bounded cache.
//!
//! The engine asks a [`ModelClientFactory`] for a client per
//! `(model, credential, endpoint)` tuple. [`CachingClientFactory`] is the
//! process-owned implementation: it memoizes constructed clients in a
//! bounded map keyed by a SHA-256 fingerprint of the tuple and evicts the
//! oldest entry when full (FIFO). It is constructed explicitly and passed
//! into each engine — there is no global singleton.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, RwLock};

use sha2::{Digest, Sha256};

use crate::clients::model::{ModelClient, ModelSpec, OpenAiClient};
use crate::error::EngineResult;

/// Turns a model spec into a reusable client.
pub trait ModelClientFactory: Send + Sync + fmt::Debug {
    /// Return a client for the spec, constructing one if needed.
    ///
    /// Fails with a configuration error (e.g. missing credential) when a
    /// client cannot be built; the engine surfaces that before any node
    /// starts.
    fn client(&self, spec: &ModelSpec) -> EngineResult<Arc<dyn ModelClient>>;
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, Arc<dyn ModelClient>>,
    order: VecDeque<String>,
}

/// Bounded FIFO cache of [`OpenAiClient`] instances.
#[derive(Debug)]
pub struct CachingClientFactory {
    capacity: usize,
    inner: RwLock<CacheInner>,
}

impl CachingClientFactory {
    /// Create a cache holding at most `capacity` clients. A capacity of
    /// zero disables caching but still constructs clients on demand.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: RwLock::new(CacheInner::default()),
        }
    }

    /// Number of currently cached clients.
    pub fn len(&self) -> usize {
        self.inner.read().map(|c| c.entries.len()).unwrap_or(0)
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fingerprint a spec without exposing the credential in the key.
    fn fingerprint(spec: &ModelSpec) -> String {
        let mut hasher = Sha256::new();
        hasher.update(spec.api_key.as_bytes());
        hasher.update(b"\0");
        hasher.update(spec.base_url.as_bytes());
        hasher.update(b"\0");
        hasher.update(spec.model.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl ModelClientFactory for CachingClientFactory {
    fn client(&self, spec: &ModelSpec) -> EngineResult<Arc<dyn ModelClient>> {
        let key = Self::fingerprint(spec);

        if let Ok(inner) = self.inner.read() {
            if let Some(client) = inner.entries.get(&key) {
                return Ok(Arc::clone(client));
            }
        }

        let client: Arc<dyn ModelClient> = Arc::new(OpenAiClient::new(spec.clone())?);

        if self.capacity > 0 {
            if let Ok(mut inner) = self.inner.write() {
                // A concurrent caller may have inserted the same key; the
                // order queue tracks insertions, so only push when new.
                if inner.entries.insert(key.clone(), Arc::clone(&client)).is_none() {
                    inner.order.push_back(key);
                }
                while inner.entries.len() > self.capacity {
                    if let Some(oldest) = inner.order.pop_front() {
                        inner.entries.remove(&oldest);
                    } else {
                        break;
                    }
                }
            }
        }

        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn spec(model: &str) -> ModelSpec {
        ModelSpec {
            model: model.to_string(),
            api_key: "sk-test".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    #[test]
    fn test_cache_reuses_clients() {
        let factory = CachingClientFactory::new(4);
        let a = factory.client(&spec("model-a")).unwrap();
        let b = factory.client(&spec("model-a")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.len(), 1);
    }

    #[test]
    fn test_distinct_specs_get_distinct_clients() {
        let factory = CachingClientFactory::new(4);
        let a = factory.client(&spec("model-a")).unwrap();
        let b = factory.client(&spec("model-b")).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(factory.len(), 2);
    }

    #[test]
    fn test_fifo_eviction_when_full() {
        let factory = CachingClientFactory::new(2);
        let first = factory.client(&spec("model-a")).unwrap();
        factory.client(&spec("model-b")).unwrap();
        factory.client(&spec("model-c")).unwrap();
        assert_eq!(factory.len(), 2);

        // model-a was the oldest entry, so asking again builds a new client.
        let rebuilt = factory.client(&spec("model-a")).unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
    }

    #[test]
    fn test_missing_credential_propagates() {
        let factory = CachingClientFactory::new(2);
        let result = factory.client(&ModelSpec {
            api_key: String::new(),
            ..spec("model-a")
        });
        assert!(matches!(result, Err(EngineError::MissingCredential { .. })));
        assert!(factory.is_empty());
    }

    #[test]
    fn test_fingerprint_distinguishes_every_field() {
        let base = spec("model-a");
        let other_key = ModelSpec {
            api_key: "sk-other".to_string(),
            ..base.clone()
        };
        let other_url = ModelSpec {
            base_url: "https://other.test/v1".to_string(),
            ..base.clone()
        };
        assert_ne!(
            CachingClientFactory::fingerprint(&base),
            CachingClientFactory::fingerprint(&other_key)
        );
        assert_ne!(
            CachingClientFactory::fingerprint(&base),
            CachingClientFactory::fingerprint(&other_url)
        );
    }
}
