//! Content-addressed cache of prior successful envelopes.
//!
//! Keys are deterministic fingerprints over (provider, query prefix,
//! requester). Eviction is FIFO-biased, not LRU: once the capacity is
//! exceeded, the oldest half of entries by insertion order is dropped.
//!
//! The interior state sits behind a mutex, which closes the lost-update race
//! between overlapping requests. There is deliberately no single-flight
//! coalescing and no TTL: two concurrent identical misses may both reach the
//! backend, and a stale successful answer can be re-served indefinitely.

use crate::providers::{ProviderId, ResponseEnvelope};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use tracing::debug;

/// Stable cache key derived from provider identity, a truncated query
/// prefix and requester identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(uuid::Uuid);

/// Number of leading query characters that participate in the fingerprint.
const QUERY_PREFIX_CHARS: usize = 200;

impl Fingerprint {
    pub fn compute(provider: ProviderId, query: &str, requester_id: i64) -> Self {
        let prefix: String = query.chars().take(QUERY_PREFIX_CHARS).collect();
        let seed = format!("{provider}:{prefix}:{requester_id}");
        Fingerprint(uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, seed.as_bytes()))
    }
}

#[derive(Debug)]
pub struct ResponseCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<Fingerprint, ResponseEnvelope>,
    /// Insertion order, oldest first.
    order: VecDeque<Fingerprint>,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, inner: Mutex::new(CacheInner::default()) }
    }

    /// Return a copy of the cached envelope, annotated as served from cache.
    pub async fn lookup(&self, fingerprint: &Fingerprint) -> Option<ResponseEnvelope> {
        let inner = self.inner.lock().await;
        inner.entries.get(fingerprint).map(|cached| {
            let mut envelope = cached.clone();
            envelope.metadata.insert("from_cache".to_string(), json!(true));
            envelope
        })
    }

    /// Store a successful envelope and evict the oldest `capacity / 2`
    /// entries when the capacity is exceeded. Non-success envelopes are
    /// never stored.
    pub async fn insert(&self, fingerprint: Fingerprint, envelope: ResponseEnvelope) {
        if !envelope.is_success() {
            return;
        }

        let mut inner = self.inner.lock().await;
        if inner.entries.insert(fingerprint, envelope).is_some() {
            inner.order.retain(|existing| existing != &fingerprint);
        }
        inner.order.push_back(fingerprint);

        if inner.entries.len() > self.capacity {
            // max(1) keeps a degenerate capacity of 0 or 1 from growing
            // without bound.
            let drop_count = (self.capacity / 2).max(1);
            for _ in 0..drop_count {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.entries.remove(&oldest);
                }
            }
            debug!(dropped = drop_count, remaining = inner.entries.len(), "cache eviction");
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }
}
