//! Per-provider usage counters.
//!
//! Volatile, process-lifetime accounting: counters only ever grow and are
//! reset by restart. Cache hits and pre-backend short-circuits deliberately
//! do not touch them; every real backend call does, including failed ones.

use crate::providers::{ProviderId, ResponseEnvelope};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ProviderCounters {
    pub requests: u64,
    pub tokens: u64,
    pub errors: u64,
}

#[derive(Debug)]
pub struct UsageStats {
    counters: Mutex<HashMap<ProviderId, ProviderCounters>>,
}

impl UsageStats {
    pub fn new() -> Self {
        let mut counters = HashMap::new();
        for id in ProviderId::ALL {
            counters.insert(id, ProviderCounters::default());
        }
        Self { counters: Mutex::new(counters) }
    }

    /// Record one backend call outcome.
    pub async fn record(&self, provider: ProviderId, envelope: &ResponseEnvelope) {
        let mut counters = self.counters.lock().await;
        let entry = counters.entry(provider).or_default();
        entry.requests += 1;
        entry.tokens += envelope.tokens_used;
        if !envelope.is_success() {
            entry.errors += 1;
        }
    }

    /// Immutable snapshot copy of all counters.
    pub async fn snapshot(&self) -> HashMap<ProviderId, ProviderCounters> {
        self.counters.lock().await.clone()
    }
}

impl Default for UsageStats {
    fn default() -> Self {
        Self::new()
    }
}
