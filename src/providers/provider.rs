use crate::config::ProvidersConfig;
use crate::providers::claude::ClaudeProvider;
use crate::providers::dashka::DashkaProvider;
use crate::providers::deepseek::DeepSeekProvider;
use crate::providers::types::{CallParams, ProviderId, ResponseEnvelope};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

/// Capability contract implemented by every backend variant.
///
/// Variants are purely technical adapters: they own their credentials and
/// HTTP client, build the vendor request, and map vendor errors to
/// [`ResponseStatus`](crate::providers::ResponseStatus) values. Classification,
/// prompt selection, caching, stats and history are dispatcher concerns and
/// never leak down here.
#[async_trait::async_trait]
pub trait AiProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Lightweight liveness check against the backend.
    ///
    /// Must never fail: any internal error is converted to `false`. Updates
    /// the variant's internal last-checked timestamp and error counter.
    async fn probe_availability(&self) -> bool;

    /// Perform the backend call.
    ///
    /// Infallible by contract: every operational failure (missing
    /// credential, timeout, rate limit, transport error, malformed body) is
    /// captured and returned as a status-tagged envelope.
    async fn process(&self, query: &str, params: &CallParams) -> ResponseEnvelope;
}

/// Probe bookkeeping shared by all variants. Plain data, never held across
/// an await point.
#[derive(Debug, Default)]
pub(crate) struct ProbeState {
    inner: Mutex<ProbeStateInner>,
}

#[derive(Debug, Default)]
struct ProbeStateInner {
    last_check: Option<DateTime<Utc>>,
    error_count: u64,
}

impl ProbeState {
    pub(crate) fn record_probe(&self, ok: bool) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.last_check = Some(Utc::now());
        if !ok {
            inner.error_count += 1;
        }
    }

    pub(crate) fn record_error(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.error_count += 1;
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> (Option<DateTime<Utc>>, u64) {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        (inner.last_check, inner.error_count)
    }
}

/// Construct the full provider registry from configuration.
///
/// One flat struct per backend, selected from this map at startup; variants
/// with missing credentials still register and deterministically report
/// themselves unavailable.
pub fn build_registry(config: &ProvidersConfig) -> HashMap<ProviderId, Arc<dyn AiProvider>> {
    let mut registry: HashMap<ProviderId, Arc<dyn AiProvider>> = HashMap::new();
    registry.insert(
        ProviderId::Claude,
        Arc::new(ClaudeProvider::new(config.claude.clone())),
    );
    registry.insert(
        ProviderId::DeepSeek,
        Arc::new(DeepSeekProvider::new(config.deepseek.clone())),
    );
    registry.insert(
        ProviderId::Dashka,
        Arc::new(DashkaProvider::new(config.dashka.clone())),
    );
    registry
}
