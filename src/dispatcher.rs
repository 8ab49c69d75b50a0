//! Request dispatcher.
//!
//! Composes the provider registry, classifier, prompt tables, cache, usage
//! counters and session history into the end-to-end request lifecycle:
//!
//! ```text
//! Received -> ProviderResolved -> AvailabilityChecked -> { CacheHit -> Done
//!   | Classified -> PromptSelected -> BackendCalled
//!     -> Enriched -> StatsUpdated -> CachedIfSuccess -> HistoryAppended -> Done }
//! ```
//!
//! Every code path returns a well-formed envelope; no error value escapes to
//! the transport. One dispatcher is constructed at process start and passed
//! by reference to every caller; all of its state is in-memory and dies with
//! the process.

use crate::cache::{Fingerprint, ResponseCache};
use crate::classify::{Category, classify};
use crate::config::DispatcherConfig;
use crate::history::{HistoryEntry, SessionHistory};
use crate::prompts::{select_prompt, suggestions_for};
use crate::providers::{
    AiProvider, CallParams, DispatchError, ProviderId, ResponseEnvelope, ResponseStatus,
    build_registry,
};
use crate::stats::{ProviderCounters, UsageStats};
use futures::future::join_all;
use serde_json::json;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Quality keywords that raise the confidence score.
const QUALITY_KEYWORDS: [&str; 4] = ["recommend", "suggest", "optimal", "better"];
/// Structural markers (numbered list, bullet, bold) that indicate a
/// well-organized answer.
const STRUCTURE_MARKERS: [&str; 3] = ["1.", "•", "**"];
/// Confidence ceiling.
const MAX_CONFIDENCE: f64 = 0.95;

/// How many history entries feed the formatted context block, and how many
/// characters of each query survive.
const CONTEXT_ENTRIES: usize = 2;
const CONTEXT_QUERY_CHARS: usize = 100;

/// Temperature used for follow-up actions.
const ACTION_TEMPERATURE: f32 = 0.1;

/// Follow-up actions available on a prior interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpAction {
    Clarify,
    Deeper,
    Optimize,
    Performance,
    Security,
}

impl FollowUpAction {
    pub const ALL: [FollowUpAction; 5] = [
        FollowUpAction::Clarify,
        FollowUpAction::Deeper,
        FollowUpAction::Optimize,
        FollowUpAction::Performance,
        FollowUpAction::Security,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FollowUpAction::Clarify => "clarify",
            FollowUpAction::Deeper => "deeper",
            FollowUpAction::Optimize => "optimize",
            FollowUpAction::Performance => "performance",
            FollowUpAction::Security => "security",
        }
    }

    /// Instruction referencing the most recent query.
    fn instruction(&self, last_query: &str) -> String {
        match self {
            FollowUpAction::Clarify => {
                format!("Clarify and expand the analysis for this request: {last_query}")
            }
            FollowUpAction::Deeper => {
                format!("Provide a deeper analysis with technical details for: {last_query}")
            }
            FollowUpAction::Optimize => {
                format!("Suggest optimizations and improvements for: {last_query}")
            }
            FollowUpAction::Performance => {
                format!("Analyze performance characteristics and tuning options for: {last_query}")
            }
            FollowUpAction::Security => {
                format!("Analyze security implications and potential vulnerabilities for: {last_query}")
            }
        }
    }
}

impl FromStr for FollowUpAction {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clarify" => Ok(FollowUpAction::Clarify),
            "deeper" => Ok(FollowUpAction::Deeper),
            "optimize" => Ok(FollowUpAction::Optimize),
            "performance" => Ok(FollowUpAction::Performance),
            "security" => Ok(FollowUpAction::Security),
            other => Err(DispatchError::UnknownAction(other.to_string())),
        }
    }
}

/// Process-wide orchestrator. Owns the cache, the usage counters and all
/// session history for the life of the process; provider variants own only
/// their own credentials and clients.
pub struct Dispatcher {
    providers: HashMap<ProviderId, Arc<dyn AiProvider>>,
    cache: ResponseCache,
    stats: UsageStats,
    history: SessionHistory,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        let providers = build_registry(&config.providers);
        Self::with_registry(providers, &config)
    }

    /// Construct with an explicit registry. Used by tests to install mock
    /// providers behind the same orchestration paths.
    pub fn with_registry(
        providers: HashMap<ProviderId, Arc<dyn AiProvider>>,
        config: &DispatcherConfig,
    ) -> Self {
        Self {
            providers,
            cache: ResponseCache::new(config.cache_capacity),
            stats: UsageStats::new(),
            history: SessionHistory::new(config.history_limit),
        }
    }

    /// Execute the full request lifecycle for one inbound query.
    pub async fn dispatch(
        &self,
        provider_id: &str,
        query: &str,
        requester_id: i64,
        session_id: i64,
    ) -> ResponseEnvelope {
        let Ok(id) = ProviderId::from_str(provider_id) else {
            warn!(provider = provider_id, "dispatch rejected: unknown provider");
            return ResponseEnvelope::dispatch_failure(format!(
                "Provider '{provider_id}' is not registered"
            ));
        };
        // The registry covers every ProviderId variant, so resolution after
        // a successful parse cannot miss; keep the guard for custom registries.
        let Some(provider) = self.providers.get(&id).cloned() else {
            return ResponseEnvelope::dispatch_failure(format!(
                "Provider '{provider_id}' is not registered"
            ));
        };

        // Probe before consulting the cache: a down provider stops serving
        // answers, cached or not, and its probe bookkeeping stays current.
        if !provider.probe_availability().await {
            info!(provider = %id, "short-circuit: provider unavailable");
            return ResponseEnvelope::provider_failure(
                id,
                ResponseStatus::NotAvailable,
                format!("Provider '{id}' is temporarily unavailable"),
                0.0,
            );
        }

        let fingerprint = Fingerprint::compute(id, query, requester_id);
        if let Some(cached) = self.cache.lookup(&fingerprint).await {
            info!(provider = %id, "cache hit");
            return cached;
        }

        let category = classify(id, query);
        let params = CallParams {
            system_prompt: select_prompt(id, category).to_string(),
            temperature: temperature_for(id),
            context: self.build_context(session_id),
            requester_id,
        };
        debug!(provider = %id, %category, "backend call");

        let mut envelope = provider.process(query, &params).await;
        self.enrich(&mut envelope, id, category, requester_id);

        self.stats.record(id, &envelope).await;
        if envelope.is_success() {
            self.cache.insert(fingerprint, envelope.clone()).await;
        } else {
            warn!(provider = %id, status = ?envelope.status, "backend call did not succeed");
        }
        self.history.append(session_id, HistoryEntry::from_envelope(query, &envelope));

        envelope
    }

    /// Execute a follow-up action against the most recent interaction of a
    /// session. Bypasses cache and classification entirely.
    pub async fn handle_action(
        &self,
        provider_id: &str,
        action: &str,
        requester_id: i64,
        session_id: i64,
    ) -> ResponseEnvelope {
        let Ok(id) = ProviderId::from_str(provider_id) else {
            return ResponseEnvelope::dispatch_failure(format!(
                "Provider '{provider_id}' is not registered"
            ));
        };
        let Some(provider) = self.providers.get(&id).cloned() else {
            return ResponseEnvelope::dispatch_failure(format!(
                "Provider '{provider_id}' is not registered"
            ));
        };
        let Ok(action) = FollowUpAction::from_str(action) else {
            warn!(action, "follow-up rejected: unknown action");
            return ResponseEnvelope::dispatch_failure(format!("Unknown action: {action}"));
        };
        let Some(last) = self.history.last(session_id) else {
            return ResponseEnvelope::dispatch_failure(
                DispatchError::NoHistory(session_id).to_string(),
            );
        };

        let prompt = action.instruction(&last.query);
        let params = CallParams {
            system_prompt: String::new(),
            temperature: ACTION_TEMPERATURE,
            context: None,
            requester_id,
        };
        debug!(provider = %id, action = action.as_str(), "follow-up backend call");

        let mut envelope = provider.process(&prompt, &params).await;
        envelope
            .metadata
            .insert("action".to_string(), json!(action.as_str()));
        envelope
            .metadata
            .insert("processed_by".to_string(), json!("dispatcher"));
        if envelope.confidence == 0.0 {
            envelope.confidence = score_confidence(&envelope.content);
        }

        self.stats.record(id, &envelope).await;
        self.history
            .append(session_id, HistoryEntry::from_envelope(&prompt, &envelope));

        envelope
    }

    /// Probe every registered provider concurrently. Never fails; a failing
    /// probe affects only its own provider's boolean.
    pub async fn provider_status(&self) -> HashMap<ProviderId, bool> {
        let probes = self.providers.iter().map(|(id, provider)| {
            let id = *id;
            let provider = provider.clone();
            async move { (id, provider.probe_availability().await) }
        });
        join_all(probes).await.into_iter().collect()
    }

    /// Snapshot copy of the per-provider usage counters.
    pub async fn usage_stats(&self) -> HashMap<ProviderId, ProviderCounters> {
        self.stats.snapshot().await
    }

    /// Number of responses currently cached.
    pub async fn cache_size(&self) -> usize {
        self.cache.len().await
    }

    /// Format the most recent history entries as a numbered context block.
    /// None when the session has no history yet.
    fn build_context(&self, session_id: i64) -> Option<String> {
        let recent = self.history.recent(session_id, CONTEXT_ENTRIES);
        if recent.is_empty() {
            return None;
        }

        let mut block = String::from("Previous requests:\n");
        for (i, entry) in recent.iter().enumerate() {
            let query: String = entry.query.chars().take(CONTEXT_QUERY_CHARS).collect();
            block.push_str(&format!("{}. {query}\n", i + 1));
        }
        Some(block)
    }

    /// Fill in derived fields the backend left empty.
    fn enrich(
        &self,
        envelope: &mut ResponseEnvelope,
        provider: ProviderId,
        category: Category,
        requester_id: i64,
    ) {
        envelope
            .metadata
            .insert("category".to_string(), json!(category.as_str()));
        envelope
            .metadata
            .insert("processed_by".to_string(), json!("dispatcher"));
        envelope
            .metadata
            .insert("requester_id".to_string(), json!(requester_id));
        envelope
            .metadata
            .insert("provider".to_string(), json!(provider.as_str()));

        if envelope.suggestions.is_empty() {
            envelope.suggestions = suggestions_for(provider, category);
        }
        if envelope.confidence == 0.0 {
            envelope.confidence = score_confidence(&envelope.content);
        }
    }
}

/// Provider-specific sampling temperature: precision for consulting and
/// support, slightly more freedom for code generation.
fn temperature_for(provider: ProviderId) -> f32 {
    match provider {
        ProviderId::Claude => 0.1,
        ProviderId::DeepSeek => 0.3,
        ProviderId::Dashka => 0.1,
    }
}

/// Heuristic confidence score over answer content, clamped to
/// [`MAX_CONFIDENCE`]. Empty content scores zero.
pub(crate) fn score_confidence(content: &str) -> f64 {
    if content.is_empty() {
        return 0.0;
    }

    let mut confidence: f64 = 0.5;
    let lower = content.to_lowercase();
    for keyword in QUALITY_KEYWORDS {
        if lower.contains(keyword) {
            confidence += 0.05;
        }
    }
    if STRUCTURE_MARKERS.iter().any(|marker| content.contains(marker)) {
        confidence += 0.1;
    }

    let chars = content.chars().count();
    if chars > 500 {
        confidence += 0.1;
    }
    if chars > 1000 {
        confidence += 0.1;
    }

    confidence.min(MAX_CONFIDENCE)
}
