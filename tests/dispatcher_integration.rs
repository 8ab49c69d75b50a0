use ai_dispatch::providers::{AiProvider, CallParams};
use ai_dispatch::{
    Dispatcher, DispatcherConfig, ProviderId, ResponseEnvelope, ResponseStatus,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Scriptable backend used to drive the dispatcher through every lifecycle
/// path without network access.
struct ScriptedProvider {
    id: ProviderId,
    available: AtomicBool,
    calls: AtomicUsize,
    content: Mutex<String>,
    status: Mutex<ResponseStatus>,
    last_params: Mutex<Option<CallParams>>,
    last_query: Mutex<Option<String>>,
}

impl ScriptedProvider {
    fn new(id: ProviderId, content: &str) -> Arc<Self> {
        Arc::new(Self {
            id,
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            content: Mutex::new(content.to_string()),
            status: Mutex::new(ResponseStatus::Success),
            last_params: Mutex::new(None),
            last_query: Mutex::new(None),
        })
    }

    fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn set_content(&self, content: &str) {
        *self.content.lock().unwrap() = content.to_string();
    }

    fn set_status(&self, status: ResponseStatus) {
        *self.status.lock().unwrap() = status;
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_params(&self) -> CallParams {
        self.last_params.lock().unwrap().clone().expect("backend was called")
    }

    fn last_query(&self) -> String {
        self.last_query.lock().unwrap().clone().expect("backend was called")
    }
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn probe_availability(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn process(&self, query: &str, params: &CallParams) -> ResponseEnvelope {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some(params.clone());
        *self.last_query.lock().unwrap() = Some(query.to_string());

        ResponseEnvelope {
            content: self.content.lock().unwrap().clone(),
            provider: Some(self.id),
            status: *self.status.lock().unwrap(),
            execution_time: 0.01,
            tokens_used: 10,
            cost: 0.001,
            model: "scripted".to_string(),
            confidence: 0.0,
            suggestions: Vec::new(),
            metadata: HashMap::new(),
            timestamp: Utc::now(),
        }
    }
}

fn dispatcher_with(mock: Arc<ScriptedProvider>) -> Dispatcher {
    let mut registry: HashMap<ProviderId, Arc<dyn AiProvider>> = HashMap::new();
    registry.insert(mock.id(), mock);
    Dispatcher::with_registry(registry, &DispatcherConfig::default())
}

fn structured_long_answer() -> String {
    format!(
        "I recommend and suggest the optimal plan, which is better than the naive one.\n\
         1. Split the service\n2. Add a queue\n{}",
        "More supporting detail about the migration. ".repeat(30)
    )
}

#[tokio::test]
async fn successful_dispatch_enriches_and_caches() {
    let mock = ScriptedProvider::new(ProviderId::Claude, &structured_long_answer());
    let dispatcher = dispatcher_with(mock.clone());

    let query = "How should I design a microservice architecture?";
    let response = dispatcher.dispatch("claude", query, 1, 1).await;

    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.provider, Some(ProviderId::Claude));
    assert_eq!(response.metadata["category"], json!("architecture"));
    assert_eq!(response.metadata["processed_by"], json!("dispatcher"));
    assert_eq!(response.metadata["requester_id"], json!(1));
    assert!(!response.metadata.contains_key("from_cache"));
    // Long, structured, keyword-rich content hits the confidence ceiling.
    assert_eq!(response.confidence, 0.95);
    assert_eq!(response.suggestions.len(), 3);

    let stats = dispatcher.usage_stats().await;
    assert_eq!(stats[&ProviderId::Claude].requests, 1);
    assert_eq!(stats[&ProviderId::Claude].tokens, 10);
    assert_eq!(stats[&ProviderId::Claude].errors, 0);

    // Identical query from the same requester is served from cache: the
    // backend is not called again and the counters stay frozen.
    let cached = dispatcher.dispatch("claude", query, 1, 1).await;
    assert_eq!(cached.metadata["from_cache"], json!(true));
    assert_eq!(cached.content, response.content);
    assert_eq!(mock.calls(), 1);
    assert_eq!(dispatcher.usage_stats().await[&ProviderId::Claude].requests, 1);

    // A different requester misses the cache.
    dispatcher.dispatch("claude", query, 2, 1).await;
    assert_eq!(mock.calls(), 2);
}

#[tokio::test]
async fn unknown_provider_yields_error_envelope() {
    let mock = ScriptedProvider::new(ProviderId::Claude, "hi");
    let dispatcher = dispatcher_with(mock.clone());

    let response = dispatcher.dispatch("gpt5", "anything", 1, 1).await;
    assert_eq!(response.status, ResponseStatus::Error);
    assert_eq!(response.provider, None);
    assert!(response.content.contains("gpt5"));
    assert_eq!(mock.calls(), 0);

    let stats = dispatcher.usage_stats().await;
    assert!(stats.values().all(|c| c.requests == 0));
}

#[tokio::test]
async fn unavailable_provider_short_circuits_before_backend() {
    let mock = ScriptedProvider::new(ProviderId::DeepSeek, "hi");
    mock.set_available(false);
    let dispatcher = dispatcher_with(mock.clone());

    let response = dispatcher.dispatch("deepseek", "fix my bug", 1, 1).await;
    assert_eq!(response.status, ResponseStatus::NotAvailable);
    assert_eq!(response.provider, Some(ProviderId::DeepSeek));
    assert_eq!(mock.calls(), 0);

    // No backend call means no counters and no history entry, so a
    // follow-up on the same session still reports missing history.
    assert!(dispatcher.usage_stats().await.values().all(|c| c.requests == 0));
    let action = dispatcher.handle_action("deepseek", "clarify", 1, 1).await;
    assert_eq!(action.status, ResponseStatus::Error);
    assert!(action.content.contains("history"));
}

#[tokio::test]
async fn failed_backend_counts_error_and_is_not_cached() {
    let mock = ScriptedProvider::new(ProviderId::Claude, "partial answer");
    mock.set_status(ResponseStatus::Timeout);
    let dispatcher = dispatcher_with(mock.clone());

    let first = dispatcher.dispatch("claude", "slow question", 1, 1).await;
    assert_eq!(first.status, ResponseStatus::Timeout);

    let stats = dispatcher.usage_stats().await;
    assert_eq!(stats[&ProviderId::Claude].requests, 1);
    assert_eq!(stats[&ProviderId::Claude].errors, 1);

    // The failure was not cached: the retry reaches the backend again.
    dispatcher.dispatch("claude", "slow question", 1, 1).await;
    assert_eq!(mock.calls(), 2);
}

#[tokio::test]
async fn every_status_produces_a_well_formed_envelope() {
    let mock = ScriptedProvider::new(ProviderId::Dashka, "status check");
    let dispatcher = dispatcher_with(mock.clone());

    for (i, status) in [
        ResponseStatus::Success,
        ResponseStatus::Error,
        ResponseStatus::Timeout,
        ResponseStatus::RateLimited,
        ResponseStatus::NotAvailable,
        ResponseStatus::Partial,
    ]
    .into_iter()
    .enumerate()
    {
        mock.set_status(status);
        let response = dispatcher
            .dispatch("dashka", &format!("status run {i}"), 1, 1)
            .await;
        assert_eq!(response.status, status);
        assert_eq!(response.provider, Some(ProviderId::Dashka));
        assert_eq!(response.is_success(), status == ResponseStatus::Success);
    }

    let counters = dispatcher.usage_stats().await[&ProviderId::Dashka];
    assert_eq!(counters.requests, 6);
    assert_eq!(counters.errors, 5);
}

#[tokio::test]
async fn context_builds_from_prior_session_queries() {
    let mock = ScriptedProvider::new(ProviderId::Claude, "answer");
    let dispatcher = dispatcher_with(mock.clone());

    dispatcher.dispatch("claude", "first question", 1, 9).await;
    assert!(mock.last_params().context.is_none());

    dispatcher.dispatch("claude", "second question", 1, 9).await;
    let context = mock.last_params().context.expect("context after history");
    assert!(context.starts_with("Previous requests:"));
    assert!(context.contains("1. first question"));

    dispatcher.dispatch("claude", "third question", 1, 9).await;
    let context = mock.last_params().context.expect("context");
    assert!(context.contains("1. first question"));
    assert!(context.contains("2. second question"));
    assert!(!context.contains("third"));

    // Other sessions start without context.
    dispatcher.dispatch("claude", "elsewhere", 1, 10).await;
    assert!(mock.last_params().context.is_none());
}

#[tokio::test]
async fn follow_up_action_references_latest_query() {
    let mock = ScriptedProvider::new(ProviderId::Claude, "base answer");
    let dispatcher = dispatcher_with(mock.clone());

    dispatcher.dispatch("claude", "design a rate limiter", 1, 3).await;
    let response = dispatcher.handle_action("claude", "deeper", 1, 3).await;

    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.metadata["action"], json!("deeper"));
    assert!(mock.last_query().contains("design a rate limiter"));

    let params = mock.last_params();
    assert!(params.system_prompt.is_empty());
    assert_eq!(params.temperature, 0.1);

    // The action result itself lands in history and becomes the new anchor.
    dispatcher.handle_action("claude", "optimize", 1, 3).await;
    assert!(mock.last_query().starts_with("Suggest optimizations"));
}

#[tokio::test]
async fn actions_without_history_fail_for_all_variants() {
    let mock = ScriptedProvider::new(ProviderId::Dashka, "x");
    let dispatcher = dispatcher_with(mock.clone());

    for action in ["clarify", "deeper", "optimize", "performance", "security"] {
        let response = dispatcher.handle_action("dashka", action, 1, 77).await;
        assert_eq!(response.status, ResponseStatus::Error);
        assert_eq!(response.provider, None);
    }
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn unknown_action_is_rejected() {
    let mock = ScriptedProvider::new(ProviderId::Claude, "x");
    let dispatcher = dispatcher_with(mock.clone());

    dispatcher.dispatch("claude", "seed history", 1, 1).await;
    let response = dispatcher.handle_action("claude", "escalate", 1, 1).await;
    assert_eq!(response.status, ResponseStatus::Error);
    assert!(response.content.contains("escalate"));
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn confidence_grows_with_answer_length() {
    let mock = ScriptedProvider::new(ProviderId::DeepSeek, "");
    let dispatcher = dispatcher_with(mock.clone());

    mock.set_content(&"I recommend this approach. ".repeat(12));
    let short = dispatcher.dispatch("deepseek", "short one", 1, 1).await;

    mock.set_content(&"I recommend this approach. ".repeat(50));
    let long = dispatcher.dispatch("deepseek", "long one", 1, 1).await;

    assert!(long.confidence > short.confidence);
    assert!(long.confidence <= 0.95);
}

#[tokio::test]
async fn per_provider_temperatures_are_applied() {
    let claude = ScriptedProvider::new(ProviderId::Claude, "a");
    let deepseek = ScriptedProvider::new(ProviderId::DeepSeek, "b");
    let mut registry: HashMap<ProviderId, Arc<dyn AiProvider>> = HashMap::new();
    registry.insert(ProviderId::Claude, claude.clone());
    registry.insert(ProviderId::DeepSeek, deepseek.clone());
    let dispatcher = Dispatcher::with_registry(registry, &DispatcherConfig::default());

    dispatcher.dispatch("claude", "q", 1, 1).await;
    assert_eq!(claude.last_params().temperature, 0.1);

    dispatcher.dispatch("deepseek", "q", 1, 1).await;
    assert_eq!(deepseek.last_params().temperature, 0.3);
}

#[tokio::test]
async fn provider_status_reflects_probes_without_failing() {
    let mock = ScriptedProvider::new(ProviderId::Claude, "a");
    let dispatcher = dispatcher_with(mock.clone());

    let status = dispatcher.provider_status().await;
    assert_eq!(status[&ProviderId::Claude], true);

    mock.set_available(false);
    let status = dispatcher.provider_status().await;
    assert_eq!(status[&ProviderId::Claude], false);
}

#[tokio::test]
async fn small_cache_evicts_oldest_half() {
    let mock = ScriptedProvider::new(ProviderId::Claude, "cached answer");
    let mut registry: HashMap<ProviderId, Arc<dyn AiProvider>> = HashMap::new();
    registry.insert(ProviderId::Claude, mock.clone());
    let config = DispatcherConfig { cache_capacity: 4, ..DispatcherConfig::default() };
    let dispatcher = Dispatcher::with_registry(registry, &config);

    for i in 0..5 {
        dispatcher.dispatch("claude", &format!("question {i}"), 1, 1).await;
    }
    assert_eq!(mock.calls(), 5);

    // 5 > 4 dropped the oldest two entries; 0 and 1 miss, 2..4 hit.
    dispatcher.dispatch("claude", "question 0", 1, 1).await;
    dispatcher.dispatch("claude", "question 1", 1, 1).await;
    assert_eq!(mock.calls(), 7);

    dispatcher.dispatch("claude", "question 4", 1, 1).await;
    assert_eq!(mock.calls(), 7);
}

#[tokio::test]
async fn history_bound_covers_dispatch_and_actions_uniformly() {
    let mock = ScriptedProvider::new(ProviderId::Claude, "bounded answer");
    let mut registry: HashMap<ProviderId, Arc<dyn AiProvider>> = HashMap::new();
    registry.insert(ProviderId::Claude, mock.clone());
    let config = DispatcherConfig { history_limit: 2, ..DispatcherConfig::default() };
    let dispatcher = Dispatcher::with_registry(registry, &config);

    dispatcher.dispatch("claude", "alpha", 1, 1).await;
    dispatcher.dispatch("claude", "beta", 1, 1).await;
    dispatcher.dispatch("claude", "gamma", 1, 1).await;

    // Only the two newest interactions survive the bound, so the context
    // block sent with the next call no longer mentions the oldest query.
    dispatcher.dispatch("claude", "delta", 1, 1).await;
    let context = mock.last_params().context.expect("context");
    assert!(!context.contains("alpha"));
    assert!(context.contains("1. beta"));
    assert!(context.contains("2. gamma"));

    // Follow-up actions land in the same bounded log.
    dispatcher.handle_action("claude", "clarify", 1, 1).await;
    dispatcher.dispatch("claude", "epsilon", 1, 1).await;
    let context = mock.last_params().context.expect("context");
    assert!(context.contains("1. delta"));
    assert!(context.contains("2. Clarify"));
}

#[tokio::test]
async fn down_provider_stops_serving_cached_answers() {
    let mock = ScriptedProvider::new(ProviderId::Claude, "healthy answer");
    let dispatcher = dispatcher_with(mock.clone());

    let first = dispatcher.dispatch("claude", "is the cluster healthy?", 1, 1).await;
    assert!(first.is_success());
    assert_eq!(dispatcher.cache_size().await, 1);

    // Availability is checked before the cache, so an outage is reported
    // even for queries that were answered while the provider was healthy.
    mock.set_available(false);
    let second = dispatcher.dispatch("claude", "is the cluster healthy?", 1, 1).await;
    assert_eq!(second.status, ResponseStatus::NotAvailable);
    assert!(!second.metadata.contains_key("from_cache"));
    assert_eq!(mock.calls(), 1);

    // Once the provider recovers, the cached answer is served again.
    mock.set_available(true);
    let third = dispatcher.dispatch("claude", "is the cluster healthy?", 1, 1).await;
    assert_eq!(third.metadata["from_cache"], json!(true));
    assert_eq!(mock.calls(), 1);
    assert_eq!(dispatcher.cache_size().await, 1);
}
