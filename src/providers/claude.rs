//! Claude provider variant.
//!
//! Technical adapter for the Anthropic messages API. Builds the vendor
//! request from the dispatcher-supplied [`CallParams`], maps vendor failures
//! to the standard statuses, and computes cost from the per-1K-token pricing
//! table. No business logic lives here.

use crate::config::ClaudeSettings;
use crate::providers::provider::{AiProvider, ProbeState};
use crate::providers::types::{CallParams, ProviderId, ResponseEnvelope, ResponseStatus};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

// $/1K tokens, input and output priced separately.
const INPUT_COST_PER_1K: f64 = 0.003;
const OUTPUT_COST_PER_1K: f64 = 0.015;

pub struct ClaudeProvider {
    client: reqwest::Client,
    settings: ClaudeSettings,
    probe_state: ProbeState,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

impl ClaudeProvider {
    pub fn new(settings: ClaudeSettings) -> Self {
        if settings.api_key.is_none() {
            warn!("ANTHROPIC_API_KEY not set; claude provider registered as not configured");
        }
        Self {
            client: reqwest::Client::new(),
            settings,
            probe_state: ProbeState::default(),
        }
    }

    fn build_request_body(&self, query: &str, params: &CallParams, max_tokens: u32) -> Value {
        let mut messages = Vec::new();
        if let Some(context) = &params.context {
            messages.push(json!({ "role": "user", "content": format!("Context: {context}") }));
        }
        messages.push(json!({ "role": "user", "content": query }));

        let system = if params.system_prompt.is_empty() {
            DEFAULT_SYSTEM_PROMPT
        } else {
            &params.system_prompt
        };

        json!({
            "model": self.settings.model,
            "max_tokens": max_tokens,
            "temperature": params.temperature,
            "system": system,
            "messages": messages,
        })
    }

    async fn post_messages(&self, api_key: &str, body: &Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(format!("{}/v1/messages", self.settings.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
    }

    fn calculate_cost(usage: &Usage) -> f64 {
        (usage.input_tokens as f64 / 1000.0) * INPUT_COST_PER_1K
            + (usage.output_tokens as f64 / 1000.0) * OUTPUT_COST_PER_1K
    }
}

#[async_trait::async_trait]
impl AiProvider for ClaudeProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Claude
    }

    async fn probe_availability(&self) -> bool {
        let Some(api_key) = self.settings.api_key.clone() else {
            self.probe_state.record_probe(false);
            return false;
        };

        let body = json!({
            "model": self.settings.model,
            "max_tokens": 1,
            "messages": [{ "role": "user", "content": "ping" }],
        });

        let ok = match self.post_messages(&api_key, &body).await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("claude probe failed: {e}");
                false
            }
        };
        self.probe_state.record_probe(ok);
        ok
    }

    async fn process(&self, query: &str, params: &CallParams) -> ResponseEnvelope {
        let start = Instant::now();

        let Some(api_key) = self.settings.api_key.clone() else {
            return ResponseEnvelope::provider_failure(
                ProviderId::Claude,
                ResponseStatus::NotAvailable,
                "Claude API is not configured; set ANTHROPIC_API_KEY",
                start.elapsed().as_secs_f64(),
            );
        };

        let body = self.build_request_body(query, params, self.settings.max_tokens);

        let response = match self.post_messages(&api_key, &body).await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                self.probe_state.record_error();
                return ResponseEnvelope::provider_failure(
                    ProviderId::Claude,
                    ResponseStatus::Timeout,
                    "Claude API request timed out",
                    start.elapsed().as_secs_f64(),
                );
            }
            Err(e) => {
                self.probe_state.record_error();
                warn!("claude transport error: {e}");
                return ResponseEnvelope::provider_failure(
                    ProviderId::Claude,
                    ResponseStatus::Error,
                    format!("Claude API transport error: {e}"),
                    start.elapsed().as_secs_f64(),
                );
            }
        };

        let status = response.status();
        let response_text = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            self.probe_state.record_error();
            return ResponseEnvelope::provider_failure(
                ProviderId::Claude,
                ResponseStatus::RateLimited,
                "Claude API rate limit exceeded",
                start.elapsed().as_secs_f64(),
            );
        }
        if !status.is_success() {
            self.probe_state.record_error();
            return ResponseEnvelope::provider_failure(
                ProviderId::Claude,
                ResponseStatus::Error,
                format!("Claude API error ({status}): {response_text}"),
                start.elapsed().as_secs_f64(),
            );
        }

        let api_response: ApiResponse = match serde_json::from_str(&response_text) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.probe_state.record_error();
                return ResponseEnvelope::provider_failure(
                    ProviderId::Claude,
                    ResponseStatus::Error,
                    format!("Claude API returned an unreadable response: {e}"),
                    start.elapsed().as_secs_f64(),
                );
            }
        };

        let content = api_response
            .content
            .iter()
            .find(|block| block.block_type == "text")
            .map(|block| block.text.clone())
            .unwrap_or_default();

        let mut metadata = HashMap::new();
        metadata.insert("input_tokens".to_string(), json!(api_response.usage.input_tokens));
        metadata.insert("output_tokens".to_string(), json!(api_response.usage.output_tokens));
        metadata.insert("stop_reason".to_string(), json!(api_response.stop_reason));
        metadata.insert("model".to_string(), json!(self.settings.model));

        ResponseEnvelope {
            content,
            provider: Some(ProviderId::Claude),
            status: ResponseStatus::Success,
            execution_time: start.elapsed().as_secs_f64(),
            tokens_used: api_response.usage.input_tokens + api_response.usage.output_tokens,
            cost: Self::calculate_cost(&api_response.usage),
            model: self.settings.model.clone(),
            confidence: 0.0,
            suggestions: Vec::new(),
            metadata,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClaudeSettings;

    fn provider_without_key() -> ClaudeProvider {
        ClaudeProvider::new(ClaudeSettings::default())
    }

    #[tokio::test]
    async fn unconfigured_provider_probes_false() {
        let provider = provider_without_key();
        assert!(!provider.probe_availability().await);
        let (last_check, errors) = provider.probe_state.snapshot();
        assert!(last_check.is_some());
        assert_eq!(errors, 1);
    }

    #[tokio::test]
    async fn unconfigured_provider_returns_not_available() {
        let provider = provider_without_key();
        let envelope = provider.process("hello", &CallParams::default()).await;
        assert_eq!(envelope.status, ResponseStatus::NotAvailable);
        assert_eq!(envelope.provider, Some(ProviderId::Claude));
        assert!(envelope.content.contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn cost_prices_input_and_output_separately() {
        let usage = Usage { input_tokens: 1000, output_tokens: 1000 };
        let cost = ClaudeProvider::calculate_cost(&usage);
        assert!((cost - 0.018).abs() < 1e-9);

        let usage = Usage { input_tokens: 500, output_tokens: 0 };
        assert!((ClaudeProvider::calculate_cost(&usage) - 0.0015).abs() < 1e-9);
    }

    #[test]
    fn empty_system_prompt_falls_back_to_default() {
        let provider = provider_without_key();
        let body = provider.build_request_body("q", &CallParams::default(), 100);
        assert_eq!(body["system"], DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn context_becomes_leading_user_message() {
        let provider = provider_without_key();
        let params = CallParams {
            context: Some("Previous requests:\n1. earlier question".to_string()),
            ..CallParams::default()
        };
        let body = provider.build_request_body("q", &params, 100);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0]["content"].as_str().unwrap().starts_with("Context:"));
        assert_eq!(messages[1]["content"], "q");
    }
}
