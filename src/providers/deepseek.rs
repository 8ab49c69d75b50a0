//! DeepSeek provider variant.
//!
//! Technical adapter for the OpenAI-compatible chat-completions API exposed
//! by DeepSeek. Same contract as the other variants: vendor failures never
//! escape as errors, only as status-tagged envelopes.

use crate::config::DeepSeekSettings;
use crate::providers::provider::{AiProvider, ProbeState};
use crate::providers::types::{CallParams, ProviderId, ResponseEnvelope, ResponseStatus};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful coding assistant.";

// $/1K tokens.
const INPUT_COST_PER_1K: f64 = 0.0014;
const OUTPUT_COST_PER_1K: f64 = 0.0028;

pub struct DeepSeekProvider {
    client: reqwest::Client,
    settings: DeepSeekSettings,
    probe_state: ProbeState,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

impl DeepSeekProvider {
    pub fn new(settings: DeepSeekSettings) -> Self {
        if settings.api_key.is_none() {
            warn!("DEEPSEEK_API_KEY not set; deepseek provider registered as not configured");
        }
        Self {
            client: reqwest::Client::new(),
            settings,
            probe_state: ProbeState::default(),
        }
    }

    fn build_request_body(&self, query: &str, params: &CallParams, max_tokens: u32) -> Value {
        let system = if params.system_prompt.is_empty() {
            DEFAULT_SYSTEM_PROMPT
        } else {
            &params.system_prompt
        };

        let mut messages = vec![json!({ "role": "system", "content": system })];
        if let Some(context) = &params.context {
            messages.push(json!({ "role": "user", "content": format!("Context: {context}") }));
        }
        messages.push(json!({ "role": "user", "content": query }));

        json!({
            "model": self.settings.model,
            "messages": messages,
            "max_tokens": max_tokens,
            "temperature": params.temperature,
        })
    }

    async fn post_completions(
        &self,
        api_key: &str,
        body: &Value,
    ) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(format!("{}/chat/completions", self.settings.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
    }

    fn calculate_cost(usage: &Usage) -> f64 {
        (usage.prompt_tokens as f64 / 1000.0) * INPUT_COST_PER_1K
            + (usage.completion_tokens as f64 / 1000.0) * OUTPUT_COST_PER_1K
    }
}

#[async_trait::async_trait]
impl AiProvider for DeepSeekProvider {
    fn id(&self) -> ProviderId {
        ProviderId::DeepSeek
    }

    async fn probe_availability(&self) -> bool {
        let Some(api_key) = self.settings.api_key.clone() else {
            self.probe_state.record_probe(false);
            return false;
        };

        let body = json!({
            "model": self.settings.model,
            "messages": [{ "role": "user", "content": "ping" }],
            "max_tokens": 1,
        });

        let ok = match self.post_completions(&api_key, &body).await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("deepseek probe failed: {e}");
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
                ProviderId::DeepSeek,
                ResponseStatus::NotAvailable,
                "DeepSeek API is not configured; set DEEPSEEK_API_KEY",
                start.elapsed().as_secs_f64(),
            );
        };

        let body = self.build_request_body(query, params, self.settings.max_tokens);

        let response = match self.post_completions(&api_key, &body).await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                self.probe_state.record_error();
                return ResponseEnvelope::provider_failure(
                    ProviderId::DeepSeek,
                    ResponseStatus::Timeout,
                    "DeepSeek API request timed out",
                    start.elapsed().as_secs_f64(),
                );
            }
            Err(e) => {
                self.probe_state.record_error();
                warn!("deepseek transport error: {e}");
                return ResponseEnvelope::provider_failure(
                    ProviderId::DeepSeek,
                    ResponseStatus::Error,
                    format!("DeepSeek API transport error: {e}"),
                    start.elapsed().as_secs_f64(),
                );
            }
        };

        let status = response.status();
        let response_text = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            self.probe_state.record_error();
            return ResponseEnvelope::provider_failure(
                ProviderId::DeepSeek,
                ResponseStatus::RateLimited,
                "DeepSeek API rate limit exceeded",
                start.elapsed().as_secs_f64(),
            );
        }
        if !status.is_success() {
            self.probe_state.record_error();
            return ResponseEnvelope::provider_failure(
                ProviderId::DeepSeek,
                ResponseStatus::Error,
                format!("DeepSeek API error ({status}): {response_text}"),
                start.elapsed().as_secs_f64(),
            );
        }

        let api_response: ApiResponse = match serde_json::from_str(&response_text) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.probe_state.record_error();
                return ResponseEnvelope::provider_failure(
                    ProviderId::DeepSeek,
                    ResponseStatus::Error,
                    format!("DeepSeek API returned an unreadable response: {e}"),
                    start.elapsed().as_secs_f64(),
                );
            }
        };

        let content = api_response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();
        let finish_reason = api_response
            .choices
            .first()
            .and_then(|choice| choice.finish_reason.clone());
        let usage = api_response.usage.unwrap_or_default();

        let mut metadata = HashMap::new();
        metadata.insert("input_tokens".to_string(), json!(usage.prompt_tokens));
        metadata.insert("output_tokens".to_string(), json!(usage.completion_tokens));
        metadata.insert("finish_reason".to_string(), json!(finish_reason));
        metadata.insert("model".to_string(), json!(self.settings.model));

        ResponseEnvelope {
            content,
            provider: Some(ProviderId::DeepSeek),
            status: ResponseStatus::Success,
            execution_time: start.elapsed().as_secs_f64(),
            tokens_used: usage.total_tokens,
            cost: Self::calculate_cost(&usage),
            model: self.settings.model.clone(),
            confidence: 0.0,
            suggestions: Vec::new(),
            metadata,
            timestamp: Utc::now(),
        }
    }
}
