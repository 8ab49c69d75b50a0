use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Closed set of backend identities. Used as the map key for the provider
/// registry, usage counters and status surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Claude,
    DeepSeek,
    Dashka,
}

impl ProviderId {
    /// All registered identities, in registry order.
    pub const ALL: [ProviderId; 3] = [ProviderId::Claude, ProviderId::DeepSeek, ProviderId::Dashka];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Claude => "claude",
            ProviderId::DeepSeek => "deepseek",
            ProviderId::Dashka => "dashka",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "claude" => Ok(ProviderId::Claude),
            "deepseek" => Ok(ProviderId::DeepSeek),
            "dashka" => Ok(ProviderId::Dashka),
            other => Err(DispatchError::UnknownProvider(other.to_string())),
        }
    }
}

/// Outcome classification carried by every [`ResponseEnvelope`].
///
/// Every consumption site matches exhaustively so a new status cannot fall
/// through silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
    Timeout,
    RateLimited,
    NotAvailable,
    Partial,
}

/// Universal result type returned by every provider call and by the
/// dispatcher itself. The transport collaborator only ever branches on
/// `status`; no error value crosses this boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub content: String,
    /// Absent for dispatcher-level failures (unknown provider, bad action).
    pub provider: Option<ProviderId>,
    pub status: ResponseStatus,
    /// Wall-clock execution time in seconds.
    pub execution_time: f64,
    pub tokens_used: u64,
    pub cost: f64,
    pub model: String,
    /// Answer quality estimate in `[0.0, 0.95]`; meaningful only on success.
    pub confidence: f64,
    /// Up to three follow-up suggestions.
    pub suggestions: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl ResponseEnvelope {
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Envelope for a failure produced by a provider variant.
    pub fn provider_failure(
        provider: ProviderId,
        status: ResponseStatus,
        message: impl Into<String>,
        execution_time: f64,
    ) -> Self {
        Self {
            content: message.into(),
            provider: Some(provider),
            status,
            execution_time,
            ..Self::empty()
        }
    }

    /// Envelope for a failure produced by the dispatcher before (or instead
    /// of) any backend call.
    pub fn dispatch_failure(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            provider: None,
            status: ResponseStatus::Error,
            execution_time: 0.0,
            ..Self::empty()
        }
    }

    fn empty() -> Self {
        Self {
            content: String::new(),
            provider: None,
            status: ResponseStatus::Error,
            execution_time: 0.0,
            tokens_used: 0,
            cost: 0.0,
            model: String::new(),
            confidence: 0.0,
            suggestions: Vec::new(),
            metadata: HashMap::new(),
            timestamp: Utc::now(),
        }
    }
}

/// Parameter bag handed to [`AiProvider::process`](crate::providers::AiProvider::process).
///
/// Built exclusively by the dispatcher; variants never compute prompts,
/// context or temperatures themselves.
#[derive(Debug, Clone, Default)]
pub struct CallParams {
    /// Instruction template selected for the classified category. Variants
    /// substitute their own generic default when empty.
    pub system_prompt: String,
    pub temperature: f32,
    /// Short formatted block of recent history, when any exists.
    pub context: Option<String>,
    pub requester_id: i64,
}

/// Caller-side failures surfaced by the dispatcher. These never escape the
/// dispatch boundary; they are rendered into Error-status envelopes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("no history available for session {0}")]
    NoHistory(i64),
}
