//! Bounded per-session interaction history.
//!
//! Each session owns its own entry list (DashMap shard), so concurrent
//! sessions never contend on one lock. Entries are capped per session with
//! the oldest dropped first.

use crate::providers::ResponseEnvelope;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;

/// Maximum characters kept from a response when recording history.
const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    /// Original query, unbounded.
    pub query: String,
    /// Response preview, truncated to [`PREVIEW_CHARS`].
    pub response_preview: String,
    pub provider: String,
    pub timestamp: DateTime<Utc>,
    pub tokens_used: u64,
    pub execution_time: f64,
}

impl HistoryEntry {
    pub fn from_envelope(query: &str, envelope: &ResponseEnvelope) -> Self {
        Self {
            query: query.to_string(),
            response_preview: envelope.content.chars().take(PREVIEW_CHARS).collect(),
            provider: envelope
                .provider
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            timestamp: envelope.timestamp,
            tokens_used: envelope.tokens_used,
            execution_time: envelope.execution_time,
        }
    }
}

#[derive(Debug)]
pub struct SessionHistory {
    limit: usize,
    sessions: DashMap<i64, VecDeque<HistoryEntry>>,
}

impl SessionHistory {
    pub fn new(limit: usize) -> Self {
        Self { limit, sessions: DashMap::new() }
    }

    /// Append an entry, dropping the oldest beyond the per-session limit.
    pub fn append(&self, session_id: i64, entry: HistoryEntry) {
        let mut entries = self.sessions.entry(session_id).or_default();
        entries.push_back(entry);
        while entries.len() > self.limit {
            entries.pop_front();
        }
    }

    /// The most recent `n` entries, oldest first.
    pub fn recent(&self, session_id: i64, n: usize) -> Vec<HistoryEntry> {
        self.sessions
            .get(&session_id)
            .map(|entries| {
                let skip = entries.len().saturating_sub(n);
                entries.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    pub fn last(&self, session_id: i64) -> Option<HistoryEntry> {
        self.sessions.get(&session_id).and_then(|entries| entries.back().cloned())
    }

    #[cfg(test)]
    pub(crate) fn len(&self, session_id: i64) -> usize {
        self.sessions.get(&session_id).map(|entries| entries.len()).unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self, session_id: i64) -> bool {
        self.len(session_id) == 0
    }
}
