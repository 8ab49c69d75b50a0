//! # AI Dispatch
//!
//! A query dispatch engine for multiple AI providers. Inbound queries are
//! routed to a named provider, classified into a prompt category, executed
//! against the provider backend and enriched with confidence scoring and
//! follow-up suggestions. Successful answers are cached; every backend call
//! feeds per-provider usage counters and bounded per-session history.
//!
//! ## Architecture Overview
//!
//! - **[`providers`]**: Provider-agnostic backend trait plus the Claude,
//!   DeepSeek and Dashka variants
//! - **[`dispatcher`]**: End-to-end request lifecycle and follow-up actions
//! - **[`classify`]**: Keyword classification of queries into categories
//! - **[`prompts`]**: Static instruction templates and canned suggestions
//! - **[`cache`]**: Fingerprint-keyed response cache with half-drop eviction
//! - **[`stats`]**: Per-provider request, token and error counters
//! - **[`history`]**: Bounded per-session interaction history
//!
//! All state is in-memory and dies with the process; a restart starts from
//! an empty cache, zeroed counters and no history.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_dispatch::{Dispatcher, DispatcherConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let dispatcher = Dispatcher::new(DispatcherConfig::from_env());
//!     let response = dispatcher
//!         .dispatch("claude", "How should I design a microservice architecture?", 1, 1)
//!         .await;
//!     println!("{}", response.content);
//! }
//! ```

/// Provider backends and shared provider types.
///
/// Defines the [`providers::AiProvider`] trait, the response envelope and
/// status model, and the three concrete variants.
pub mod providers;

/// Request dispatcher and follow-up actions.
pub mod dispatcher;

/// Keyword classification of queries into prompt categories.
pub mod classify;

/// Static prompt templates and per-category suggestions.
pub mod prompts;

/// Fingerprint-keyed cache of successful responses.
pub mod cache;

/// Per-provider usage counters.
pub mod stats;

/// Bounded per-session interaction history.
pub mod history;

/// Dispatcher and provider configuration.
pub mod config;

// Re-export the main dispatch types
pub use dispatcher::{Dispatcher, FollowUpAction};

// Re-export configuration types
pub use config::{DashkaMode, DispatcherConfig, ProvidersConfig};

// Re-export provider types used at the API boundary
pub use providers::{
    AiProvider, CallParams, DispatchError, ProviderId, ResponseEnvelope, ResponseStatus,
};

// Re-export supporting state types
pub use cache::{Fingerprint, ResponseCache};
pub use classify::Category;
pub use history::{HistoryEntry, SessionHistory};
pub use stats::{ProviderCounters, UsageStats};

// CLI module for command-line interface
pub mod cli;
