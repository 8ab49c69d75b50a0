//! Provider capability contract and the concrete backend variants.
//!
//! Variants are flat structs owning only their own credentials and HTTP
//! client. Everything with business meaning (classification, prompts,
//! caching, counters, history) lives in the dispatcher.

pub mod claude;
pub mod dashka;
pub mod deepseek;
pub mod provider;
pub mod types;

pub use claude::ClaudeProvider;
pub use dashka::DashkaProvider;
pub use deepseek::DeepSeekProvider;
pub use provider::{AiProvider, build_registry};
pub use types::{CallParams, DispatchError, ProviderId, ResponseEnvelope, ResponseStatus};
