//! Dispatcher configuration.
//!
//! Loaded either from a TOML file or from the environment variables the
//! provider backends conventionally use (`ANTHROPIC_API_KEY`,
//! `DEEPSEEK_API_KEY`, ...). All state derived from this configuration is
//! in-memory and process-lifetime; there is nothing durable to migrate.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Unified configuration for the dispatcher and all provider variants.
/// Every field is optional in TOML; omitted sections fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Maximum number of cached envelopes before eviction runs.
    pub cache_capacity: usize,
    /// Maximum retained interactions per session.
    pub history_limit: usize,
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub claude: ClaudeSettings,
    pub deepseek: DeepSeekSettings,
    pub dashka: DashkaSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaudeSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepSeekSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashkaSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub mode: DashkaMode,
    pub max_tokens: u32,
}

/// Dashka runs either as a self-contained mock or against a real support
/// API endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashkaMode {
    Mock,
    Api,
}

impl Default for ClaudeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-3-sonnet-20240229".to_string(),
            max_tokens: 4000,
        }
    }
}

impl Default for DeepSeekSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-coder".to_string(),
            max_tokens: 4000,
        }
    }
}

impl Default for DashkaSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.dashka.example.com".to_string(),
            mode: DashkaMode::Mock,
            max_tokens: 3000,
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 100,
            history_limit: 20,
            providers: ProvidersConfig::default(),
        }
    }
}

impl DispatcherConfig {
    /// Build configuration from defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = env::var("ANTHROPIC_API_KEY") {
            config.providers.claude.api_key = Some(key);
        }
        if let Ok(model) = env::var("CLAUDE_MODEL") {
            config.providers.claude.model = model;
        }
        if let Some(max) = parse_env_u32("CLAUDE_MAX_TOKENS") {
            config.providers.claude.max_tokens = max;
        }

        if let Ok(key) = env::var("DEEPSEEK_API_KEY") {
            config.providers.deepseek.api_key = Some(key);
        }
        if let Ok(url) = env::var("DEEPSEEK_BASE_URL") {
            config.providers.deepseek.base_url = url;
        }
        if let Ok(model) = env::var("DEEPSEEK_MODEL") {
            config.providers.deepseek.model = model;
        }
        if let Some(max) = parse_env_u32("DEEPSEEK_MAX_TOKENS") {
            config.providers.deepseek.max_tokens = max;
        }

        if let Ok(key) = env::var("DASHKA_API_KEY") {
            config.providers.dashka.api_key = Some(key);
        }
        if let Ok(url) = env::var("DASHKA_BASE_URL") {
            config.providers.dashka.base_url = url;
        }
        if let Ok(mode) = env::var("DASHKA_MODE") {
            config.providers.dashka.mode = match mode.to_lowercase().as_str() {
                "api" => DashkaMode::Api,
                _ => DashkaMode::Mock,
            };
        }

        config
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Save configuration to a TOML file.
    pub fn to_toml_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml_string()?;
        std::fs::write(path, content).context("Failed to write config file")
    }

    /// Convert configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

fn parse_env_u32(name: &str) -> Option<u32> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
