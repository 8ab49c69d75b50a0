//! Command line interface
//!
//! Argument parsing plus configuration discovery: an explicit `--config`
//! path wins, then `./ai-dispatch.toml` if present, then environment
//! variables with built-in defaults.

pub mod args;

pub use args::{Args, Commands};

use crate::config::DispatcherConfig;
use anyhow::Result;
use std::path::Path;
use tracing::info;

/// Default configuration file probed in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "ai-dispatch.toml";

/// Resolve the effective configuration for this invocation.
pub fn load_config(explicit: Option<&Path>) -> Result<DispatcherConfig> {
    if let Some(path) = explicit {
        info!(path = %path.display(), "loading configuration file");
        return DispatcherConfig::from_toml_file(path);
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        info!(path = DEFAULT_CONFIG_FILE, "loading discovered configuration file");
        return DispatcherConfig::from_toml_file(default_path);
    }

    info!("no configuration file found, using environment variables");
    Ok(DispatcherConfig::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn explicit_path_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "cache_capacity = 7\nhistory_limit = 3").expect("write");
        let config = load_config(Some(file.path())).expect("load");
        assert_eq!(config.cache_capacity, 7);
        assert_eq!(config.history_limit, 3);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        assert!(load_config(Some(Path::new("/nonexistent/dispatch.toml"))).is_err());
    }
}
