//! Command line argument parsing
//!
//! Subcommands:
//! - `ask`: Dispatch a single query to a provider
//! - `action`: Run a follow-up action on the latest interaction of a session
//! - `status`: Probe the availability of every provider
//! - `stats`: Print per-provider usage counters
//! - `interactive`: REPL that dispatches each line as a query

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ai-dispatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dispatch queries across AI providers with caching, classification and usage accounting")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    /// Configuration file path (TOML); environment variables are used when absent
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Dispatch a single query to a provider
    Ask {
        /// Target provider: claude, deepseek or dashka
        provider: String,
        /// Query text
        query: String,
        /// Requester identity, part of the cache key
        #[arg(long, default_value_t = 0)]
        requester: i64,
        /// Session identity, scopes conversation history
        #[arg(long, default_value_t = 0)]
        session: i64,
        /// Print the full response envelope as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a follow-up action against the latest interaction of a session
    Action {
        /// Target provider: claude, deepseek or dashka
        provider: String,
        /// Action name: clarify, deeper, optimize, performance or security
        action: String,
        /// Requester identity
        #[arg(long, default_value_t = 0)]
        requester: i64,
        /// Session identity
        #[arg(long, default_value_t = 0)]
        session: i64,
        /// Print the full response envelope as JSON
        #[arg(long)]
        json: bool,
    },
    /// Probe availability of every registered provider
    Status,
    /// Print per-provider usage counters
    Stats,
    /// Interactive mode: dispatch each input line as a query
    Interactive {
        /// Provider used for dispatched lines
        #[arg(short = 'p', long = "provider", default_value = "claude")]
        provider: String,
        /// Requester identity
        #[arg(long, default_value_t = 0)]
        requester: i64,
    },
}
