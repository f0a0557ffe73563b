use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

pub use broker_api::OverflowPolicy;

#[derive(Parser)]
#[command(
    name = "streamhub-server",
    about = "Topic stream broker: live fan-out + scheduled batch persistence"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the broker server
    Serve(ServeArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml", env = "CONFIG_PATH")]
    pub config: String,
}

// ---- TOML Config ----

/// Built-in durable store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Memory,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// How often the flush scheduler inspects topic activity.
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
    /// Idle time after which a topic is flushed regardless of size.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Record count that arms the size-triggered flush.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Per-session outbound queue capacity (WS frames / subscription buffers).
    #[serde(default = "default_session_buffer")]
    pub session_buffer: usize,
    /// Overflow behavior of per-session delivery queues.
    #[serde(default = "default_session_overflow")]
    pub session_overflow: OverflowPolicy,
    /// Durable store receiving flushed batches.
    #[serde(default = "default_store")]
    pub store: StoreKind,
}

fn default_api_port() -> u16 {
    9200
}
fn default_check_interval_ms() -> u64 {
    10_000
}
fn default_flush_interval_ms() -> u64 {
    60_000
}
fn default_batch_size() -> usize {
    10
}
fn default_session_buffer() -> usize {
    4096
}
fn default_session_overflow() -> OverflowPolicy {
    OverflowPolicy::Drop
}
fn default_store() -> StoreKind {
    StoreKind::Memory
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            check_interval_ms: default_check_interval_ms(),
            flush_interval_ms: default_flush_interval_ms(),
            batch_size: default_batch_size(),
            session_buffer: default_session_buffer(),
            session_overflow: default_session_overflow(),
            store: default_store(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self, crate::error::ServerError> {
        if !std::path::Path::new(path).exists() {
            tracing::info!(config = %path, "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::ServerError::Config {
                context: "read",
                detail: format!("'{path}': {e}"),
            }
        })?;
        toml::from_str(&content).map_err(|e| crate::error::ServerError::Config {
            context: "parse",
            detail: format!("'{path}': {e}"),
        })
    }
}
