//! Environment-based Configuration
//!
//! All deployment-specific values come from environment variables. The
//! admission API key is the only hard requirement; everything else has a
//! sensible local-node default.
//!
//! # Environment Variables
//!
//! - `API_KEY` - admission auth key (required)
//! - `BITCOIN_RPC_HOST` / `BITCOIN_RPC_PORT` - Bitcoin Core JSON-RPC (default: 127.0.0.1:8332)
//! - `BITCOIN_RPC_USER` / `BITCOIN_RPC_PASSWORD` - JSON-RPC basic auth
//! - `ZMQ_ENABLED` - "true" to use Bitcoin Core push notifications (default: true)
//! - `ZMQ_BLOCK_URL` - rawblock publisher (default: tcp://127.0.0.1:28332)
//! - `ZMQ_TX_URL` - rawtx publisher (default: tcp://127.0.0.1:28333)
//! - `COUNTERPARTY_HOST` / `COUNTERPARTY_PORT` - Counterparty indexer API
//! - `DATABASE_PATH` - SQLite file (default: ./data/listings.db)
//! - `BLOCK_POLL_INTERVAL_SECONDS` / `UTXO_POLL_INTERVAL_SECONDS` - fallback
//!   polling cadence, ZMQ provides the real-time path (default: 300)
//! - `SPEND_SCAN_DEPTH` - how many recent blocks the spending-tx lookup walks
//! - `LISTEN_HOST` / `LISTEN_PORT` - HTTP bind address (default: 0.0.0.0:5000)
//! - `LOG_LEVEL` - trace, debug, info, warn, error (default: info)

use std::env;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Runtime configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// API key required on listing submissions
    pub api_key: String,

    pub bitcoin_rpc_host: String,
    pub bitcoin_rpc_port: u16,
    pub bitcoin_rpc_user: String,
    pub bitcoin_rpc_password: String,

    pub zmq_enabled: bool,
    pub zmq_block_url: String,
    pub zmq_tx_url: String,

    pub counterparty_host: String,
    pub counterparty_port: u16,

    pub database_path: String,

    /// Fallback polling cadence for block-driven transitions
    pub block_poll_interval_seconds: u64,
    /// Fallback polling cadence for spend detection
    pub utxo_poll_interval_seconds: u64,
    /// How many recent blocks the spending-tx lookup walks back from the tip
    pub spend_scan_depth: u64,

    pub listen_host: String,
    pub listen_port: u16,

    pub log_level: String,
}

impl Config {
    /// Load configuration from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: require("API_KEY")?,
            bitcoin_rpc_host: env_or("BITCOIN_RPC_HOST", "127.0.0.1"),
            bitcoin_rpc_port: parse_env("BITCOIN_RPC_PORT", 8332)?,
            bitcoin_rpc_user: env_or("BITCOIN_RPC_USER", "rpc"),
            bitcoin_rpc_password: env_or("BITCOIN_RPC_PASSWORD", "rpc"),
            zmq_enabled: env_or("ZMQ_ENABLED", "true").to_lowercase() == "true",
            zmq_block_url: env_or("ZMQ_BLOCK_URL", "tcp://127.0.0.1:28332"),
            zmq_tx_url: env_or("ZMQ_TX_URL", "tcp://127.0.0.1:28333"),
            counterparty_host: env_or("COUNTERPARTY_HOST", "api.counterparty.io"),
            counterparty_port: parse_env("COUNTERPARTY_PORT", 4000)?,
            database_path: env_or("DATABASE_PATH", "./data/listings.db"),
            block_poll_interval_seconds: parse_env("BLOCK_POLL_INTERVAL_SECONDS", 300)?,
            utxo_poll_interval_seconds: parse_env("UTXO_POLL_INTERVAL_SECONDS", 300)?,
            spend_scan_depth: parse_env("SPEND_SCAN_DEPTH", 144)?,
            listen_host: env_or("LISTEN_HOST", "0.0.0.0"),
            listen_port: parse_env("LISTEN_PORT", 5000)?,
            log_level: env_or("LOG_LEVEL", "info"),
        })
    }

    /// Counterparty API base URL
    pub fn counterparty_url(&self) -> String {
        format!("https://{}:{}", self.counterparty_host, self.counterparty_port)
    }
}

fn require(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), raw)),
        Err(_) => Ok(default),
    }
}
