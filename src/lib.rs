//! dutchbid - Dutch Auction Broker for UTXO-Bound Counterparty Assets
//!
//! The broker accepts listings backed by a sequence of pre-signed PSBTs,
//! one per block over a declared range, with descending asking prices.
//! Only the PSBT whose block the chain tip has reached is ever revealed,
//! which is the anti-front-running guarantee of the whole system.
//!
//! ## Module Organization
//!
//! - `config` - Environment-based configuration
//! - `logging` - tracing subscriber setup
//! - `error` - Admission and service error kinds
//! - `types` - Listing, PSBT step, and API payload types
//! - `oracle` - Bitcoin node and Counterparty indexer adapters
//! - `storage` - SQLite-backed listing store
//! - `admission` - Submission validation pipeline
//! - `revelation` - Progressive PSBT revelation rule
//! - `engine` - Pure listing state-transition function
//! - `monitor` - Poll scheduler and ZMQ push subscribers
//! - `api` - HTTP server, routes, API-key auth

pub mod admission;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod oracle;
pub mod revelation;
pub mod storage;
pub mod types;

// Re-exports: Configuration
pub use config::{Config, ConfigError};

// Re-exports: Errors
pub use error::{AdmissionError, ServiceError};

// Re-exports: Core types
pub use types::{AssetQty, Listing, ListingStatus, PsbtStep, SpendFields};

// Re-exports: Oracles
pub use oracle::{AssetOracle, ChainOracle, OracleError, OracleResult};

// Re-exports: Storage
pub use storage::{ListingStore, SqliteListingStore, StorageError};
