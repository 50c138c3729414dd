//! Listing Storage
//!
//! Durable store for listings and their PSBT schedules. The store is the
//! sole source of truth: the single-active-listing-per-UTXO invariant and
//! terminal-status stickiness are enforced here, in SQL, so that races
//! between concurrent admissions or between the push and poll event paths
//! cannot corrupt state.

pub mod sqlite;

pub use sqlite::SqliteListingStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Listing, ListingStatus, NewListing, PsbtStep, SpendFields, SubmitStep};

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(String),

    /// A non-terminal listing already holds this UTXO
    #[error("utxo already listed: {0}")]
    UtxoBusy(String),

    /// Write-lock contention; retriable
    #[error("store busy: {0}")]
    Busy(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("connection error: {0}")]
    Connection(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Which side of a sale an address is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressRole {
    Seller,
    Buyer,
}

/// Listing storage interface
///
/// Production implementation is `SqliteListingStore`; tests use its
/// `in_memory` constructor.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Insert a listing and its full schedule in one transaction
    ///
    /// Fails with `UtxoBusy` when a non-terminal listing already exists
    /// for the same UTXO. The check and the insert are atomic.
    async fn insert_listing(&self, listing: &NewListing, steps: &[SubmitStep])
        -> StorageResult<i64>;

    /// Fetch a listing by id
    async fn get(&self, id: i64) -> StorageResult<Option<Listing>>;

    /// Fetch the step for one block of a listing's schedule
    async fn step_for(&self, listing_id: i64, block: u64) -> StorageResult<Option<PsbtStep>>;

    /// All steps of a listing, ordered by block
    async fn steps(&self, listing_id: i64) -> StorageResult<Vec<PsbtStep>>;

    /// The distinct advertised prices of a listing's schedule
    async fn step_prices(&self, listing_id: i64) -> StorageResult<Vec<u64>>;

    /// Listings filtered by status; empty filter means all
    async fn list(&self, statuses: &[ListingStatus]) -> StorageResult<Vec<Listing>>;

    /// Listings where `address` is the seller or the recipient
    async fn list_by_address(
        &self,
        address: &str,
        role: AddressRole,
        statuses: &[ListingStatus],
    ) -> StorageResult<Vec<Listing>>;

    /// All listings still subject to transitions
    async fn non_terminal(&self) -> StorageResult<Vec<Listing>>;

    /// Non-terminal listings watching a given outpoint
    async fn watching_utxo(&self, txid: &str, vout: u32) -> StorageResult<Vec<Listing>>;

    /// Advance a non-terminal listing's status
    ///
    /// The write only lands when the persisted status still equals `from`,
    /// so stale evaluations and duplicate events fall through harmlessly.
    /// Returns whether a row changed.
    async fn advance_status(
        &self,
        id: i64,
        from: ListingStatus,
        to: ListingStatus,
    ) -> StorageResult<bool>;

    /// Terminally mark a listing `sold` or `closed` with its spend details
    ///
    /// No-op when the listing is already terminal: terminal states are
    /// sticky and repeated spend events have no further effect. Returns
    /// whether a row changed.
    async fn record_spend(
        &self,
        id: i64,
        to: ListingStatus,
        spend: &SpendFields,
    ) -> StorageResult<bool>;
}
