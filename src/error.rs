//! Error Kinds
//!
//! Admission failures are enumerated independently of HTTP so that the
//! transport layer can map them to status codes in one place. Pipeline
//! errors never reach users; they are logged and retried on the next
//! cycle.

use thiserror::Error;

use crate::oracle::OracleError;
use crate::storage::StorageError;

/// A rejected listing submission
///
/// Admission returns the first failure and performs no writes.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Structural check failed: missing/invalid fields, step count mismatch
    #[error("invalid submission: {0}")]
    Shape(String),

    /// Step coverage, price monotonicity, or fixed-price invariant violated
    #[error("invalid schedule: {0}")]
    Schedule(String),

    /// `start_block` is not in the future
    #[error("invalid start block: {0}")]
    Temporal(String),

    /// UTXO missing, spent, or unconfirmed
    #[error("utxo unavailable: {0}")]
    UtxoUnavailable(String),

    /// Multi-asset UTXO or wrong asset/quantity
    #[error("asset mismatch: {0}")]
    AssetMismatch(String),

    /// A non-terminal listing already exists for this UTXO
    #[error("utxo already listed: {0}")]
    UtxoInUse(String),

    /// Oracle failure while validating against live chain state
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// Store failure while persisting
    #[error("storage error: {0}")]
    Store(StorageError),
}

impl From<StorageError> for AdmissionError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::UtxoBusy(utxo) => AdmissionError::UtxoInUse(utxo),
            other => AdmissionError::Store(other),
        }
    }
}

impl AdmissionError {
    /// Whether the caller should retry the identical submission later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AdmissionError::Oracle(OracleError::Transient(_))
                | AdmissionError::Store(StorageError::Busy(_))
        )
    }
}

/// Startup and top-level service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utxo_busy_maps_to_in_use() {
        let err: AdmissionError = StorageError::UtxoBusy("ab:0".to_string()).into();
        assert!(matches!(err, AdmissionError::UtxoInUse(_)));
    }

    #[test]
    fn test_retryable() {
        assert!(AdmissionError::Oracle(OracleError::Transient("timeout".into())).is_retryable());
        assert!(!AdmissionError::Shape("missing field".into()).is_retryable());
        assert!(!AdmissionError::Oracle(OracleError::Fatal("bad auth".into())).is_retryable());
    }
}
