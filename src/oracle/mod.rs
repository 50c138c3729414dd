//! Oracle Interfaces
//!
//! The broker consumes two read-only oracles: the Bitcoin node (chain
//! state) and the Counterparty indexer (asset balances bound to a UTXO).
//! Both are capability traits so tests can inject fakes; the live
//! implementations live in `bitcoin_rpc` and `counterparty`.
//!
//! Failure semantics matter more than the method set: a `Transient`
//! failure must never alter listing state. Callers retry on the next
//! scheduler tick or push event.

pub mod bitcoin_rpc;
pub mod counterparty;

pub use bitcoin_rpc::BitcoinRpc;
pub use counterparty::CounterpartyClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::AssetQty;

/// Oracle failures
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    /// Network trouble, timeout, node still warming up - retry next cycle
    #[error("transient oracle failure: {0}")]
    Transient(String),

    /// Auth or protocol error - operator intervention expected
    #[error("fatal oracle failure: {0}")]
    Fatal(String),
}

pub type OracleResult<T> = Result<T, OracleError>;

/// A confirmed, unspent transaction output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoInfo {
    pub value_sats: u64,
    pub confirmations: u64,
    /// Address of the controlling scriptPubKey, when one exists
    pub address: Option<String>,
}

/// An outpoint reference `(txid, vout)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutPointRef {
    pub txid: String,
    pub vout: u32,
}

/// One output of a spending transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutputSummary {
    pub value_sats: u64,
    /// None for outputs without an address form (OP_RETURN and friends)
    pub address: Option<String>,
}

/// A confirmed transaction that consumed a watched UTXO
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendingTx {
    pub txid: String,
    pub block_height: u64,
    pub block_time: Option<u64>,
    pub outputs: Vec<TxOutputSummary>,
    pub inputs: Vec<OutPointRef>,
}

/// An asset balance bound to a UTXO
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBalance {
    pub asset: String,
    pub quantity: AssetQty,
    pub divisible: bool,
}

/// Read-only view of confirmed Bitcoin chain state
#[async_trait]
pub trait ChainOracle: Send + Sync {
    /// Current best-chain height
    async fn tip(&self) -> OracleResult<u64>;

    /// Look up an unspent output; `None` means missing or already spent
    async fn utxo(&self, txid: &str, vout: u32) -> OracleResult<Option<UtxoInfo>>;

    /// Convenience over `utxo`
    async fn is_spent(&self, txid: &str, vout: u32) -> OracleResult<bool> {
        Ok(self.utxo(txid, vout).await?.is_none())
    }

    /// Locate the confirmed transaction that consumed an outpoint
    ///
    /// `None` when the spend cannot be located (outside the scan window,
    /// or the outpoint is not actually spent).
    async fn spending_tx(&self, txid: &str, vout: u32) -> OracleResult<Option<SpendingTx>>;
}

/// Read-only view of Counterparty asset state
#[async_trait]
pub trait AssetOracle: Send + Sync {
    /// All asset balances attached to a UTXO
    ///
    /// Returns the full set so admission can reject multi-asset UTXOs.
    async fn balances(&self, txid: &str, vout: u32) -> OracleResult<Vec<AssetBalance>>;
}
