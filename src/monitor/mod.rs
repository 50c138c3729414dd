//! Listing Monitor
//!
//! Drives the state engine from two redundant event sources: ZMQ push
//! notifications (real-time path) and periodic polling (authoritative
//! fallback - push may drop messages silently, poll guarantees eventual
//! progress). Both paths converge on the same evaluation, and the
//! store's status guards make duplicate deliveries harmless, so no
//! already-handled bookkeeping exists anywhere.
//!
//! Pipeline errors never propagate to users: every failure is logged and
//! the affected listing is retried on the next cycle.

pub mod zmq;

use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::engine;
use crate::oracle::{ChainOracle, OracleError, SpendingTx};
use crate::storage::ListingStore;
use crate::types::{unix_now, Listing};

/// Sweep driver shared by the poll scheduler and the push subscribers
pub struct ListingMonitor {
    store: Arc<dyn ListingStore>,
    chain: Arc<dyn ChainOracle>,
}

impl ListingMonitor {
    pub fn new(store: Arc<dyn ListingStore>, chain: Arc<dyn ChainOracle>) -> Self {
        Self { store, chain }
    }

    /// Periodic height sweep loop
    ///
    /// The first tick fires immediately, which repairs state missed while
    /// the service was down.
    pub async fn run_height_poll(
        self: Arc<Self>,
        interval_secs: u64,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.height_sweep().await {
                        warn!("height sweep skipped: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    info!("height poll stopping");
                    return;
                }
            }
        }
    }

    /// Periodic spend-detection loop
    pub async fn run_spend_poll(
        self: Arc<Self>,
        interval_secs: u64,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.spend_sweep().await {
                        warn!("spend sweep skipped: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    info!("spend poll stopping");
                    return;
                }
            }
        }
    }

    /// Push handler: a new best block arrived
    ///
    /// Height transitions and spend confirmations both happen exactly at
    /// block boundaries, so run both sweeps.
    pub async fn on_new_block(&self) {
        if let Err(e) = self.height_sweep().await {
            warn!("height sweep after block notification skipped: {e}");
        }
        if let Err(e) = self.spend_sweep().await {
            warn!("spend sweep after block notification skipped: {e}");
        }
    }

    /// Push handler: a raw transaction arrived
    ///
    /// Decodes the transaction and intersects its input outpoints with
    /// the watched UTXOs. Matches are re-checked against confirmed chain
    /// state; seeing a spender in the mempool never transitions state by
    /// itself.
    pub async fn on_raw_tx(&self, raw: &[u8]) {
        let tx: bitcoin::Transaction = match bitcoin::consensus::encode::deserialize(raw) {
            Ok(tx) => tx,
            Err(e) => {
                debug!("ignoring undecodable rawtx notification: {e}");
                return;
            }
        };

        for input in &tx.input {
            let txid = input.previous_output.txid.to_string();
            let vout = input.previous_output.vout;

            let watchers = match self.store.watching_utxo(&txid, vout).await {
                Ok(watchers) => watchers,
                Err(e) => {
                    error!("watched-utxo lookup failed for {txid}:{vout}: {e}");
                    continue;
                }
            };
            if watchers.is_empty() {
                continue;
            }

            info!("transaction {} touches {} watched utxo(s)", tx.compute_txid(), watchers.len());

            let tip = match self.chain.tip().await {
                Ok(tip) => tip,
                Err(e) => {
                    warn!("tip lookup failed handling rawtx: {e}");
                    return;
                }
            };

            for listing in &watchers {
                self.check_spend(listing, tip).await;
            }
        }
    }

    /// Apply height-driven transitions to every non-terminal listing
    pub async fn height_sweep(&self) -> Result<(), OracleError> {
        let tip = self.chain.tip().await?;
        debug!("height sweep at tip {tip}");

        let listings = match self.store.non_terminal().await {
            Ok(listings) => listings,
            Err(e) => {
                error!("height sweep could not load listings: {e}");
                return Ok(());
            }
        };

        for listing in &listings {
            self.apply(listing, tip, None).await;
        }

        Ok(())
    }

    /// Check every non-terminal listing's UTXO for a confirmed spend
    pub async fn spend_sweep(&self) -> Result<(), OracleError> {
        let tip = self.chain.tip().await?;

        let listings = match self.store.non_terminal().await {
            Ok(listings) => listings,
            Err(e) => {
                error!("spend sweep could not load listings: {e}");
                return Ok(());
            }
        };

        debug!("spend sweep over {} listing(s)", listings.len());
        for listing in &listings {
            self.check_spend(listing, tip).await;
        }

        Ok(())
    }

    /// Spend path for one listing: confirmed-spent check, spender lookup,
    /// then engine evaluation
    async fn check_spend(&self, listing: &Listing, tip: u64) {
        let spent = match self
            .chain
            .is_spent(&listing.utxo_txid, listing.utxo_vout)
            .await
        {
            Ok(spent) => spent,
            Err(e) => {
                warn!(
                    "listing {}: spent check failed, retrying next cycle: {e}",
                    listing.id
                );
                return;
            }
        };
        if !spent {
            return;
        }

        match self
            .chain
            .spending_tx(&listing.utxo_txid, listing.utxo_vout)
            .await
        {
            Ok(Some(tx)) => self.apply(listing, tip, Some(&tx)).await,
            Ok(None) => {
                // Unconfirmed spender, or one outside the scan window.
                // Classification requires a located transaction.
                debug!(
                    "listing {}: utxo {} spent but spender not located yet",
                    listing.id,
                    listing.outpoint()
                );
            }
            Err(e) => {
                warn!(
                    "listing {}: spender lookup failed, retrying next cycle: {e}",
                    listing.id
                );
            }
        }
    }

    /// Evaluate one listing and write back whatever transition applies
    async fn apply(&self, listing: &Listing, tip: u64, spend: Option<&SpendingTx>) {
        let prices = match self.store.step_prices(listing.id).await {
            Ok(prices) => prices,
            Err(e) => {
                error!("listing {}: schedule load failed: {e}", listing.id);
                return;
            }
        };

        let Some(transition) = engine::evaluate(listing, tip, spend, &prices, unix_now()) else {
            return;
        };

        let written = match &transition.spend {
            Some(fields) => self.store.record_spend(listing.id, transition.to, fields).await,
            None => {
                self.store
                    .advance_status(listing.id, transition.from, transition.to)
                    .await
            }
        };

        match written {
            Ok(true) => info!(
                "listing {} status updated: {} -> {}",
                listing.id, transition.from, transition.to
            ),
            // Stale evaluation or duplicate event; the guard absorbed it
            Ok(false) => debug!(
                "listing {}: transition {} -> {} superseded",
                listing.id, transition.from, transition.to
            ),
            Err(e) => error!(
                "listing {}: status write failed: {e}",
                listing.id
            ),
        }
    }
}
