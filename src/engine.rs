//! Listing State Engine
//!
//! Pure transition function over `(listing, tip, spend observation)`. The
//! monitor fetches chain state and applies the returned transition through
//! the store; nothing here performs I/O, which keeps every rule testable
//! without mocks.
//!
//! A confirmed spend always wins over height progression: a listing in any
//! non-terminal state jumps straight to `sold` or `closed` the moment its
//! UTXO is observed consumed. Without a spend, the engine lands the
//! listing on whatever state the current tip implies, so a listing that
//! was never evaluated while purchasable legally skips intermediate
//! states (nothing was revealed during the missed window).
//!
//! Duplicate events are harmless by construction: the store refuses
//! transitions whose `from` status is stale and never lets a terminal
//! status move, so re-applying any transition is a no-op.

use crate::oracle::SpendingTx;
use crate::types::{Listing, ListingStatus, SpendFields};

/// A status change the store should apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Status the listing held when evaluated; the store's write guard
    pub from: ListingStatus,
    pub to: ListingStatus,
    /// Present exactly when `to` is `sold` or `closed`
    pub spend: Option<SpendFields>,
}

/// Evaluate one listing against the current tip and an optional confirmed
/// spend observation
///
/// `step_prices` is the set of advertised prices across the listing's
/// schedule; `now` is the wall-clock timestamp recorded on a terminal
/// spend. Returns `None` when no transition applies.
pub fn evaluate(
    listing: &Listing,
    tip: u64,
    spend: Option<&SpendingTx>,
    step_prices: &[u64],
    now: u64,
) -> Option<Transition> {
    if listing.status.is_terminal() {
        return None;
    }

    if let Some(tx) = spend {
        let (to, fields) = classify_spend(step_prices, tx, now);
        return Some(Transition {
            from: listing.status,
            to,
            spend: Some(fields),
        });
    }

    let target = height_status(listing, tip);
    if rank(target) > rank(listing.status) {
        return Some(Transition {
            from: listing.status,
            to: target,
            spend: None,
        });
    }

    None
}

/// The status a never-spent listing holds at a given tip
pub fn height_status(listing: &Listing, tip: u64) -> ListingStatus {
    if tip < listing.start_block {
        ListingStatus::Upcoming
    } else if tip <= listing.end_block {
        ListingStatus::Active
    } else if listing.blocks_after_end > 0 && tip <= listing.grace_end() {
        ListingStatus::Finished
    } else {
        ListingStatus::Expired
    }
}

/// Classify a confirmed spend as a sale through one of our PSBTs or an
/// out-of-band close
///
/// An output whose value equals any advertised step price is taken as a
/// PSBT settlement; the first such output (in output order) names the
/// buyer. The signal is heuristic, not cryptographic proof, and that is
/// the advertised semantics.
pub fn classify_spend(step_prices: &[u64], tx: &SpendingTx, now: u64) -> (ListingStatus, SpendFields) {
    let matched = tx
        .outputs
        .iter()
        .find(|out| step_prices.contains(&out.value_sats));

    let (status, recipient) = match matched {
        Some(out) => (ListingStatus::Sold, out.address.clone()),
        // Best effort: first output that carries an address at all
        None => (
            ListingStatus::Closed,
            tx.outputs.iter().find_map(|out| out.address.clone()),
        ),
    };

    (
        status,
        SpendFields {
            spent_txid: tx.txid.clone(),
            spent_block: tx.block_height,
            spent_at: now,
            recipient,
        },
    )
}

/// Forward-only ordering of the height-driven states
fn rank(status: ListingStatus) -> u8 {
    match status {
        ListingStatus::Upcoming => 0,
        ListingStatus::Active => 1,
        ListingStatus::Finished => 2,
        ListingStatus::Expired => 3,
        ListingStatus::Sold | ListingStatus::Closed => 4,
    }
}
