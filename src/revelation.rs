//! Progressive PSBT Revelation
//!
//! Given a listing and the current tip, decide which single PSBT step, if
//! any, may be exposed. Future steps stay hidden until the chain reaches
//! their block; that is the anti-front-running property the broker
//! exists for. During the grace window after the end block the final
//! (lowest-price) step remains purchasable.

use crate::types::{Listing, ListingStatus};

/// Why no PSBT is currently exposed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithheldReason {
    Sold,
    Closed,
    NotStarted,
    Expired,
}

impl WithheldReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Sold => "listing is sold",
            Self::Closed => "listing is closed",
            Self::NotStarted => "listing has not started yet",
            Self::Expired => "listing has ended",
        }
    }
}

/// Decide which schedule block may be revealed at the given tip
///
/// Never returns a block beyond `now`.
pub fn reveal_target(listing: &Listing, now: u64) -> Result<u64, WithheldReason> {
    match listing.status {
        ListingStatus::Sold => return Err(WithheldReason::Sold),
        ListingStatus::Closed => return Err(WithheldReason::Closed),
        _ => {}
    }

    if now < listing.start_block {
        return Err(WithheldReason::NotStarted);
    }
    if now <= listing.end_block {
        return Ok(now);
    }
    if listing.blocks_after_end > 0 && now <= listing.grace_end() {
        return Ok(listing.end_block);
    }

    Err(WithheldReason::Expired)
}
