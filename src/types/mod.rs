//! Shared Data Types
//!
//! - `listing` - the listing aggregate, its PSBT steps, API payloads
//! - `qty` - fixed-point asset quantities

pub mod listing;
pub mod qty;

pub use listing::{
    Listing, ListingResponse, ListingStatus, NewListing, PsbtStep, SpendFields, SubmitListingRequest,
    SubmitStep,
};
pub use qty::AssetQty;

/// Current unix time in seconds
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
