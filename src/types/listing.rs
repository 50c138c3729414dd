//! Listing Types
//!
//! A listing is a Dutch auction (or a single-block fixed-price sale) of a
//! Counterparty asset pinned to one Bitcoin UTXO. Its lifecycle:
//!
//! upcoming → active → finished → expired
//!
//! with a terminal jump to `sold` or `closed` from any non-terminal state
//! once the UTXO is confirmed spent.

use serde::{Deserialize, Serialize};

use super::qty::AssetQty;

/// Status of a listing through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    /// Admitted, start block not yet reached
    Upcoming,
    /// Inside the auction block range, a PSBT is purchasable
    Active,
    /// Past the end block, final PSBT purchasable during the grace window
    Finished,
    /// Grace window elapsed without a sale
    Expired,
    /// UTXO spent by a transaction matching a step price
    Sold,
    /// UTXO spent out-of-band
    Closed,
}

impl ListingStatus {
    /// Terminal listings never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sold | Self::Closed | Self::Expired)
    }

    /// The three states that count against the one-listing-per-UTXO guard
    pub const NON_TERMINAL: [ListingStatus; 3] = [Self::Upcoming, Self::Active, Self::Finished];
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Upcoming => "upcoming",
            Self::Active => "active",
            Self::Finished => "finished",
            Self::Expired => "expired",
            Self::Sold => "sold",
            Self::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(Self::Upcoming),
            "active" => Ok(Self::Active),
            "finished" => Ok(Self::Finished),
            "expired" => Ok(Self::Expired),
            "sold" => Ok(Self::Sold),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("unknown status: {}", s)),
        }
    }
}

/// A persisted listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    /// Monotonically assigned identifier
    pub id: i64,
    /// Counterparty asset name
    pub asset_name: String,
    /// Quantity bound to the UTXO
    pub asset_qty: AssetQty,
    /// Transaction id of the UTXO carrying the asset
    pub utxo_txid: String,
    /// Output index of the UTXO
    pub utxo_vout: u32,
    /// First block of the auction range
    pub start_block: u64,
    /// Last block of the auction range
    pub end_block: u64,
    /// Grace window after `end_block` during which the final PSBT stays purchasable
    pub blocks_after_end: u64,
    pub start_price_sats: u64,
    pub end_price_sats: u64,
    pub price_decrement: u64,
    pub status: ListingStatus,

    // Populated only on terminal spend (sold or closed)
    pub spent_txid: Option<String>,
    pub spent_block: Option<u64>,
    pub spent_at: Option<u64>,
    /// Recipient address of the spending transaction
    pub recipient: Option<String>,

    /// Address controlling the UTXO at admission
    pub seller: Option<String>,
    /// Unix timestamp of admission
    pub created_at: u64,
}

impl Listing {
    /// UTXO in `txid:vout` form
    pub fn outpoint(&self) -> String {
        format!("{}:{}", self.utxo_txid, self.utxo_vout)
    }

    /// Last block at which the final PSBT is still purchasable
    pub fn grace_end(&self) -> u64 {
        self.end_block + self.blocks_after_end
    }
}

/// Spend details written together with a terminal `sold`/`closed` status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendFields {
    pub spent_txid: String,
    pub spent_block: u64,
    pub spent_at: u64,
    pub recipient: Option<String>,
}

/// A listing to persist; the store assigns the id and the `upcoming` status
#[derive(Debug, Clone)]
pub struct NewListing {
    pub asset_name: String,
    pub asset_qty: AssetQty,
    pub utxo_txid: String,
    pub utxo_vout: u32,
    pub start_block: u64,
    pub end_block: u64,
    pub blocks_after_end: u64,
    pub start_price_sats: u64,
    pub end_price_sats: u64,
    pub price_decrement: u64,
    pub seller: Option<String>,
    pub created_at: u64,
}

/// One pre-signed PSBT of a listing's schedule, unique on `(listing_id, block_number)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsbtStep {
    pub listing_id: i64,
    /// Height at which this step becomes the current step
    pub block_number: u64,
    /// Advertised price
    pub price_sats: u64,
    /// Opaque base64 blob, never decoded beyond the magic-byte check
    pub psbt_data: String,
}

// =============================================================================
// API Request/Response Types
// =============================================================================

/// POST /listings - submit a listing with its full PSBT schedule
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitListingRequest {
    pub asset_name: String,
    pub asset_qty: AssetQty,
    pub utxo_txid: String,
    pub utxo_vout: u32,
    pub start_block: u64,
    pub end_block: u64,
    /// Defaults to 144 blocks (roughly one day) when omitted
    pub blocks_after_end: Option<u64>,
    pub start_price_sats: u64,
    pub end_price_sats: u64,
    pub price_decrement: u64,
    pub psbts: Vec<SubmitStep>,
}

/// One step of a submitted schedule
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitStep {
    pub block_number: u64,
    pub price_sats: u64,
    pub psbt_data: String,
}

/// Listing metadata as served by the API
///
/// Never carries the PSBT schedule; future steps stay hidden until their
/// block is reached.
#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub id: i64,
    pub asset_name: String,
    pub asset_qty: AssetQty,
    pub utxo_txid: String,
    pub utxo_vout: u32,
    pub start_block: u64,
    pub end_block: u64,
    pub blocks_after_end: u64,
    pub start_price_sats: u64,
    pub end_price_sats: u64,
    pub price_decrement: u64,
    pub status: ListingStatus,
    pub spent_txid: Option<String>,
    pub spent_block: Option<u64>,
    pub spent_at: Option<u64>,
    pub recipient: Option<String>,
    pub seller: Option<String>,
    pub created_at: u64,
}

impl From<&Listing> for ListingResponse {
    fn from(l: &Listing) -> Self {
        Self {
            id: l.id,
            asset_name: l.asset_name.clone(),
            asset_qty: l.asset_qty,
            utxo_txid: l.utxo_txid.clone(),
            utxo_vout: l.utxo_vout,
            start_block: l.start_block,
            end_block: l.end_block,
            blocks_after_end: l.blocks_after_end,
            start_price_sats: l.start_price_sats,
            end_price_sats: l.end_price_sats,
            price_decrement: l.price_decrement,
            status: l.status,
            spent_txid: l.spent_txid.clone(),
            spent_block: l.spent_block,
            spent_at: l.spent_at,
            recipient: l.recipient.clone(),
            seller: l.seller.clone(),
            created_at: l.created_at,
        }
    }
}
