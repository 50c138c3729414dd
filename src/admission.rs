//! Listing Admission
//!
//! Ordered validation pipeline for submitted listings. Checks run from
//! cheap and local to oracle-backed; the first failure rejects the whole
//! submission with no side effect. The only write is the final atomic
//! insert, whose UTXO guard lives in the store.
//!
//! Check order:
//! 1. shape - fields, ranges, step count
//! 2. PSBT format - base64 + magic bytes, never decoded further
//! 3. schedule - coverage, endpoints, descending prices, decrement fit
//! 4. temporal - start block strictly in the future
//! 5. UTXO liveness - exists, unspent, confirmed
//! 6. asset binding - exactly the declared asset and quantity
//! 7. single-active guard - enforced by the insert itself

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::info;

use crate::error::AdmissionError;
use crate::oracle::{AssetOracle, ChainOracle};
use crate::storage::{ListingStore, StorageError};
use crate::types::{unix_now, Listing, NewListing, SubmitListingRequest, SubmitStep};

/// Grace window applied when a submission omits `blocks_after_end`
pub const DEFAULT_BLOCKS_AFTER_END: u64 = 144;

/// PSBT magic prefix: "psbt" followed by 0xff
const PSBT_MAGIC: [u8; 5] = [0x70, 0x73, 0x62, 0x74, 0xff];

/// Validate a submission against its own schedule and live chain state,
/// then persist it atomically
pub async fn admit(
    req: SubmitListingRequest,
    chain: &dyn ChainOracle,
    assets: &dyn AssetOracle,
    store: &dyn ListingStore,
) -> Result<Listing, AdmissionError> {
    validate_shape(&req)?;

    for (i, step) in req.psbts.iter().enumerate() {
        validate_psbt_format(&step.psbt_data)
            .map_err(|e| AdmissionError::Shape(format!("psbt {i}: {e}")))?;
    }

    let steps = validate_schedule(&req)?;

    let tip = chain.tip().await?;
    if req.start_block <= tip {
        return Err(AdmissionError::Temporal(format!(
            "start_block {} must be above the current tip {}",
            req.start_block, tip
        )));
    }

    let utxo = chain
        .utxo(&req.utxo_txid, req.utxo_vout)
        .await?
        .ok_or_else(|| {
            AdmissionError::UtxoUnavailable(format!(
                "utxo {}:{} does not exist or is already spent",
                req.utxo_txid, req.utxo_vout
            ))
        })?;

    if utxo.confirmations < 1 {
        return Err(AdmissionError::UtxoUnavailable(format!(
            "utxo {}:{} is not yet confirmed",
            req.utxo_txid, req.utxo_vout
        )));
    }

    validate_asset_binding(&req, assets).await?;

    let listing = NewListing {
        asset_name: req.asset_name.clone(),
        asset_qty: req.asset_qty,
        utxo_txid: req.utxo_txid.clone(),
        utxo_vout: req.utxo_vout,
        start_block: req.start_block,
        end_block: req.end_block,
        blocks_after_end: req.blocks_after_end.unwrap_or(DEFAULT_BLOCKS_AFTER_END),
        start_price_sats: req.start_price_sats,
        end_price_sats: req.end_price_sats,
        price_decrement: req.price_decrement,
        seller: utxo.address,
        created_at: unix_now(),
    };

    // Invariant 5 is enforced inside the insert; transient write-lock
    // contention gets one retry before surfacing as retriable
    let id = match store.insert_listing(&listing, &steps).await {
        Err(StorageError::Busy(_)) => store.insert_listing(&listing, &steps).await?,
        other => other?,
    };

    info!(
        listing_id = id,
        asset = %listing.asset_name,
        utxo = %format!("{}:{}", listing.utxo_txid, listing.utxo_vout),
        "admitted listing"
    );

    store
        .get(id)
        .await
        .map_err(AdmissionError::from)?
        .ok_or_else(|| AdmissionError::Store(StorageError::NotFound(id.to_string())))
}

/// Structural checks that need no oracle
fn validate_shape(req: &SubmitListingRequest) -> Result<(), AdmissionError> {
    if req.asset_name.is_empty() {
        return Err(AdmissionError::Shape("asset_name must not be empty".into()));
    }
    if req.asset_qty.is_zero() {
        return Err(AdmissionError::Shape("asset_qty must be positive".into()));
    }
    if req.utxo_txid.len() != 64 || !req.utxo_txid.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AdmissionError::Shape(
            "utxo_txid must be 64 hex characters".into(),
        ));
    }
    if req.end_block < req.start_block {
        return Err(AdmissionError::Shape(
            "end_block must not precede start_block".into(),
        ));
    }

    let expected_steps = req.end_block - req.start_block + 1;
    if req.psbts.len() as u64 != expected_steps {
        return Err(AdmissionError::Shape(format!(
            "expected {} psbt steps for blocks {}..={}, got {}",
            expected_steps,
            req.start_block,
            req.end_block,
            req.psbts.len()
        )));
    }

    Ok(())
}

/// Base64-decode and check the magic prefix; the blob is otherwise opaque
fn validate_psbt_format(psbt_data: &str) -> Result<(), String> {
    let decoded = BASE64
        .decode(psbt_data)
        .map_err(|e| format!("invalid base64: {e}"))?;

    if decoded.len() < PSBT_MAGIC.len() || decoded[..PSBT_MAGIC.len()] != PSBT_MAGIC {
        return Err("missing psbt magic bytes".to_string());
    }

    Ok(())
}

/// Schedule consistency: contiguous coverage, declared endpoints, and a
/// price curve matching the declared decrement
///
/// Returns the steps sorted by block number, ready to persist.
fn validate_schedule(req: &SubmitListingRequest) -> Result<Vec<SubmitStep>, AdmissionError> {
    let mut steps = req.psbts.clone();
    steps.sort_by_key(|s| s.block_number);

    for (i, step) in steps.iter().enumerate() {
        let expected_block = req.start_block + i as u64;
        if step.block_number != expected_block {
            return Err(AdmissionError::Schedule(format!(
                "steps must cover blocks {}..={} with one step per block; \
                 missing or duplicate step at block {}",
                req.start_block, req.end_block, expected_block
            )));
        }
    }

    let (first, last) = match (steps.first(), steps.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(AdmissionError::Schedule("no psbt steps provided".into())),
    };
    if first.price_sats != req.start_price_sats {
        return Err(AdmissionError::Schedule(format!(
            "first step price {} does not match start_price_sats {}",
            first.price_sats, req.start_price_sats
        )));
    }
    if last.price_sats != req.end_price_sats {
        return Err(AdmissionError::Schedule(format!(
            "last step price {} does not match end_price_sats {}",
            last.price_sats, req.end_price_sats
        )));
    }

    for pair in steps.windows(2) {
        if pair[1].price_sats > pair[0].price_sats {
            return Err(AdmissionError::Schedule(format!(
                "price increases from {} to {} at block {}",
                pair[0].price_sats, pair[1].price_sats, pair[1].block_number
            )));
        }
    }

    if req.start_block == req.end_block {
        // Degenerate fixed-price listing
        if req.start_price_sats != req.end_price_sats {
            return Err(AdmissionError::Schedule(
                "single-block listing requires start_price_sats == end_price_sats".into(),
            ));
        }
        if req.price_decrement != 0 {
            return Err(AdmissionError::Schedule(
                "single-block listing requires price_decrement == 0".into(),
            ));
        }
        return Ok(steps);
    }

    // Strict Dutch auction: each step drops by approximately the declared
    // decrement; integer rounding across the range is tolerated, one full
    // decrement of drift is not
    if req.price_decrement == 0 {
        return Err(AdmissionError::Schedule(
            "multi-block listing requires a positive price_decrement".into(),
        ));
    }

    let dec = req.price_decrement as i128;
    for (k, step) in steps.iter().enumerate() {
        let expected = req.start_price_sats as i128 - k as i128 * dec;
        let declared = step.price_sats as i128;
        if (expected - declared).abs() >= dec {
            return Err(AdmissionError::Schedule(format!(
                "step price {} at block {} diverges from the declared decrement curve",
                step.price_sats, step.block_number
            )));
        }
    }

    Ok(steps)
}

/// The UTXO must carry exactly the declared asset and quantity
async fn validate_asset_binding(
    req: &SubmitListingRequest,
    assets: &dyn AssetOracle,
) -> Result<(), AdmissionError> {
    let balances = assets.balances(&req.utxo_txid, req.utxo_vout).await?;

    if balances.is_empty() {
        return Err(AdmissionError::AssetMismatch(format!(
            "no assets found on utxo {}:{}",
            req.utxo_txid, req.utxo_vout
        )));
    }
    if balances.len() > 1 {
        return Err(AdmissionError::AssetMismatch(format!(
            "utxo has {} assets attached; only single-asset utxos are supported",
            balances.len()
        )));
    }

    let balance = &balances[0];
    if balance.asset != req.asset_name {
        return Err(AdmissionError::AssetMismatch(format!(
            "expected asset '{}', found '{}'",
            req.asset_name, balance.asset
        )));
    }

    if !balance.divisible && !req.asset_qty.is_whole() {
        return Err(AdmissionError::AssetMismatch(format!(
            "'{}' is indivisible; quantity {} must be whole",
            balance.asset, req.asset_qty
        )));
    }

    if balance.quantity != req.asset_qty {
        return Err(AdmissionError::AssetMismatch(format!(
            "expected quantity {}, found {}",
            req.asset_qty, balance.quantity
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssetQty;

    /// "psbt\xff" plus a little padding, base64-encoded
    fn valid_psbt_blob() -> String {
        BASE64.encode([0x70, 0x73, 0x62, 0x74, 0xff, 0x01, 0x00])
    }

    fn dutch_request() -> SubmitListingRequest {
        let prices = [100_000u64, 90_000, 80_000, 70_000, 60_000];
        SubmitListingRequest {
            asset_name: "RAREPEPE".to_string(),
            asset_qty: AssetQty::from_units(1),
            utxo_txid: "ab".repeat(32),
            utxo_vout: 0,
            start_block: 850_000,
            end_block: 850_004,
            blocks_after_end: Some(144),
            start_price_sats: 100_000,
            end_price_sats: 60_000,
            price_decrement: 10_000,
            psbts: prices
                .iter()
                .enumerate()
                .map(|(i, &price)| SubmitStep {
                    block_number: 850_000 + i as u64,
                    price_sats: price,
                    psbt_data: valid_psbt_blob(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_psbt_format() {
        assert!(validate_psbt_format(&valid_psbt_blob()).is_ok());
        assert!(validate_psbt_format("not-base64!").is_err());
        // Valid base64, wrong magic
        assert!(validate_psbt_format(&BASE64.encode(b"cHNi")).is_err());
        // Too short to hold the magic
        assert!(validate_psbt_format(&BASE64.encode([0x70, 0x73])).is_err());
    }

    #[test]
    fn test_shape_accepts_valid() {
        assert!(validate_shape(&dutch_request()).is_ok());
    }

    #[test]
    fn test_shape_rejects_step_count_mismatch() {
        let mut req = dutch_request();
        req.psbts.pop();
        assert!(matches!(
            validate_shape(&req),
            Err(AdmissionError::Shape(_))
        ));
    }

    #[test]
    fn test_shape_rejects_bad_txid() {
        let mut req = dutch_request();
        req.utxo_txid = "zz".repeat(32);
        assert!(matches!(validate_shape(&req), Err(AdmissionError::Shape(_))));

        req.utxo_txid = "ab".repeat(10);
        assert!(matches!(validate_shape(&req), Err(AdmissionError::Shape(_))));
    }

    #[test]
    fn test_shape_rejects_inverted_range() {
        let mut req = dutch_request();
        req.start_block = 850_005;
        assert!(matches!(validate_shape(&req), Err(AdmissionError::Shape(_))));
    }

    #[test]
    fn test_schedule_accepts_exact_curve() {
        let steps = validate_schedule(&dutch_request()).unwrap();
        assert_eq!(steps.len(), 5);
        assert_eq!(steps[0].block_number, 850_000);
    }

    #[test]
    fn test_schedule_accepts_unordered_submission() {
        let mut req = dutch_request();
        req.psbts.reverse();
        let steps = validate_schedule(&req).unwrap();
        assert_eq!(steps[0].price_sats, 100_000);
        assert_eq!(steps[4].price_sats, 60_000);
    }

    #[test]
    fn test_schedule_rejects_gap() {
        let mut req = dutch_request();
        req.psbts[2].block_number = 850_009;
        assert!(matches!(
            validate_schedule(&req),
            Err(AdmissionError::Schedule(_))
        ));
    }

    #[test]
    fn test_schedule_rejects_duplicate_block() {
        let mut req = dutch_request();
        req.psbts[2].block_number = 850_001;
        assert!(matches!(
            validate_schedule(&req),
            Err(AdmissionError::Schedule(_))
        ));
    }

    #[test]
    fn test_schedule_rejects_price_increase() {
        let mut req = dutch_request();
        req.psbts[2].price_sats = 95_000;
        assert!(matches!(
            validate_schedule(&req),
            Err(AdmissionError::Schedule(_))
        ));
    }

    #[test]
    fn test_schedule_rejects_endpoint_mismatch() {
        let mut req = dutch_request();
        req.psbts[4].price_sats = 61_000;
        assert!(matches!(
            validate_schedule(&req),
            Err(AdmissionError::Schedule(_))
        ));
    }

    #[test]
    fn test_schedule_rejects_curve_divergence() {
        // Monotone and endpoint-correct, but not following the decrement
        let mut req = dutch_request();
        req.psbts[1].price_sats = 62_000;
        req.psbts[2].price_sats = 61_500;
        req.psbts[3].price_sats = 61_000;
        assert!(matches!(
            validate_schedule(&req),
            Err(AdmissionError::Schedule(_))
        ));
    }

    #[test]
    fn test_schedule_tolerates_rounding() {
        // span 10_000 over 3 steps, decrement 3_334 rounds the middle steps
        let mut req = dutch_request();
        req.start_block = 850_000;
        req.end_block = 850_003;
        req.start_price_sats = 100_000;
        req.end_price_sats = 90_000;
        req.price_decrement = 3_334;
        let prices = [100_000u64, 96_666, 93_332, 90_000];
        req.psbts = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| SubmitStep {
                block_number: 850_000 + i as u64,
                price_sats: price,
                psbt_data: valid_psbt_blob(),
            })
            .collect();

        assert!(validate_schedule(&req).is_ok());
    }

    #[test]
    fn test_schedule_multi_block_requires_decrement() {
        let mut req = dutch_request();
        req.price_decrement = 0;
        assert!(matches!(
            validate_schedule(&req),
            Err(AdmissionError::Schedule(_))
        ));
    }

    fn fixed_price_request() -> SubmitListingRequest {
        SubmitListingRequest {
            asset_name: "RAREPEPE".to_string(),
            asset_qty: AssetQty::from_units(1),
            utxo_txid: "ab".repeat(32),
            utxo_vout: 0,
            start_block: 900_000,
            end_block: 900_000,
            blocks_after_end: Some(0),
            start_price_sats: 50_000,
            end_price_sats: 50_000,
            price_decrement: 0,
            psbts: vec![SubmitStep {
                block_number: 900_000,
                price_sats: 50_000,
                psbt_data: valid_psbt_blob(),
            }],
        }
    }

    #[test]
    fn test_fixed_price_form() {
        let req = fixed_price_request();
        assert!(validate_shape(&req).is_ok());
        assert!(validate_schedule(&req).is_ok());
    }

    #[test]
    fn test_fixed_price_rejects_nonzero_decrement() {
        let mut req = fixed_price_request();
        req.price_decrement = 1_000;
        assert!(matches!(
            validate_schedule(&req),
            Err(AdmissionError::Schedule(_))
        ));
    }

    #[test]
    fn test_fixed_price_rejects_differing_endpoints() {
        let mut req = fixed_price_request();
        req.end_price_sats = 40_000;
        // Last step price no longer matches end_price_sats
        assert!(matches!(
            validate_schedule(&req),
            Err(AdmissionError::Schedule(_))
        ));
    }
}
