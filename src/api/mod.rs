//! HTTP API
//!
//! REST surface over the store, the oracles, and the admission pipeline:
//! - GET  /health                      - liveness + tip height
//! - GET  /listings?status=...         - filtered list (comma-separated OR)
//! - POST /listings                    - admission (API key)
//! - GET  /listings/:id                - metadata, never the schedule
//! - GET  /listings/:id/current-psbt   - revelation result
//! - GET  /address/:addr?role=...      - listings by seller or recipient
//!
//! Listing metadata responses never include PSBT steps; the only path
//! that exposes a PSBT is the revelation endpoint, which serves at most
//! the step the chain has already reached.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::admission;
use crate::error::AdmissionError;
use crate::oracle::{AssetOracle, ChainOracle, OracleError};
use crate::revelation::reveal_target;
use crate::storage::{AddressRole, ListingStore, StorageError};
use crate::types::{ListingResponse, ListingStatus, SubmitListingRequest};

/// Shared state for all handlers
pub struct AppState {
    pub store: Arc<dyn ListingStore>,
    pub chain: Arc<dyn ChainOracle>,
    pub assets: Arc<dyn AssetOracle>,
    pub api_key: String,
}

pub type SharedAppState = Arc<AppState>;

/// Build the application router
pub fn create_router(state: SharedAppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/listings",
            get(handle_list_listings).post(handle_submit_listing),
        )
        .route("/listings/:id", get(handle_get_listing))
        .route("/listings/:id/current-psbt", get(handle_current_psbt))
        .route("/address/:addr", get(handle_listings_by_address))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the shutdown signal flips
pub async fn serve(
    state: SharedAppState,
    host: &str,
    port: u16,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), std::io::Error> {
    let app = create_router(state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health
async fn handle_health(State(state): State<SharedAppState>) -> impl IntoResponse {
    match state.chain.tip().await {
        Ok(tip) => Json(json!({
            "status": "healthy",
            "bitcoin_rpc": "connected",
            "current_block": tip,
        })),
        Err(e) => Json(json!({
            "status": "healthy",
            "bitcoin_rpc": format!("error: {e}"),
            "current_block": serde_json::Value::Null,
        })),
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
}

/// GET /listings?status=active,finished
async fn handle_list_listings(
    State(state): State<SharedAppState>,
    Query(query): Query<ListQuery>,
) -> Response {
    let statuses = match query.status.as_deref().map(parse_status_filter) {
        Some(Ok(statuses)) => statuses,
        Some(Err(bad)) => {
            return error_response(StatusCode::BAD_REQUEST, &format!("invalid status filter: {bad}"))
        }
        None => Vec::new(),
    };

    match state.store.list(&statuses).await {
        Ok(listings) => {
            let listings: Vec<ListingResponse> = listings.iter().map(Into::into).collect();
            Json(json!({
                "success": true,
                "count": listings.len(),
                "listings": listings,
            }))
            .into_response()
        }
        Err(e) => storage_error_response(e),
    }
}

/// POST /listings
async fn handle_submit_listing(
    State(state): State<SharedAppState>,
    headers: HeaderMap,
    Json(req): Json<SubmitListingRequest>,
) -> Response {
    match headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        Some(key) if key == state.api_key => {}
        Some(_) => return error_response(StatusCode::UNAUTHORIZED, "invalid API key"),
        None => return error_response(StatusCode::UNAUTHORIZED, "API key required"),
    }

    match admission::admit(req, state.chain.as_ref(), state.assets.as_ref(), state.store.as_ref())
        .await
    {
        Ok(listing) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "listing_id": listing.id,
                "listing": ListingResponse::from(&listing),
            })),
        )
            .into_response(),
        Err(e) => admission_error_response(e),
    }
}

/// GET /listings/:id
async fn handle_get_listing(
    State(state): State<SharedAppState>,
    Path(id): Path<i64>,
) -> Response {
    match state.store.get(id).await {
        Ok(Some(listing)) => Json(json!({
            "success": true,
            "listing": ListingResponse::from(&listing),
        }))
        .into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, &format!("listing {id} not found")),
        Err(e) => storage_error_response(e),
    }
}

/// GET /listings/:id/current-psbt
///
/// Returns only the PSBT for the block the chain has reached, or the
/// final one during the grace window. Future steps are never served.
async fn handle_current_psbt(
    State(state): State<SharedAppState>,
    Path(id): Path<i64>,
) -> Response {
    let listing = match state.store.get(id).await {
        Ok(Some(listing)) => listing,
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, &format!("listing {id} not found"))
        }
        Err(e) => return storage_error_response(e),
    };

    let tip = match state.chain.tip().await {
        Ok(tip) => tip,
        Err(e) => {
            warn!("revelation for listing {id} unavailable: {e}");
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "unable to get current block height",
            );
        }
    };

    match reveal_target(&listing, tip) {
        Ok(block) => match state.store.step_for(id, block).await {
            Ok(Some(step)) => Json(json!({
                "success": true,
                "current_block": tip,
                "listing_id": id,
                "listing_status": listing.status,
                "psbt": step,
            }))
            .into_response(),
            Ok(None) => error_response(
                StatusCode::NOT_FOUND,
                &format!("no psbt available for block {block}"),
            ),
            Err(e) => storage_error_response(e),
        },
        Err(reason) => Json(json!({
            "success": true,
            "current_block": tip,
            "listing_id": id,
            "listing_status": listing.status,
            "psbt": serde_json::Value::Null,
            "message": reason.message(),
        }))
        .into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct AddressQuery {
    role: Option<String>,
    status: Option<String>,
}

/// GET /address/:addr?role=seller|buyer&status=...
async fn handle_listings_by_address(
    State(state): State<SharedAppState>,
    Path(addr): Path<String>,
    Query(query): Query<AddressQuery>,
) -> Response {
    let role = match query.role.as_deref() {
        None | Some("seller") => AddressRole::Seller,
        Some("buyer") => AddressRole::Buyer,
        Some(bad) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("invalid role '{bad}', expected seller or buyer"),
            )
        }
    };

    let statuses = match query.status.as_deref().map(parse_status_filter) {
        Some(Ok(statuses)) => statuses,
        Some(Err(bad)) => {
            return error_response(StatusCode::BAD_REQUEST, &format!("invalid status filter: {bad}"))
        }
        None => Vec::new(),
    };

    match state.store.list_by_address(&addr, role, &statuses).await {
        Ok(listings) => {
            let listings: Vec<ListingResponse> = listings.iter().map(Into::into).collect();
            Json(json!({
                "success": true,
                "address": addr,
                "role": match role {
                    AddressRole::Seller => "seller",
                    AddressRole::Buyer => "buyer",
                },
                "count": listings.len(),
                "listings": listings,
            }))
            .into_response()
        }
        Err(e) => storage_error_response(e),
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

fn parse_status_filter(raw: &str) -> Result<Vec<ListingStatus>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| token.parse().map_err(|_| token.to_string()))
        .collect()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn admission_error_response(e: AdmissionError) -> Response {
    let status = match &e {
        AdmissionError::Shape(_)
        | AdmissionError::Schedule(_)
        | AdmissionError::Temporal(_)
        | AdmissionError::UtxoUnavailable(_)
        | AdmissionError::AssetMismatch(_) => StatusCode::BAD_REQUEST,
        AdmissionError::UtxoInUse(_) => StatusCode::CONFLICT,
        AdmissionError::Oracle(OracleError::Transient(_)) => StatusCode::SERVICE_UNAVAILABLE,
        AdmissionError::Oracle(OracleError::Fatal(_)) => StatusCode::SERVICE_UNAVAILABLE,
        AdmissionError::Store(StorageError::Busy(_)) => StatusCode::SERVICE_UNAVAILABLE,
        AdmissionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        warn!("admission failed: {e}");
    }

    error_response(status, &e.to_string())
}

fn storage_error_response(e: StorageError) -> Response {
    warn!("storage error serving request: {e}");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal storage error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter_single_and_multi() {
        assert_eq!(
            parse_status_filter("active").unwrap(),
            vec![ListingStatus::Active]
        );
        assert_eq!(
            parse_status_filter("active, finished").unwrap(),
            vec![ListingStatus::Active, ListingStatus::Finished]
        );
    }

    #[test]
    fn test_status_filter_rejects_unknown() {
        assert_eq!(parse_status_filter("active,bogus"), Err("bogus".to_string()));
    }

    #[test]
    fn test_status_filter_skips_empty_tokens() {
        assert_eq!(
            parse_status_filter("sold,,").unwrap(),
            vec![ListingStatus::Sold]
        );
    }
}
