//! Counterparty Indexer Client
//!
//! Asset oracle implementation over the Counterparty Core REST API. Used
//! exclusively during admission to verify which assets, if any, are bound
//! to the listed UTXO.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{AssetBalance, AssetOracle, OracleError, OracleResult};
use crate::config::Config;
use crate::types::AssetQty;

const API_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for a Counterparty Core node
#[derive(Debug, Clone)]
pub struct CounterpartyClient {
    client: Client,
    base_url: String,
}

impl CounterpartyClient {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.counterparty_url())
    }
}

#[async_trait::async_trait]
impl AssetOracle for CounterpartyClient {
    async fn balances(&self, txid: &str, vout: u32) -> OracleResult<Vec<AssetBalance>> {
        let url = format!(
            "{}/v2/utxos/{}:{}/balances?verbose=true",
            self.base_url, txid, vout
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OracleError::Transient(format!("counterparty: {e}")))?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(OracleError::Transient(format!(
                "counterparty: indexer returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(OracleError::Fatal(format!(
                "counterparty: indexer returned {status}"
            )));
        }

        let body: BalancesResponse = resp
            .json()
            .await
            .map_err(|e| OracleError::Fatal(format!("counterparty: malformed response: {e}")))?;

        body.result
            .into_iter()
            .map(|entry| {
                let quantity = entry
                    .quantity_normalized
                    .parse::<AssetQty>()
                    .map_err(|e| OracleError::Fatal(format!("counterparty: {e}")))?;

                Ok(AssetBalance {
                    asset: entry.asset,
                    quantity,
                    divisible: entry.asset_info.map(|i| i.divisible).unwrap_or(false),
                })
            })
            .collect()
    }
}

// =============================================================================
// Counterparty API Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    #[serde(default)]
    result: Vec<BalanceEntry>,
}

#[derive(Debug, Deserialize)]
struct BalanceEntry {
    asset: String,
    quantity_normalized: String,
    #[serde(default)]
    asset_info: Option<AssetInfo>,
}

#[derive(Debug, Deserialize)]
struct AssetInfo {
    #[serde(default)]
    divisible: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balances_response_parses() {
        let raw = r#"{
            "result": [
                {
                    "asset": "RAREPEPE",
                    "quantity": 1,
                    "quantity_normalized": "1",
                    "utxo": "abc:0",
                    "asset_info": {"divisible": false, "locked": true}
                }
            ]
        }"#;
        let body: BalancesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(body.result.len(), 1);
        assert_eq!(body.result[0].asset, "RAREPEPE");
        assert!(!body.result[0].asset_info.as_ref().unwrap().divisible);
    }

    #[test]
    fn test_divisible_normalized_quantity() {
        let raw = r#"{"result":[{"asset":"PEPECASH","quantity_normalized":"0.50000000","asset_info":{"divisible":true}}]}"#;
        let body: BalancesResponse = serde_json::from_str(raw).unwrap();
        let qty: AssetQty = body.result[0].quantity_normalized.parse().unwrap();
        assert_eq!(qty, AssetQty::from_raw(50_000_000));
    }

    #[test]
    fn test_empty_result() {
        let body: BalancesResponse = serde_json::from_str(r#"{"result":[]}"#).unwrap();
        assert!(body.result.is_empty());
    }
}
