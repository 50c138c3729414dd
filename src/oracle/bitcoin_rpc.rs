//! Bitcoin Core JSON-RPC Client
//!
//! Chain oracle implementation over the node's JSON-RPC interface with
//! HTTP basic auth. Only read methods are used: `getblockcount`,
//! `gettxout`, `getblockhash`, `getblock`.
//!
//! The spending-transaction lookup walks recent blocks back from the tip
//! rather than requiring an address or transaction index on the node; the
//! walk depth is configurable. A spend older than the scan window is
//! reported as not located.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{
    ChainOracle, OracleError, OracleResult, OutPointRef, SpendingTx, TxOutputSummary, UtxoInfo,
};
use crate::config::Config;

const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Bitcoin Core is still reading blocks at startup
const RPC_IN_WARMUP: i64 = -28;

/// JSON-RPC client for a Bitcoin node
#[derive(Debug, Clone)]
pub struct BitcoinRpc {
    client: Client,
    url: String,
    user: String,
    password: String,
    scan_depth: u64,
}

impl BitcoinRpc {
    pub fn new(host: &str, port: u16, user: &str, password: &str, scan_depth: u64) -> Self {
        let client = Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            url: format!("http://{}:{}", host, port),
            user: user.to_string(),
            password: password.to_string(),
            scan_depth,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.bitcoin_rpc_host,
            config.bitcoin_rpc_port,
            &config.bitcoin_rpc_user,
            &config.bitcoin_rpc_password,
            config.spend_scan_depth,
        )
    }

    /// Issue one JSON-RPC call; `None` when the node returns a null result
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> OracleResult<Option<T>> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": "dutchbid",
            "method": method,
            "params": params,
        });

        let resp = self
            .client
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::Transient(format!("{method}: {e}")))?;

        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(OracleError::Fatal(format!(
                    "{method}: node rejected RPC credentials"
                )));
            }
            // RPC-level errors arrive with a 500 and an error body; fall through
            _ => {}
        }

        let rpc: RpcResponse<T> = resp
            .json()
            .await
            .map_err(|e| OracleError::Fatal(format!("{method}: malformed response: {e}")))?;

        if let Some(err) = rpc.error {
            if err.code == RPC_IN_WARMUP {
                return Err(OracleError::Transient(format!("{method}: {}", err.message)));
            }
            return Err(OracleError::Fatal(format!(
                "{method}: rpc error {}: {}",
                err.code, err.message
            )));
        }

        Ok(rpc.result)
    }

    async fn call_required<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> OracleResult<T> {
        self.call(method, params)
            .await?
            .ok_or_else(|| OracleError::Fatal(format!("{method}: empty result")))
    }
}

#[async_trait::async_trait]
impl ChainOracle for BitcoinRpc {
    async fn tip(&self) -> OracleResult<u64> {
        self.call_required("getblockcount", json!([])).await
    }

    async fn utxo(&self, txid: &str, vout: u32) -> OracleResult<Option<UtxoInfo>> {
        let result: Option<GetTxOutResult> =
            self.call("gettxout", json!([txid, vout, true])).await?;

        Ok(result.map(|out| UtxoInfo {
            value_sats: btc_to_sats(out.value),
            confirmations: out.confirmations,
            address: out.script_pub_key.address,
        }))
    }

    async fn spending_tx(&self, txid: &str, vout: u32) -> OracleResult<Option<SpendingTx>> {
        let tip = self.tip().await?;
        let floor = tip.saturating_sub(self.scan_depth);

        // Most spends are recent, so walk backwards from the tip
        for height in (floor..=tip).rev() {
            let hash: String = self.call_required("getblockhash", json!([height])).await?;
            let block: VerboseBlock = self.call_required("getblock", json!([hash, 2])).await?;

            for tx in block.tx {
                let consumed = tx
                    .vin
                    .iter()
                    .any(|vin| vin.txid.as_deref() == Some(txid) && vin.vout == Some(vout));
                if !consumed {
                    continue;
                }

                let outputs = tx
                    .vout
                    .into_iter()
                    .map(|o| TxOutputSummary {
                        value_sats: btc_to_sats(o.value),
                        address: o.script_pub_key.address,
                    })
                    .collect();

                let inputs = tx
                    .vin
                    .into_iter()
                    .filter_map(|vin| {
                        Some(OutPointRef {
                            txid: vin.txid?,
                            vout: vin.vout?,
                        })
                    })
                    .collect();

                return Ok(Some(SpendingTx {
                    txid: tx.txid,
                    block_height: block.height,
                    block_time: Some(block.time),
                    outputs,
                    inputs,
                }));
            }
        }

        Ok(None)
    }
}

fn btc_to_sats(btc: f64) -> u64 {
    (btc * 100_000_000.0).round() as u64
}

// =============================================================================
// JSON-RPC Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct GetTxOutResult {
    value: f64,
    #[serde(default)]
    confirmations: u64,
    #[serde(rename = "scriptPubKey")]
    script_pub_key: ScriptPubKey,
}

#[derive(Debug, Deserialize)]
struct ScriptPubKey {
    #[serde(default)]
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerboseBlock {
    height: u64,
    time: u64,
    tx: Vec<VerboseTx>,
}

#[derive(Debug, Deserialize)]
struct VerboseTx {
    txid: String,
    vin: Vec<VerboseVin>,
    vout: Vec<VerboseVout>,
}

#[derive(Debug, Deserialize)]
struct VerboseVin {
    #[serde(default)]
    txid: Option<String>,
    #[serde(default)]
    vout: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct VerboseVout {
    value: f64,
    #[serde(rename = "scriptPubKey")]
    script_pub_key: ScriptPubKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_btc_to_sats() {
        assert_eq!(btc_to_sats(0.0), 0);
        assert_eq!(btc_to_sats(0.00000001), 1);
        assert_eq!(btc_to_sats(0.0008), 80_000);
        assert_eq!(btc_to_sats(1.0), 100_000_000);
    }

    #[test]
    fn test_txout_parses_without_address() {
        // Non-standard scripts have no address field
        let raw = r#"{"value":0.0001,"confirmations":3,"scriptPubKey":{"hex":"6a"}}"#;
        let out: GetTxOutResult = serde_json::from_str(raw).unwrap();
        assert_eq!(out.confirmations, 3);
        assert!(out.script_pub_key.address.is_none());
    }

    #[test]
    fn test_rpc_error_body_parses() {
        let raw = r#"{"result":null,"error":{"code":-28,"message":"Loading block index..."},"id":"dutchbid"}"#;
        let resp: RpcResponse<u64> = serde_json::from_str(raw).unwrap();
        assert!(resp.result.is_none());
        assert_eq!(resp.error.unwrap().code, RPC_IN_WARMUP);
    }
}
