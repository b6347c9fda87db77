//! Production transport over a validator node.
//!
//! Broadcasts go through the CometBFT JSON-RPC endpoint (one method per
//! broadcast mode). Simulation goes through the Cosmos REST endpoint.
//! Timeouts are owned here; the pipeline adds none.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use v4_core::BoxFuture;
use v4_registry::json::string_or_number;

use crate::transport::{
    BroadcastMode, SimulationReply, TransactionOutcome, Transport, TransportError,
    TransportResult,
};

/// Default timeout for node requests. Commit broadcasts wait for a block.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const SIMULATE_PATH: &str = "/cosmos/tx/v1beta1/simulate";

// =============================================================================
// JSON-RPC payloads
// =============================================================================

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: TxParams<'a>,
}

#[derive(Debug, Serialize)]
struct TxParams<'a> {
    tx: &'a str,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckResult {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    hash: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExecResult {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    #[serde(default, deserialize_with = "string_or_number")]
    gas_wanted: u64,
    #[serde(default, deserialize_with = "string_or_number")]
    gas_used: u64,
}

#[derive(Debug, Deserialize)]
struct CommitResult {
    #[serde(default)]
    check_tx: ExecResult,
    #[serde(default, alias = "deliver_tx")]
    tx_result: Option<ExecResult>,
    hash: String,
    #[serde(default, deserialize_with = "string_or_number")]
    height: u64,
}

#[derive(Debug, Serialize)]
struct SimulateRequest<'a> {
    tx_bytes: &'a str,
}

#[derive(Debug, Deserialize)]
struct SimulateResponse {
    gas_info: Option<GasInfo>,
}

#[derive(Debug, Deserialize)]
struct GasInfo {
    #[serde(deserialize_with = "string_or_number")]
    gas_used: u64,
}

#[derive(Debug, Deserialize)]
struct RestErrorBody {
    message: String,
}

/// Interpret a JSON-RPC broadcast reply for `mode`.
pub(crate) fn parse_broadcast(
    mode: BroadcastMode,
    body: &str,
) -> TransportResult<Option<TransactionOutcome>> {
    let response: RpcResponse = serde_json::from_str(body)
        .map_err(|e| TransportError::Malformed(format!("broadcast reply: {e}")))?;

    if let Some(error) = response.error {
        let detail = error.data.map(|d| format!(": {d}")).unwrap_or_default();
        return Err(TransportError::Rpc(format!("{}{detail}", error.message)));
    }
    let Some(result) = response.result.filter(|v| !v.is_null()) else {
        return Ok(None);
    };

    let malformed = |e: serde_json::Error| TransportError::Malformed(format!("{mode} result: {e}"));
    let outcome = match mode {
        BroadcastMode::Async => {
            let check: CheckResult = serde_json::from_value(result).map_err(malformed)?;
            TransactionOutcome::Async { hash: check.hash }
        }
        BroadcastMode::Sync => {
            let check: CheckResult = serde_json::from_value(result).map_err(malformed)?;
            TransactionOutcome::Sync {
                hash: check.hash,
                code: check.code,
                log: check.log,
            }
        }
        BroadcastMode::Commit => {
            let commit: CommitResult = serde_json::from_value(result).map_err(malformed)?;
            // A failed mempool check never reaches a block.
            let exec = if commit.check_tx.code != 0 {
                commit.check_tx
            } else {
                commit.tx_result.unwrap_or_default()
            };
            TransactionOutcome::Indexed {
                hash: commit.hash,
                height: commit.height,
                code: exec.code,
                raw_log: exec.log,
                gas_used: exec.gas_used,
                gas_wanted: exec.gas_wanted,
            }
        }
    };
    Ok(Some(outcome))
}

/// Interpret a simulate reply. Non-success statuses carrying a JSON error
/// body are node-side failures, not transport errors.
pub(crate) fn parse_simulation(
    success: bool,
    body: &str,
) -> TransportResult<Option<SimulationReply>> {
    if success {
        let response: SimulateResponse = serde_json::from_str(body)
            .map_err(|e| TransportError::Malformed(format!("simulate reply: {e}")))?;
        return Ok(response
            .gas_info
            .map(|gas| SimulationReply::Ok {
                gas_used: gas.gas_used,
            }));
    }
    match serde_json::from_str::<RestErrorBody>(body) {
        Ok(error) => Ok(Some(SimulationReply::Failed {
            message: error.message,
        })),
        Err(_) => Err(TransportError::Http(format!("simulate failed: {body}"))),
    }
}

// =============================================================================
// NodeTransport
// =============================================================================

/// Transport talking to a validator's RPC and REST endpoints.
pub struct NodeTransport {
    client: Client,
    rpc_url: String,
    rest_url: String,
    request_id: AtomicU64,
}

impl NodeTransport {
    pub fn new(rpc_url: impl Into<String>, rest_url: impl Into<String>) -> TransportResult<Self> {
        Self::with_timeout(rpc_url, rest_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        rpc_url: impl Into<String>,
        rest_url: impl Into<String>,
        timeout: Duration,
    ) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            rpc_url: rpc_url.into().trim_end_matches('/').to_string(),
            rest_url: rest_url.into().trim_end_matches('/').to_string(),
            request_id: AtomicU64::new(1),
        })
    }

    async fn post_text<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> TransportResult<(bool, String)> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Http(format!("HTTP request failed: {e}")))?;
        let success = response.status().is_success();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Http(format!("Failed to read response: {e}")))?;
        Ok((success, text))
    }

    async fn broadcast_inner(
        &self,
        tx_bytes: &[u8],
        mode: BroadcastMode,
    ) -> TransportResult<Option<TransactionOutcome>> {
        let encoded = BASE64.encode(tx_bytes);
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
            method: mode.rpc_method(),
            params: TxParams { tx: &encoded },
        };
        debug!(mode = %mode, bytes = tx_bytes.len(), "Broadcasting transaction");

        let (success, body) = self.post_text(&self.rpc_url, &request).await?;
        if !success {
            warn!(mode = %mode, "Broadcast returned non-success status");
        }
        parse_broadcast(mode, &body)
    }

    async fn simulate_inner(&self, tx_bytes: &[u8]) -> TransportResult<Option<SimulationReply>> {
        let encoded = BASE64.encode(tx_bytes);
        let url = format!("{}{}", self.rest_url, SIMULATE_PATH);
        let (success, body) = self
            .post_text(&url, &SimulateRequest { tx_bytes: &encoded })
            .await?;
        parse_simulation(success, &body)
    }
}

impl Transport for NodeTransport {
    fn broadcast<'a>(
        &'a self,
        tx_bytes: &'a [u8],
        mode: BroadcastMode,
    ) -> BoxFuture<'a, TransportResult<Option<TransactionOutcome>>> {
        Box::pin(self.broadcast_inner(tx_bytes, mode))
    }

    fn simulate<'a>(
        &'a self,
        tx_bytes: &'a [u8],
    ) -> BoxFuture<'a, TransportResult<Option<SimulationReply>>> {
        Box::pin(self.simulate_inner(tx_bytes))
    }
}
