//! Transport trait for submitting transactions to a node.
//!
//! Provides a trait-based abstraction so the pipeline can be driven by
//! `NodeTransport` in production and `MockTransport` in tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use v4_core::BoxFuture;

/// How long `broadcast` waits before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastMode {
    /// Return as soon as the node has the bytes.
    Async,
    /// Return after the mempool check.
    Sync,
    /// Return after the transaction is included in a block.
    Commit,
}

impl BroadcastMode {
    /// CometBFT RPC method name.
    pub fn rpc_method(&self) -> &'static str {
        match self {
            Self::Async => "broadcast_tx_async",
            Self::Sync => "broadcast_tx_sync",
            Self::Commit => "broadcast_tx_commit",
        }
    }
}

impl std::fmt::Display for BroadcastMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Async => write!(f, "async"),
            Self::Sync => write!(f, "sync"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

impl std::str::FromStr for BroadcastMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "async" => Ok(Self::Async),
            "sync" => Ok(Self::Sync),
            "commit" => Ok(Self::Commit),
            other => Err(format!("unknown broadcast mode: {other}")),
        }
    }
}

/// Result of a broadcast. The shape follows the requested mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TransactionOutcome {
    /// Accepted for relay; no execution result yet.
    Async { hash: String },
    /// Mempool admission result. `code != 0` is a rejection.
    Sync { hash: String, code: u32, log: String },
    /// Included in a block. `code != 0` is an execution failure.
    Indexed {
        hash: String,
        height: u64,
        code: u32,
        raw_log: String,
        gas_used: u64,
        gas_wanted: u64,
    },
}

impl TransactionOutcome {
    pub fn hash(&self) -> &str {
        match self {
            Self::Async { hash } | Self::Sync { hash, .. } | Self::Indexed { hash, .. } => hash,
        }
    }

    /// Mode that produces this shape.
    pub fn mode(&self) -> BroadcastMode {
        match self {
            Self::Async { .. } => BroadcastMode::Async,
            Self::Sync { .. } => BroadcastMode::Sync,
            Self::Indexed { .. } => BroadcastMode::Commit,
        }
    }

    /// Node-reported result code; async acknowledgments carry none.
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Async { .. } => None,
            Self::Sync { code, .. } | Self::Indexed { code, .. } => Some(*code),
        }
    }

    /// True unless the node reported a nonzero code.
    pub fn is_accepted(&self) -> bool {
        self.code().map_or(true, |code| code == 0)
    }
}

/// Result of a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SimulationReply {
    Ok { gas_used: u64 },
    /// The node refused to execute the transaction.
    Failed { message: String },
}

/// Transport-level failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Submits bytes to a node.
///
/// `Ok(None)` means the node answered with nothing usable.
pub trait Transport: Send + Sync {
    fn broadcast<'a>(
        &'a self,
        tx_bytes: &'a [u8],
        mode: BroadcastMode,
    ) -> BoxFuture<'a, TransportResult<Option<TransactionOutcome>>>;

    fn simulate<'a>(
        &'a self,
        tx_bytes: &'a [u8],
    ) -> BoxFuture<'a, TransportResult<Option<SimulationReply>>>;
}

// =============================================================================
// MockTransport
// =============================================================================

/// Recorded broadcast call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBroadcast {
    pub tx_bytes: Vec<u8>,
    pub mode: BroadcastMode,
}

/// Mock transport for testing.
///
/// Returns the configured reply; when no broadcast reply is set it echoes an
/// accepted outcome matching the requested mode.
#[derive(Debug)]
pub struct MockTransport {
    broadcasts: parking_lot::Mutex<Vec<RecordedBroadcast>>,
    simulations: parking_lot::Mutex<Vec<Vec<u8>>>,
    next_broadcast: parking_lot::Mutex<Option<TransportResult<Option<TransactionOutcome>>>>,
    next_simulation: parking_lot::Mutex<TransportResult<Option<SimulationReply>>>,
    hash_counter: AtomicUsize,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            broadcasts: parking_lot::Mutex::new(Vec::new()),
            simulations: parking_lot::Mutex::new(Vec::new()),
            next_broadcast: parking_lot::Mutex::new(None),
            next_simulation: parking_lot::Mutex::new(Ok(Some(SimulationReply::Ok {
                gas_used: 100_000,
            }))),
            hash_counter: AtomicUsize::new(0),
        }
    }

    /// Fix the broadcast reply.
    pub fn set_broadcast_reply(&self, reply: TransportResult<Option<TransactionOutcome>>) {
        *self.next_broadcast.lock() = Some(reply);
    }

    pub fn set_simulation_reply(&self, reply: TransportResult<Option<SimulationReply>>) {
        *self.next_simulation.lock() = reply;
    }

    pub fn broadcasts(&self) -> Vec<RecordedBroadcast> {
        self.broadcasts.lock().clone()
    }

    pub fn simulations(&self) -> Vec<Vec<u8>> {
        self.simulations.lock().clone()
    }

    fn echo(&self, mode: BroadcastMode) -> TransactionOutcome {
        let n = self.hash_counter.fetch_add(1, Ordering::SeqCst);
        let hash = format!("{n:064X}");
        match mode {
            BroadcastMode::Async => TransactionOutcome::Async { hash },
            BroadcastMode::Sync => TransactionOutcome::Sync {
                hash,
                code: 0,
                log: String::new(),
            },
            BroadcastMode::Commit => TransactionOutcome::Indexed {
                hash,
                height: 1,
                code: 0,
                raw_log: String::new(),
                gas_used: 0,
                gas_wanted: 0,
            },
        }
    }
}

impl Transport for MockTransport {
    fn broadcast<'a>(
        &'a self,
        tx_bytes: &'a [u8],
        mode: BroadcastMode,
    ) -> BoxFuture<'a, TransportResult<Option<TransactionOutcome>>> {
        Box::pin(async move {
            self.broadcasts.lock().push(RecordedBroadcast {
                tx_bytes: tx_bytes.to_vec(),
                mode,
            });
            let configured = self.next_broadcast.lock().clone();
            configured.unwrap_or_else(|| Ok(Some(self.echo(mode))))
        })
    }

    fn simulate<'a>(
        &'a self,
        tx_bytes: &'a [u8],
    ) -> BoxFuture<'a, TransportResult<Option<SimulationReply>>> {
        Box::pin(async move {
            self.simulations.lock().push(tx_bytes.to_vec());
            self.next_simulation.lock().clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let rejected = TransactionOutcome::Sync {
            hash: "AB".to_string(),
            code: 32,
            log: "account sequence mismatch".to_string(),
        };
        assert_eq!(rejected.hash(), "AB");
        assert_eq!(rejected.mode(), BroadcastMode::Sync);
        assert!(!rejected.is_accepted());
        assert!(TransactionOutcome::Async {
            hash: "CD".to_string()
        }
        .is_accepted());
    }

    #[test]
    fn test_mode_parse_and_method() {
        assert_eq!("Commit".parse::<BroadcastMode>().unwrap(), BroadcastMode::Commit);
        assert_eq!(BroadcastMode::Sync.rpc_method(), "broadcast_tx_sync");
        assert!("block".parse::<BroadcastMode>().is_err());
    }

    #[tokio::test]
    async fn test_mock_echoes_requested_mode() {
        let transport = MockTransport::new();
        let outcome = transport
            .broadcast(b"tx", BroadcastMode::Commit)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.mode(), BroadcastMode::Commit);
        assert_eq!(transport.broadcasts().len(), 1);
        assert_eq!(transport.broadcasts()[0].tx_bytes, b"tx".to_vec());
    }

    #[tokio::test]
    async fn test_mock_configured_replies() {
        let transport = MockTransport::new();
        transport.set_broadcast_reply(Ok(None));
        transport.set_simulation_reply(Ok(Some(SimulationReply::Failed {
            message: "insufficient funds".to_string(),
        })));
        assert_eq!(transport.broadcast(b"tx", BroadcastMode::Sync).await, Ok(None));
        assert!(matches!(
            transport.simulate(b"tx").await,
            Ok(Some(SimulationReply::Failed { .. }))
        ));
        assert_eq!(transport.simulations().len(), 1);
    }
}
