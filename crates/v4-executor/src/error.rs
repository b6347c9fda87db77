//! Executor error types.
//!
//! Every failure leaving the builder or the pipeline is one of these four
//! kinds; transport, registry and signer errors are folded into
//! `UnexpectedClient` before they cross the crate boundary.

use thiserror::Error;
use v4_core::{CoreError, WalletError};
use v4_registry::RegistryError;

#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Local input validation failed; nothing was sent.
    #[error("Validation failed: {0}")]
    Validation(#[from] CoreError),

    #[error("Market not found: {0}")]
    MarketNotFound(String),

    /// A collaborator returned nothing, or something of the wrong shape.
    #[error("Unexpected client response: {0}")]
    UnexpectedClient(String),

    /// The node rejected the simulated transaction. Message is the node's own.
    #[error("Simulation failed: {0}")]
    SimulationFailed(String),
}

impl ExecutorError {
    /// True for errors the caller fixes by changing inputs.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::MarketNotFound(_))
    }
}

impl From<RegistryError> for ExecutorError {
    fn from(e: RegistryError) -> Self {
        Self::UnexpectedClient(format!("lookup failed: {e}"))
    }
}

impl From<WalletError> for ExecutorError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::NotReady => Self::Validation(CoreError::WalletNotReady),
            WalletError::SigningFailed(msg) => {
                Self::UnexpectedClient(format!("signer failed: {msg}"))
            }
        }
    }
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_errors_become_unexpected_client() {
        let err: ExecutorError = RegistryError::HttpClient("HTTP 502".to_string()).into();
        assert!(matches!(err, ExecutorError::UnexpectedClient(ref m) if m.contains("502")));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_wallet_errors() {
        let not_ready: ExecutorError = WalletError::NotReady.into();
        assert!(not_ready.is_validation());
        let failed: ExecutorError = WalletError::SigningFailed("hsm offline".to_string()).into();
        assert!(matches!(failed, ExecutorError::UnexpectedClient(_)));
    }

    #[test]
    fn test_simulation_message_kept_verbatim() {
        let err = ExecutorError::SimulationFailed("insufficient funds".to_string());
        assert_eq!(err.to_string(), "Simulation failed: insufficient funds");
    }
}
