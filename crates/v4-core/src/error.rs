//! Error types for v4-core.

use thiserror::Error;

/// Local validation failures. None of these require a network round trip.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid expiry: {0}")]
    InvalidExpiry(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Subaccount number {0} out of range [0, 127]")]
    SubaccountOutOfRange(u32),

    #[error("Wallet address not resolved yet")]
    WalletNotReady,

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
