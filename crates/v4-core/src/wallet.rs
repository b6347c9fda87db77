//! Wallet capability consumed by the client.
//!
//! Key derivation happens outside this crate. A wallet may exist before its
//! address is known; `address()` returns `None` until then.

use thiserror::Error;

use crate::BoxFuture;

/// Wallet errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Wallet address not resolved yet")]
    NotReady,

    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

/// Signer abstraction.
pub trait Wallet: Send + Sync {
    /// Bech32 account address, once resolved.
    fn address(&self) -> Option<String>;

    /// Compressed secp256k1 public key.
    fn public_key(&self) -> Vec<u8>;

    /// Sign canonical sign-doc bytes.
    fn sign<'a>(&'a self, sign_bytes: &'a [u8]) -> BoxFuture<'a, Result<Vec<u8>, WalletError>>;
}
