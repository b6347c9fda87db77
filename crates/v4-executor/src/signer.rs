//! Local secp256k1 wallet.
//!
//! Signs the SHA-256 digest of the sign-doc bytes and returns the 64-byte
//! `r || s` signature the chain expects. Address derivation is done
//! elsewhere; the bech32 address is attached once known.

use std::path::PathBuf;
use std::sync::OnceLock;

use alloy::primitives::B256;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as AlloySigner;
use sha2::{Digest, Sha256};
use thiserror::Error;
use v4_core::{BoxFuture, Wallet, WalletError};
use zeroize::Zeroizing;

// =============================================================================
// KeySource
// =============================================================================

/// Source of the private key.
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Load from environment variable (development).
    EnvVar { var_name: String },
    /// Load from file (production, recommend 0600 permissions).
    File { path: PathBuf },
}

/// Key loading errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Failed to decode hex: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Failed to read key file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),
}

/// Parse a hex key (optional 0x prefix, surrounding whitespace ignored).
fn parse_hex_key(hex_str: &str) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    let trimmed = hex_str.trim().trim_start_matches("0x");
    Ok(Zeroizing::new(hex::decode(trimmed)?))
}

// =============================================================================
// LocalWallet
// =============================================================================

/// Wallet holding a private key in process.
///
/// Never log key material or signatures.
pub struct LocalWallet {
    signer: PrivateKeySigner,
    address: OnceLock<String>,
}

impl LocalWallet {
    /// Load a key from the given source.
    pub fn load(source: &KeySource) -> Result<Self, KeyError> {
        let secret_bytes: Zeroizing<Vec<u8>> = match source {
            KeySource::EnvVar { var_name } => {
                let hex = Zeroizing::new(
                    std::env::var(var_name)
                        .map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?,
                );
                parse_hex_key(&hex)?
            }
            KeySource::File { path } => {
                let content = Zeroizing::new(std::fs::read_to_string(path)?);
                parse_hex_key(&content)?
            }
        };
        Self::from_bytes(&secret_bytes)
    }

    pub fn from_bytes(secret_bytes: &[u8]) -> Result<Self, KeyError> {
        let signer = PrivateKeySigner::from_slice(secret_bytes)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        Ok(Self {
            signer,
            address: OnceLock::new(),
        })
    }

    /// Attach the resolved account address. Later calls keep the first value.
    pub fn with_address(self, address: impl Into<String>) -> Self {
        self.set_address(address);
        self
    }

    /// Returns false if an address was already set.
    pub fn set_address(&self, address: impl Into<String>) -> bool {
        self.address.set(address.into()).is_ok()
    }
}

impl Wallet for LocalWallet {
    fn address(&self) -> Option<String> {
        self.address.get().cloned()
    }

    fn public_key(&self) -> Vec<u8> {
        self.signer
            .credential()
            .verifying_key()
            .to_sec1_bytes()
            .to_vec()
    }

    fn sign<'a>(&'a self, sign_bytes: &'a [u8]) -> BoxFuture<'a, Result<Vec<u8>, WalletError>> {
        Box::pin(async move {
            let digest = B256::from_slice(&Sha256::digest(sign_bytes));
            let signature = self
                .signer
                .sign_hash(&digest)
                .await
                .map_err(|e| WalletError::SigningFailed(e.to_string()))?;
            // Drop the recovery byte.
            Ok(signature.as_bytes()[..64].to_vec())
        })
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address.get())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::PrimitiveSignature;

    // Well-known test private key (DO NOT use in production)
    const TEST_PRIVATE_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn test_wallet() -> LocalWallet {
        let bytes = parse_hex_key(TEST_PRIVATE_KEY).unwrap();
        LocalWallet::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn test_parse_hex_key_trims() {
        let bytes = parse_hex_key(&format!("  {TEST_PRIVATE_KEY}\n")).unwrap();
        assert_eq!(bytes.len(), 32);
        assert!(parse_hex_key("0xzz").is_err());
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(matches!(
            LocalWallet::from_bytes(&[0u8; 32]),
            Err(KeyError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_load_from_missing_env_var() {
        let source = KeySource::EnvVar {
            var_name: "V4_TEST_KEY_THAT_DOES_NOT_EXIST".to_string(),
        };
        assert!(matches!(
            LocalWallet::load(&source),
            Err(KeyError::EnvVarNotFound(_))
        ));
    }

    #[test]
    fn test_address_resolves_once() {
        let wallet = test_wallet();
        assert_eq!(wallet.address(), None);
        assert!(wallet.set_address("dydx1first"));
        assert!(!wallet.set_address("dydx1second"));
        assert_eq!(wallet.address().as_deref(), Some("dydx1first"));
    }

    #[test]
    fn test_public_key_is_compressed() {
        let key = test_wallet().public_key();
        assert_eq!(key.len(), 33);
        assert!(key[0] == 0x02 || key[0] == 0x03);
    }

    #[tokio::test]
    async fn test_signature_is_deterministic_and_recoverable() {
        let wallet = test_wallet();
        let message = b"sign doc bytes";
        let sig = wallet.sign(message).await.unwrap();
        assert_eq!(sig.len(), 64);
        assert_eq!(sig, wallet.sign(message).await.unwrap());

        // Recover with either parity and check one matches the signer.
        let digest = B256::from_slice(&Sha256::digest(message));
        let recovered: Vec<_> = [false, true]
            .into_iter()
            .filter_map(|parity| {
                PrimitiveSignature::from_bytes_and_parity(&sig, parity)
                    .recover_address_from_prehash(&digest)
                    .ok()
            })
            .collect();
        assert!(recovered.contains(&wallet.signer.address()));
    }
}
