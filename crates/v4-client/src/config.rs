//! Client configuration.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use v4_core::SHORT_BLOCK_WINDOW;
use v4_executor::BroadcastMode;

use crate::error::{AppError, AppResult};

/// Asset denominations on the target chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenomConfig {
    /// Denom fees and transfers are paid in.
    #[serde(default = "default_usdc_denom")]
    pub usdc_denom: String,
    #[serde(default = "default_usdc_decimals")]
    pub usdc_decimals: u32,
    #[serde(default = "default_chain_token_denom")]
    pub chain_token_denom: String,
    #[serde(default = "default_chain_token_decimals")]
    pub chain_token_decimals: u32,
}

fn default_usdc_denom() -> String {
    "ibc/8E27BA2D5493AF5636760E354E46004562C46AB7EC0CC4C1CA14E9E20E2545B5".to_string()
}

fn default_usdc_decimals() -> u32 {
    6
}

fn default_chain_token_denom() -> String {
    "adv4tnt".to_string()
}

fn default_chain_token_decimals() -> u32 {
    18
}

impl Default for DenomConfig {
    fn default() -> Self {
        Self {
            usdc_denom: default_usdc_denom(),
            usdc_decimals: default_usdc_decimals(),
            chain_token_denom: default_chain_token_denom(),
            chain_token_decimals: default_chain_token_decimals(),
        }
    }
}

/// Top-level configuration. Defaults target the public testnet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_indexer_url")]
    pub indexer_url: String,
    /// Validator REST (LCD) endpoint.
    #[serde(default = "default_validator_url")]
    pub validator_url: String,
    /// Validator CometBFT RPC endpoint used for broadcast.
    #[serde(default = "default_validator_rpc_url")]
    pub validator_rpc_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: String,
    #[serde(default)]
    pub denoms: DenomConfig,
    /// Price per unit of gas in `denoms.usdc_denom` base units.
    #[serde(default = "default_gas_price")]
    pub gas_price: Decimal,
    /// Blocks added past the next block for default short-term expiry.
    #[serde(default = "default_short_block_buffer")]
    pub short_block_buffer: u32,
    /// Forces one broadcast mode for every send.
    #[serde(default)]
    pub broadcast_mode: Option<BroadcastMode>,
}

fn default_indexer_url() -> String {
    "https://indexer.v4testnet.dydx.exchange".to_string()
}

fn default_validator_url() -> String {
    "https://dydx-testnet-api.polkachu.com".to_string()
}

fn default_validator_rpc_url() -> String {
    "https://dydx-testnet-rpc.polkachu.com".to_string()
}

fn default_chain_id() -> String {
    "dydx-testnet-4".to_string()
}

fn default_gas_price() -> Decimal {
    Decimal::new(25, 3)
}

fn default_short_block_buffer() -> u32 {
    v4_core::DEFAULT_SHORT_BLOCK_BUFFER
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            indexer_url: default_indexer_url(),
            validator_url: default_validator_url(),
            validator_rpc_url: default_validator_rpc_url(),
            chain_id: default_chain_id(),
            denoms: DenomConfig::default(),
            gas_price: default_gas_price(),
            short_block_buffer: default_short_block_buffer(),
            broadcast_mode: None,
        }
    }
}

impl ClientConfig {
    /// Load from `V4_CLIENT_CONFIG`, falling back to defaults.
    pub fn load() -> AppResult<Self> {
        let config_path = std::env::var("V4_CLIENT_CONFIG")
            .unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.chain_id.trim().is_empty() {
            return Err(AppError::Config("chain_id must not be empty".to_string()));
        }
        if self.gas_price <= Decimal::ZERO {
            return Err(AppError::Config(format!(
                "gas_price must be positive, got {}",
                self.gas_price
            )));
        }
        if self.short_block_buffer >= SHORT_BLOCK_WINDOW {
            return Err(AppError::Config(format!(
                "short_block_buffer must be below {SHORT_BLOCK_WINDOW}, got {}",
                self.short_block_buffer
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.chain_id, "dydx-testnet-4");
        assert_eq!(config.gas_price, dec!(0.025));
        assert_eq!(config.short_block_buffer, 2);
        assert!(config.broadcast_mode.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ClientConfig::from_toml(
            r#"
            chain_id = "dydx-mainnet-1"
            broadcast_mode = "commit"

            [denoms]
            usdc_denom = "uusdc"
            "#,
        )
        .unwrap();
        assert_eq!(config.chain_id, "dydx-mainnet-1");
        assert_eq!(config.broadcast_mode, Some(BroadcastMode::Commit));
        assert_eq!(config.denoms.usdc_denom, "uusdc");
        assert_eq!(config.denoms.usdc_decimals, 6);
        assert_eq!(config.indexer_url, default_indexer_url());
    }

    #[test]
    fn test_invalid_values_rejected() {
        for body in [
            "chain_id = \"\"",
            "gas_price = \"0\"",
            "short_block_buffer = 20",
        ] {
            let err = ClientConfig::from_toml(body).unwrap_err();
            assert!(matches!(err, AppError::Config(_)), "{body}");
        }
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string(&ClientConfig::default()).unwrap();
        assert!(toml_str.contains("chain_id"));
        assert!(toml_str.contains("[denoms]"));
    }
}
