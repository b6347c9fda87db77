//! Per-market scaling metadata.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::quantize::{quantum_exponent, subtick_exponent};

/// Scaling metadata for one perpetual market.
///
/// Immutable once fetched. The client never caches it; callers that want
/// to skip a lookup pass it to the resolved builder path directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInfo {
    /// Market ticker, e.g. "ETH-USD".
    pub ticker: String,
    /// Order book identifier on chain.
    pub clob_pair_id: u32,
    /// Power-of-ten scale of one base quantum.
    pub atomic_resolution: i32,
    /// Minimum tradable number of quantums.
    pub step_base_quantums: u64,
    /// Scale linking quantums and subticks to the quote asset.
    pub quantum_conversion_exponent: i32,
    /// Price granularity in subticks.
    pub subticks_per_tick: u32,
}

impl MarketInfo {
    /// Reject metadata quantization cannot work with: zero steps or ticks,
    /// or exponents whose arithmetic overflows.
    pub fn validate(&self) -> Result<()> {
        if self.step_base_quantums == 0 {
            return Err(CoreError::InvalidSize(format!(
                "{} has a zero step_base_quantums",
                self.ticker
            )));
        }
        if self.subticks_per_tick == 0 {
            return Err(CoreError::InvalidPrice(format!(
                "{} has a zero subticks_per_tick",
                self.ticker
            )));
        }
        if quantum_exponent(self).is_none() {
            return Err(CoreError::InvalidSize(format!(
                "{} has an unusable atomic_resolution {}",
                self.ticker, self.atomic_resolution
            )));
        }
        if subtick_exponent(self).is_none() {
            return Err(CoreError::InvalidPrice(format!(
                "{} has unusable exponents ({}, {})",
                self.ticker, self.atomic_resolution, self.quantum_conversion_exponent
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn eth_usd() -> MarketInfo {
    MarketInfo {
        ticker: "ETH-USD".to_string(),
        clob_pair_id: 1,
        atomic_resolution: -9,
        step_base_quantums: 1_000_000,
        quantum_conversion_exponent: -9,
        subticks_per_tick: 100_000,
    }
}
