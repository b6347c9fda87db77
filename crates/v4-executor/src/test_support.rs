//! Shared fixtures for unit tests.

use std::sync::Arc;

use v4_core::{MarketInfo, Subaccount};

use crate::signer::LocalWallet;

/// Well-known development key. Never fund it.
pub(crate) const TEST_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub(crate) const TEST_ADDRESS: &str = "dydx1tst0a6pljd2j5ng2r6xa9tu9xkqkmkfz4tlw8h";

/// 2023-11-14T22:13:20.500Z
pub(crate) const NOW_MS: u64 = 1_700_000_000_500;

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

pub(crate) fn wallet_with_address(address: &str) -> LocalWallet {
    unresolved_wallet().with_address(address)
}

pub(crate) fn test_wallet() -> LocalWallet {
    wallet_with_address(TEST_ADDRESS)
}

pub(crate) fn unresolved_wallet() -> LocalWallet {
    let bytes = hex::decode(TEST_PRIVATE_KEY).unwrap();
    LocalWallet::from_bytes(&bytes).unwrap()
}

pub(crate) fn subaccount(number: u32) -> Subaccount {
    Subaccount::new(Arc::new(test_wallet()), number).unwrap()
}

pub(crate) fn unresolved_subaccount() -> Subaccount {
    Subaccount::new(Arc::new(unresolved_wallet()), 0).unwrap()
}
