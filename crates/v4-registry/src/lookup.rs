//! Lookup traits and in-memory implementations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use v4_core::{BoxFuture, MarketInfo};

use crate::error::RegistryResult;

/// On-chain account state needed to sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
    pub account_number: u64,
    pub sequence: u64,
}

/// Market metadata by ticker. `Ok(None)` means the market does not exist.
pub trait MarketLookup: Send + Sync {
    fn get_market<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, RegistryResult<Option<MarketInfo>>>;
}

/// Latest committed block height.
pub trait HeightLookup: Send + Sync {
    fn latest_height(&self) -> BoxFuture<'_, RegistryResult<u32>>;
}

/// Account number and sequence. `Ok(None)` means the account is unknown on chain.
pub trait AccountLookup: Send + Sync {
    fn get_account<'a>(&'a self, address: &'a str) -> BoxFuture<'a, RegistryResult<Option<Account>>>;
}

// =============================================================================
// In-memory implementations
// =============================================================================

/// Market lookup over a fixed set of markets.
#[derive(Debug, Default)]
pub struct StaticMarketLookup {
    markets: RwLock<HashMap<String, MarketInfo>>,
    calls: AtomicUsize,
}

impl StaticMarketLookup {
    pub fn new(markets: impl IntoIterator<Item = MarketInfo>) -> Self {
        let lookup = Self::default();
        for market in markets {
            lookup.insert(market);
        }
        lookup
    }

    pub fn insert(&self, market: MarketInfo) {
        self.markets.write().insert(market.ticker.clone(), market);
    }

    /// Number of lookups served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MarketLookup for StaticMarketLookup {
    fn get_market<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, RegistryResult<Option<MarketInfo>>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.markets.read().get(ticker).cloned())
        })
    }
}

/// Height lookup returning a settable height.
#[derive(Debug, Default)]
pub struct FixedHeightLookup {
    height: AtomicU32,
    calls: AtomicUsize,
}

impl FixedHeightLookup {
    pub fn new(height: u32) -> Self {
        Self {
            height: AtomicU32::new(height),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, height: u32) {
        self.height.store(height, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HeightLookup for FixedHeightLookup {
    fn latest_height(&self) -> BoxFuture<'_, RegistryResult<u32>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.height.load(Ordering::SeqCst))
        })
    }
}

/// Account lookup over a fixed set of accounts.
#[derive(Debug, Default)]
pub struct StaticAccountLookup {
    accounts: RwLock<HashMap<String, Account>>,
    calls: AtomicUsize,
}

impl StaticAccountLookup {
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        let lookup = Self::default();
        for account in accounts {
            lookup.insert(account);
        }
        lookup
    }

    pub fn insert(&self, account: Account) {
        self.accounts.write().insert(account.address.clone(), account);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AccountLookup for StaticAccountLookup {
    fn get_account<'a>(&'a self, address: &'a str) -> BoxFuture<'a, RegistryResult<Option<Account>>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.accounts.read().get(address).cloned())
        })
    }
}
