//! Read-only lookups consumed by the v4 client.
//!
//! - `MarketLookup`: per-market scaling metadata by ticker
//! - `HeightLookup`: latest block height
//! - `AccountLookup`: account number and sequence by address
//!
//! `IndexerClient` and `ValidatorRestClient` implement these over HTTP;
//! the `Static*`/`Fixed*` types serve them from memory.

pub mod error;
pub mod indexer;
pub mod json;
pub mod lookup;
pub mod validator;

pub use error::{RegistryError, RegistryResult};
pub use indexer::IndexerClient;
pub use lookup::{
    Account, AccountLookup, FixedHeightLookup, HeightLookup, MarketLookup, StaticAccountLookup,
    StaticMarketLookup,
};
pub use validator::ValidatorRestClient;
