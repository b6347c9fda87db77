//! Core types for the v4 order client.
//!
//! This crate has no I/O. It provides:
//! - `Price`, `Size`: precision-safe numeric types
//! - `MarketInfo`: per-market scaling metadata
//! - Quantization of human price/size into quantums and subticks
//! - Expiry computation for short-lived and long-lived orders
//! - `Subaccount` and the `Wallet` capability
//! - Wire-form messages (`Order`, `MsgPlaceOrder`, `MsgCancelOrder`, ...)

use std::pin::Pin;

pub mod clock;
pub mod decimal;
pub mod error;
pub mod expiry;
pub mod market;
pub mod order;
pub mod quantize;
pub mod subaccount;
pub mod wallet;
pub mod wire;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use expiry::{
    Expiry, ExpiryCalculator, ExpiryRequest, DEFAULT_SHORT_BLOCK_BUFFER, SHORT_BLOCK_WINDOW,
};
pub use market::MarketInfo;
pub use order::{
    CancelIntent, ConditionType, ExecutionMode, OrderFlags, OrderIntent, OrderKind, OrderSide,
    TimeInForce, Trigger,
};
pub use quantize::{
    quantums_to_size, subticks_to_price, to_asset_quantums, to_base_units, to_quantums,
    to_subticks, QUOTE_QUANTUMS_ATOMIC_RESOLUTION,
};
pub use subaccount::{Subaccount, SubaccountId, MAX_SUBACCOUNT_NUMBER};
pub use wallet::{Wallet, WalletError};
pub use wire::{
    Coin, MsgCancelOrder, MsgCreateTransfer, MsgDepositToSubaccount, MsgPlaceOrder, MsgSend,
    MsgWithdrawFromSubaccount, Order, OrderId, Transfer, TxMessage, USDC_ASSET_ID,
};
