//! Order-related enums and the human-readable intents.
//!
//! Numeric discriminants are the protocol's wire values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::decimal::{Price, Size};
use crate::expiry::ExpiryRequest;

/// Order side: buy or sell. Serialized as the protocol integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Protocol enum value (SIDE_BUY = 1, SIDE_SELL = 2).
    pub fn as_proto(&self) -> i32 {
        match self {
            Self::Buy => 1,
            Self::Sell => 2,
        }
    }
}

impl From<OrderSide> for i32 {
    fn from(side: OrderSide) -> Self {
        side.as_proto()
    }
}

impl TryFrom<i32> for OrderSide {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Buy),
            2 => Ok(Self::Sell),
            other => Err(format!("unknown side: {other}")),
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(format!("unknown side: {other}")),
        }
    }
}

/// Short-lived orders expire by block height and live only in memory on the
/// validators; long-lived orders are stored in state until a wall-clock deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    ShortTerm,
    LongTerm,
}

impl OrderKind {
    /// Order flags for this kind. Conditional orders are always stateful.
    pub fn flags(&self, conditional: bool) -> OrderFlags {
        match (self, conditional) {
            (_, true) => OrderFlags::Conditional,
            (Self::ShortTerm, false) => OrderFlags::ShortTerm,
            (Self::LongTerm, false) => OrderFlags::LongTerm,
        }
    }
}

impl FromStr for OrderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "short_term" | "short" => Ok(Self::ShortTerm),
            "long_term" | "long" => Ok(Self::LongTerm),
            other => Err(format!("unknown order kind: {other}")),
        }
    }
}

/// Order flags carried in the order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum OrderFlags {
    ShortTerm = 0,
    Conditional = 32,
    LongTerm = 64,
}

impl OrderFlags {
    #[inline]
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// Stateful orders (long-term and conditional) expire by block time.
    #[inline]
    pub fn is_stateful(&self) -> bool {
        !matches!(self, Self::ShortTerm)
    }
}

impl From<OrderFlags> for u32 {
    fn from(flags: OrderFlags) -> Self {
        flags.as_u32()
    }
}

impl TryFrom<u32> for OrderFlags {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::ShortTerm),
            32 => Ok(Self::Conditional),
            64 => Ok(Self::LongTerm),
            other => Err(format!("unknown order flags: {other}")),
        }
    }
}

/// Caller-facing execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Default,
    FillOrKill,
    ImmediateOrCancel,
    PostOnly,
}

impl ExecutionMode {
    pub fn time_in_force(&self) -> TimeInForce {
        match self {
            Self::Default => TimeInForce::Unspecified,
            Self::FillOrKill => TimeInForce::FillOrKill,
            Self::ImmediateOrCancel => TimeInForce::ImmediateOrCancel,
            Self::PostOnly => TimeInForce::PostOnly,
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "default" | "gtt" => Ok(Self::Default),
            "fok" | "fill_or_kill" => Ok(Self::FillOrKill),
            "ioc" | "immediate_or_cancel" => Ok(Self::ImmediateOrCancel),
            "post_only" => Ok(Self::PostOnly),
            other => Err(format!("unknown execution mode: {other}")),
        }
    }
}

/// Protocol time-in-force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum TimeInForce {
    #[default]
    Unspecified = 0,
    ImmediateOrCancel = 1,
    PostOnly = 2,
    FillOrKill = 3,
}

impl From<TimeInForce> for i32 {
    fn from(tif: TimeInForce) -> Self {
        tif as i32
    }
}

impl TryFrom<i32> for TimeInForce {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unspecified),
            1 => Ok(Self::ImmediateOrCancel),
            2 => Ok(Self::PostOnly),
            3 => Ok(Self::FillOrKill),
            other => Err(format!("unknown time in force: {other}")),
        }
    }
}

/// Trigger condition of a conditional order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum ConditionType {
    #[default]
    Unspecified = 0,
    StopLoss = 1,
    TakeProfit = 2,
}

impl From<ConditionType> for i32 {
    fn from(condition: ConditionType) -> Self {
        condition as i32
    }
}

impl TryFrom<i32> for ConditionType {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unspecified),
            1 => Ok(Self::StopLoss),
            2 => Ok(Self::TakeProfit),
            other => Err(format!("unknown condition type: {other}")),
        }
    }
}

/// Trigger price for a conditional order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub condition: ConditionType,
    pub price: Price,
}

impl Trigger {
    pub fn stop_loss(price: Price) -> Self {
        Self {
            condition: ConditionType::StopLoss,
            price,
        }
    }

    pub fn take_profit(price: Price) -> Self {
        Self {
            condition: ConditionType::TakeProfit,
            price,
        }
    }
}

/// Human-readable description of an order to place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Market ticker, e.g. "ETH-USD".
    pub market: String,
    pub side: OrderSide,
    pub price: Price,
    pub size: Size,
    /// Caller-chosen correlation id.
    pub client_id: u32,
    pub kind: OrderKind,
    pub execution: ExecutionMode,
    pub trigger: Option<Trigger>,
    pub reduce_only: bool,
    /// `None` selects the default expiry for short-lived orders.
    pub expiry: Option<ExpiryRequest>,
    /// Overrides the derived client metadata (1 with a trigger, else 0).
    pub client_metadata: Option<u32>,
}

impl OrderIntent {
    pub fn new(
        market: impl Into<String>,
        side: OrderSide,
        price: Price,
        size: Size,
        client_id: u32,
        kind: OrderKind,
    ) -> Self {
        Self {
            market: market.into(),
            side,
            price,
            size,
            client_id,
            kind,
            execution: ExecutionMode::Default,
            trigger: None,
            reduce_only: false,
            expiry: None,
            client_metadata: None,
        }
    }

    pub fn short_term(
        market: impl Into<String>,
        side: OrderSide,
        price: Price,
        size: Size,
        client_id: u32,
    ) -> Self {
        Self::new(market, side, price, size, client_id, OrderKind::ShortTerm)
    }

    /// Long-lived order valid for `good_til_secs` seconds from now.
    pub fn long_term(
        market: impl Into<String>,
        side: OrderSide,
        price: Price,
        size: Size,
        client_id: u32,
        good_til_secs: u64,
    ) -> Self {
        Self::new(market, side, price, size, client_id, OrderKind::LongTerm)
            .with_expiry(ExpiryRequest::AfterSeconds(good_til_secs))
    }

    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn with_expiry(mut self, expiry: ExpiryRequest) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }

    pub fn with_client_metadata(mut self, metadata: u32) -> Self {
        self.client_metadata = Some(metadata);
        self
    }

    /// Client metadata carried on the wire.
    pub fn effective_client_metadata(&self) -> u32 {
        self.client_metadata
            .unwrap_or(u32::from(self.trigger.is_some()))
    }

    pub fn flags(&self) -> OrderFlags {
        self.kind.flags(self.trigger.is_some())
    }
}

/// Human-readable description of a cancellation.
///
/// `deadline` is the cancellation's own expiry, not the original order's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelIntent {
    pub market: String,
    pub client_id: u32,
    /// Flags the order was placed with.
    pub order_flags: OrderFlags,
    pub deadline: ExpiryRequest,
}

impl CancelIntent {
    pub fn new(
        market: impl Into<String>,
        client_id: u32,
        order_flags: OrderFlags,
        deadline: ExpiryRequest,
    ) -> Self {
        Self {
            market: market.into(),
            client_id,
            order_flags,
            deadline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flags_follow_kind_and_trigger() {
        assert_eq!(OrderKind::ShortTerm.flags(false), OrderFlags::ShortTerm);
        assert_eq!(OrderKind::LongTerm.flags(false), OrderFlags::LongTerm);
        assert_eq!(OrderKind::LongTerm.flags(true), OrderFlags::Conditional);
        assert_eq!(OrderFlags::Conditional.as_u32(), 32);
        assert!(OrderFlags::LongTerm.is_stateful());
        assert!(!OrderFlags::ShortTerm.is_stateful());
    }

    #[test]
    fn test_execution_mode_maps_to_time_in_force() {
        assert_eq!(ExecutionMode::Default.time_in_force(), TimeInForce::Unspecified);
        assert_eq!(
            ExecutionMode::ImmediateOrCancel.time_in_force() as i32,
            1
        );
        assert_eq!(ExecutionMode::PostOnly.time_in_force() as i32, 2);
        assert_eq!(ExecutionMode::FillOrKill.time_in_force() as i32, 3);
    }

    #[test]
    fn test_parse_cli_values() {
        assert_eq!("BUY".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!("ioc".parse::<ExecutionMode>().unwrap(), ExecutionMode::ImmediateOrCancel);
        assert_eq!("long-term".parse::<OrderKind>().unwrap(), OrderKind::LongTerm);
        assert!("hold".parse::<OrderSide>().is_err());
    }

    #[test]
    fn test_flags_serde_as_integer() {
        let json = serde_json::to_string(&OrderFlags::LongTerm).unwrap();
        assert_eq!(json, "64");
        let back: OrderFlags = serde_json::from_str("32").unwrap();
        assert_eq!(back, OrderFlags::Conditional);
        assert!(serde_json::from_str::<OrderFlags>("7").is_err());
    }

    #[test]
    fn test_intent_builders() {
        let intent = OrderIntent::long_term(
            "ETH-USD",
            OrderSide::Sell,
            Price::new(dec!(1400)),
            Size::new(dec!(0.5)),
            7,
            3600,
        )
        .with_trigger(Trigger::take_profit(Price::new(dec!(1500))))
        .reduce_only();

        assert_eq!(intent.flags(), OrderFlags::Conditional);
        assert_eq!(intent.effective_client_metadata(), 1);
        assert_eq!(intent.clone().with_client_metadata(0).effective_client_metadata(), 0);
        assert_eq!(intent.expiry, Some(ExpiryRequest::AfterSeconds(3600)));
        assert!(intent.reduce_only);
    }
}
