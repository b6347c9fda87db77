//! Protocol-exact message forms.
//!
//! These are the typed messages handed to the encoder. Integer fields carry
//! protocol units (quantums, subticks, asset quantums); nothing here is
//! human-scaled.

use serde::{Deserialize, Serialize};

use crate::expiry::Expiry;
use crate::order::{ConditionType, OrderFlags, OrderSide, TimeInForce};
use crate::subaccount::SubaccountId;

/// Asset id of USDC on chain.
pub const USDC_ASSET_ID: u32 = 0;

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId {
    pub subaccount_id: SubaccountId,
    pub client_id: u32,
    pub order_flags: OrderFlags,
    pub clob_pair_id: u32,
}

/// Wire-form order.
///
/// The expiry is a single tagged value, so a block deadline and a time
/// deadline can never both be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub side: OrderSide,
    pub quantums: u64,
    pub subticks: u64,
    pub expiry: Expiry,
    pub time_in_force: TimeInForce,
    pub reduce_only: bool,
    pub client_metadata: u32,
    pub condition_type: ConditionType,
    pub conditional_order_trigger_subticks: u64,
}

impl Order {
    #[inline]
    pub fn good_til_block(&self) -> u32 {
        self.expiry.good_til_block()
    }

    #[inline]
    pub fn good_til_block_time(&self) -> u32 {
        self.expiry.good_til_block_time()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgPlaceOrder {
    pub order: Order,
}

/// Cancellation. `expiry` is the cancel's own deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCancelOrder {
    pub order_id: OrderId,
    pub expiry: Expiry,
}

// =============================================================================
// Transfers
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub sender: SubaccountId,
    pub recipient: SubaccountId,
    pub asset_id: u32,
    pub amount: u64,
}

/// Subaccount to subaccount transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateTransfer {
    pub transfer: Transfer,
}

/// Wallet balance to subaccount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDepositToSubaccount {
    pub sender: String,
    pub recipient: SubaccountId,
    pub asset_id: u32,
    pub quantums: u64,
}

/// Subaccount to wallet balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgWithdrawFromSubaccount {
    pub sender: SubaccountId,
    pub recipient: String,
    pub asset_id: u32,
    pub quantums: u64,
}

/// Amount of one denom, in base units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

/// Bank send between wallet addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSend {
    pub from_address: String,
    pub to_address: String,
    pub amount: Vec<Coin>,
}

// =============================================================================
// TxMessage
// =============================================================================

/// Any message that can go into a transaction body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TxMessage {
    PlaceOrder(MsgPlaceOrder),
    CancelOrder(MsgCancelOrder),
    CreateTransfer(MsgCreateTransfer),
    DepositToSubaccount(MsgDepositToSubaccount),
    WithdrawFromSubaccount(MsgWithdrawFromSubaccount),
    Send(MsgSend),
}

impl TxMessage {
    pub fn type_url(&self) -> &'static str {
        match self {
            Self::PlaceOrder(_) => "/dydxprotocol.clob.MsgPlaceOrder",
            Self::CancelOrder(_) => "/dydxprotocol.clob.MsgCancelOrder",
            Self::CreateTransfer(_) => "/dydxprotocol.sending.MsgCreateTransfer",
            Self::DepositToSubaccount(_) => "/dydxprotocol.sending.MsgDepositToSubaccount",
            Self::WithdrawFromSubaccount(_) => "/dydxprotocol.sending.MsgWithdrawFromSubaccount",
            Self::Send(_) => "/cosmos.bank.v1beta1.MsgSend",
        }
    }

    pub fn as_place_order(&self) -> Option<&MsgPlaceOrder> {
        match self {
            Self::PlaceOrder(msg) => Some(msg),
            _ => None,
        }
    }
}

impl From<MsgPlaceOrder> for TxMessage {
    fn from(msg: MsgPlaceOrder) -> Self {
        Self::PlaceOrder(msg)
    }
}

impl From<MsgCancelOrder> for TxMessage {
    fn from(msg: MsgCancelOrder) -> Self {
        Self::CancelOrder(msg)
    }
}

impl From<MsgCreateTransfer> for TxMessage {
    fn from(msg: MsgCreateTransfer) -> Self {
        Self::CreateTransfer(msg)
    }
}

impl From<MsgDepositToSubaccount> for TxMessage {
    fn from(msg: MsgDepositToSubaccount) -> Self {
        Self::DepositToSubaccount(msg)
    }
}

impl From<MsgWithdrawFromSubaccount> for TxMessage {
    fn from(msg: MsgWithdrawFromSubaccount) -> Self {
        Self::WithdrawFromSubaccount(msg)
    }
}

impl From<MsgSend> for TxMessage {
    fn from(msg: MsgSend) -> Self {
        Self::Send(msg)
    }
}
