//! Order, cancel and transfer message construction.
//!
//! Every `build_*` operation has two forms:
//! - `*_with`: takes concrete market metadata and height, performs no I/O
//! - plain: looks up what it needs, then delegates to the `*_with` form
//!
//! Input checks that need no lookup run before any lookup is issued.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;
use v4_core::{
    quantize, CancelIntent, Clock, Coin, CoreError, Expiry, ExpiryCalculator, MarketInfo,
    MsgCancelOrder, MsgCreateTransfer, MsgDepositToSubaccount, MsgPlaceOrder, MsgSend,
    MsgWithdrawFromSubaccount, Order, OrderFlags, OrderId, OrderIntent, OrderKind, Subaccount,
    SubaccountId, SystemClock, Transfer, Wallet, USDC_ASSET_ID,
};
use v4_registry::{HeightLookup, MarketLookup};

use crate::error::{ExecutorError, ExecutorResult};

/// Decimals of the USDC asset on chain.
pub const DEFAULT_USDC_DECIMALS: u32 = 6;

/// Native chain token used by bank sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainToken {
    pub denom: String,
    pub decimals: u32,
}

/// Builds wire messages from human-readable intents.
pub struct MessageBuilder<C: Clock = SystemClock> {
    markets: Arc<dyn MarketLookup>,
    heights: Arc<dyn HeightLookup>,
    expiry: ExpiryCalculator<C>,
    usdc_decimals: u32,
    chain_token: Option<ChainToken>,
}

impl MessageBuilder<SystemClock> {
    pub fn new(markets: Arc<dyn MarketLookup>, heights: Arc<dyn HeightLookup>) -> Self {
        Self::with_expiry(markets, heights, ExpiryCalculator::new())
    }
}

impl<C: Clock> MessageBuilder<C> {
    pub fn with_expiry(
        markets: Arc<dyn MarketLookup>,
        heights: Arc<dyn HeightLookup>,
        expiry: ExpiryCalculator<C>,
    ) -> Self {
        Self {
            markets,
            heights,
            expiry,
            usdc_decimals: DEFAULT_USDC_DECIMALS,
            chain_token: None,
        }
    }

    pub fn with_usdc_decimals(mut self, decimals: u32) -> Self {
        self.usdc_decimals = decimals;
        self
    }

    pub fn with_chain_token(mut self, token: ChainToken) -> Self {
        self.chain_token = Some(token);
        self
    }

    pub fn expiry(&self) -> &ExpiryCalculator<C> {
        &self.expiry
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Fetch market metadata; a missing market is `MarketNotFound`.
    ///
    /// Metadata quantization cannot use is rejected here, before any order
    /// is built from it.
    pub async fn market(&self, ticker: &str) -> ExecutorResult<MarketInfo> {
        let market = self
            .markets
            .get_market(ticker)
            .await?
            .ok_or_else(|| ExecutorError::MarketNotFound(ticker.to_string()))?;
        market.validate()?;
        Ok(market)
    }

    pub async fn current_height(&self) -> ExecutorResult<u32> {
        Ok(self.heights.latest_height().await?)
    }

    /// Height is only needed for block-based expiries.
    async fn height_for(&self, flags: OrderFlags) -> ExecutorResult<Option<u32>> {
        if flags.is_stateful() {
            Ok(None)
        } else {
            self.current_height().await.map(Some)
        }
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Checks that depend only on the intent itself.
    fn precheck_order(&self, intent: &OrderIntent) -> ExecutorResult<OrderFlags> {
        if intent.trigger.is_some() && intent.kind == OrderKind::ShortTerm {
            return Err(CoreError::InvalidOrder(
                "conditional orders must be long-term".to_string(),
            )
            .into());
        }
        let flags = intent.flags();
        self.expiry.check_kind(flags, intent.expiry.as_ref())?;
        Ok(flags)
    }

    /// Build an order from concrete metadata.
    ///
    /// `current_height` is required for short-term orders and ignored otherwise.
    pub fn build_order_with(
        &self,
        subaccount: &Subaccount,
        intent: &OrderIntent,
        market: &MarketInfo,
        current_height: Option<u32>,
    ) -> ExecutorResult<Order> {
        let flags = self.precheck_order(intent)?;
        market.validate()?;
        let subaccount_id = subaccount.id()?;

        let quantums = quantize::to_quantums(intent.size, market)?;
        let subticks = quantize::to_subticks(intent.price, market)?;
        let expiry = self.expiry.resolve(flags, intent.expiry, current_height)?;

        let (condition_type, trigger_subticks) = match &intent.trigger {
            Some(trigger) => (
                trigger.condition,
                quantize::to_subticks(trigger.price, market)?,
            ),
            None => (Default::default(), 0),
        };

        let order = Order {
            order_id: OrderId {
                subaccount_id,
                client_id: intent.client_id,
                order_flags: flags,
                clob_pair_id: market.clob_pair_id,
            },
            side: intent.side,
            quantums,
            subticks,
            expiry,
            time_in_force: intent.execution.time_in_force(),
            reduce_only: intent.reduce_only,
            client_metadata: intent.effective_client_metadata(),
            condition_type,
            conditional_order_trigger_subticks: trigger_subticks,
        };

        debug!(
            market = %market.ticker,
            client_id = intent.client_id,
            flags = flags.as_u32(),
            quantums,
            subticks,
            good_til_block = order.good_til_block(),
            good_til_block_time = order.good_til_block_time(),
            "Order built"
        );
        Ok(order)
    }

    /// Build an order, fetching market metadata and (for short-term orders) height.
    pub async fn build_order(
        &self,
        subaccount: &Subaccount,
        intent: &OrderIntent,
    ) -> ExecutorResult<Order> {
        let flags = self.precheck_order(intent)?;
        let market = self.market(&intent.market).await?;
        let height = self.height_for(flags).await?;
        self.build_order_with(subaccount, intent, &market, height)
    }

    /// Build an order with known metadata, fetching height only if needed.
    pub async fn build_order_for_market(
        &self,
        subaccount: &Subaccount,
        intent: &OrderIntent,
        market: &MarketInfo,
    ) -> ExecutorResult<Order> {
        let flags = self.precheck_order(intent)?;
        let height = self.height_for(flags).await?;
        self.build_order_with(subaccount, intent, market, height)
    }

    pub async fn place_order_message(
        &self,
        subaccount: &Subaccount,
        intent: &OrderIntent,
    ) -> ExecutorResult<MsgPlaceOrder> {
        Ok(MsgPlaceOrder {
            order: self.build_order(subaccount, intent).await?,
        })
    }

    // =========================================================================
    // Cancels
    // =========================================================================

    /// Build a cancel from a known pair id and height.
    ///
    /// The deadline kind must match the order flags: block height for
    /// short-term orders, time for stateful ones.
    pub fn build_cancel_with(
        &self,
        subaccount: &Subaccount,
        intent: &CancelIntent,
        clob_pair_id: u32,
        current_height: Option<u32>,
    ) -> ExecutorResult<MsgCancelOrder> {
        let expiry: Expiry =
            self.expiry
                .resolve(intent.order_flags, Some(intent.deadline), current_height)?;

        debug!(
            market = %intent.market,
            client_id = intent.client_id,
            flags = intent.order_flags.as_u32(),
            "Cancel built"
        );
        Ok(MsgCancelOrder {
            order_id: OrderId {
                subaccount_id: subaccount.id()?,
                client_id: intent.client_id,
                order_flags: intent.order_flags,
                clob_pair_id,
            },
            expiry,
        })
    }

    /// Build a cancel, looking up the market's pair id.
    pub async fn build_cancel(
        &self,
        subaccount: &Subaccount,
        intent: &CancelIntent,
    ) -> ExecutorResult<MsgCancelOrder> {
        self.expiry
            .check_kind(intent.order_flags, Some(&intent.deadline))?;
        subaccount.address()?;
        let market = self.market(&intent.market).await?;
        let height = self.height_for(intent.order_flags).await?;
        self.build_cancel_with(subaccount, intent, market.clob_pair_id, height)
    }

    /// Build a cancel for a caller-known pair id, skipping the market lookup.
    pub async fn build_cancel_raw(
        &self,
        subaccount: &Subaccount,
        intent: &CancelIntent,
        clob_pair_id: u32,
    ) -> ExecutorResult<MsgCancelOrder> {
        self.expiry
            .check_kind(intent.order_flags, Some(&intent.deadline))?;
        subaccount.address()?;
        let height = self.height_for(intent.order_flags).await?;
        self.build_cancel_with(subaccount, intent, clob_pair_id, height)
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    fn usdc_quantums(&self, amount: Decimal) -> ExecutorResult<u64> {
        Ok(quantize::to_asset_quantums(amount, self.usdc_decimals)?)
    }

    /// USDC transfer between two subaccounts.
    pub fn transfer_message(
        &self,
        subaccount: &Subaccount,
        recipient: SubaccountId,
        amount: Decimal,
    ) -> ExecutorResult<MsgCreateTransfer> {
        Ok(MsgCreateTransfer {
            transfer: Transfer {
                sender: subaccount.id()?,
                recipient,
                asset_id: USDC_ASSET_ID,
                amount: self.usdc_quantums(amount)?,
            },
        })
    }

    /// USDC from the wallet balance into the subaccount.
    pub fn deposit_message(
        &self,
        subaccount: &Subaccount,
        amount: Decimal,
    ) -> ExecutorResult<MsgDepositToSubaccount> {
        let recipient = subaccount.id()?;
        Ok(MsgDepositToSubaccount {
            sender: recipient.owner.clone(),
            recipient,
            asset_id: USDC_ASSET_ID,
            quantums: self.usdc_quantums(amount)?,
        })
    }

    /// USDC from the subaccount to `recipient`, or to its own wallet.
    pub fn withdraw_message(
        &self,
        subaccount: &Subaccount,
        amount: Decimal,
        recipient: Option<String>,
    ) -> ExecutorResult<MsgWithdrawFromSubaccount> {
        let sender = subaccount.id()?;
        Ok(MsgWithdrawFromSubaccount {
            recipient: recipient.unwrap_or_else(|| sender.owner.clone()),
            sender,
            asset_id: USDC_ASSET_ID,
            quantums: self.usdc_quantums(amount)?,
        })
    }

    /// Bank send of the native chain token from the wallet to `recipient`.
    pub fn send_token_message(
        &self,
        wallet: &dyn Wallet,
        recipient: impl Into<String>,
        amount: Decimal,
    ) -> ExecutorResult<MsgSend> {
        let token = self.chain_token.as_ref().ok_or_else(|| {
            CoreError::InvalidAmount("chain token denom is not configured".to_string())
        })?;
        let from_address = wallet.address().ok_or(CoreError::WalletNotReady)?;
        let base_units = quantize::to_base_units(amount, token.decimals)?;
        Ok(MsgSend {
            from_address,
            to_address: recipient.into(),
            amount: vec![Coin {
                denom: token.denom.clone(),
                amount: base_units.to_string(),
            }],
        })
    }
}
