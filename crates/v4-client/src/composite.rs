//! Single-call operations over the builder and the pipeline.
//!
//! Each operation has a `*_message` variant that stops after building, so
//! several messages can be batched into one `send`.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;
use v4_core::{
    CancelIntent, Clock, CoreError, ExpiryCalculator, ExpiryRequest, MarketInfo, MsgCancelOrder,
    MsgCreateTransfer, MsgDepositToSubaccount, MsgPlaceOrder, MsgSend, MsgWithdrawFromSubaccount,
    OrderIntent, OrderKind, Subaccount, SubaccountId, SystemClock, TxMessage, Wallet,
};
use v4_executor::{
    BroadcastMode, ChainToken, ExecutorResult, Fee, MessageBuilder, MessageEncoder,
    NodeTransport, PipelineConfig, TransactionOutcome, TransactionPipeline, TxOptions,
};
use v4_registry::{IndexerClient, ValidatorRestClient};

use crate::config::ClientConfig;
use crate::error::AppResult;

pub struct CompositeClient<C: Clock = SystemClock> {
    builder: MessageBuilder<C>,
    pipeline: TransactionPipeline,
    /// Overrides the per-message default when set.
    broadcast_mode: Option<BroadcastMode>,
}

/// Message builder backed by the indexer and validator in `config`.
///
/// Needs no encoder; enough for previewing orders without sending them.
pub fn message_builder(config: &ClientConfig) -> AppResult<MessageBuilder> {
    config.validate()?;
    let validator = Arc::new(ValidatorRestClient::new(&config.validator_url)?);
    builder_with(config, validator)
}

fn builder_with(
    config: &ClientConfig,
    validator: Arc<ValidatorRestClient>,
) -> AppResult<MessageBuilder> {
    let indexer = Arc::new(IndexerClient::new(&config.indexer_url)?);
    let expiry = ExpiryCalculator::new().with_short_block_buffer(config.short_block_buffer)?;
    Ok(MessageBuilder::with_expiry(indexer, validator, expiry)
        .with_usdc_decimals(config.denoms.usdc_decimals)
        .with_chain_token(ChainToken {
            denom: config.denoms.chain_token_denom.clone(),
            decimals: config.denoms.chain_token_decimals,
        }))
}

impl CompositeClient {
    /// Wire the HTTP collaborators described by `config`.
    ///
    /// `encoder` must produce the node's protobuf bytes for anything that
    /// is broadcast; `MsgpackEncoder` only suits tests and dry runs.
    pub fn connect(config: &ClientConfig, encoder: Arc<dyn MessageEncoder>) -> AppResult<Self> {
        config.validate()?;
        let validator = Arc::new(ValidatorRestClient::new(&config.validator_url)?);
        let builder = builder_with(config, validator.clone())?;
        let transport = Arc::new(NodeTransport::new(
            &config.validator_rpc_url,
            &config.validator_url,
        )?);

        let pipeline = TransactionPipeline::new(
            transport,
            validator,
            encoder,
            PipelineConfig {
                chain_id: config.chain_id.clone(),
                fee_denom: config.denoms.usdc_denom.clone(),
                gas_price: config.gas_price,
            },
        );

        info!(
            chain_id = %config.chain_id,
            indexer = %config.indexer_url,
            validator = %config.validator_url,
            "Composite client ready"
        );
        Ok(Self::new(builder, pipeline).with_broadcast_mode(config.broadcast_mode))
    }
}

impl<C: Clock> CompositeClient<C> {
    pub fn new(builder: MessageBuilder<C>, pipeline: TransactionPipeline) -> Self {
        Self {
            builder,
            pipeline,
            broadcast_mode: None,
        }
    }

    pub fn with_broadcast_mode(mut self, mode: Option<BroadcastMode>) -> Self {
        self.broadcast_mode = mode;
        self
    }

    pub fn builder(&self) -> &MessageBuilder<C> {
        &self.builder
    }

    pub fn pipeline(&self) -> &TransactionPipeline {
        &self.pipeline
    }

    /// Apply the client-wide mode unless the call already picked one.
    fn options(&self, mut options: TxOptions) -> TxOptions {
        if options.broadcast_mode.is_none() {
            options.broadcast_mode = self.broadcast_mode;
        }
        options
    }

    async fn send_one(
        &self,
        message: TxMessage,
        subaccount: &Subaccount,
        options: TxOptions,
    ) -> ExecutorResult<TransactionOutcome> {
        let options = self.options(options);
        self.pipeline
            .send(&[message], subaccount.wallet().as_ref(), &options)
            .await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    pub async fn place_order_message(
        &self,
        subaccount: &Subaccount,
        intent: &OrderIntent,
    ) -> ExecutorResult<MsgPlaceOrder> {
        self.builder.place_order_message(subaccount, intent).await
    }

    /// Build with caller-supplied market and height; no lookups.
    pub fn place_order_message_with(
        &self,
        subaccount: &Subaccount,
        intent: &OrderIntent,
        market: &MarketInfo,
        current_height: Option<u32>,
    ) -> ExecutorResult<MsgPlaceOrder> {
        Ok(MsgPlaceOrder {
            order: self
                .builder
                .build_order_with(subaccount, intent, market, current_height)?,
        })
    }

    /// Place an order. Orders carry no fee.
    pub async fn place_order(
        &self,
        subaccount: &Subaccount,
        intent: &OrderIntent,
    ) -> ExecutorResult<TransactionOutcome> {
        let message = self.place_order_message(subaccount, intent).await?;
        info!(
            market = %intent.market,
            client_id = intent.client_id,
            side = ?intent.side,
            flags = message.order.order_id.order_flags.as_u32(),
            "Placing order"
        );
        self.send_one(message.into(), subaccount, TxOptions::zero_fee())
            .await
    }

    /// Place a short-term order, optionally at an explicit block.
    pub async fn place_short_term_order(
        &self,
        subaccount: &Subaccount,
        intent: &OrderIntent,
        good_til_block: Option<u32>,
    ) -> ExecutorResult<TransactionOutcome> {
        if intent.kind != OrderKind::ShortTerm {
            return Err(CoreError::InvalidOrder(format!(
                "expected a short-term order, got {:?}",
                intent.kind
            ))
            .into());
        }
        let intent = match good_til_block {
            Some(block) => intent.clone().with_expiry(ExpiryRequest::AtBlock(block)),
            None => intent.clone(),
        };
        self.place_order(subaccount, &intent).await
    }

    // =========================================================================
    // Cancels
    // =========================================================================

    pub async fn cancel_order_message(
        &self,
        subaccount: &Subaccount,
        intent: &CancelIntent,
    ) -> ExecutorResult<MsgCancelOrder> {
        self.builder.build_cancel(subaccount, intent).await
    }

    pub async fn cancel_order(
        &self,
        subaccount: &Subaccount,
        intent: &CancelIntent,
    ) -> ExecutorResult<TransactionOutcome> {
        let message = self.cancel_order_message(subaccount, intent).await?;
        info!(
            market = %intent.market,
            client_id = intent.client_id,
            "Cancelling order"
        );
        self.send_one(message.into(), subaccount, TxOptions::zero_fee())
            .await
    }

    /// Cancel by pair id without a market lookup.
    pub async fn cancel_raw_order(
        &self,
        subaccount: &Subaccount,
        intent: &CancelIntent,
        clob_pair_id: u32,
    ) -> ExecutorResult<TransactionOutcome> {
        let message = self
            .builder
            .build_cancel_raw(subaccount, intent, clob_pair_id)
            .await?;
        self.send_one(message.into(), subaccount, TxOptions::zero_fee())
            .await
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    pub fn transfer_to_subaccount_message(
        &self,
        subaccount: &Subaccount,
        recipient: SubaccountId,
        amount: Decimal,
    ) -> ExecutorResult<MsgCreateTransfer> {
        self.builder.transfer_message(subaccount, recipient, amount)
    }

    /// Move USDC between subaccounts.
    pub async fn transfer_to_subaccount(
        &self,
        subaccount: &Subaccount,
        recipient: SubaccountId,
        amount: Decimal,
    ) -> ExecutorResult<TransactionOutcome> {
        let message = self.transfer_to_subaccount_message(subaccount, recipient, amount)?;
        self.send_one(message.into(), subaccount, TxOptions::zero_fee())
            .await
    }

    pub fn deposit_to_subaccount_message(
        &self,
        subaccount: &Subaccount,
        amount: Decimal,
    ) -> ExecutorResult<MsgDepositToSubaccount> {
        self.builder.deposit_message(subaccount, amount)
    }

    /// Move USDC from the wallet into the subaccount. Pays a simulated fee.
    pub async fn deposit_to_subaccount(
        &self,
        subaccount: &Subaccount,
        amount: Decimal,
    ) -> ExecutorResult<TransactionOutcome> {
        let message = self.deposit_to_subaccount_message(subaccount, amount)?;
        self.send_one(message.into(), subaccount, TxOptions::default())
            .await
    }

    pub fn withdraw_from_subaccount_message(
        &self,
        subaccount: &Subaccount,
        amount: Decimal,
        recipient: Option<String>,
    ) -> ExecutorResult<MsgWithdrawFromSubaccount> {
        self.builder.withdraw_message(subaccount, amount, recipient)
    }

    /// Move USDC out of the subaccount. Pays a simulated fee.
    pub async fn withdraw_from_subaccount(
        &self,
        subaccount: &Subaccount,
        amount: Decimal,
        recipient: Option<String>,
    ) -> ExecutorResult<TransactionOutcome> {
        let message = self.withdraw_from_subaccount_message(subaccount, amount, recipient)?;
        self.send_one(message.into(), subaccount, TxOptions::default())
            .await
    }

    pub fn send_token_message(
        &self,
        subaccount: &Subaccount,
        recipient: impl Into<String>,
        amount: Decimal,
    ) -> ExecutorResult<MsgSend> {
        self.builder
            .send_token_message(subaccount.wallet().as_ref(), recipient, amount)
    }

    /// Bank send of the native chain token. Pays a simulated fee.
    pub async fn send_token(
        &self,
        subaccount: &Subaccount,
        recipient: impl Into<String>,
        amount: Decimal,
    ) -> ExecutorResult<TransactionOutcome> {
        let message = self.send_token_message(subaccount, recipient, amount)?;
        info!(
            to = %message.to_address,
            amount = %message.amount[0].amount,
            denom = %message.amount[0].denom,
            "Sending chain token"
        );
        self.send_one(message.into(), subaccount, TxOptions::default())
            .await
    }

    // =========================================================================
    // Pipeline passthroughs
    // =========================================================================

    pub async fn sign(
        &self,
        messages: &[TxMessage],
        wallet: &dyn Wallet,
        options: &TxOptions,
    ) -> ExecutorResult<Vec<u8>> {
        self.pipeline.sign(messages, wallet, options).await
    }

    pub async fn simulate(
        &self,
        messages: &[TxMessage],
        wallet: &dyn Wallet,
        options: &TxOptions,
    ) -> ExecutorResult<Fee> {
        self.pipeline.simulate(messages, wallet, options).await
    }

    /// Send a batch of prebuilt messages in one transaction.
    pub async fn send(
        &self,
        messages: &[TxMessage],
        wallet: &dyn Wallet,
        options: TxOptions,
    ) -> ExecutorResult<TransactionOutcome> {
        let options = self.options(options);
        self.pipeline.send(messages, wallet, &options).await
    }

    pub async fn send_signed_transaction(
        &self,
        tx_bytes: &[u8],
        mode: BroadcastMode,
    ) -> ExecutorResult<TransactionOutcome> {
        self.pipeline.send_signed_transaction(tx_bytes, mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use v4_executor::{LocalWallet, MsgpackEncoder};

    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_connect_uses_caller_encoder() {
        let config = ClientConfig::default();
        assert!(CompositeClient::connect(&config, Arc::new(MsgpackEncoder)).is_ok());

        let bad = ClientConfig {
            chain_id: " ".to_string(),
            ..ClientConfig::default()
        };
        assert!(CompositeClient::connect(&bad, Arc::new(MsgpackEncoder)).is_err());
        assert!(message_builder(&bad).is_err());
    }

    #[test]
    fn test_message_builder_carries_chain_token() {
        let mut config = ClientConfig::default();
        config.denoms.chain_token_denom = "adydx".to_string();
        let builder = message_builder(&config).unwrap();

        let bytes = hex::decode(TEST_PRIVATE_KEY).unwrap();
        let wallet = LocalWallet::from_bytes(&bytes)
            .unwrap()
            .with_address("dydx1sender");
        let msg = builder
            .send_token_message(&wallet, "dydx1other", dec!(2))
            .unwrap();
        assert_eq!(msg.amount[0].denom, "adydx");
        assert_eq!(msg.amount[0].amount, "2000000000000000000");
    }
}
