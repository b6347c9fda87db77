//! Transaction pipeline: sign, simulate, broadcast.
//!
//! No step is retried. A failed simulate or broadcast is returned to the
//! caller, who decides whether to rebuild with a fresh expiry or sequence.
//! Nothing is cached between calls; concurrent sends for the same account
//! must be sequenced by the caller (or pinned via `TxOptions::account`).

use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};
use v4_core::{CoreError, TxMessage, Wallet};
use v4_registry::{Account, AccountLookup};

use crate::encoder::{Encodable, MessageEncoder};
use crate::error::{ExecutorError, ExecutorResult};
use crate::transport::{BroadcastMode, SimulationReply, TransactionOutcome, Transport};
use crate::tx::{AuthInfo, Coin, Fee, SignDoc, SignerInfo, TxBody, TxRaw};

/// Headroom applied to simulated gas.
pub const GAS_MULTIPLIER: Decimal = dec!(1.6);

/// Gas limit used when the fee is waived.
pub const ZERO_FEE_GAS_LIMIT: u64 = 1_000_000;

/// Chain-level settings for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub chain_id: String,
    /// Denom fees are paid in.
    pub fee_denom: String,
    /// Default price per unit of gas, in `fee_denom` base units.
    pub gas_price: Decimal,
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct TxOptions {
    /// Skip simulation and attach an empty fee.
    pub zero_fee: bool,
    pub gas_price: Option<Decimal>,
    pub memo: Option<String>,
    /// Pin account number and sequence instead of looking them up.
    pub account: Option<Account>,
    /// `None` picks a mode from the messages.
    pub broadcast_mode: Option<BroadcastMode>,
}

impl TxOptions {
    pub fn zero_fee() -> Self {
        Self {
            zero_fee: true,
            ..Self::default()
        }
    }

    pub fn with_gas_price(mut self, gas_price: Decimal) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_account(mut self, account: Account) -> Self {
        self.account = Some(account);
        self
    }

    pub fn with_broadcast_mode(mut self, mode: BroadcastMode) -> Self {
        self.broadcast_mode = Some(mode);
        self
    }
}

/// Mode used when the caller does not pick one.
///
/// A lone short-term order only needs the mempool check; a lone long-term
/// order waits for inclusion. Everything else is sync.
pub fn default_broadcast_mode(messages: &[TxMessage]) -> BroadcastMode {
    match messages {
        [single] => match single.as_place_order().map(|m| m.order.order_id.order_flags) {
            Some(v4_core::OrderFlags::LongTerm) => BroadcastMode::Commit,
            _ => BroadcastMode::Sync,
        },
        _ => BroadcastMode::Sync,
    }
}

/// Drives sign, simulate and broadcast against injected collaborators.
pub struct TransactionPipeline {
    transport: Arc<dyn Transport>,
    accounts: Arc<dyn AccountLookup>,
    encoder: Arc<dyn MessageEncoder>,
    config: PipelineConfig,
}

impl TransactionPipeline {
    pub fn new(
        transport: Arc<dyn Transport>,
        accounts: Arc<dyn AccountLookup>,
        encoder: Arc<dyn MessageEncoder>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            transport,
            accounts,
            encoder,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn encode(&self, item: Encodable<'_>) -> ExecutorResult<Vec<u8>> {
        self.encoder
            .encode(item)
            .map_err(|e| ExecutorError::UnexpectedClient(e.to_string()))
    }

    async fn resolve_account(
        &self,
        wallet: &dyn Wallet,
        pinned: Option<&Account>,
    ) -> ExecutorResult<Account> {
        if let Some(account) = pinned {
            return Ok(account.clone());
        }
        let address = wallet.address().ok_or(CoreError::WalletNotReady)?;
        self.accounts
            .get_account(&address)
            .await?
            .ok_or_else(|| ExecutorError::UnexpectedClient(format!("no account for {address}")))
    }

    fn encode_body(&self, messages: &[TxMessage], memo: Option<&str>) -> ExecutorResult<Vec<u8>> {
        if messages.is_empty() {
            return Err(CoreError::InvalidOrder("transaction has no messages".to_string()).into());
        }
        let encoded = messages
            .iter()
            .map(|m| self.encoder.encode_any(m))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ExecutorError::UnexpectedClient(e.to_string()))?;
        let body = TxBody {
            messages: encoded,
            memo: memo.unwrap_or_default().to_string(),
            timeout_height: 0,
        };
        self.encode(Encodable::Body(&body))
    }

    fn encode_auth_info(
        &self,
        wallet: &dyn Wallet,
        account: &Account,
        fee: Fee,
    ) -> ExecutorResult<Vec<u8>> {
        let auth_info = AuthInfo {
            signer_infos: vec![SignerInfo {
                public_key: wallet.public_key(),
                sequence: account.sequence,
            }],
            fee,
        };
        self.encode(Encodable::AuthInfo(&auth_info))
    }

    /// `gas = floor(gas_used * 1.6)`, `amount = ceil(gas * gas_price)`.
    pub fn fee_from_gas(&self, gas_used: u64, gas_price: Decimal) -> ExecutorResult<Fee> {
        let overflow = || ExecutorError::UnexpectedClient(format!("gas {gas_used} overflows"));
        let gas = Decimal::from(gas_used)
            .checked_mul(GAS_MULTIPLIER)
            .map(|g| g.floor())
            .ok_or_else(overflow)?;
        let amount = gas.checked_mul(gas_price).map(|a| a.ceil()).ok_or_else(overflow)?;
        Ok(Fee {
            amount: vec![Coin {
                denom: self.config.fee_denom.clone(),
                amount: amount.normalize().to_string(),
            }],
            gas_limit: gas.to_u64().ok_or_else(overflow)?,
        })
    }

    async fn simulate_with(
        &self,
        messages: &[TxMessage],
        wallet: &dyn Wallet,
        account: &Account,
        options: &TxOptions,
    ) -> ExecutorResult<Fee> {
        let tx = TxRaw {
            body_bytes: self.encode_body(messages, options.memo.as_deref())?,
            auth_info_bytes: self.encode_auth_info(wallet, account, Fee::zero(0))?,
            signatures: vec![Vec::new()],
        };
        let tx_bytes = self.encode(Encodable::Tx(&tx))?;

        let reply = self
            .transport
            .simulate(&tx_bytes)
            .await
            .map_err(|e| ExecutorError::UnexpectedClient(e.to_string()))?
            .ok_or_else(|| {
                ExecutorError::UnexpectedClient("simulation returned no gas info".to_string())
            })?;

        match reply {
            SimulationReply::Ok { gas_used } => {
                let gas_price = options.gas_price.unwrap_or(self.config.gas_price);
                let fee = self.fee_from_gas(gas_used, gas_price)?;
                debug!(gas_used, gas_limit = fee.gas_limit, "Simulation succeeded");
                Ok(fee)
            }
            SimulationReply::Failed { message } => {
                warn!(error = %message, "Simulation rejected by node");
                Err(ExecutorError::SimulationFailed(message))
            }
        }
    }

    // =========================================================================
    // Public operations
    // =========================================================================

    /// Dry-run the messages and return the fee they would need.
    pub async fn simulate(
        &self,
        messages: &[TxMessage],
        wallet: &dyn Wallet,
        options: &TxOptions,
    ) -> ExecutorResult<Fee> {
        let account = self.resolve_account(wallet, options.account.as_ref()).await?;
        self.simulate_with(messages, wallet, &account, options).await
    }

    /// Build and sign a transaction; returns the broadcastable bytes.
    pub async fn sign(
        &self,
        messages: &[TxMessage],
        wallet: &dyn Wallet,
        options: &TxOptions,
    ) -> ExecutorResult<Vec<u8>> {
        let account = self.resolve_account(wallet, options.account.as_ref()).await?;
        let fee = if options.zero_fee {
            Fee::zero(ZERO_FEE_GAS_LIMIT)
        } else {
            self.simulate_with(messages, wallet, &account, options).await?
        };

        let body_bytes = self.encode_body(messages, options.memo.as_deref())?;
        let auth_info_bytes = self.encode_auth_info(wallet, &account, fee)?;
        let sign_doc = SignDoc {
            body_bytes,
            auth_info_bytes,
            chain_id: self.config.chain_id.clone(),
            account_number: account.account_number,
        };
        let sign_bytes = self.encode(Encodable::SignDoc(&sign_doc))?;

        // NOTE: Do not log signature bytes.
        let signature = wallet.sign(&sign_bytes).await?;
        if signature.len() != 64 {
            return Err(ExecutorError::UnexpectedClient(format!(
                "signer returned a {}-byte signature",
                signature.len()
            )));
        }

        debug!(
            messages = messages.len(),
            sequence = account.sequence,
            account_number = account.account_number,
            "Transaction signed"
        );
        let tx = TxRaw {
            body_bytes: sign_doc.body_bytes,
            auth_info_bytes: sign_doc.auth_info_bytes,
            signatures: vec![signature],
        };
        self.encode(Encodable::Tx(&tx))
    }

    /// Sign and broadcast.
    pub async fn send(
        &self,
        messages: &[TxMessage],
        wallet: &dyn Wallet,
        options: &TxOptions,
    ) -> ExecutorResult<TransactionOutcome> {
        let mode = options
            .broadcast_mode
            .unwrap_or_else(|| default_broadcast_mode(messages));
        let tx_bytes = self.sign(messages, wallet, options).await?;
        self.send_signed_transaction(&tx_bytes, mode).await
    }

    /// Broadcast bytes signed elsewhere.
    ///
    /// A node rejection inside a well-formed reply is returned as an outcome;
    /// a missing reply or one of the wrong shape is `UnexpectedClient`.
    pub async fn send_signed_transaction(
        &self,
        tx_bytes: &[u8],
        mode: BroadcastMode,
    ) -> ExecutorResult<TransactionOutcome> {
        let outcome = self
            .transport
            .broadcast(tx_bytes, mode)
            .await
            .map_err(|e| ExecutorError::UnexpectedClient(e.to_string()))?
            .ok_or_else(|| {
                ExecutorError::UnexpectedClient(format!("no reply to {mode} broadcast"))
            })?;

        if outcome.mode() != mode {
            return Err(ExecutorError::UnexpectedClient(format!(
                "{mode} broadcast answered with a {} reply",
                outcome.mode()
            )));
        }

        if outcome.is_accepted() {
            info!(hash = %outcome.hash(), mode = %mode, "Transaction broadcast");
        } else {
            warn!(
                hash = %outcome.hash(),
                mode = %mode,
                code = outcome.code().unwrap_or_default(),
                "Transaction rejected by node"
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::MsgpackEncoder;
    use crate::test_support::{test_wallet, TEST_ADDRESS};
    use crate::transport::{MockTransport, TransportError};
    use v4_core::{
        ConditionType, Expiry, MsgCancelOrder, MsgPlaceOrder, Order, OrderFlags, OrderId,
        OrderSide, SubaccountId, TimeInForce,
    };
    use v4_registry::StaticAccountLookup;

    struct Fixture {
        transport: Arc<MockTransport>,
        accounts: Arc<StaticAccountLookup>,
        pipeline: TransactionPipeline,
    }

    fn account() -> Account {
        Account {
            address: TEST_ADDRESS.to_string(),
            account_number: 12,
            sequence: 4,
        }
    }

    fn fixture() -> Fixture {
        let transport = Arc::new(MockTransport::new());
        let accounts = Arc::new(StaticAccountLookup::new([account()]));
        let pipeline = TransactionPipeline::new(
            transport.clone(),
            accounts.clone(),
            Arc::new(MsgpackEncoder),
            PipelineConfig {
                chain_id: "dydx-testnet-4".to_string(),
                fee_denom: "uusdc".to_string(),
                gas_price: dec!(0.025),
            },
        );
        Fixture {
            transport,
            accounts,
            pipeline,
        }
    }

    fn place(flags: OrderFlags, expiry: Expiry) -> TxMessage {
        MsgPlaceOrder {
            order: Order {
                order_id: OrderId {
                    subaccount_id: SubaccountId::new(TEST_ADDRESS, 0).unwrap(),
                    client_id: 1,
                    order_flags: flags,
                    clob_pair_id: 1,
                },
                side: OrderSide::Buy,
                quantums: 10_000_000,
                subticks: 1_350_000_000,
                expiry,
                time_in_force: TimeInForce::Unspecified,
                reduce_only: false,
                client_metadata: 0,
                condition_type: ConditionType::Unspecified,
                conditional_order_trigger_subticks: 0,
            },
        }
        .into()
    }

    fn short_place() -> TxMessage {
        place(OrderFlags::ShortTerm, Expiry::ShortLived { good_til_block: 103 })
    }

    fn long_place() -> TxMessage {
        place(
            OrderFlags::LongTerm,
            Expiry::LongLived {
                good_til_block_time: 1_700_000_060,
            },
        )
    }

    #[test]
    fn test_default_broadcast_mode() {
        let cancel: TxMessage = MsgCancelOrder {
            order_id: OrderId {
                subaccount_id: SubaccountId::new(TEST_ADDRESS, 0).unwrap(),
                client_id: 1,
                order_flags: OrderFlags::ShortTerm,
                clob_pair_id: 1,
            },
            expiry: Expiry::ShortLived { good_til_block: 103 },
        }
        .into();
        let conditional = place(
            OrderFlags::Conditional,
            Expiry::LongLived {
                good_til_block_time: 1_700_000_060,
            },
        );

        assert_eq!(default_broadcast_mode(&[short_place()]), BroadcastMode::Sync);
        assert_eq!(default_broadcast_mode(&[long_place()]), BroadcastMode::Commit);
        assert_eq!(default_broadcast_mode(&[conditional]), BroadcastMode::Sync);
        assert_eq!(default_broadcast_mode(&[cancel]), BroadcastMode::Sync);
        assert_eq!(
            default_broadcast_mode(&[long_place(), long_place()]),
            BroadcastMode::Sync
        );
    }

    #[test]
    fn test_fee_from_gas() {
        let f = fixture();
        let fee = f.pipeline.fee_from_gas(100_001, dec!(0.025)).unwrap();
        // floor(160_001.6) = 160_001; ceil(4_000.025) = 4_001
        assert_eq!(fee.gas_limit, 160_001);
        assert_eq!(fee.amount[0].amount, "4001");
        assert_eq!(fee.amount[0].denom, "uusdc");
    }

    #[tokio::test]
    async fn test_zero_fee_send_skips_simulation() {
        let f = fixture();
        let outcome = f
            .pipeline
            .send(&[short_place()], &test_wallet(), &TxOptions::zero_fee())
            .await
            .unwrap();
        assert_eq!(outcome.mode(), BroadcastMode::Sync);
        assert!(f.transport.simulations().is_empty());
        assert_eq!(f.transport.broadcasts().len(), 1);
        assert_eq!(f.transport.broadcasts()[0].mode, BroadcastMode::Sync);
    }

    #[tokio::test]
    async fn test_send_with_fee_simulates_first() {
        let f = fixture();
        f.pipeline
            .send(&[long_place()], &test_wallet(), &TxOptions::default())
            .await
            .unwrap();
        assert_eq!(f.transport.simulations().len(), 1);
        assert_eq!(f.transport.broadcasts()[0].mode, BroadcastMode::Commit);
    }

    #[tokio::test]
    async fn test_simulate_returns_fee() {
        let f = fixture();
        let fee = f
            .pipeline
            .simulate(&[long_place()], &test_wallet(), &TxOptions::default().with_gas_price(dec!(1)))
            .await
            .unwrap();
        // Mock reports 100_000 gas used.
        assert_eq!(fee.gas_limit, 160_000);
        assert_eq!(fee.amount[0].amount, "160000");
    }

    #[tokio::test]
    async fn test_sync_rejection_is_an_outcome() {
        let f = fixture();
        let rejection = TransactionOutcome::Sync {
            hash: "0A1B".to_string(),
            code: 32,
            log: "account sequence mismatch".to_string(),
        };
        f.transport.set_broadcast_reply(Ok(Some(rejection.clone())));
        let outcome = f
            .pipeline
            .send(&[short_place()], &test_wallet(), &TxOptions::zero_fee())
            .await
            .unwrap();
        assert_eq!(outcome, rejection);
        assert!(!outcome.is_accepted());
    }

    #[tokio::test]
    async fn test_missing_reply_is_unexpected_client() {
        let f = fixture();
        f.transport.set_broadcast_reply(Ok(None));
        let err = f
            .pipeline
            .send(&[short_place()], &test_wallet(), &TxOptions::zero_fee())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::UnexpectedClient(_)));
    }

    #[tokio::test]
    async fn test_transport_error_is_unexpected_client() {
        let f = fixture();
        f.transport
            .set_broadcast_reply(Err(TransportError::Http("connection reset".to_string())));
        let err = f
            .pipeline
            .send_signed_transaction(b"signed", BroadcastMode::Async)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::UnexpectedClient(ref m) if m.contains("connection reset")));
    }

    #[tokio::test]
    async fn test_mode_mismatch_is_unexpected_client() {
        let f = fixture();
        f.transport.set_broadcast_reply(Ok(Some(TransactionOutcome::Async {
            hash: "FF".to_string(),
        })));
        let err = f
            .pipeline
            .send_signed_transaction(b"signed", BroadcastMode::Commit)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::UnexpectedClient(_)));
    }

    #[tokio::test]
    async fn test_simulation_failure_keeps_node_message() {
        let f = fixture();
        f.transport.set_simulation_reply(Ok(Some(SimulationReply::Failed {
            message: "insufficient funds".to_string(),
        })));
        let err = f
            .pipeline
            .send(&[long_place()], &test_wallet(), &TxOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::SimulationFailed(ref m) if m == "insufficient funds"));
        assert!(f.transport.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn test_simulation_without_gas_info() {
        let f = fixture();
        f.transport.set_simulation_reply(Ok(None));
        let err = f
            .pipeline
            .simulate(&[long_place()], &test_wallet(), &TxOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::UnexpectedClient(_)));
    }

    #[tokio::test]
    async fn test_unknown_account_is_unexpected_client() {
        let f = fixture();
        let wallet = crate::test_support::wallet_with_address("dydx1stranger");
        let err = f
            .pipeline
            .sign(&[short_place()], &wallet, &TxOptions::zero_fee())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::UnexpectedClient(_)));
    }

    #[tokio::test]
    async fn test_pinned_account_skips_lookup() {
        let f = fixture();
        let options = TxOptions::zero_fee().with_account(Account {
            address: TEST_ADDRESS.to_string(),
            account_number: 12,
            sequence: 99,
        });
        f.pipeline
            .sign(&[short_place()], &test_wallet(), &options)
            .await
            .unwrap();
        assert_eq!(f.accounts.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_message_list_rejected() {
        let f = fixture();
        let err = f
            .pipeline
            .sign(&[], &test_wallet(), &TxOptions::zero_fee())
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_signature_covers_sign_doc() {
        let f = fixture();
        let wallet = test_wallet();
        let options = TxOptions::zero_fee().with_memo("batch-1");
        let tx_bytes = f.pipeline.sign(&[short_place()], &wallet, &options).await.unwrap();

        let tx: TxRaw = rmp_serde::from_slice(&tx_bytes).unwrap();
        let auth_info: AuthInfo = rmp_serde::from_slice(&tx.auth_info_bytes).unwrap();
        assert_eq!(auth_info.fee, Fee::zero(ZERO_FEE_GAS_LIMIT));
        assert_eq!(auth_info.signer_infos[0].sequence, 4);

        let body: TxBody = rmp_serde::from_slice(&tx.body_bytes).unwrap();
        assert_eq!(body.memo, "batch-1");

        let sign_doc = SignDoc {
            body_bytes: tx.body_bytes.clone(),
            auth_info_bytes: tx.auth_info_bytes.clone(),
            chain_id: "dydx-testnet-4".to_string(),
            account_number: 12,
        };
        let sign_bytes = MsgpackEncoder.encode(Encodable::SignDoc(&sign_doc)).unwrap();
        assert_eq!(tx.signatures[0], wallet.sign(&sign_bytes).await.unwrap());
    }
}
