//! Order building, signing and broadcast for the v4 client.
//!
//! - `builder`: turns intents into chain messages (quantization, expiry)
//! - `pipeline`: sign, simulate, broadcast
//! - `transport` / `node`: how signed bytes reach a node
//! - `signer`: local key handling

pub mod builder;
pub mod encoder;
pub mod error;
pub mod node;
pub mod pipeline;
pub mod signer;
pub mod transport;
pub mod tx;

#[cfg(test)]
pub(crate) mod test_support;

pub use builder::{ChainToken, MessageBuilder, DEFAULT_USDC_DECIMALS};
pub use encoder::{Encodable, EncodeError, MessageEncoder, MsgpackEncoder};
pub use error::{ExecutorError, ExecutorResult};
pub use node::NodeTransport;
pub use pipeline::{
    default_broadcast_mode, PipelineConfig, TransactionPipeline, TxOptions, GAS_MULTIPLIER,
    ZERO_FEE_GAS_LIMIT,
};
pub use signer::{KeyError, KeySource, LocalWallet};
pub use transport::{
    BroadcastMode, MockTransport, RecordedBroadcast, SimulationReply, TransactionOutcome,
    Transport, TransportError, TransportResult,
};
pub use tx::{Any, AuthInfo, Coin, Fee, SignDoc, SignerInfo, TxBody, TxRaw};
