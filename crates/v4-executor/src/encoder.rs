//! Message encoder seam.
//!
//! The pipeline never picks a wire codec itself; it is handed a
//! `MessageEncoder` at construction. `MsgpackEncoder` is the bundled
//! implementation.

use serde::Serialize;
use thiserror::Error;
use v4_core::TxMessage;

use crate::tx::{Any, AuthInfo, SignDoc, TxBody, TxRaw};

/// Anything the pipeline needs turned into bytes.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum Encodable<'a> {
    Message(&'a TxMessage),
    Body(&'a TxBody),
    AuthInfo(&'a AuthInfo),
    SignDoc(&'a SignDoc),
    Tx(&'a TxRaw),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Encoding failed: {0}")]
    Failed(String),
}

/// Encodes typed values to canonical bytes. Must be deterministic.
pub trait MessageEncoder: Send + Sync {
    fn encode(&self, item: Encodable<'_>) -> Result<Vec<u8>, EncodeError>;

    /// Encode a message and wrap it with its type URL.
    fn encode_any(&self, message: &TxMessage) -> Result<Any, EncodeError> {
        Ok(Any {
            type_url: message.type_url().to_string(),
            value: self.encode(Encodable::Message(message))?,
        })
    }
}

/// Named-field MessagePack encoder.
///
/// Field order follows struct declaration order, so equal values always
/// produce equal bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgpackEncoder;

impl MessageEncoder for MsgpackEncoder {
    fn encode(&self, item: Encodable<'_>) -> Result<Vec<u8>, EncodeError> {
        rmp_serde::to_vec_named(&item).map_err(|e| EncodeError::Failed(e.to_string()))
    }
}
