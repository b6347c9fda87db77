//! Numbered sub-ledgers under one wallet address.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{CoreError, Result};
use crate::wallet::Wallet;

/// Highest valid subaccount number.
pub const MAX_SUBACCOUNT_NUMBER: u32 = 127;

fn check_number(number: u32) -> Result<()> {
    if number > MAX_SUBACCOUNT_NUMBER {
        return Err(CoreError::SubaccountOutOfRange(number));
    }
    Ok(())
}

/// A trading account: a wallet reference plus a subaccount number.
///
/// The wallet is shared, not copied; its address is read on every call.
#[derive(Clone)]
pub struct Subaccount {
    wallet: Arc<dyn Wallet>,
    number: u32,
}

impl Subaccount {
    /// Fails with `SubaccountOutOfRange` for numbers above 127.
    pub fn new(wallet: Arc<dyn Wallet>, number: u32) -> Result<Self> {
        check_number(number)?;
        Ok(Self { wallet, number })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn wallet(&self) -> &Arc<dyn Wallet> {
        &self.wallet
    }

    /// Owning address. Fails with `WalletNotReady` before the wallet resolves it.
    pub fn address(&self) -> Result<String> {
        self.wallet.address().ok_or(CoreError::WalletNotReady)
    }

    pub fn id(&self) -> Result<SubaccountId> {
        Ok(SubaccountId {
            owner: self.address()?,
            number: self.number,
        })
    }
}

impl fmt::Debug for Subaccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subaccount")
            .field("address", &self.wallet.address())
            .field("number", &self.number)
            .finish()
    }
}

/// Wire form of a subaccount reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubaccountId {
    pub owner: String,
    pub number: u32,
}

impl SubaccountId {
    pub fn new(owner: impl Into<String>, number: u32) -> Result<Self> {
        check_number(number)?;
        Ok(Self {
            owner: owner.into(),
            number,
        })
    }
}

impl fmt::Display for SubaccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.number)
    }
}
