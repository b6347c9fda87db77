//! Expiry computation for short-lived and long-lived orders.
//!
//! Short-lived orders expire at an absolute block height that must lie in
//! `(current_height, current_height + SHORT_BLOCK_WINDOW]`. Long-lived orders
//! expire at a UNIX timestamp (whole seconds) that must be in the future; the
//! upper bound is left to the chain.

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::{CoreError, Result};
use crate::order::OrderFlags;

/// Number of blocks ahead a short-lived order may be valid for.
pub const SHORT_BLOCK_WINDOW: u32 = 20;

/// Extra blocks added past the next block when no expiry is given.
pub const DEFAULT_SHORT_BLOCK_BUFFER: u32 = 2;

/// Caller-supplied expiry, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryRequest {
    /// Absolute block height (short-lived orders).
    AtBlock(u32),
    /// Seconds from now (long-lived orders).
    AfterSeconds(u64),
    /// Absolute UNIX timestamp in seconds (long-lived orders).
    AtTime(u32),
}

impl ExpiryRequest {
    #[inline]
    pub fn is_block_based(&self) -> bool {
        matches!(self, Self::AtBlock(_))
    }
}

/// Validated expiry. Exactly one representation exists per order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiry {
    ShortLived { good_til_block: u32 },
    LongLived { good_til_block_time: u32 },
}

impl Expiry {
    /// Block height deadline, zero for long-lived orders.
    #[inline]
    pub fn good_til_block(&self) -> u32 {
        match self {
            Self::ShortLived { good_til_block } => *good_til_block,
            Self::LongLived { .. } => 0,
        }
    }

    /// Timestamp deadline, zero for short-lived orders.
    #[inline]
    pub fn good_til_block_time(&self) -> u32 {
        match self {
            Self::ShortLived { .. } => 0,
            Self::LongLived {
                good_til_block_time,
            } => *good_til_block_time,
        }
    }

    #[inline]
    pub fn is_short_lived(&self) -> bool {
        matches!(self, Self::ShortLived { .. })
    }
}

/// Computes and validates order expiries.
#[derive(Debug)]
pub struct ExpiryCalculator<C: Clock = SystemClock> {
    clock: C,
    short_block_buffer: u32,
}

impl Default for ExpiryCalculator<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpiryCalculator<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> ExpiryCalculator<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            short_block_buffer: DEFAULT_SHORT_BLOCK_BUFFER,
        }
    }

    /// Override the default short block buffer.
    ///
    /// The default expiry `H + 1 + buffer` must stay inside the window.
    pub fn with_short_block_buffer(mut self, buffer: u32) -> Result<Self> {
        if buffer >= SHORT_BLOCK_WINDOW {
            return Err(CoreError::InvalidExpiry(format!(
                "short block buffer {buffer} must be below {SHORT_BLOCK_WINDOW}"
            )));
        }
        self.short_block_buffer = buffer;
        Ok(self)
    }

    pub fn short_block_buffer(&self) -> u32 {
        self.short_block_buffer
    }

    /// Short-lived expiry at `current_height`, defaulting to `H + 1 + buffer`.
    pub fn short_lived(&self, current_height: u32, requested: Option<u32>) -> Result<Expiry> {
        let good_til_block = match requested {
            Some(block) => block,
            None => current_height
                .checked_add(1 + self.short_block_buffer)
                .ok_or_else(|| {
                    CoreError::InvalidExpiry(format!("height {current_height} overflows"))
                })?,
        };

        let upper = u64::from(current_height) + u64::from(SHORT_BLOCK_WINDOW);
        if good_til_block <= current_height || u64::from(good_til_block) > upper {
            return Err(CoreError::InvalidExpiry(format!(
                "good_til_block {good_til_block} outside ({current_height}, {upper}]"
            )));
        }
        Ok(Expiry::ShortLived { good_til_block })
    }

    /// Long-lived expiry from a relative or absolute time request.
    pub fn long_lived(&self, request: ExpiryRequest) -> Result<Expiry> {
        let now = self.clock.now_secs();
        let deadline = match request {
            ExpiryRequest::AfterSeconds(0) => {
                return Err(CoreError::InvalidExpiry(
                    "good_til_block_time must be in the future".to_string(),
                ))
            }
            ExpiryRequest::AfterSeconds(secs) => now.saturating_add(secs),
            ExpiryRequest::AtTime(time) => u64::from(time),
            ExpiryRequest::AtBlock(block) => {
                return Err(CoreError::InvalidExpiry(format!(
                    "long-lived orders expire by time, got block {block}"
                )))
            }
        };

        if deadline <= now {
            return Err(CoreError::InvalidExpiry(format!(
                "good_til_block_time {deadline} is not after now ({now})"
            )));
        }
        let good_til_block_time = u32::try_from(deadline).map_err(|_| {
            CoreError::InvalidExpiry(format!("good_til_block_time {deadline} overflows u32"))
        })?;
        Ok(Expiry::LongLived {
            good_til_block_time,
        })
    }

    /// Reject a request whose kind does not match the order flags.
    ///
    /// Needs no height, so it runs before any lookup.
    pub fn check_kind(&self, flags: OrderFlags, request: Option<&ExpiryRequest>) -> Result<()> {
        match (flags.is_stateful(), request) {
            (false, None) => Ok(()),
            (false, Some(r)) if r.is_block_based() => Ok(()),
            (false, Some(r)) => Err(CoreError::InvalidExpiry(format!(
                "short-lived orders expire by block, got {r:?}"
            ))),
            (true, None) => Err(CoreError::InvalidExpiry(
                "stateful orders need a time deadline".to_string(),
            )),
            (true, Some(r)) if r.is_block_based() => Err(CoreError::InvalidExpiry(format!(
                "stateful orders expire by time, got {r:?}"
            ))),
            (true, Some(_)) => Ok(()),
        }
    }

    /// Resolve the expiry for the given flags.
    ///
    /// `current_height` is only read for short-lived orders.
    pub fn resolve(
        &self,
        flags: OrderFlags,
        request: Option<ExpiryRequest>,
        current_height: Option<u32>,
    ) -> Result<Expiry> {
        self.check_kind(flags, request.as_ref())?;
        match (flags.is_stateful(), request) {
            (true, Some(request)) => self.long_lived(request),
            (false, request) => {
                let height = current_height.ok_or_else(|| {
                    CoreError::InvalidExpiry("short-lived expiry needs a block height".to_string())
                })?;
                let requested = match request {
                    Some(ExpiryRequest::AtBlock(block)) => Some(block),
                    _ => None,
                };
                self.short_lived(height, requested)
            }
            (true, None) => Err(CoreError::InvalidExpiry(
                "stateful orders need a time deadline".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const NOW_MS: u64 = 1_700_000_000_500;
    const NOW_SECS: u64 = 1_700_000_000;

    fn calculator() -> ExpiryCalculator<ManualClock> {
        ExpiryCalculator::with_clock(ManualClock::new(NOW_MS))
    }

    #[test]
    fn test_default_short_expiry_is_height_plus_three() {
        let expiry = calculator().short_lived(1_000, None).unwrap();
        assert_eq!(expiry, Expiry::ShortLived { good_til_block: 1_003 });
        assert_eq!(expiry.good_til_block_time(), 0);
    }

    #[test]
    fn test_default_short_expiry_inside_window() {
        let calc = calculator();
        for height in [0u32, 1, 17, 1_000_000, u32::MAX - SHORT_BLOCK_WINDOW] {
            let gtb = calc.short_lived(height, None).unwrap().good_til_block();
            assert!(gtb > height);
            assert!(u64::from(gtb) <= u64::from(height) + u64::from(SHORT_BLOCK_WINDOW));
        }
    }

    #[test]
    fn test_short_expiry_window_bounds() {
        let calc = calculator();
        assert!(calc.short_lived(100, Some(101)).is_ok());
        assert!(calc.short_lived(100, Some(120)).is_ok());
        for bad in [99, 100, 121, 500] {
            assert!(
                matches!(calc.short_lived(100, Some(bad)), Err(CoreError::InvalidExpiry(_))),
                "block {bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_short_expiry_overflow() {
        let result = calculator().short_lived(u32::MAX, None);
        assert!(matches!(result, Err(CoreError::InvalidExpiry(_))));
    }

    #[test]
    fn test_buffer_override() {
        let calc = calculator().with_short_block_buffer(5).unwrap();
        assert_eq!(calc.short_lived(10, None).unwrap().good_til_block(), 16);
        assert!(calculator().with_short_block_buffer(19).is_ok());
        assert!(calculator().with_short_block_buffer(20).is_err());
    }

    #[test]
    fn test_long_expiry_truncates_to_seconds() {
        let expiry = calculator()
            .long_lived(ExpiryRequest::AfterSeconds(60))
            .unwrap();
        assert_eq!(
            expiry,
            Expiry::LongLived {
                good_til_block_time: (NOW_SECS + 60) as u32
            }
        );
        assert_eq!(expiry.good_til_block(), 0);
    }

    #[test]
    fn test_long_expiry_must_be_future() {
        let calc = calculator();
        assert!(calc.long_lived(ExpiryRequest::AfterSeconds(0)).is_err());
        assert!(calc.long_lived(ExpiryRequest::AtTime(NOW_SECS as u32)).is_err());
        assert!(calc.long_lived(ExpiryRequest::AtTime(NOW_SECS as u32 + 1)).is_ok());
    }

    #[test]
    fn test_long_expiry_overflow() {
        let result = calculator().long_lived(ExpiryRequest::AfterSeconds(u64::from(u32::MAX)));
        assert!(matches!(result, Err(CoreError::InvalidExpiry(_))));
    }

    #[test]
    fn test_check_kind_pairs() {
        let calc = calculator();
        let block = ExpiryRequest::AtBlock(5);
        let secs = ExpiryRequest::AfterSeconds(5);
        assert!(calc.check_kind(OrderFlags::ShortTerm, None).is_ok());
        assert!(calc.check_kind(OrderFlags::ShortTerm, Some(&block)).is_ok());
        assert!(calc.check_kind(OrderFlags::ShortTerm, Some(&secs)).is_err());
        assert!(calc.check_kind(OrderFlags::LongTerm, Some(&secs)).is_ok());
        assert!(calc.check_kind(OrderFlags::LongTerm, Some(&block)).is_err());
        assert!(calc.check_kind(OrderFlags::Conditional, None).is_err());
    }

    #[test]
    fn test_resolve_never_sets_both_fields() {
        let calc = calculator();
        let requests = [
            None,
            Some(ExpiryRequest::AtBlock(1_005)),
            Some(ExpiryRequest::AfterSeconds(30)),
            Some(ExpiryRequest::AtTime(NOW_SECS as u32 + 30)),
        ];
        for flags in [OrderFlags::ShortTerm, OrderFlags::LongTerm, OrderFlags::Conditional] {
            for request in requests {
                if let Ok(expiry) = calc.resolve(flags, request, Some(1_000)) {
                    assert!(expiry.good_til_block() == 0 || expiry.good_til_block_time() == 0);
                    assert_eq!(expiry.is_short_lived(), !flags.is_stateful());
                }
            }
        }
    }

    #[test]
    fn test_resolve_short_needs_height() {
        let result = calculator().resolve(OrderFlags::ShortTerm, None, None);
        assert!(matches!(result, Err(CoreError::InvalidExpiry(_))));
    }
}
