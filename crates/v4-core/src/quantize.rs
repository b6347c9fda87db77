//! Conversion between human units and protocol integer units.
//!
//! - quantums = floor(size * 10^-atomic_resolution), rounded down to a
//!   multiple of `step_base_quantums`
//! - subticks = floor(price * 10^(atomic_resolution - quantum_conversion_exponent + 6)),
//!   rounded down to a multiple of `subticks_per_tick`
//!
//! All arithmetic is exact decimal arithmetic; every function is pure.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::decimal::{Price, Size};
use crate::error::{CoreError, Result};
use crate::market::MarketInfo;

/// Atomic resolution of quote quantums (USDC has 6 decimals).
pub const QUOTE_QUANTUMS_ATOMIC_RESOLUTION: i32 = -6;

/// Maximum scale `rust_decimal` can represent.
const MAX_SCALE: u32 = 28;

/// 10^exp as an exact decimal, or `None` when it is not representable.
fn pow10(exp: i32) -> Option<Decimal> {
    if exp >= 0 {
        (0..exp).try_fold(Decimal::ONE, |acc, _| acc.checked_mul(Decimal::TEN))
    } else {
        let scale = exp.unsigned_abs();
        (scale <= MAX_SCALE).then(|| Decimal::new(1, scale))
    }
}

/// Exponent turning quantums into quantums-per-size, i.e. `-atomic_resolution`.
pub(crate) fn quantum_exponent(market: &MarketInfo) -> Option<i32> {
    market.atomic_resolution.checked_neg()
}

/// `atomic_resolution - quantum_conversion_exponent + 6`.
pub(crate) fn subtick_exponent(market: &MarketInfo) -> Option<i32> {
    market
        .atomic_resolution
        .checked_sub(market.quantum_conversion_exponent)?
        .checked_sub(QUOTE_QUANTUMS_ATOMIC_RESOLUTION)
}

/// Floor `raw` to a multiple of `step`. `raw` must already be non-negative.
fn floor_to_multiple(raw: Decimal, step: u64) -> Option<u64> {
    let raw = raw.floor().to_u64()?;
    Some(raw / step * step)
}

/// Convert a base-asset size into quantums.
///
/// Fails with `InvalidSize` when the result is not a positive multiple of the
/// market step, or when the market metadata cannot scale the value.
pub fn to_quantums(size: Size, market: &MarketInfo) -> Result<u64> {
    if market.step_base_quantums == 0 {
        return Err(CoreError::InvalidSize(format!(
            "{} has a zero step_base_quantums",
            market.ticker
        )));
    }
    if !size.is_positive() {
        return Err(CoreError::InvalidSize(format!("size {size} must be positive")));
    }

    let scaled = quantum_exponent(market)
        .and_then(pow10)
        .and_then(|factor| size.inner().checked_mul(factor))
        .ok_or_else(|| CoreError::InvalidSize(format!("size {size} overflows quantums")))?;
    let quantums = floor_to_multiple(scaled, market.step_base_quantums)
        .ok_or_else(|| CoreError::InvalidSize(format!("size {size} overflows quantums")))?;

    if quantums == 0 {
        return Err(CoreError::InvalidSize(format!(
            "size {size} is below the {} minimum step of {} quantums",
            market.ticker, market.step_base_quantums
        )));
    }
    Ok(quantums)
}

/// Convert a quote price into subticks.
///
/// Fails with `InvalidPrice` when the result is not a positive multiple of
/// `subticks_per_tick`.
pub fn to_subticks(price: Price, market: &MarketInfo) -> Result<u64> {
    if market.subticks_per_tick == 0 {
        return Err(CoreError::InvalidPrice(format!(
            "{} has a zero subticks_per_tick",
            market.ticker
        )));
    }
    if !price.is_positive() {
        return Err(CoreError::InvalidPrice(format!(
            "price {price} must be positive"
        )));
    }

    let scaled = subtick_exponent(market)
        .and_then(pow10)
        .and_then(|factor| price.inner().checked_mul(factor))
        .ok_or_else(|| CoreError::InvalidPrice(format!("price {price} overflows subticks")))?;
    let subticks = floor_to_multiple(scaled, u64::from(market.subticks_per_tick))
        .ok_or_else(|| CoreError::InvalidPrice(format!("price {price} overflows subticks")))?;

    if subticks == 0 {
        return Err(CoreError::InvalidPrice(format!(
            "price {price} is below one {} tick",
            market.ticker
        )));
    }
    Ok(subticks)
}

/// Inverse of [`to_subticks`] for values that are already on a tick.
pub fn subticks_to_price(subticks: u64, market: &MarketInfo) -> Result<Price> {
    subtick_exponent(market)
        .and_then(i32::checked_neg)
        .and_then(pow10)
        .and_then(|factor| Decimal::from(subticks).checked_mul(factor))
        .map(|d| Price::new(d.normalize()))
        .ok_or_else(|| {
            CoreError::InvalidPrice(format!("{subticks} subticks cannot be scaled to a price"))
        })
}

/// Inverse of [`to_quantums`].
pub fn quantums_to_size(quantums: u64, market: &MarketInfo) -> Result<Size> {
    pow10(market.atomic_resolution)
        .and_then(|factor| Decimal::from(quantums).checked_mul(factor))
        .map(|d| Size::new(d.normalize()))
        .ok_or_else(|| {
            CoreError::InvalidSize(format!("{quantums} quantums cannot be scaled to a size"))
        })
}

/// Scale a positive human amount by `10^decimals`; the result is integral.
fn scale_amount(amount: Decimal, decimals: u32) -> Result<Decimal> {
    if !(amount.is_sign_positive() && !amount.is_zero()) {
        return Err(CoreError::InvalidAmount(format!(
            "amount {amount} must be positive"
        )));
    }
    let amount = amount.normalize();
    if amount.scale() > decimals {
        return Err(CoreError::InvalidAmount(format!(
            "amount {amount} has more than {decimals} decimal places"
        )));
    }

    i32::try_from(decimals)
        .ok()
        .and_then(pow10)
        .and_then(|factor| amount.checked_mul(factor))
        .ok_or_else(|| CoreError::InvalidAmount(format!("amount {amount} overflows base units")))
}

/// Convert a human asset amount (e.g. USDC) into integer quantums.
///
/// The amount must be positive, carry no more fractional digits than the
/// asset supports, and fit a signed 64-bit integer.
pub fn to_asset_quantums(amount: Decimal, decimals: u32) -> Result<u64> {
    let scaled = scale_amount(amount, decimals)?;
    scaled
        .to_i64()
        .and_then(|q| u64::try_from(q).ok())
        .ok_or_else(|| CoreError::InvalidAmount(format!("amount {amount} overflows quantums")))
}

/// Convert a human token amount into base units of a denom.
///
/// Chain tokens carry 18 decimals, so the result is wider than quantums.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Result<u128> {
    let scaled = scale_amount(amount, decimals)?;
    scaled
        .to_u128()
        .ok_or_else(|| CoreError::InvalidAmount(format!("amount {amount} overflows base units")))
}
