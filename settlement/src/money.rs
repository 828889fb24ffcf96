//! Monetary arithmetic helpers
//!
//! Every amount is a `rust_decimal::Decimal`. Accumulation is checked so an
//! overflow becomes an error instead of a panic.

use crate::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};

/// Round to the minor unit, half-up (away from zero on the midpoint).
///
/// The result always carries exactly `scale` decimal places.
pub fn round_to_minor(amount: Decimal, scale: u32) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

/// Fail with `InvalidAmount` if `amount` has digits below the minor unit
pub fn ensure_minor_units(amount: Decimal, scale: u32, context: &str) -> Result<()> {
    if ledger_core::types::is_quantized(amount, scale) {
        Ok(())
    } else {
        Err(Error::InvalidAmount(format!(
            "{}: {} is not a multiple of the minor unit (scale {})",
            context, amount, scale
        )))
    }
}

/// `a + b`, or `Overflow`
pub fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| Error::Overflow(format!("{} + {}", a, b)))
}

/// `a - b`, or `Overflow`
pub fn checked_sub(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_sub(b)
        .ok_or_else(|| Error::Overflow(format!("{} - {}", a, b)))
}

/// Sum with overflow detection
pub fn checked_sum<I>(amounts: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, checked_add)
}
