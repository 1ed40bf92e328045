//! Entropy accounting for random identifiers.
//!
//! All three relations come from the birthday-bound approximation
//! `risk ~ total^2 / (2 * 2^bits)`, where `risk` is expressed as "1-in-N" odds of
//! at least one collision among `total` identifiers. Each function rounds in the
//! direction that keeps callers safe:
//! - [`bits_for`] rounds up (never asks for fewer bits than needed)
//! - [`total_for`] rounds down (never promises more identifiers than allowed)
//! - [`risk_for`] rounds down (never reports better odds than reality)
//!
//! These run at configuration time only; the generation path is integer-only.
//! Results saturate at `u128::MAX` instead of overflowing.

use crate::error::{PuidError, Result};

/// Decimal places kept by [`bits_for`].
pub const BITS_PRECISION: i32 = 2;

/// Minimum entropy bits so that `total` identifiers collide with odds no worse than 1-in-`risk`.
///
/// # Errors
/// Returns [`PuidError::InvalidArgument`] unless `total >= 2` and `risk >= 1`, both finite.
pub fn bits_for(total: f64, risk: f64) -> Result<f64> {
    check_total(total)?;
    check_risk(risk)?;
    let exact = 2.0 * total.log2() + risk.log2() - 1.0;
    Ok(round_up_to(exact, BITS_PRECISION))
}

/// Maximum number of identifiers at `bits` of entropy whose collision odds stay within 1-in-`risk`.
///
/// Saturates at `u128::MAX` for very large entropy.
///
/// # Errors
/// Returns [`PuidError::InvalidArgument`] unless `bits > 0` and `risk >= 1`, both finite.
pub fn total_for(bits: f64, risk: f64) -> Result<u128> {
    check_bits(bits)?;
    check_risk(risk)?;
    Ok(floor_saturating((2.0 * bits.exp2() / risk).sqrt()))
}

/// Collision odds ("1-in-N", returned as `N`) for `total` identifiers at `bits` of entropy.
///
/// A result of `0` means a collision is more likely than not to have occurred.
/// Saturates at `u128::MAX`.
///
/// # Errors
/// Returns [`PuidError::InvalidArgument`] unless `bits > 0` and `total >= 2`, both finite.
pub fn risk_for(bits: f64, total: f64) -> Result<u128> {
    check_bits(bits)?;
    check_total(total)?;
    Ok(floor_saturating(2.0 * bits.exp2() / (total * total)))
}

/// Exact entropy of one symbol drawn uniformly from `count` symbols.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn entropy_bits_per_symbol(count: usize) -> f64 {
    (count as f64).log2()
}

/// Round `value` up to `places` decimal places, never returning less than `value`.
#[must_use]
pub fn round_up_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    let rounded = (value * scale).ceil() / scale;
    if rounded < value {
        rounded + scale.recip()
    } else {
        rounded
    }
}

/// Round `value` to `places` decimal places for display.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

// `as` saturates at both ends (and maps infinity to `u128::MAX`).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_saturating(value: f64) -> u128 {
    value.floor() as u128
}

fn check_total(total: f64) -> Result<()> {
    if total.is_finite() && total >= 2.0 {
        Ok(())
    } else {
        Err(PuidError::invalid(format!(
            "total must be a finite number >= 2, got {total}"
        )))
    }
}

fn check_risk(risk: f64) -> Result<()> {
    if risk.is_finite() && risk >= 1.0 {
        Ok(())
    } else {
        Err(PuidError::invalid(format!(
            "risk must be a finite number >= 1, got {risk}"
        )))
    }
}

pub(crate) fn check_bits(bits: f64) -> Result<()> {
    if bits.is_finite() && bits > 0.0 {
        Ok(())
    } else {
        Err(PuidError::invalid(format!(
            "bits must be a finite number > 0, got {bits}"
        )))
    }
}
