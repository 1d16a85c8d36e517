//! # Discount Policy
//!
//! The single authority for validating and computing discount amounts.
//!
//! Every discount entry point (sale-level, item-level, any UI) goes through
//! [`DiscountPolicy::validate`] with the acting user's ceiling. Centralizing
//! the ceiling check here keeps the rules identical across call sites.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  validate(value, reason, base, ceiling)                             │
//! │                                                                     │
//! │  reason empty ─────────────────────► ValidationError::Required      │
//! │  magnitude <= 0 ───────────────────► InvalidAmount                  │
//! │  fixed amount > base ──────────────► InvalidAmount                  │
//! │  percentage > 100% ────────────────► clamped to 100%                │
//! │  effective rate > ceiling ─────────► DiscountExceedsCeiling         │
//! │  otherwise ────────────────────────► Ok(computed amount)            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A fixed amount is judged by its *equivalent percentage of the base*
//! (rounded up, so the check is conservative). Percentage amounts are
//! computed by flooring, so the granted amount never exceeds the ceiling
//! through rounding.

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::DiscountValue;

/// Full percentage expressed in basis points.
pub const FULL_BPS: u32 = 10_000;

/// Stateless discount rule authority.
pub struct DiscountPolicy;

impl DiscountPolicy {
    /// Validates a discount against its base and the actor's ceiling,
    /// returning the computed amount.
    ///
    /// `ceiling_bps` comes from the identity collaborator (per user/role).
    pub fn validate(
        value: &DiscountValue,
        reason: &str,
        base: Money,
        ceiling_bps: u32,
    ) -> CoreResult<Money> {
        if reason.trim().is_empty() {
            return Err(ValidationError::required("reason").into());
        }

        if !base.is_positive() {
            return Err(CoreError::invalid_amount(
                base.cents(),
                "discount base must be positive",
            ));
        }

        match value {
            DiscountValue::FixedAmount { amount_cents } => {
                let amount = Money::from_cents(*amount_cents);
                if !amount.is_positive() {
                    return Err(CoreError::invalid_amount(
                        amount.cents(),
                        "discount amount must be positive",
                    ));
                }
                if amount > base {
                    return Err(CoreError::invalid_amount(
                        amount.cents(),
                        format!("discount exceeds base of {base}"),
                    ));
                }

                let requested_bps = equivalent_bps(amount, base);
                if requested_bps > ceiling_bps {
                    return Err(CoreError::DiscountExceedsCeiling {
                        requested_bps,
                        ceiling_bps,
                    });
                }

                Ok(amount)
            }
            DiscountValue::Percentage { bps } => {
                if *bps == 0 {
                    return Err(CoreError::invalid_amount(
                        0,
                        "discount percentage must be positive",
                    ));
                }

                // Percentages above 100% are clamped, not rejected; the
                // ceiling check below still applies to the clamped value.
                let clamped = (*bps).min(FULL_BPS);
                if clamped > ceiling_bps {
                    return Err(CoreError::DiscountExceedsCeiling {
                        requested_bps: clamped,
                        ceiling_bps,
                    });
                }

                Ok(base.percent_of(clamped))
            }
        }
    }

    /// Effective amount of an already-accepted discount against the current
    /// base, used by total recomputation.
    ///
    /// A fixed amount is capped at the base (the base may have shrunk since
    /// validation, e.g. after an exchange); a percentage is re-derived.
    pub fn effective_amount(value: &DiscountValue, base: Money) -> Money {
        if !base.is_positive() {
            return Money::zero();
        }
        match value {
            DiscountValue::FixedAmount { amount_cents } => {
                Money::from_cents((*amount_cents).min(base.cents()).max(0))
            }
            DiscountValue::Percentage { bps } => base.percent_of((*bps).min(FULL_BPS)),
        }
    }
}

/// Equivalent rate of `amount` over `base`, in basis points, rounded up.
///
/// Rounding up makes the ceiling comparison conservative: an amount is only
/// accepted when it is at or below the ceiling exactly.
fn equivalent_bps(amount: Money, base: Money) -> u32 {
    let a = amount.cents() as i128;
    let b = base.cents() as i128;
    ((a * FULL_BPS as i128 + b - 1) / b) as u32
}

// =============================================================================
// Unit Tests
// =============================================================================
