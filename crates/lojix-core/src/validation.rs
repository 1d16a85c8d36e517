//! Field-level validation helpers shared across the domain.
//!
//! Structural checks only (presence, sign, length). Business rules such as
//! discount ceilings or stock availability live with their owning module.

use crate::error::ValidationError;
use crate::money::Money;

/// Longest accepted free-text reason or note.
pub const MAX_TEXT_LEN: usize = 500;

/// A line item quantity must be at least one.
pub fn validate_quantity(quantity: i64) -> Result<(), ValidationError> {
    if quantity <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }
    Ok(())
}

/// A unit price snapshot must be strictly positive.
pub fn validate_unit_price(price: Money) -> Result<(), ValidationError> {
    if !price.is_positive() {
        return Err(ValidationError::must_be_positive("unit_price"));
    }
    Ok(())
}

/// A payment amount must be strictly positive.
pub fn validate_payment_amount(amount: Money) -> Result<(), ValidationError> {
    if !amount.is_positive() {
        return Err(ValidationError::must_be_positive("amount"));
    }
    Ok(())
}

/// A mandatory free-text reason: non-empty after trimming, bounded length.
pub fn validate_reason(reason: &str) -> Result<(), ValidationError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::required("reason"));
    }
    if trimmed.len() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_TEXT_LEN,
        });
    }
    Ok(())
}

/// An optional note: bounded length when present.
pub fn validate_note(note: Option<&str>) -> Result<(), ValidationError> {
    if let Some(note) = note {
        if note.len() > MAX_TEXT_LEN {
            return Err(ValidationError::TooLong {
                field: "note".to_string(),
                max: MAX_TEXT_LEN,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_must_be_positive() {
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(1).is_ok());
    }

    #[test]
    fn unit_price_must_be_positive() {
        assert!(validate_unit_price(Money::zero()).is_err());
        assert!(validate_unit_price(Money::from_cents(-100)).is_err());
        assert!(validate_unit_price(Money::from_cents(1)).is_ok());
    }

    #[test]
    fn reason_must_be_present_and_bounded() {
        assert!(validate_reason("").is_err());
        assert!(validate_reason("   ").is_err());
        assert!(validate_reason("customer changed their mind").is_ok());
        assert!(validate_reason(&"x".repeat(MAX_TEXT_LEN + 1)).is_err());
    }

    #[test]
    fn note_is_optional() {
        assert!(validate_note(None).is_ok());
        assert!(validate_note(Some("pay half now")).is_ok());
        assert!(validate_note(Some(&"x".repeat(MAX_TEXT_LEN + 1))).is_err());
    }
}
