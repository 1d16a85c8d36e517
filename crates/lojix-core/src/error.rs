//! # Error Types
//!
//! Domain-specific error types for lojix-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  lojix-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                    │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  lojix-engine errors (separate crate)                               │
//! │  └── EngineError      - Wraps CoreError, adds CompensationFailed    │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → EngineError → caller           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. `thiserror` derive macros, never manual impls
//! 2. Context in every variant (ids, amounts, limits involved)
//! 3. Errors are enum variants, never bare strings
//! 4. No failure is downgraded to a silent success

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations surfaced to callers with their structured kind.
///
/// The caller (UI layer) presents these; the core never formats user-facing
/// messages beyond the kind plus the values involved.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Non-positive or out-of-range payment/discount amount.
    #[error("Invalid amount {amount_cents}: {reason}")]
    InvalidAmount { amount_cents: i64, reason: String },

    /// Requested quantity exceeds what is on hand at a location.
    ///
    /// Never silently clamped: the reserve fails with no side effects and the
    /// caller decides what to do.
    #[error(
        "Insufficient stock for {product_id} at {location_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        location_id: String,
        available: i64,
        requested: i64,
    },

    /// Requested store-credit draw exceeds the customer's ledger balance.
    #[error(
        "Insufficient credit for customer {customer_id}: available {available_cents}, requested {requested_cents}"
    )]
    InsufficientCredit {
        customer_id: String,
        available_cents: i64,
        requested_cents: i64,
    },

    /// Computed discount rate exceeds the acting user's allowed maximum.
    #[error("Discount of {requested_bps}bps exceeds ceiling of {ceiling_bps}bps")]
    DiscountExceedsCeiling { requested_bps: u32, ceiling_bps: u32 },

    /// Attempted completion while the sale still owes a balance.
    #[error("Sale {sale_id} has outstanding balance of {balance_due_cents} centavos")]
    OutstandingBalance {
        sale_id: String,
        balance_due_cents: i64,
    },

    /// Attempted mutation on a completed/cancelled sale.
    #[error("Sale {sale_id} is {status}, cannot perform operation")]
    InvalidSaleState { sale_id: String, status: String },

    /// Referenced line item / product / customer / sale does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Input validation failure (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidAmount error with context.
    pub fn invalid_amount(amount_cents: i64, reason: impl Into<String>) -> Self {
        CoreError::InvalidAmount {
            amount_cents,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, caught before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "prod-1".to_string(),
            location_id: "loja1".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for prod-1 at loja1: available 3, requested 5"
        );

        let err = CoreError::DiscountExceedsCeiling {
            requested_bps: 2000,
            ceiling_bps: 1500,
        };
        assert_eq!(
            err.to_string(),
            "Discount of 2000bps exceeds ceiling of 1500bps"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("reason").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: reason is required");
    }
}
