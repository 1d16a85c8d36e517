//! # Domain Types
//!
//! Core domain types for the sales transaction ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                               │
//! │                                                                     │
//! │  Sale (sale.rs) ──┬── LineItem ──── Discount (item-level)           │
//! │                   ├── Discount (sale-level)                         │
//! │                   ├── Payment                                       │
//! │                   └── ReturnRecord ── ReturnedItem                  │
//! │                                                                     │
//! │  Ledger rows:  CreditEntry   StockMovement   ExchangeRecord         │
//! │  Audit:        AuditEvent (append-only)                             │
//! │  Till:         CashWithdrawal                                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has a UUID `id` used for relations; the Sale additionally
//! carries a sequential `number` business key shown to users.
//!
//! All "kind" fields are closed enums with exhaustive handling, never open
//! string comparison.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

// =============================================================================
// Sale Enums
// =============================================================================

/// Commercial kind of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleKind {
    /// Paid at the counter.
    Cash,
    /// "Fiada": customer pays later, against a due date.
    CreditTerm,
}

/// The status of a sale transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Items, discounts and payments are still being added.
    #[default]
    InProgress,
    /// Explicitly completed after the balance reached zero.
    Completed,
    /// Cancelled; terminal, rejects all further mutation.
    Cancelled,
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SaleStatus::InProgress => "in_progress",
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// Accepted payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Cash,
    Pix,
    CreditCard,
    DebitCard,
    Transfer,
    Boleto,
    /// Draws down the customer's credit ledger balance (FIFO).
    StoreCredit,
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentKind::Cash => "cash",
            PaymentKind::Pix => "pix",
            PaymentKind::CreditCard => "credit_card",
            PaymentKind::DebitCard => "debit_card",
            PaymentKind::Transfer => "transfer",
            PaymentKind::Boleto => "boleto",
            PaymentKind::StoreCredit => "store_credit",
        };
        f.write_str(s)
    }
}

/// A payment towards a sale. A sale can hold multiple partial payments.
///
/// Immutable once recorded except via the explicit edit/removal operations,
/// which re-trigger total recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub sale_id: String,
    pub kind: PaymentKind,
    /// Amount in centavos; always positive and at most the balance due at
    /// the time the payment was accepted.
    pub amount_cents: i64,
    pub note: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Set by the edit operation; the original row is never rewritten silently.
    pub edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub edited_by: Option<String>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Discount
// =============================================================================

/// Magnitude of a discount, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscountValue {
    /// A fixed centavo amount off the base.
    FixedAmount { amount_cents: i64 },
    /// A percentage of the base, in basis points (1500 = 15%).
    Percentage { bps: u32 },
}

impl fmt::Display for DiscountValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountValue::FixedAmount { amount_cents } => {
                write!(f, "{}", Money::from_cents(*amount_cents))
            }
            DiscountValue::Percentage { bps } => {
                write!(f, "{}.{:02}%", bps / 100, bps % 100)
            }
        }
    }
}

/// A discount applied to a sale or to a single line item.
///
/// The target is implied by placement: item-level discounts live on their
/// `LineItem`, the (at most one) sale-level discount lives on the `Sale`.
/// The two levels are mutually exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discount {
    pub id: String,
    pub value: DiscountValue,
    /// Mandatory, non-empty justification.
    pub reason: String,
    pub applied_by: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Line Item
// =============================================================================

/// A product line within a sale.
///
/// Uses the snapshot pattern: name and unit price are frozen at the time the
/// item is added, so later catalog changes never rewrite sale history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Unit price in centavos at time of sale (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// Quantity already returned; never exceeds `quantity`.
    pub returned_qty: i64,
    /// Item-level discount, mutually exclusive with a sale-level one.
    pub discount: Option<Discount>,
    pub created_at: DateTime<Utc>,
}

impl LineItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Line subtotal before any discount: unit price × quantity.
    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    /// Quantity still eligible for return or exchange.
    #[inline]
    pub fn remaining_qty(&self) -> i64 {
        self.quantity - self.returned_qty
    }
}

// =============================================================================
// Returns
// =============================================================================

/// Whether refund value from a return is settled as store credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCredit {
    /// Issue a credit ledger entry for the refund value.
    WithCredit,
    /// No credit issued; settlement handled outside the ledger.
    WithoutCredit,
}

/// What happens to physically returned stock.
///
/// Deliberately an explicit per-call policy: a returned-but-defective item
/// must not silently go back to sellable inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockDisposition {
    /// Return the quantity to sellable stock at the sale's location.
    Restock,
    /// Keep it out of stock (defective, write-off).
    Discard,
}

/// One returned line within a ReturnRecord.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnedItem {
    pub line_item_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price snapshot of the originating line.
    pub unit_price_cents: i64,
}

impl ReturnedItem {
    /// Refund value for this item: unit price × quantity.
    #[inline]
    pub fn refund(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// A registered return of one or more items from a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub id: String,
    pub sale_id: String,
    pub credit: ReturnCredit,
    pub disposition: StockDisposition,
    pub refund_cents: i64,
    pub reason: String,
    pub items: Vec<ReturnedItem>,
    /// Credit ledger entry created for this return, when `credit` applies.
    pub credit_entry_id: Option<String>,
    pub performed_by: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Exchange
// =============================================================================

/// How a negative value difference (store owes customer) is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Settlement {
    /// Issue store credit for the difference.
    Credit,
    /// Refund in cash/card via the till; emits a CashWithdrawal.
    ManualRefund { method: PaymentKind },
}

/// A product-to-product exchange applied to a sale line.
///
/// Snapshots both sides (old and new product name/price) so the record stays
/// meaningful after later catalog changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub id: String,
    pub sale_id: String,
    pub line_item_id: String,
    pub old_product_id: String,
    pub old_product_name: String,
    pub old_unit_price_cents: i64,
    pub returned_qty: i64,
    pub new_product_id: String,
    pub new_product_name: String,
    pub new_unit_price_cents: i64,
    pub new_qty: i64,
    pub location_id: String,
    /// received value − returned value; negative means the store owes.
    pub value_difference_cents: i64,
    /// Required when `value_difference_cents` is negative.
    pub settlement: Option<Settlement>,
    pub performed_by: String,
    pub created_at: DateTime<Utc>,
}

impl ExchangeRecord {
    #[inline]
    pub fn value_difference(&self) -> Money {
        Money::from_cents(self.value_difference_cents)
    }
}

// =============================================================================
// Credit Ledger
// =============================================================================

/// What produced a credit ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CreditOrigin {
    Return { sale_id: String, return_id: String },
    Exchange { sale_id: String, exchange_id: String },
    Manual,
}

/// One row of a customer's store-credit ledger.
///
/// Invariant: `used_cents + balance == total_cents` at all times; balance is
/// derived, never stored. `used_cents` only ever increases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditEntry {
    pub id: String,
    pub customer_id: String,
    pub origin: CreditOrigin,
    pub total_cents: i64,
    pub used_cents: i64,
    pub reason: Option<String>,
    pub issued_by: String,
    pub created_at: DateTime<Utc>,
}

impl CreditEntry {
    /// Remaining balance: total − used. Never negative.
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.total_cents - self.used_cents)
    }
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    In,
    Out,
}

/// Audit row paired with every stock mutation.
///
/// Exactly one movement per successful reserve/release/adjust; used for
/// reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub location_id: String,
    pub kind: MovementKind,
    pub quantity: i64,
    pub prior_quantity: i64,
    pub new_quantity: i64,
    pub reason: String,
    pub sale_id: Option<String>,
    pub exchange_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Audit Log
// =============================================================================

/// Closed set of auditable actions on a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Creation,
    ItemAdded,
    ItemRemoved,
    PaymentAdded,
    PaymentEdited,
    PaymentRemoved,
    DiscountApplied,
    DiscountCleared,
    Return,
    Exchange,
    Completion,
    Cancellation,
}

/// Append-only audit event tied to a sale. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: String,
    pub sale_id: String,
    pub action: AuditAction,
    pub description: String,
    pub actor_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Till
// =============================================================================

/// Withdrawal record emitted to the till collaborator for manual-refund
/// settlements. The core does not manage drawer open/close state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashWithdrawal {
    pub id: String,
    pub sale_id: String,
    pub exchange_id: String,
    pub amount_cents: i64,
    pub method: PaymentKind,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Misc
// =============================================================================

/// Due date for credit-term sales, date-only (no time component).
pub type DueDate = NaiveDate;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_status_default() {
        assert_eq!(SaleStatus::default(), SaleStatus::InProgress);
    }

    #[test]
    fn test_payment_kind_display() {
        assert_eq!(PaymentKind::StoreCredit.to_string(), "store_credit");
        assert_eq!(PaymentKind::Pix.to_string(), "pix");
    }

    #[test]
    fn test_discount_value_display() {
        let pct = DiscountValue::Percentage { bps: 1550 };
        assert_eq!(pct.to_string(), "15.50%");
        let fixed = DiscountValue::FixedAmount { amount_cents: 2599 };
        assert_eq!(fixed.to_string(), "R$ 25.99");
    }

    #[test]
    fn test_credit_entry_balance() {
        let entry = CreditEntry {
            id: "c1".to_string(),
            customer_id: "cust".to_string(),
            origin: CreditOrigin::Manual,
            total_cents: 1000,
            used_cents: 400,
            reason: None,
            issued_by: "user".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(entry.balance().cents(), 600);
        assert_eq!(entry.used_cents + entry.balance().cents(), entry.total_cents);
    }

    #[test]
    fn test_kind_serialization_is_snake_case() {
        let json = serde_json::to_string(&PaymentKind::CreditCard).unwrap();
        assert_eq!(json, "\"credit_card\"");

        let json = serde_json::to_string(&Settlement::ManualRefund {
            method: PaymentKind::Cash,
        })
        .unwrap();
        assert_eq!(json, "{\"kind\":\"manual_refund\",\"method\":\"cash\"}");
    }
}
