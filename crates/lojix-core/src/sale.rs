//! # Sale Aggregate
//!
//! The sale is the consistency boundary of the whole system: line items,
//! discounts, payments, returns and exchanges all hang off it, and every
//! mutation ends by recomputing the derived totals.
//!
//! ## Money Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  gross_total     = Σ line subtotal (unit price × quantity)          │
//! │  discount_total  = Σ item discounts  +  sale-level discount         │
//! │  net_total       = gross_total − discount_total                     │
//! │  paid_total      = Σ payments                                       │
//! │  refund_total    = Σ manual-refund settlements                      │
//! │  balance_due     = net_total − paid_total + refund_total            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Guards
//! - item and discount mutation: `InProgress` only
//! - payments, returns, exchanges: `InProgress` or `Completed`
//! - `Cancelled` is terminal and rejects everything
//!
//! Returns deliberately do not change the sale totals: refund value is
//! settled through the credit ledger, not by rewriting history. Exchanges
//! DO change the totals, because the sold goods themselves change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::discount::DiscountPolicy;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    Discount, DiscountValue, DueDate, ExchangeRecord, LineItem, Payment, PaymentKind,
    ReturnRecord, SaleKind, SaleStatus,
};
use crate::validation::{
    validate_note, validate_payment_amount, validate_quantity, validate_unit_price,
};

// =============================================================================
// Sale
// =============================================================================

/// A sale transaction with its full history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    /// Sequential business number shown to users ("venda #142").
    pub number: i64,
    pub kind: SaleKind,
    pub status: SaleStatus,
    pub customer_id: Option<String>,
    /// Location whose stock this sale draws from.
    pub location_id: String,
    pub items: Vec<LineItem>,
    pub payments: Vec<Payment>,
    /// Sale-level discount; mutually exclusive with item-level ones.
    pub discount: Option<Discount>,
    pub returns: Vec<ReturnRecord>,
    pub exchanges: Vec<ExchangeRecord>,
    pub gross_total_cents: i64,
    pub discount_total_cents: i64,
    pub net_total_cents: i64,
    pub paid_total_cents: i64,
    /// Money handed back to the customer via manual-refund settlements.
    pub refund_total_cents: i64,
    pub note: Option<String>,
    /// Required before a credit-term sale can complete.
    pub due_date: Option<DueDate>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// What an exchange did to the sale's lines; the caller needs the old-side
/// snapshot to build its `ExchangeRecord`.
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    /// The line the exchanged units came from.
    pub source_line_id: String,
    /// The line now carrying the new product. Equals `source_line_id` when
    /// the whole line was replaced in place.
    pub result_line_id: String,
    pub old_product_id: String,
    pub old_product_name: String,
    pub old_unit_price_cents: i64,
    /// new value − returned value; negative means the store owes.
    pub value_difference_cents: i64,
}

impl Sale {
    /// Opens a new in-progress sale. Credit-term sales must name a customer.
    pub fn new(
        number: i64,
        kind: SaleKind,
        customer_id: Option<String>,
        location_id: impl Into<String>,
        created_by: impl Into<String>,
    ) -> CoreResult<Self> {
        if kind == SaleKind::CreditTerm && customer_id.is_none() {
            return Err(ValidationError::required("customer_id").into());
        }

        Ok(Sale {
            id: Uuid::new_v4().to_string(),
            number,
            kind,
            status: SaleStatus::InProgress,
            customer_id,
            location_id: location_id.into(),
            items: Vec::new(),
            payments: Vec::new(),
            discount: None,
            returns: Vec::new(),
            exchanges: Vec::new(),
            gross_total_cents: 0,
            discount_total_cents: 0,
            net_total_cents: 0,
            paid_total_cents: 0,
            refund_total_cents: 0,
            note: None,
            due_date: None,
            created_by: created_by.into(),
            created_at: Utc::now(),
            completed_at: None,
            cancelled_at: None,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn gross_total(&self) -> Money {
        Money::from_cents(self.gross_total_cents)
    }

    #[inline]
    pub fn discount_total(&self) -> Money {
        Money::from_cents(self.discount_total_cents)
    }

    #[inline]
    pub fn net_total(&self) -> Money {
        Money::from_cents(self.net_total_cents)
    }

    #[inline]
    pub fn paid_total(&self) -> Money {
        Money::from_cents(self.paid_total_cents)
    }

    #[inline]
    pub fn refund_total(&self) -> Money {
        Money::from_cents(self.refund_total_cents)
    }

    /// What the customer still owes. Refunds already handed back count
    /// against what was paid.
    #[inline]
    pub fn balance_due(&self) -> Money {
        Money::from_cents(self.net_total_cents - self.paid_total_cents + self.refund_total_cents)
    }

    pub fn item(&self, item_id: &str) -> CoreResult<&LineItem> {
        self.items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| CoreError::not_found("LineItem", item_id))
    }

    pub fn payment(&self, payment_id: &str) -> CoreResult<&Payment> {
        self.payments
            .iter()
            .find(|p| p.id == payment_id)
            .ok_or_else(|| CoreError::not_found("Payment", payment_id))
    }

    fn item_mut(&mut self, item_id: &str) -> CoreResult<&mut LineItem> {
        self.items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| CoreError::not_found("LineItem", item_id))
    }

    // =========================================================================
    // Status Guards
    // =========================================================================

    fn ensure_in_progress(&self) -> CoreResult<()> {
        if self.status != SaleStatus::InProgress {
            return Err(CoreError::InvalidSaleState {
                sale_id: self.id.clone(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_not_cancelled(&self) -> CoreResult<()> {
        if self.status == SaleStatus::Cancelled {
            return Err(CoreError::InvalidSaleState {
                sale_id: self.id.clone(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Line Items
    // =========================================================================

    /// Appends a product line with frozen name/price snapshots, returning
    /// the new line's id. Each add is its own line, even for a product
    /// already on the sale; returns and exchanges address lines directly.
    pub fn add_item(
        &mut self,
        product_id: impl Into<String>,
        name_snapshot: impl Into<String>,
        unit_price: Money,
        quantity: i64,
    ) -> CoreResult<String> {
        self.ensure_in_progress()?;
        validate_quantity(quantity)?;
        validate_unit_price(unit_price)?;

        let item = LineItem {
            id: Uuid::new_v4().to_string(),
            sale_id: self.id.clone(),
            product_id: product_id.into(),
            name_snapshot: name_snapshot.into(),
            unit_price_cents: unit_price.cents(),
            quantity,
            returned_qty: 0,
            discount: None,
            created_at: Utc::now(),
        };
        let id = item.id.clone();
        self.items.push(item);
        self.recompute_totals();
        Ok(id)
    }

    /// Removes a line entirely, returning it so the caller can release stock.
    ///
    /// A line with returned units is referenced by return records and cannot
    /// be removed.
    pub fn remove_item(&mut self, item_id: &str) -> CoreResult<LineItem> {
        self.ensure_in_progress()?;

        let pos = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| CoreError::not_found("LineItem", item_id))?;

        if self.items[pos].returned_qty > 0 {
            return Err(CoreError::InvalidSaleState {
                sale_id: self.id.clone(),
                status: "holding returned units".to_string(),
            });
        }

        let item = self.items.remove(pos);
        self.recompute_totals();
        Ok(item)
    }

    // =========================================================================
    // Discounts
    // =========================================================================

    /// Applies a discount to a single line, clearing any sale-level discount
    /// (the two levels are mutually exclusive).
    pub fn apply_item_discount(
        &mut self,
        item_id: &str,
        value: DiscountValue,
        reason: impl Into<String>,
        applied_by: impl Into<String>,
        ceiling_bps: u32,
    ) -> CoreResult<Money> {
        self.ensure_in_progress()?;

        let reason = reason.into();
        let base = self.item(item_id)?.subtotal();
        let amount = DiscountPolicy::validate(&value, &reason, base, ceiling_bps)?;

        self.discount = None;
        let discount = Discount {
            id: Uuid::new_v4().to_string(),
            value,
            reason,
            applied_by: applied_by.into(),
            created_at: Utc::now(),
        };
        self.item_mut(item_id)?.discount = Some(discount);
        self.recompute_totals();
        Ok(amount)
    }

    /// Applies a discount on the whole sale's gross total, clearing all
    /// item-level discounts.
    pub fn apply_sale_discount(
        &mut self,
        value: DiscountValue,
        reason: impl Into<String>,
        applied_by: impl Into<String>,
        ceiling_bps: u32,
    ) -> CoreResult<Money> {
        self.ensure_in_progress()?;

        let reason = reason.into();
        let base: Money = self.items.iter().map(LineItem::subtotal).sum();
        let amount = DiscountPolicy::validate(&value, &reason, base, ceiling_bps)?;

        for item in &mut self.items {
            item.discount = None;
        }
        self.discount = Some(Discount {
            id: Uuid::new_v4().to_string(),
            value,
            reason,
            applied_by: applied_by.into(),
            created_at: Utc::now(),
        });
        self.recompute_totals();
        Ok(amount)
    }

    /// Clears the sale-level discount, returning it when one was set.
    pub fn clear_sale_discount(&mut self) -> CoreResult<Option<Discount>> {
        self.ensure_in_progress()?;
        let cleared = self.discount.take();
        self.recompute_totals();
        Ok(cleared)
    }

    /// Clears a line's discount, returning it when one was set.
    pub fn clear_item_discount(&mut self, item_id: &str) -> CoreResult<Option<Discount>> {
        self.ensure_in_progress()?;
        let cleared = self.item_mut(item_id)?.discount.take();
        self.recompute_totals();
        Ok(cleared)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Records a payment. Overpayment is rejected, never clamped.
    pub fn record_payment(
        &mut self,
        kind: PaymentKind,
        amount: Money,
        note: Option<String>,
        created_by: impl Into<String>,
    ) -> CoreResult<&Payment> {
        self.ensure_not_cancelled()?;
        validate_payment_amount(amount)?;
        validate_note(note.as_deref())?;

        let balance = self.balance_due();
        if amount > balance {
            return Err(CoreError::invalid_amount(
                amount.cents(),
                format!("payment exceeds balance due of {balance}"),
            ));
        }

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: self.id.clone(),
            kind,
            amount_cents: amount.cents(),
            note,
            created_by: created_by.into(),
            created_at: Utc::now(),
            edited: false,
            edited_at: None,
            edited_by: None,
        };
        let id = payment.id.clone();
        self.payments.push(payment);
        self.recompute_totals();
        self.payment(&id)
    }

    /// Edits a payment's amount and note, stamping the edit trail.
    ///
    /// Store-credit payments cannot be edited: the drawn credit would go out
    /// of sync with the ledger. Remove and re-add instead.
    pub fn edit_payment(
        &mut self,
        payment_id: &str,
        new_amount: Money,
        note: Option<String>,
        edited_by: impl Into<String>,
    ) -> CoreResult<&Payment> {
        self.ensure_not_cancelled()?;
        validate_payment_amount(new_amount)?;
        validate_note(note.as_deref())?;

        let current = self.payment(payment_id)?;
        if current.kind == PaymentKind::StoreCredit {
            return Err(CoreError::invalid_amount(
                new_amount.cents(),
                "store credit payments cannot be edited; remove and re-add",
            ));
        }

        // The edited amount may grow only up to the balance freed by
        // dropping the old amount.
        let headroom = self.balance_due() + current.amount();
        if new_amount > headroom {
            return Err(CoreError::invalid_amount(
                new_amount.cents(),
                format!("payment exceeds balance due of {headroom}"),
            ));
        }

        let edited_by = edited_by.into();
        let payment = self
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or_else(|| CoreError::not_found("Payment", payment_id))?;
        payment.amount_cents = new_amount.cents();
        if note.is_some() {
            payment.note = note;
        }
        payment.edited = true;
        payment.edited_at = Some(Utc::now());
        payment.edited_by = Some(edited_by);

        self.recompute_totals();
        self.payment(payment_id)
    }

    /// Removes a payment, returning it so the caller can compensate (e.g.
    /// re-issue store credit).
    pub fn remove_payment(&mut self, payment_id: &str) -> CoreResult<Payment> {
        self.ensure_not_cancelled()?;

        let pos = self
            .payments
            .iter()
            .position(|p| p.id == payment_id)
            .ok_or_else(|| CoreError::not_found("Payment", payment_id))?;

        let payment = self.payments.remove(pos);
        self.recompute_totals();
        Ok(payment)
    }

    // =========================================================================
    // Returns
    // =========================================================================

    /// Marks `quantity` units of a line as returned. Totals are untouched;
    /// refund value flows through the credit ledger instead.
    pub fn mark_returned(&mut self, item_id: &str, quantity: i64) -> CoreResult<&LineItem> {
        self.ensure_not_cancelled()?;
        validate_quantity(quantity)?;

        let sale_id = self.id.clone();
        let item = self.item_mut(item_id)?;
        let remaining = item.remaining_qty();
        if quantity > remaining {
            return Err(CoreError::Validation(ValidationError::OutOfRange {
                field: format!("returned quantity for sale {sale_id}"),
                min: 1,
                max: remaining,
            }));
        }

        item.returned_qty += quantity;
        self.item(item_id)
    }

    /// Attaches a finished return record to the sale's history.
    pub fn push_return(&mut self, record: ReturnRecord) {
        self.returns.push(record);
    }

    // =========================================================================
    // Exchanges
    // =========================================================================

    /// Swaps `returned_qty` units of a line for `new_qty` units of a
    /// different product.
    ///
    /// When the whole untouched line is exchanged it is rewritten in place;
    /// otherwise the line is split and the new product gets its own line.
    /// Totals are recomputed, so the sale's value follows the goods.
    pub fn exchange_line(
        &mut self,
        item_id: &str,
        returned_qty: i64,
        new_product_id: impl Into<String>,
        new_product_name: impl Into<String>,
        new_unit_price: Money,
        new_qty: i64,
    ) -> CoreResult<ExchangeOutcome> {
        self.ensure_not_cancelled()?;
        validate_quantity(returned_qty)?;
        validate_quantity(new_qty)?;
        validate_unit_price(new_unit_price)?;

        let sale_id = self.id.clone();
        let item = self.item_mut(item_id)?;
        let remaining = item.remaining_qty();
        if returned_qty > remaining {
            return Err(CoreError::Validation(ValidationError::OutOfRange {
                field: format!("exchanged quantity for sale {sale_id}"),
                min: 1,
                max: remaining,
            }));
        }

        let old_product_id = item.product_id.clone();
        let old_product_name = item.name_snapshot.clone();
        let old_unit_price_cents = item.unit_price_cents;
        let value_difference_cents =
            new_unit_price.cents() * new_qty - old_unit_price_cents * returned_qty;

        let result_line_id;
        if returned_qty == item.quantity && item.returned_qty == 0 {
            // Whole line, never partially returned: rewrite in place.
            item.product_id = new_product_id.into();
            item.name_snapshot = new_product_name.into();
            item.unit_price_cents = new_unit_price.cents();
            item.quantity = new_qty;
            result_line_id = item.id.clone();
        } else {
            item.quantity -= returned_qty;
            let new_item = LineItem {
                id: Uuid::new_v4().to_string(),
                sale_id: self.id.clone(),
                product_id: new_product_id.into(),
                name_snapshot: new_product_name.into(),
                unit_price_cents: new_unit_price.cents(),
                quantity: new_qty,
                returned_qty: 0,
                discount: None,
                created_at: Utc::now(),
            };
            result_line_id = new_item.id.clone();
            self.items.push(new_item);
        }

        self.recompute_totals();
        Ok(ExchangeOutcome {
            source_line_id: item_id.to_string(),
            result_line_id,
            old_product_id,
            old_product_name,
            old_unit_price_cents,
            value_difference_cents,
        })
    }

    /// Attaches a finished exchange record to the sale's history.
    pub fn push_exchange(&mut self, record: ExchangeRecord) {
        self.exchanges.push(record);
    }

    /// Registers money handed back to the customer (manual-refund
    /// settlement of a negative exchange difference).
    pub fn add_refund(&mut self, amount: Money) {
        self.refund_total_cents += amount.cents();
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn set_note(&mut self, note: Option<String>) -> CoreResult<()> {
        self.ensure_in_progress()?;
        validate_note(note.as_deref())?;
        self.note = note;
        Ok(())
    }

    pub fn set_due_date(&mut self, due_date: Option<DueDate>) -> CoreResult<()> {
        self.ensure_in_progress()?;
        self.due_date = due_date;
        Ok(())
    }

    /// Completes the sale. Cash sales must be fully paid; credit-term sales
    /// may carry a balance but need a due date.
    pub fn complete(&mut self) -> CoreResult<()> {
        self.ensure_in_progress()?;

        match self.kind {
            SaleKind::Cash => {
                let balance = self.balance_due();
                if balance.is_positive() {
                    return Err(CoreError::OutstandingBalance {
                        sale_id: self.id.clone(),
                        balance_due_cents: balance.cents(),
                    });
                }
            }
            SaleKind::CreditTerm => {
                if self.due_date.is_none() {
                    return Err(ValidationError::required("due_date").into());
                }
            }
        }

        self.status = SaleStatus::Completed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Cancels the sale; only an in-progress sale can be. Terminal: the
    /// caller restores stock for units not already returned and compensates
    /// store-credit payments.
    pub fn cancel(&mut self) -> CoreResult<()> {
        self.ensure_in_progress()?;
        self.status = SaleStatus::Cancelled;
        self.cancelled_at = Some(Utc::now());
        Ok(())
    }

    // =========================================================================
    // Totals
    // =========================================================================

    /// Recomputes every derived total from the current lines and payments.
    /// Called at the end of every mutating operation.
    fn recompute_totals(&mut self) {
        let gross: Money = self.items.iter().map(LineItem::subtotal).sum();

        let item_discounts: Money = self
            .items
            .iter()
            .filter_map(|i| {
                i.discount
                    .as_ref()
                    .map(|d| DiscountPolicy::effective_amount(&d.value, i.subtotal()))
            })
            .sum();

        let sale_discount = self
            .discount
            .as_ref()
            .map(|d| DiscountPolicy::effective_amount(&d.value, gross))
            .unwrap_or_else(Money::zero);

        let mut discount_total = item_discounts + sale_discount;
        if discount_total > gross {
            discount_total = gross;
        }

        let paid: Money = self.payments.iter().map(Payment::amount).sum();

        self.gross_total_cents = gross.cents();
        self.discount_total_cents = discount_total.cents();
        self.net_total_cents = (gross - discount_total).cents();
        self.paid_total_cents = paid.cents();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
