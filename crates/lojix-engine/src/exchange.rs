//! # Returns and Exchanges
//!
//! The after-sale half of the engine: taking goods back (optionally into
//! stock, optionally issuing store credit for their value) and swapping a
//! sold product for a different one.
//!
//! Both operations span several ledgers, so they follow one shape: validate
//! everything first with no side effects, then commit steps in a fixed
//! order, compensating already-committed steps when a later one fails. A
//! compensation that itself fails escalates to `CompensationFailed` with
//! the exact leftovers named.

use std::collections::HashMap;

use tracing::{error, info, warn};
use uuid::Uuid;

use lojix_core::{
    AuditAction, CashWithdrawal, CoreError, CreditOrigin, ExchangeRecord, Money, ReturnCredit,
    ReturnRecord, ReturnedItem, SaleStatus, Settlement, StockDisposition, ValidationError,
};

use crate::context::Actor;
use crate::engine::SalesEngine;
use crate::error::{EngineError, EngineResult};
use crate::stock::MovementLink;

/// One line of a return request.
#[derive(Debug, Clone)]
pub struct ReturnLine {
    pub item_id: String,
    pub quantity: i64,
}

impl SalesEngine {
    /// Registers a return of one or more lines from a sale.
    ///
    /// All-or-nothing across the requested lines: any bad line rejects the
    /// whole request before anything is marked. Sale totals are untouched;
    /// with `ReturnCredit::WithCredit` the refund value (frozen unit price
    /// times quantity) becomes a credit ledger entry instead.
    pub fn register_return(
        &self,
        actor: &Actor,
        sale_id: &str,
        lines: &[ReturnLine],
        credit: ReturnCredit,
        disposition: StockDisposition,
        reason: &str,
    ) -> EngineResult<ReturnRecord> {
        lojix_core::validation::validate_reason(reason)?;
        if lines.is_empty() {
            return Err(CoreError::from(ValidationError::required("lines")).into());
        }

        self.with_sale(sale_id, |sale| {
            if sale.status == SaleStatus::Cancelled {
                return Err(CoreError::InvalidSaleState {
                    sale_id: sale.id.clone(),
                    status: sale.status.to_string(),
                }
                .into());
            }

            let customer_id = match credit {
                ReturnCredit::WithCredit => Some(
                    sale.customer_id
                        .clone()
                        .ok_or_else(|| CoreError::from(ValidationError::required("customer_id")))?,
                ),
                ReturnCredit::WithoutCredit => None,
            };

            // Validate every line (including cumulative quantities when the
            // same line appears twice) before touching anything.
            let mut requested: HashMap<&str, i64> = HashMap::new();
            let mut returned_items = Vec::with_capacity(lines.len());
            let mut refund = Money::zero();
            for line in lines {
                let item = sale.item(&line.item_id)?;
                let already = requested.entry(line.item_id.as_str()).or_insert(0);
                let remaining = item.remaining_qty() - *already;
                if line.quantity < 1 || line.quantity > remaining {
                    return Err(CoreError::Validation(ValidationError::OutOfRange {
                        field: format!("returned quantity for line {}", line.item_id),
                        min: 1,
                        max: remaining,
                    })
                    .into());
                }
                *already += line.quantity;

                // Refund at the frozen unit price.
                refund += item.unit_price().multiply_quantity(line.quantity);
                returned_items.push(ReturnedItem {
                    line_item_id: item.id.clone(),
                    product_id: item.product_id.clone(),
                    quantity: line.quantity,
                    unit_price_cents: item.unit_price_cents,
                });
            }

            // Commit: marks cannot fail after the validation above.
            for line in lines {
                sale.mark_returned(&line.item_id, line.quantity)?;
            }

            if disposition == StockDisposition::Restock {
                for item in &returned_items {
                    self.stock.release(
                        &item.product_id,
                        &sale.location_id,
                        item.quantity,
                        "returned",
                        MovementLink::sale(sale_id),
                    )?;
                }
            }

            let return_id = Uuid::new_v4().to_string();
            let mut credit_entry_id = None;
            if let Some(customer_id) = &customer_id {
                if refund.is_positive() {
                    let entry = self.credit.issue(
                        customer_id,
                        refund,
                        CreditOrigin::Return {
                            sale_id: sale_id.to_string(),
                            return_id: return_id.clone(),
                        },
                        Some(reason.to_string()),
                        &actor.id,
                    )?;
                    credit_entry_id = Some(entry.id);
                }
            }

            let record = ReturnRecord {
                id: return_id,
                sale_id: sale_id.to_string(),
                credit,
                disposition,
                refund_cents: refund.cents(),
                reason: reason.to_string(),
                items: returned_items,
                credit_entry_id,
                performed_by: actor.id.clone(),
                created_at: chrono::Utc::now(),
            };
            sale.push_return(record.clone());

            info!(sale_id, refund = %refund, ?credit, ?disposition, "return registered");
            self.record_audit(
                sale_id,
                AuditAction::Return,
                format!("{} line(s) returned, refund value {refund}: {reason}", lines.len()),
                actor,
            );
            Ok(record)
        })
    }

    /// Exchanges `returned_qty` units of a sold line for `new_qty` units of
    /// a different product.
    ///
    /// The new product's stock is reserved before the sale is touched; the
    /// returned units go back to stock per `disposition`. A negative value
    /// difference (store owes the customer) must name a settlement.
    #[allow(clippy::too_many_arguments)]
    pub fn exchange_product(
        &self,
        actor: &Actor,
        sale_id: &str,
        item_id: &str,
        returned_qty: i64,
        new_product_id: &str,
        new_qty: i64,
        disposition: StockDisposition,
        settlement: Option<Settlement>,
        reason: &str,
    ) -> EngineResult<ExchangeRecord> {
        lojix_core::validation::validate_reason(reason)?;
        let new_product = self.lookup_product(new_product_id)?;

        self.with_sale(sale_id, |sale| {
            if sale.status == SaleStatus::Cancelled {
                return Err(CoreError::InvalidSaleState {
                    sale_id: sale.id.clone(),
                    status: sale.status.to_string(),
                }
                .into());
            }

            let item = sale.item(item_id)?;
            let remaining = item.remaining_qty();
            if returned_qty < 1 || returned_qty > remaining {
                return Err(CoreError::Validation(ValidationError::OutOfRange {
                    field: format!("exchanged quantity for line {item_id}"),
                    min: 1,
                    max: remaining,
                })
                .into());
            }
            let old_product_id = item.product_id.clone();

            let difference =
                new_product.unit_price_cents * new_qty - item.unit_price_cents * returned_qty;
            if difference < 0 {
                match settlement {
                    None => {
                        return Err(
                            CoreError::from(ValidationError::required("settlement")).into()
                        )
                    }
                    Some(Settlement::Credit) if sale.customer_id.is_none() => {
                        return Err(
                            CoreError::from(ValidationError::required("customer_id")).into()
                        )
                    }
                    _ => {}
                }
            } else if settlement.is_some() {
                return Err(CoreError::invalid_amount(
                    difference,
                    "settlement given but the store owes nothing",
                )
                .into());
            }

            let exchange_id = Uuid::new_v4().to_string();
            let link = MovementLink::exchange(sale_id, exchange_id.clone());

            // First fallible commit: reserve the replacement units. Fails
            // cleanly with nothing to undo.
            self.stock.reserve(
                &new_product.id,
                &sale.location_id,
                new_qty,
                "exchange out",
                link.clone(),
            )?;

            let outcome = match sale.exchange_line(
                item_id,
                returned_qty,
                &new_product.id,
                &new_product.name,
                new_product.unit_price(),
                new_qty,
            ) {
                Ok(outcome) => outcome,
                Err(e) => {
                    if let Err(undo) = self.stock.release(
                        &new_product.id,
                        &sale.location_id,
                        new_qty,
                        "exchange reverted",
                        link.clone(),
                    ) {
                        error!(sale_id, %exchange_id, %undo, "exchange compensation failed");
                        return Err(EngineError::compensation_failed(
                            "exchange_product",
                            format!(
                                "{new_qty}x {new_product_id} reserved but line {item_id} of sale {sale_id} unchanged: {undo}"
                            ),
                        ));
                    }
                    return Err(e.into());
                }
            };

            if disposition == StockDisposition::Restock {
                self.stock.release(
                    &old_product_id,
                    &sale.location_id,
                    returned_qty,
                    "exchange returned",
                    link,
                )?;
            }

            if difference < 0 {
                let owed = Money::from_cents(-difference);
                match settlement {
                    Some(Settlement::Credit) => {
                        // Customer presence was checked above.
                        if let Some(customer_id) = &sale.customer_id {
                            self.credit.issue(
                                customer_id,
                                owed,
                                CreditOrigin::Exchange {
                                    sale_id: sale_id.to_string(),
                                    exchange_id: exchange_id.clone(),
                                },
                                Some(reason.to_string()),
                                &actor.id,
                            )?;
                        }
                    }
                    Some(Settlement::ManualRefund { method }) => {
                        self.till().record_withdrawal(CashWithdrawal {
                            id: Uuid::new_v4().to_string(),
                            sale_id: sale_id.to_string(),
                            exchange_id: exchange_id.clone(),
                            amount_cents: owed.cents(),
                            method,
                            reason: reason.to_string(),
                            created_at: chrono::Utc::now(),
                        });
                        sale.add_refund(owed);
                    }
                    None => {}
                }
            }

            let record = ExchangeRecord {
                id: exchange_id.clone(),
                sale_id: sale_id.to_string(),
                line_item_id: outcome.result_line_id.clone(),
                old_product_id: outcome.old_product_id.clone(),
                old_product_name: outcome.old_product_name.clone(),
                old_unit_price_cents: outcome.old_unit_price_cents,
                returned_qty,
                new_product_id: new_product.id.clone(),
                new_product_name: new_product.name.clone(),
                new_unit_price_cents: new_product.unit_price_cents,
                new_qty,
                location_id: sale.location_id.clone(),
                value_difference_cents: outcome.value_difference_cents,
                settlement,
                performed_by: actor.id.clone(),
                created_at: chrono::Utc::now(),
            };
            sale.push_exchange(record.clone());

            let balance = sale.balance_due();
            if balance.is_negative() {
                // Ledger-visible, not clamped: the credit side accounts for it.
                warn!(sale_id, %balance, "sale balance negative after exchange");
            }

            info!(
                sale_id,
                %exchange_id,
                difference = %record.value_difference(),
                "product exchanged"
            );
            self.record_audit(
                sale_id,
                AuditAction::Exchange,
                format!(
                    "{returned_qty}x {} exchanged for {new_qty}x {} (difference {}): {reason}",
                    record.old_product_name,
                    record.new_product_name,
                    record.value_difference()
                ),
                actor,
            );
            Ok(record)
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
