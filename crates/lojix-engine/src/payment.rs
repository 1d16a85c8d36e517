//! # Payment Processing
//!
//! Payments attach to a sale one at a time; each method decides its own
//! amount and the mix is free. Store-credit payments are the only kind with
//! a side effect outside the sale: they draw down the customer's credit
//! ledger, FIFO, at record time.
//!
//! Ordering for store credit: the ledger draw commits first, then the sale
//! records the payment. A sale-side rejection (overpayment, bad state)
//! re-issues the drawn credit; only a failed re-issue escalates.

use tracing::{info, warn};

use lojix_core::{AuditAction, CreditOrigin, Money, PaymentKind, ValidationError};

use crate::context::Actor;
use crate::engine::SalesEngine;
use crate::error::{EngineError, EngineResult};

impl SalesEngine {
    /// Records a payment towards a sale. Returns the new payment's id.
    pub fn add_payment(
        &self,
        actor: &Actor,
        sale_id: &str,
        kind: PaymentKind,
        amount: Money,
        note: Option<String>,
    ) -> EngineResult<String> {
        self.with_sale(sale_id, |sale| {
            if kind == PaymentKind::StoreCredit {
                let customer_id = sale
                    .customer_id
                    .clone()
                    .ok_or_else(|| ValidationError::required("customer_id"))?;

                self.credit.consume(&customer_id, amount)?;

                match sale.record_payment(kind, amount, note, &actor.id) {
                    Ok(payment) => {
                        let id = payment.id.clone();
                        info!(sale_id, %amount, %customer_id, "store credit payment");
                        self.record_audit(
                            sale_id,
                            AuditAction::PaymentAdded,
                            format!("store_credit payment of {amount}"),
                            actor,
                        );
                        Ok(id)
                    }
                    Err(e) => {
                        // Give the drawn credit back before surfacing the error.
                        warn!(sale_id, %amount, %e, "store credit payment rejected, re-issuing");
                        if let Err(undo) = self.credit.issue(
                            &customer_id,
                            amount,
                            CreditOrigin::Manual,
                            Some("store credit payment reversed".to_string()),
                            &actor.id,
                        ) {
                            return Err(EngineError::compensation_failed(
                                "add_payment",
                                format!(
                                    "{amount} drawn from customer {customer_id} but not recorded on sale {sale_id}: {undo}"
                                ),
                            ));
                        }
                        Err(e.into())
                    }
                }
            } else {
                let payment = sale.record_payment(kind, amount, note, &actor.id)?;
                let id = payment.id.clone();
                info!(sale_id, %kind, %amount, "payment added");
                self.record_audit(
                    sale_id,
                    AuditAction::PaymentAdded,
                    format!("{kind} payment of {amount}"),
                    actor,
                );
                Ok(id)
            }
        })
    }

    /// Edits a payment's amount (and note), stamping the edit trail.
    /// Store-credit payments cannot be edited; remove and re-add.
    pub fn edit_payment(
        &self,
        actor: &Actor,
        sale_id: &str,
        payment_id: &str,
        new_amount: Money,
        note: Option<String>,
    ) -> EngineResult<()> {
        self.with_sale(sale_id, |sale| {
            let old_amount = sale.payment(payment_id)?.amount();
            sale.edit_payment(payment_id, new_amount, note, &actor.id)?;

            info!(sale_id, payment_id, %old_amount, %new_amount, "payment edited");
            self.record_audit(
                sale_id,
                AuditAction::PaymentEdited,
                format!("payment {payment_id} changed from {old_amount} to {new_amount}"),
                actor,
            );
            Ok(())
        })
    }

    /// Removes a payment. Removing a store-credit payment re-issues the
    /// drawn amount as a fresh credit entry.
    pub fn remove_payment(
        &self,
        actor: &Actor,
        sale_id: &str,
        payment_id: &str,
    ) -> EngineResult<()> {
        self.with_sale(sale_id, |sale| {
            let removed = sale.remove_payment(payment_id)?;

            if removed.kind == PaymentKind::StoreCredit {
                if let Some(customer_id) = &sale.customer_id {
                    self.credit.issue(
                        customer_id,
                        removed.amount(),
                        CreditOrigin::Manual,
                        Some(format!("store credit payment removed from sale #{}", sale.number)),
                        &actor.id,
                    )?;
                }
            }

            info!(sale_id, payment_id, amount = %removed.amount(), "payment removed");
            self.record_audit(
                sale_id,
                AuditAction::PaymentRemoved,
                format!("{} payment of {} removed", removed.kind, removed.amount()),
                actor,
            );
            Ok(())
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
