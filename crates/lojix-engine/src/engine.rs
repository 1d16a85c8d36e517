//! # Sales Engine
//!
//! Orchestrates the sale aggregate against the stock ledger, credit ledger
//! and audit log.
//!
//! ## Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  sales: DashMap<sale_id, Sale>                                      │
//! │                                                                     │
//! │  Every operation on a sale runs under its map entry guard, so two   │
//! │  requests for the same sale serialize. Lock order inside a guard    │
//! │  is always: sale → stock → credit → audit (never backwards), so     │
//! │  cross-ledger operations cannot deadlock.                           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Fallible steps run before any sale mutation wherever possible; where a
//! cross-ledger step must commit first (stock for exchanges, credit for
//! store-credit payments), failure after it triggers compensation, and a
//! failed compensation escalates to `EngineError::CompensationFailed`.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use lojix_core::{
    AuditAction, CoreError, CreditOrigin, DiscountValue, DueDate, PaymentKind, Sale, SaleKind,
};

use crate::audit::AuditLog;
use crate::context::{Actor, Catalog, ProductSnapshot, Till};
use crate::credit::CreditLedger;
use crate::error::{EngineError, EngineResult};
use crate::stock::{MovementLink, StockLedger};

pub struct SalesEngine {
    sales: DashMap<String, Sale>,
    next_number: AtomicI64,
    pub(crate) stock: StockLedger,
    pub(crate) credit: CreditLedger,
    audit: AuditLog,
    catalog: Arc<dyn Catalog>,
    till: Arc<dyn Till>,
}

impl SalesEngine {
    pub fn new(catalog: Arc<dyn Catalog>, till: Arc<dyn Till>) -> Self {
        SalesEngine {
            sales: DashMap::new(),
            next_number: AtomicI64::new(1),
            stock: StockLedger::new(),
            credit: CreditLedger::new(),
            audit: AuditLog::new(),
            catalog,
            till,
        }
    }

    #[inline]
    pub fn stock(&self) -> &StockLedger {
        &self.stock
    }

    #[inline]
    pub fn credit(&self) -> &CreditLedger {
        &self.credit
    }

    #[inline]
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Runs `f` with exclusive access to one sale. The entry guard is held
    /// for the whole closure; see the module docs for the lock order.
    pub(crate) fn with_sale<T>(
        &self,
        sale_id: &str,
        f: impl FnOnce(&mut Sale) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut sale = self
            .sales
            .get_mut(sale_id)
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;
        f(&mut sale)
    }

    pub(crate) fn lookup_product(&self, product_id: &str) -> EngineResult<ProductSnapshot> {
        self.catalog
            .product(product_id)
            .ok_or_else(|| CoreError::not_found("Product", product_id).into())
    }

    pub(crate) fn till(&self) -> &dyn Till {
        self.till.as_ref()
    }

    pub(crate) fn record_audit(
        &self,
        sale_id: &str,
        action: AuditAction,
        description: impl Into<String>,
        actor: &Actor,
    ) {
        self.audit.record(sale_id, action, description, &actor.id);
    }

    // =========================================================================
    // Sale Lifecycle
    // =========================================================================

    /// Opens a new sale and returns a snapshot of it.
    pub fn create_sale(
        &self,
        actor: &Actor,
        kind: SaleKind,
        customer_id: Option<String>,
        location_id: &str,
    ) -> EngineResult<Sale> {
        let number = self.next_number.fetch_add(1, Ordering::SeqCst);
        let sale = Sale::new(number, kind, customer_id, location_id, &actor.id)?;

        info!(sale_id = %sale.id, number, ?kind, location_id, "sale created");
        self.record_audit(
            &sale.id,
            AuditAction::Creation,
            format!("sale #{number} opened"),
            actor,
        );

        let snapshot = sale.clone();
        self.sales.insert(sale.id.clone(), sale);
        Ok(snapshot)
    }

    /// Snapshot of a sale by id.
    pub fn sale(&self, sale_id: &str) -> EngineResult<Sale> {
        self.sales
            .get(sale_id)
            .map(|s| s.clone())
            .ok_or_else(|| CoreError::not_found("Sale", sale_id).into())
    }

    pub fn set_note(&self, sale_id: &str, note: Option<String>) -> EngineResult<()> {
        self.with_sale(sale_id, |sale| Ok(sale.set_note(note)?))
    }

    pub fn set_due_date(&self, sale_id: &str, due_date: Option<DueDate>) -> EngineResult<()> {
        self.with_sale(sale_id, |sale| Ok(sale.set_due_date(due_date)?))
    }

    // =========================================================================
    // Line Items
    // =========================================================================

    /// Adds `quantity` units of a product, reserving stock atomically.
    /// Returns the id of the affected line.
    pub fn add_item(
        &self,
        actor: &Actor,
        sale_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> EngineResult<String> {
        let product = self.lookup_product(product_id)?;

        self.with_sale(sale_id, |sale| {
            self.stock.reserve(
                &product.id,
                &sale.location_id,
                quantity,
                "sold",
                MovementLink::sale(sale_id),
            )?;

            match sale.add_item(&product.id, &product.name, product.unit_price(), quantity) {
                Ok(item_id) => {
                    debug!(sale_id, product_id, quantity, "item added");
                    self.record_audit(
                        sale_id,
                        AuditAction::ItemAdded,
                        format!("{quantity}x {} added", product.name),
                        actor,
                    );
                    Ok(item_id)
                }
                Err(e) => {
                    // Hand the reserved units back before surfacing the error.
                    if let Err(undo) = self.stock.release(
                        &product.id,
                        &sale.location_id,
                        quantity,
                        "add item reverted",
                        MovementLink::sale(sale_id),
                    ) {
                        return Err(EngineError::compensation_failed(
                            "add_item",
                            format!(
                                "{quantity}x {product_id} reserved but not added to sale {sale_id}: {undo}"
                            ),
                        ));
                    }
                    Err(e.into())
                }
            }
        })
    }

    /// Removes a line and releases its reserved stock.
    pub fn remove_item(&self, actor: &Actor, sale_id: &str, item_id: &str) -> EngineResult<()> {
        self.with_sale(sale_id, |sale| {
            let removed = sale.remove_item(item_id)?;
            self.stock.release(
                &removed.product_id,
                &sale.location_id,
                removed.quantity,
                "item removed",
                MovementLink::sale(sale_id),
            )?;

            debug!(sale_id, item_id, "item removed");
            self.record_audit(
                sale_id,
                AuditAction::ItemRemoved,
                format!("{}x {} removed", removed.quantity, removed.name_snapshot),
                actor,
            );
            Ok(())
        })
    }

    // =========================================================================
    // Discounts
    // =========================================================================

    /// Applies a discount to one line, under the actor's ceiling.
    pub fn apply_item_discount(
        &self,
        actor: &Actor,
        sale_id: &str,
        item_id: &str,
        value: DiscountValue,
        reason: &str,
    ) -> EngineResult<()> {
        self.with_sale(sale_id, |sale| {
            let superseded = sale.discount.is_some();
            let amount = sale.apply_item_discount(
                item_id,
                value,
                reason,
                &actor.id,
                actor.discount_ceiling_bps,
            )?;
            if superseded {
                debug!(sale_id, item_id, "sale-level discount superseded by line discount");
                self.record_audit(
                    sale_id,
                    AuditAction::DiscountCleared,
                    "sale discount cleared by line discount",
                    actor,
                );
            }
            self.record_audit(
                sale_id,
                AuditAction::DiscountApplied,
                format!("{value} off line {item_id} ({amount}): {reason}"),
                actor,
            );
            Ok(())
        })
    }

    /// Applies a discount on the whole sale, under the actor's ceiling.
    pub fn apply_sale_discount(
        &self,
        actor: &Actor,
        sale_id: &str,
        value: DiscountValue,
        reason: &str,
    ) -> EngineResult<()> {
        self.with_sale(sale_id, |sale| {
            let superseded = sale.items.iter().any(|i| i.discount.is_some());
            let amount =
                sale.apply_sale_discount(value, reason, &actor.id, actor.discount_ceiling_bps)?;
            if superseded {
                debug!(sale_id, "line discounts superseded by sale-level discount");
                self.record_audit(
                    sale_id,
                    AuditAction::DiscountCleared,
                    "line discounts cleared by sale discount",
                    actor,
                );
            }
            self.record_audit(
                sale_id,
                AuditAction::DiscountApplied,
                format!("{value} off sale ({amount}): {reason}"),
                actor,
            );
            Ok(())
        })
    }

    /// Clears the sale-level discount.
    pub fn clear_sale_discount(&self, actor: &Actor, sale_id: &str) -> EngineResult<()> {
        self.with_sale(sale_id, |sale| {
            if sale.clear_sale_discount()?.is_some() {
                self.record_audit(
                    sale_id,
                    AuditAction::DiscountCleared,
                    "sale discount cleared",
                    actor,
                );
            }
            Ok(())
        })
    }

    /// Clears one line's discount.
    pub fn clear_item_discount(
        &self,
        actor: &Actor,
        sale_id: &str,
        item_id: &str,
    ) -> EngineResult<()> {
        self.with_sale(sale_id, |sale| {
            if sale.clear_item_discount(item_id)?.is_some() {
                self.record_audit(
                    sale_id,
                    AuditAction::DiscountCleared,
                    format!("discount cleared from line {item_id}"),
                    actor,
                );
            }
            Ok(())
        })
    }

    // =========================================================================
    // Completion / Cancellation
    // =========================================================================

    /// Completes the sale (cash sales must be fully paid).
    pub fn complete_sale(&self, actor: &Actor, sale_id: &str) -> EngineResult<Sale> {
        self.with_sale(sale_id, |sale| {
            sale.complete()?;
            info!(sale_id, number = sale.number, "sale completed");
            self.record_audit(
                sale_id,
                AuditAction::Completion,
                format!("sale #{} completed, net {}", sale.number, sale.net_total()),
                actor,
            );
            Ok(sale.clone())
        })
    }

    /// Cancels the sale: restores stock for units not already returned and
    /// re-issues store credit drawn by its payments.
    pub fn cancel_sale(&self, actor: &Actor, sale_id: &str, reason: &str) -> EngineResult<Sale> {
        lojix_core::validation::validate_reason(reason)?;

        self.with_sale(sale_id, |sale| {
            sale.cancel()?;

            for item in &sale.items {
                let remaining = item.remaining_qty();
                if remaining > 0 {
                    self.stock.release(
                        &item.product_id,
                        &sale.location_id,
                        remaining,
                        "sale cancelled",
                        MovementLink::sale(sale_id),
                    )?;
                }
            }

            // Money drawn from the credit ledger goes back to it.
            if let Some(customer_id) = &sale.customer_id {
                for payment in &sale.payments {
                    if payment.kind == PaymentKind::StoreCredit {
                        self.credit.issue(
                            customer_id,
                            payment.amount(),
                            CreditOrigin::Manual,
                            Some(format!("sale #{} cancelled", sale.number)),
                            &actor.id,
                        )?;
                    }
                }
            }

            info!(sale_id, number = sale.number, reason, "sale cancelled");
            self.record_audit(
                sale_id,
                AuditAction::Cancellation,
                format!("sale #{} cancelled: {reason}", sale.number),
                actor,
            );
            Ok(sale.clone())
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{InMemoryCatalog, MemoryTill};
    use lojix_core::SaleStatus;

    fn engine() -> SalesEngine {
        let catalog = InMemoryCatalog::new()
            .with_product("case", "Phone Case", 2_500)
            .with_product("glass", "Tempered Glass", 1_500);
        let engine = SalesEngine::new(Arc::new(catalog), Arc::new(MemoryTill::new()));
        engine.stock().adjust("case", "loja1", 10, "intake").unwrap();
        engine.stock().adjust("glass", "loja1", 10, "intake").unwrap();
        engine
    }

    fn clerk() -> Actor {
        Actor::new("alice", 1500)
    }

    #[test]
    fn sale_numbers_are_sequential() {
        let engine = engine();
        let actor = clerk();
        let first = engine
            .create_sale(&actor, SaleKind::Cash, None, "loja1")
            .unwrap();
        let second = engine
            .create_sale(&actor, SaleKind::Cash, None, "loja1")
            .unwrap();
        assert_eq!(second.number, first.number + 1);
    }

    #[test]
    fn add_item_reserves_stock() {
        let engine = engine();
        let actor = clerk();
        let sale = engine
            .create_sale(&actor, SaleKind::Cash, None, "loja1")
            .unwrap();

        engine.add_item(&actor, &sale.id, "case", 3).unwrap();
        assert_eq!(engine.stock().quantity_of("case", "loja1"), 7);

        let err = engine.add_item(&actor, &sale.id, "case", 8).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::InsufficientStock { .. })
        ));
        // Failed reserve did not change anything.
        assert_eq!(engine.stock().quantity_of("case", "loja1"), 7);
        assert_eq!(engine.sale(&sale.id).unwrap().items[0].quantity, 3);
    }

    #[test]
    fn remove_item_releases_stock() {
        let engine = engine();
        let actor = clerk();
        let sale = engine
            .create_sale(&actor, SaleKind::Cash, None, "loja1")
            .unwrap();
        let item_id = engine.add_item(&actor, &sale.id, "case", 3).unwrap();

        engine.remove_item(&actor, &sale.id, &item_id).unwrap();
        assert_eq!(engine.stock().quantity_of("case", "loja1"), 10);
        assert!(engine.sale(&sale.id).unwrap().items.is_empty());
    }

    #[test]
    fn unknown_product_is_not_found() {
        let engine = engine();
        let actor = clerk();
        let sale = engine
            .create_sale(&actor, SaleKind::Cash, None, "loja1")
            .unwrap();
        let err = engine.add_item(&actor, &sale.id, "missing", 1).unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::NotFound { .. })));
    }

    #[test]
    fn cancel_restores_unreturned_stock() {
        let engine = engine();
        let actor = clerk();
        let sale = engine
            .create_sale(&actor, SaleKind::Cash, None, "loja1")
            .unwrap();
        engine.add_item(&actor, &sale.id, "case", 4).unwrap();
        assert_eq!(engine.stock().quantity_of("case", "loja1"), 6);

        let cancelled = engine
            .cancel_sale(&actor, &sale.id, "customer walked out")
            .unwrap();
        assert_eq!(cancelled.status, SaleStatus::Cancelled);
        assert_eq!(engine.stock().quantity_of("case", "loja1"), 10);

        let err = engine.add_item(&actor, &sale.id, "case", 1).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::InvalidSaleState { .. })
        ));
        // The rejected add put its reservation back.
        assert_eq!(engine.stock().quantity_of("case", "loja1"), 10);
    }

    #[test]
    fn audit_trail_follows_the_sale() {
        let engine = engine();
        let actor = clerk();
        let sale = engine
            .create_sale(&actor, SaleKind::Cash, None, "loja1")
            .unwrap();
        let item_id = engine.add_item(&actor, &sale.id, "case", 2).unwrap();
        engine
            .apply_item_discount(
                &actor,
                &sale.id,
                &item_id,
                DiscountValue::Percentage { bps: 1000 },
                "scratched box",
            )
            .unwrap();

        let actions: Vec<_> = engine
            .audit()
            .events_for_sale(&sale.id)
            .iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::Creation,
                AuditAction::ItemAdded,
                AuditAction::DiscountApplied,
            ]
        );
    }

    #[test]
    fn superseding_a_discount_level_audits_the_clearance() {
        let engine = engine();
        let actor = clerk();
        let sale = engine
            .create_sale(&actor, SaleKind::Cash, None, "loja1")
            .unwrap();
        let item_id = engine.add_item(&actor, &sale.id, "case", 2).unwrap();
        engine
            .apply_item_discount(
                &actor,
                &sale.id,
                &item_id,
                DiscountValue::Percentage { bps: 1000 },
                "scratched box",
            )
            .unwrap();
        engine
            .apply_sale_discount(
                &actor,
                &sale.id,
                DiscountValue::Percentage { bps: 500 },
                "loyal customer",
            )
            .unwrap();

        let actions: Vec<_> = engine
            .audit()
            .events_for_sale(&sale.id)
            .iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::Creation,
                AuditAction::ItemAdded,
                AuditAction::DiscountApplied,
                AuditAction::DiscountCleared,
                AuditAction::DiscountApplied,
            ]
        );
    }
}
