//! Collaborator seams: identity, catalog and till.
//!
//! The engine never decides discount ceilings, product prices or drawer
//! mechanics itself; those come in through the types here so callers can
//! plug in their own sources.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use lojix_core::{CashWithdrawal, Money};

// =============================================================================
// Actor
// =============================================================================

/// The acting user for an engine call.
///
/// The discount ceiling comes from the identity layer (per user or role);
/// the engine only enforces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    /// Highest discount rate this actor may grant, in basis points.
    pub discount_ceiling_bps: u32,
}

impl Actor {
    pub fn new(id: impl Into<String>, discount_ceiling_bps: u32) -> Self {
        Actor {
            id: id.into(),
            discount_ceiling_bps,
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Product data frozen into a line item at add time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: String,
    pub name: String,
    pub unit_price_cents: i64,
}

impl ProductSnapshot {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

/// Read-only product lookup. The catalog itself (CRUD, pricing rules) is
/// owned elsewhere; the engine only needs name and current price.
pub trait Catalog: Send + Sync {
    fn product(&self, product_id: &str) -> Option<ProductSnapshot>;
}

/// Catalog backed by a fixed map, for tests and embedded setups.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: HashMap<String, ProductSnapshot>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        unit_price_cents: i64,
    ) -> Self {
        let id = id.into();
        self.products.insert(
            id.clone(),
            ProductSnapshot {
                id,
                name: name.into(),
                unit_price_cents,
            },
        );
        self
    }
}

impl Catalog for InMemoryCatalog {
    fn product(&self, product_id: &str) -> Option<ProductSnapshot> {
        self.products.get(product_id).cloned()
    }
}

// =============================================================================
// Till
// =============================================================================

/// Receives withdrawal records for manual-refund settlements. The engine
/// does not manage drawer open/close state.
pub trait Till: Send + Sync {
    fn record_withdrawal(&self, withdrawal: CashWithdrawal);
}

/// Till that accumulates withdrawals in memory.
#[derive(Debug, Default)]
pub struct MemoryTill {
    withdrawals: Mutex<Vec<CashWithdrawal>>,
}

impl MemoryTill {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn withdrawals(&self) -> Vec<CashWithdrawal> {
        self.withdrawals
            .lock()
            .expect("till mutex poisoned")
            .clone()
    }
}

impl Till for MemoryTill {
    fn record_withdrawal(&self, withdrawal: CashWithdrawal) {
        self.withdrawals
            .lock()
            .expect("till mutex poisoned")
            .push(withdrawal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup() {
        let catalog = InMemoryCatalog::new().with_product("p1", "Phone Case", 2_500);
        let snapshot = catalog.product("p1").unwrap();
        assert_eq!(snapshot.name, "Phone Case");
        assert_eq!(snapshot.unit_price().cents(), 2_500);
        assert!(catalog.product("missing").is_none());
    }
}
