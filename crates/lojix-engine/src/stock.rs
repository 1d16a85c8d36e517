//! # Stock Ledger
//!
//! Per-product, per-location quantities plus an append-only movement trail.
//!
//! ## Concurrency Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  levels: DashMap<(product, location), i64>                          │
//! │                                                                     │
//! │  reserve/release/adjust hold the shard entry guard across the       │
//! │  check-and-write, so two concurrent reserves of the last unit can   │
//! │  never both succeed.                                                │
//! │                                                                     │
//! │  movements: Mutex<Vec<StockMovement>>  (append-only, one per        │
//! │  successful mutation, recorded while the entry guard is held)       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed reserve has no side effects: no level change, no movement.

use dashmap::DashMap;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use lojix_core::{CoreError, CoreResult, MovementKind, StockMovement};

/// Attribution of a stock movement to the sale/exchange that caused it.
#[derive(Debug, Clone, Default)]
pub struct MovementLink {
    pub sale_id: Option<String>,
    pub exchange_id: Option<String>,
}

impl MovementLink {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn sale(sale_id: impl Into<String>) -> Self {
        MovementLink {
            sale_id: Some(sale_id.into()),
            exchange_id: None,
        }
    }

    pub fn exchange(sale_id: impl Into<String>, exchange_id: impl Into<String>) -> Self {
        MovementLink {
            sale_id: Some(sale_id.into()),
            exchange_id: Some(exchange_id.into()),
        }
    }
}

/// In-memory stock ledger. Quantities never go negative.
#[derive(Debug, Default)]
pub struct StockLedger {
    levels: DashMap<(String, String), i64>,
    movements: Mutex<Vec<StockMovement>>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current on-hand quantity; zero for never-seen keys.
    pub fn quantity_of(&self, product_id: &str, location_id: &str) -> i64 {
        self.levels
            .get(&(product_id.to_string(), location_id.to_string()))
            .map(|q| *q)
            .unwrap_or(0)
    }

    /// Atomically checks availability and decrements. All-or-nothing: on
    /// `InsufficientStock` the level is untouched and no movement is made.
    pub fn reserve(
        &self,
        product_id: &str,
        location_id: &str,
        quantity: i64,
        reason: &str,
        link: MovementLink,
    ) -> CoreResult<()> {
        if quantity <= 0 {
            return Err(CoreError::invalid_amount(
                quantity,
                "reserve quantity must be positive",
            ));
        }

        let key = (product_id.to_string(), location_id.to_string());
        let mut entry = self.levels.entry(key).or_insert(0);
        let prior = *entry;
        if prior < quantity {
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                location_id: location_id.to_string(),
                available: prior,
                requested: quantity,
            });
        }
        *entry -= quantity;
        let new = *entry;

        debug!(product_id, location_id, quantity, prior, new, "stock reserved");
        self.record(
            product_id,
            location_id,
            MovementKind::Out,
            quantity,
            prior,
            new,
            reason,
            link,
        );
        Ok(())
    }

    /// Increments the level (return to stock, cancellation restore).
    pub fn release(
        &self,
        product_id: &str,
        location_id: &str,
        quantity: i64,
        reason: &str,
        link: MovementLink,
    ) -> CoreResult<()> {
        if quantity <= 0 {
            return Err(CoreError::invalid_amount(
                quantity,
                "release quantity must be positive",
            ));
        }

        let key = (product_id.to_string(), location_id.to_string());
        let mut entry = self.levels.entry(key).or_insert(0);
        let prior = *entry;
        *entry += quantity;
        let new = *entry;

        debug!(product_id, location_id, quantity, prior, new, "stock released");
        self.record(
            product_id,
            location_id,
            MovementKind::In,
            quantity,
            prior,
            new,
            reason,
            link,
        );
        Ok(())
    }

    /// Signed manual adjustment (intake, recount, write-off). Rejects any
    /// delta that would take the level negative.
    pub fn adjust(
        &self,
        product_id: &str,
        location_id: &str,
        delta: i64,
        reason: &str,
    ) -> CoreResult<i64> {
        if delta == 0 {
            return Err(CoreError::invalid_amount(0, "adjustment delta is zero"));
        }

        let key = (product_id.to_string(), location_id.to_string());
        let mut entry = self.levels.entry(key).or_insert(0);
        let prior = *entry;
        let new = prior + delta;
        if new < 0 {
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                location_id: location_id.to_string(),
                available: prior,
                requested: -delta,
            });
        }
        *entry = new;

        debug!(product_id, location_id, delta, prior, new, reason, "stock adjusted");
        let kind = if delta > 0 {
            MovementKind::In
        } else {
            MovementKind::Out
        };
        self.record(
            product_id,
            location_id,
            kind,
            delta.abs(),
            prior,
            new,
            reason,
            MovementLink::none(),
        );
        Ok(new)
    }

    /// Full movement trail, oldest first.
    pub fn movements(&self) -> Vec<StockMovement> {
        self.movements
            .lock()
            .expect("stock movements mutex poisoned")
            .clone()
    }

    /// Movements attributed to one sale, oldest first.
    pub fn movements_for_sale(&self, sale_id: &str) -> Vec<StockMovement> {
        self.movements
            .lock()
            .expect("stock movements mutex poisoned")
            .iter()
            .filter(|m| m.sale_id.as_deref() == Some(sale_id))
            .cloned()
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        product_id: &str,
        location_id: &str,
        kind: MovementKind,
        quantity: i64,
        prior_quantity: i64,
        new_quantity: i64,
        reason: &str,
        link: MovementLink,
    ) {
        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            location_id: location_id.to_string(),
            kind,
            quantity,
            prior_quantity,
            new_quantity,
            reason: reason.to_string(),
            sale_id: link.sale_id,
            exchange_id: link.exchange_id,
            created_at: chrono::Utc::now(),
        };
        self.movements
            .lock()
            .expect("stock movements mutex poisoned")
            .push(movement);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
