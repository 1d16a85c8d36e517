//! # Customer Credit Ledger
//!
//! Store credit as append-only entries per customer. An entry is issued with
//! a `total_cents` and consumed by bumping `used_cents`; the balance is
//! always derived, never stored.
//!
//! Consumption is FIFO across a customer's entries (oldest first), matching
//! how credit expiry would be reasoned about. The whole check-and-consume
//! runs under the customer's map entry guard, so two concurrent draws can
//! never both spend the same centavo.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use lojix_core::{CoreError, CoreResult, CreditEntry, CreditOrigin, Money};

/// One entry's share of a FIFO draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditDraw {
    pub entry_id: String,
    pub amount_cents: i64,
}

/// In-memory credit ledger keyed by customer.
#[derive(Debug, Default)]
pub struct CreditLedger {
    entries: DashMap<String, Vec<CreditEntry>>,
}

impl CreditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new credit entry, returning a copy of it.
    pub fn issue(
        &self,
        customer_id: &str,
        amount: Money,
        origin: CreditOrigin,
        reason: Option<String>,
        issued_by: &str,
    ) -> CoreResult<CreditEntry> {
        if !amount.is_positive() {
            return Err(CoreError::invalid_amount(
                amount.cents(),
                "credit amount must be positive",
            ));
        }

        let entry = CreditEntry {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            origin,
            total_cents: amount.cents(),
            used_cents: 0,
            reason,
            issued_by: issued_by.to_string(),
            created_at: chrono::Utc::now(),
        };

        info!(customer_id, amount = %amount, entry_id = %entry.id, "credit issued");
        self.entries
            .entry(customer_id.to_string())
            .or_default()
            .push(entry.clone());
        Ok(entry)
    }

    /// Draws `amount` from the customer's balance, oldest entries first.
    ///
    /// All-or-nothing: on `InsufficientCredit` no entry is touched. Returns
    /// how the draw was split across entries.
    pub fn consume(&self, customer_id: &str, amount: Money) -> CoreResult<Vec<CreditDraw>> {
        if !amount.is_positive() {
            return Err(CoreError::invalid_amount(
                amount.cents(),
                "credit draw must be positive",
            ));
        }

        let mut entry = self.entries.entry(customer_id.to_string()).or_default();
        let available: i64 = entry.iter().map(|e| e.balance().cents()).sum();
        if available < amount.cents() {
            return Err(CoreError::InsufficientCredit {
                customer_id: customer_id.to_string(),
                available_cents: available,
                requested_cents: amount.cents(),
            });
        }

        let mut remaining = amount.cents();
        let mut draws = Vec::new();
        for row in entry.iter_mut() {
            if remaining == 0 {
                break;
            }
            let balance = row.balance().cents();
            if balance == 0 {
                continue;
            }
            let take = balance.min(remaining);
            row.used_cents += take;
            remaining -= take;
            draws.push(CreditDraw {
                entry_id: row.id.clone(),
                amount_cents: take,
            });
        }

        info!(customer_id, amount = %amount, entries = draws.len(), "credit consumed");
        Ok(draws)
    }

    /// Customer's current balance, zero for unknown customers.
    pub fn balance_of(&self, customer_id: &str) -> Money {
        let cents = self
            .entries
            .get(customer_id)
            .map(|rows| rows.iter().map(|e| e.balance().cents()).sum())
            .unwrap_or(0);
        Money::from_cents(cents)
    }

    /// All entries for a customer, oldest first.
    pub fn entries_for(&self, customer_id: &str) -> Vec<CreditEntry> {
        self.entries
            .get(customer_id)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
