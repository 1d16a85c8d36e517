//! Append-only audit log of sale history.
//!
//! Every state-changing engine operation records exactly one event here
//! after it succeeds. Events are never edited or deleted; there is no API
//! to do so.

use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use lojix_core::{AuditAction, AuditEvent};

#[derive(Debug, Default)]
pub struct AuditLog {
    events: Mutex<Vec<AuditEvent>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event. Infallible: an operation that already committed
    /// must not be failed retroactively by its audit write.
    pub fn record(
        &self,
        sale_id: &str,
        action: AuditAction,
        description: impl Into<String>,
        actor_id: &str,
    ) {
        let event = AuditEvent {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            action,
            description: description.into(),
            actor_id: actor_id.to_string(),
            created_at: chrono::Utc::now(),
        };
        info!(sale_id, ?action, actor_id, "audit event");
        self.events
            .lock()
            .expect("audit log mutex poisoned")
            .push(event);
    }

    /// Events for one sale, oldest first.
    pub fn events_for_sale(&self, sale_id: &str) -> Vec<AuditEvent> {
        self.events
            .lock()
            .expect("audit log mutex poisoned")
            .iter()
            .filter(|e| e.sale_id == sale_id)
            .cloned()
            .collect()
    }

    /// Full trail, oldest first.
    pub fn all(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit log mutex poisoned").clone()
    }
}
