//! # lojix-engine
//!
//! Ledgers, concurrency and orchestration for the Lojix sales system, on
//! top of the pure logic in `lojix-core`.
//!
//! ## Module Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  engine     SalesEngine: sale lifecycle, items, discounts           │
//! │  payment    Payment processing, incl. store-credit draws            │
//! │  exchange   Returns and product exchanges                           │
//! │  stock      StockLedger: per-location levels + movement trail       │
//! │  credit     CreditLedger: FIFO store credit per customer            │
//! │  audit      AuditLog: append-only sale history                      │
//! │  context    Collaborator seams: Actor, Catalog, Till                │
//! │  error      EngineError / EngineResult                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine is synchronous and in-memory: callers own durability. All
//! shared state is internally synchronized, so a `SalesEngine` behind an
//! `Arc` can be driven from many threads at once.

pub mod audit;
pub mod context;
pub mod credit;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod payment;
pub mod stock;

pub use audit::AuditLog;
pub use context::{Actor, Catalog, InMemoryCatalog, MemoryTill, ProductSnapshot, Till};
pub use credit::{CreditDraw, CreditLedger};
pub use engine::SalesEngine;
pub use error::{EngineError, EngineResult};
pub use exchange::ReturnLine;
pub use stock::{MovementLink, StockLedger};
