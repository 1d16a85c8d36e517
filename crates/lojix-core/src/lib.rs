//! # lojix-core
//!
//! Pure business logic for the Lojix sales transaction ledger.
//!
//! ## Golden Rule: NO I/O ALLOWED
//!
//! This crate contains only pure domain logic. It must never:
//! - Access a database
//! - Make network calls
//! - Read or write files
//! - Spawn threads
//!
//! Persistence, concurrency and orchestration live in `lojix-engine`.
//!
//! ## Module Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  money       Money (integer centavos) + basis-point arithmetic      │
//! │  types       Domain types: payments, discounts, lines, ledger rows  │
//! │  sale        The Sale aggregate and every mutation on it            │
//! │  discount    DiscountPolicy: the single ceiling authority           │
//! │  validation  Field-level structural checks                          │
//! │  error       CoreError / ValidationError / CoreResult               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

pub mod discount;
pub mod error;
pub mod money;
pub mod sale;
pub mod types;
pub mod validation;

// Re-export the primary types at the crate root.
pub use discount::{DiscountPolicy, FULL_BPS};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use sale::{ExchangeOutcome, Sale};
pub use types::{
    AuditAction, AuditEvent, CashWithdrawal, CreditEntry, CreditOrigin, Discount, DiscountValue,
    DueDate, ExchangeRecord, LineItem, MovementKind, Payment, PaymentKind, ReturnCredit,
    ReturnRecord, ReturnedItem, SaleKind, SaleStatus, Settlement, StockDisposition,
    StockMovement,
};
