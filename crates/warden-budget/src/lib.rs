//! # warden-budget
//!
//! Per-session token budget. Usage is charged against an inclusive limit;
//! once usage is strictly above the limit every further charge reports the
//! budget as exceeded until the session is reset. Usage is persisted to a
//! JSON ledger so separate hook processes share one view.

#![deny(unsafe_code)]

pub mod errors;
pub mod ledger;
pub mod monitor;
pub mod types;

pub use errors::{BudgetError, Result};
pub use ledger::{LedgerStore, UsageLedger};
pub use monitor::TokenBudgetMonitor;
pub use types::{BudgetLevel, BudgetStatus, TokenUsage};
