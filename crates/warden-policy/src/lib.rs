//! # warden-policy
//!
//! Rule store and command policy engine.
//!
//! - [`RuleStore`]: validated, specificity-indexed allow/ask/deny rules
//! - [`CommandPolicyEngine`]: classifies a command line into a [`Verdict`]
//! - Compound commands are split on `&&`, `||`, `;`, `|` and evaluated per
//!   part; the most severe part decides
//! - Core deny rules cannot be disabled or shadowed
//!
//! [`Verdict`]: warden_core::Verdict

#![deny(unsafe_code)]

pub mod audit;
pub mod builtin;
pub mod engine;
pub mod errors;
pub mod rules;
pub mod split;
pub mod store;

pub use audit::{AuditEntry, AuditLog, read_audit_file};
pub use engine::CommandPolicyEngine;
pub use errors::{PolicyError, Result};
pub use rules::{Rule, RuleTier};
pub use split::{SubCommand, command_words, split_command};
pub use store::RuleStore;
