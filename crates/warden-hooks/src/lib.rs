//! # warden-hooks
//!
//! Hook engine and host protocol for warden.
//!
//! The host runs `warden hook <event>` at lifecycle points, writing one JSON
//! object to stdin. [`protocol::dispatch`] parses it, runs every handler
//! registered for the event in priority order and renders the result back
//! as stdout JSON plus an exit status.
//!
//! ## Gating
//!
//! [`PreToolUse`](types::HookType::PreToolUse) and
//! [`PostToolUse`](types::HookType::PostToolUse) are gating: the most severe
//! handler result wins and a handler error or timeout asks the user. Every
//! other event is informational and always lets the host proceed.

#![deny(unsafe_code)]

pub mod engine;
pub mod errors;
pub mod handler;
pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod types;

pub use engine::HookEngine;
pub use errors::{HookError, Result};
pub use handler::HookHandler;
pub use handlers::{ContinuityLaunch, Services, default_engine, default_registry};
pub use protocol::{EXIT_ASK, EXIT_BLOCK, EXIT_PROCEED, HookResponse, dispatch, input_failure};
pub use registry::HookRegistry;
pub use types::{HookAction, HookContext, HookInfo, HookInput, HookResult, HookType};
