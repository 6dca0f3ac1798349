//! Session management core module.
//!
//! This module provides the control facade over the VPN daemon: live session
//! status, disconnecting a client, on-demand recording and reading back the
//! recorded traffic history.

/// Submodule for session manager implementation.
pub mod session_manager;

pub use session_manager::{SessionManager, DEFAULT_HISTORY_LIMIT};
