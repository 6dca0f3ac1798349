//! Client side of the VPN daemon's management interface.
//!
//! - `transport`: one short-lived TCP exchange per command, serialized per daemon.
//! - `parser`: pure conversion of a `status` reply into session records.
//! - `types`: session records and the protocol's fixed tokens.

pub mod parser;
pub mod transport;
pub mod types;

pub use parser::parse_status;
pub use transport::{CommandChannel, ManagementTransport};
pub use types::SessionRecord;
