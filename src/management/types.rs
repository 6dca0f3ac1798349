//! Types shared by the management-interface client and its callers.

use serde::Serialize;

/// Command asking the daemon for its connected-client list.
pub const STATUS_COMMAND: &str = "status";

/// Leading field of a connected-client line in a status reply.
pub const CLIENT_LIST_TOKEN: &str = "CLIENT_LIST";

/// Line that terminates a multi-line reply.
pub const END_SENTINEL: &str = "END";

/// Prefixes of the daemon's single-line replies, which carry no `END` line.
pub const SINGLE_LINE_REPLY_PREFIXES: [&str; 2] = ["SUCCESS:", "ERROR:"];

/// Prefix of unsolicited real-time messages, the connect banner included.
pub const NOTIFICATION_PREFIX: char = '>';

/// One connected client as reported by a single status poll.
///
/// Counters are cumulative since the client connected. The name is whatever the
/// daemon reports and is not unique across reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub name: String,
    pub real_address: String,
    pub virtual_address: String,
    pub bytes_received: u64,
    pub bytes_sent: u64,
}

/// Builds the command that disconnects the client registered under `name`.
pub fn kill_command(name: &str) -> String {
    format!("kill name {}", name)
}
