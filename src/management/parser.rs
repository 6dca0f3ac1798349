//! Status reply parsing.
//!
//! Turns the text of a `status` reply into [`SessionRecord`]s. The daemon's output is
//! not under our control, so parsing degrades by omission: a line that does not look
//! like a well-formed client entry is skipped and the rest of the reply is still used.

use log::trace;

use super::types::{SessionRecord, CLIENT_LIST_TOKEN};

/// Extracts every well-formed `CLIENT_LIST` entry from `raw`, in input order.
///
/// Never fails. Empty input, garbage and replies missing their `END` line all yield
/// whatever complete entries could be found.
pub fn parse_status(raw: &str) -> Vec<SessionRecord> {
    raw.lines().filter_map(parse_client_line).collect()
}

fn parse_client_line(line: &str) -> Option<SessionRecord> {
    if !line.starts_with(CLIENT_LIST_TOKEN) {
        return None;
    }
    // The first field is the token itself, whatever follows it.
    let mut fields = line.split(',').skip(1);

    let name = fields.next()?;
    let real_address = fields.next()?;
    let virtual_address = fields.next()?;
    let bytes_received = fields.next()?.trim().parse::<u64>();
    let bytes_sent = fields.next()?.trim().parse::<u64>();

    match (bytes_received, bytes_sent) {
        (Ok(bytes_received), Ok(bytes_sent)) => Some(SessionRecord {
            name: name.to_string(),
            real_address: real_address.to_string(),
            virtual_address: virtual_address.to_string(),
            bytes_received,
            bytes_sent,
        }),
        _ => {
            trace!("skipping client line with non-numeric counters: {}", line);
            None
        }
    }
}
