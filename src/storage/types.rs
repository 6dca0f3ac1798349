use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::management::types::SessionRecord;

/// Cumulative byte counters of one subject at one instant.
///
/// Samples are append-only facts: once written they are never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficSample {
    /// Expected to match a registered user name; not enforced on write.
    pub subject_name: String,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub captured_at: DateTime<Utc>,
}

impl TrafficSample {
    /// Samples `record` now.
    pub fn capture(record: &SessionRecord) -> Self {
        Self {
            subject_name: record.name.clone(),
            bytes_received: record.bytes_received,
            bytes_sent: record.bytes_sent,
            captured_at: Utc::now(),
        }
    }
}
