use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::management::types::SessionRecord;
use crate::storage::types::TrafficSample;

/// API error payload
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
}

/// One live session, in the field names the HTTP API has always used.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub name: String,
    pub real_ip: String,
    pub virt_ip: String,
    pub bytes_recv: u64,
    pub bytes_sent: u64,
}

impl From<&SessionRecord> for SessionResponse {
    fn from(record: &SessionRecord) -> Self {
        Self {
            name: record.name.clone(),
            real_ip: record.real_address.clone(),
            virt_ip: record.virtual_address.clone(),
            bytes_recv: record.bytes_received,
            bytes_sent: record.bytes_sent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryEntryResponse {
    pub timestamp: String, // ISO8601, UTC
    pub bytes_recv: u64,
    pub bytes_sent: u64,
}

impl From<&TrafficSample> for HistoryEntryResponse {
    fn from(sample: &TrafficSample) -> Self {
        Self {
            timestamp: sample
                .captured_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
            bytes_recv: sample.bytes_received,
            bytes_sent: sample.bytes_sent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u64>,
}
