//! Traffic recording for one poll of the management interface.
//!
//! [`Recorder`] asks the daemon for its client list, parses it and appends one
//! [`TrafficSample`] per reported session through the injected [`Storage`].
//!
//! Highlights
//! - Only a failed poll fails the cycle; a sample the store refuses is logged,
//!   counted and skipped so the rest of the cycle is kept
//! - Each sample is stamped just before its own write, not once per batch
//! - Samples are written one by one; a cycle cancelled midway keeps what it wrote
//! - Log lines of one cycle share a correlation id
//! - At most one cycle runs at a time, whoever starts it; a second request while one
//!   is in flight is refused with [`RecorderError::CycleInProgress`]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use uuid::Uuid;

use super::types::CycleReport;
use crate::error_handling::types::RecorderError;
use crate::management::parser::parse_status;
use crate::management::transport::CommandChannel;
use crate::management::types::STATUS_COMMAND;
use crate::storage::storage_trait::Storage;
use crate::storage::types::TrafficSample;

pub struct Recorder {
    channel: Arc<dyn CommandChannel>,
    storage: Arc<dyn Storage>,
    in_flight: Arc<AtomicBool>,
}

/// Marks a cycle as running. Dropping it, abort included, frees the recorder.
pub struct CycleGuard(Arc<AtomicBool>);

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Recorder {
    pub fn new(channel: Arc<dyn CommandChannel>, storage: Arc<dyn Storage>) -> Self {
        Self {
            channel,
            storage,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claims the recorder for one cycle, or `None` while another cycle runs.
    pub fn try_begin(&self) -> Option<CycleGuard> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(CycleGuard(Arc::clone(&self.in_flight)))
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Polls the daemon once and persists a sample per active session.
    ///
    /// Errors
    /// - Returns [`RecorderError::CycleInProgress`] when another cycle is running.
    /// - Returns [`RecorderError::Transport`] when the daemon could not be polled.
    ///   Storage failures never fail the cycle; they show up in
    ///   [`CycleReport::failed`].
    pub async fn run_cycle(&self) -> Result<CycleReport, RecorderError> {
        let guard = self.try_begin().ok_or_else(|| {
            debug!("recording cycle requested while another is running");
            RecorderError::CycleInProgress
        })?;
        self.run_claimed(guard).await
    }

    /// Runs a cycle the caller already claimed through [`Self::try_begin`].
    pub async fn run_claimed(&self, _guard: CycleGuard) -> Result<CycleReport, RecorderError> {
        let cycle_id = Uuid::new_v4();
        debug!("[{}] recording cycle started", cycle_id);

        let raw = self.channel.execute(STATUS_COMMAND).await.map_err(|e| {
            warn!("[{}] status poll failed: {}", cycle_id, e);
            RecorderError::Transport(e)
        })?;
        let sessions = parse_status(&raw);

        let mut report = CycleReport {
            sessions: sessions.len(),
            ..Default::default()
        };
        for session in &sessions {
            let sample = TrafficSample::capture(session);
            match self.storage.insert_traffic_sample(&sample).await {
                Ok(()) => report.written += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        "[{}] could not store sample for {}: {}",
                        cycle_id, sample.subject_name, e
                    );
                }
            }
        }

        if report.is_partial() {
            warn!(
                "[{}] cycle finished with {} of {} sample(s) lost",
                cycle_id, report.failed, report.sessions
            );
        } else {
            info!(
                "[{}] recorded {} sample(s)",
                cycle_id, report.written
            );
        }
        Ok(report)
    }
}
