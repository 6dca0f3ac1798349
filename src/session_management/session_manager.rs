use crate::data_capture::recorder::Recorder;
use crate::data_capture::types::CycleReport;
use crate::error_handling::types::SessionError;
use crate::management::parser::parse_status;
use crate::management::transport::CommandChannel;
use crate::management::types::{kill_command, SessionRecord, STATUS_COMMAND};
use crate::storage::storage_trait::Storage;
use crate::storage::types::TrafficSample;
use log::{debug, info};
use std::sync::Arc;

/// Number of samples `history` returns when the caller does not ask for a limit.
pub const DEFAULT_HISTORY_LIMIT: u64 = 50;

/// The structure related to session management
///
/// Front door for everything a caller can ask about the daemon's sessions. It shares
/// the management channel and the store with the background recorder, so foreground
/// calls and recording cycles are serialized by the same transport gate.
///
/// # Fields Overview
///
/// - `channel`: the management interface of the daemon
/// - `storage`: where traffic samples and registered users live
/// - `recorder`: the recorder used for on-demand cycles
pub struct SessionManager {
    channel: Arc<dyn CommandChannel>,
    storage: Arc<dyn Storage>,
    recorder: Arc<Recorder>,
}

impl SessionManager {
    pub fn new(
        channel: Arc<dyn CommandChannel>,
        storage: Arc<dyn Storage>,
        recorder: Arc<Recorder>,
    ) -> Self {
        Self {
            channel,
            storage,
            recorder,
        }
    }

    /// Sessions the daemon currently reports.
    pub async fn get_status(&self) -> Result<Vec<SessionRecord>, SessionError> {
        let raw = self.channel.execute(STATUS_COMMAND).await?;
        let sessions = parse_status(&raw);
        debug!("daemon reports {} active session(s)", sessions.len());
        Ok(sessions)
    }

    /// Asks the daemon to disconnect `session_name` and returns its reply verbatim.
    ///
    /// The reply is not interpreted: a name the daemon does not know still yields
    /// `Ok` with the daemon's `ERROR:` line. Confirm with a later [`Self::get_status`].
    pub async fn kill(&self, session_name: &str) -> Result<String, SessionError> {
        if session_name.is_empty() || session_name.contains(['\r', '\n']) {
            return Err(SessionError::InvalidName(session_name.to_string()));
        }
        info!("requesting disconnect of {}", session_name);
        let reply = self.channel.execute(&kill_command(session_name)).await?;
        Ok(reply)
    }

    /// At most `limit` samples of `subject_name`, newest first.
    pub async fn history(
        &self,
        subject_name: &str,
        limit: u64,
    ) -> Result<Vec<TrafficSample>, SessionError> {
        if limit == 0 {
            return Err(SessionError::InvalidLimit(limit));
        }
        let samples = self.storage.query_traffic(subject_name, limit).await?;
        Ok(samples)
    }

    pub async fn is_registered(&self, name: &str) -> Result<bool, SessionError> {
        Ok(self.storage.user_exists(name).await?)
    }

    /// Runs one recording cycle right away, outside the schedule.
    ///
    /// Refused with [`SessionError::CycleInProgress`] while any cycle is running.
    pub async fn record_now(&self) -> Result<CycleReport, SessionError> {
        let report = self.recorder.run_cycle().await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::types::{StorageError, TransportError};
    use crate::testing::{MemStorage, ScriptedChannel};
    use chrono::{Duration as ChronoDuration, Utc};

    const TWO_CLIENTS: &str = "OpenVPN CLIENT LIST\n\
                               CLIENT_LIST,alice,1.2.3.4:5000,10.8.0.2,100,200\n\
                               CLIENT_LIST,bob,1.2.3.5:5001,10.8.0.3,300,400\n\
                               END\n";

    fn manager(channel: Arc<ScriptedChannel>, storage: Arc<MemStorage>) -> SessionManager {
        let recorder = Arc::new(Recorder::new(channel.clone(), storage.clone()));
        SessionManager::new(channel, storage, recorder)
    }

    fn sample(name: &str, bytes: u64, seconds_ago: i64) -> TrafficSample {
        TrafficSample {
            subject_name: name.to_string(),
            bytes_received: bytes,
            bytes_sent: bytes,
            captured_at: Utc::now() - ChronoDuration::seconds(seconds_ago),
        }
    }

    #[tokio::test]
    async fn status_parses_the_daemon_reply() {
        let channel = Arc::new(ScriptedChannel::replying(TWO_CLIENTS));
        let manager = manager(channel.clone(), Arc::new(MemStorage::default()));

        let sessions = manager.get_status().await.unwrap();

        assert_eq!(channel.commands(), vec!["status".to_string()]);
        let names: Vec<_> = sessions.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["alice", "bob"]);
        assert_eq!(sessions[1].bytes_sent, 400);
    }

    #[tokio::test]
    async fn status_surfaces_transport_errors() {
        let channel = Arc::new(ScriptedChannel::failing(|| {
            TransportError::Timeout(std::time::Duration::from_secs(5))
        }));
        let manager = manager(channel, Arc::new(MemStorage::default()));

        let err = manager.get_status().await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(TransportError::Timeout(_))));
    }

    #[tokio::test]
    async fn kill_returns_the_reply_verbatim() {
        let channel = Arc::new(ScriptedChannel::responding(|command| {
            format!("SUCCESS: common name '{}' found, 1 client(s) killed\r\n", &command[10..])
        }));
        let manager = manager(channel.clone(), Arc::new(MemStorage::default()));

        let reply = manager.kill("alice").await.unwrap();

        assert_eq!(channel.commands(), vec!["kill name alice".to_string()]);
        assert_eq!(reply, "SUCCESS: common name 'alice' found, 1 client(s) killed\r\n");
    }

    #[tokio::test]
    async fn kill_of_unknown_name_is_not_an_error() {
        let channel = Arc::new(ScriptedChannel::replying(
            "ERROR: common name 'ghost' not found\r\n",
        ));
        let manager = manager(channel, Arc::new(MemStorage::default()));

        let reply = manager.kill("ghost").await.unwrap();
        assert!(reply.starts_with("ERROR:"));
    }

    #[tokio::test]
    async fn kill_rejects_names_that_break_framing() {
        let channel = Arc::new(ScriptedChannel::replying("SUCCESS: ok\r\n"));
        let manager = manager(channel.clone(), Arc::new(MemStorage::default()));

        for bad in ["", "alice\nstatus", "bob\r"] {
            let err = manager.kill(bad).await.unwrap_err();
            assert!(matches!(err, SessionError::InvalidName(_)), "{:?}", bad);
        }
        assert_eq!(channel.calls(), 0);
    }

    #[tokio::test]
    async fn history_is_newest_first_and_bounded() {
        let storage = Arc::new(MemStorage::default());
        for (bytes, ago) in [(1, 30), (2, 20), (3, 10)] {
            storage.insert_traffic_sample(&sample("alice", bytes, ago)).await.unwrap();
        }
        storage.insert_traffic_sample(&sample("bob", 9, 5)).await.unwrap();
        let manager = manager(Arc::new(ScriptedChannel::replying("END\n")), storage);

        let history = manager.history("alice", 2).await.unwrap();

        let bytes: Vec<_> = history.iter().map(|s| s.bytes_received).collect();
        assert_eq!(bytes, [3, 2]);
    }

    #[tokio::test]
    async fn history_rejects_a_zero_limit() {
        let manager = manager(
            Arc::new(ScriptedChannel::replying("END\n")),
            Arc::new(MemStorage::default()),
        );
        let err = manager.history("alice", 0).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidLimit(0)));
    }

    #[tokio::test]
    async fn record_now_stores_one_sample_per_session() {
        let storage = Arc::new(MemStorage::failing_on_write(1));
        let manager = manager(Arc::new(ScriptedChannel::replying(TWO_CLIENTS)), storage.clone());

        let report = manager.record_now().await.unwrap();

        assert_eq!(report.sessions, 2);
        assert_eq!(report.written, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(storage.samples()[0].subject_name, "bob");
    }

    #[tokio::test]
    async fn record_now_reports_transport_failure() {
        let manager = manager(
            Arc::new(ScriptedChannel::failing(|| TransportError::Closed)),
            Arc::new(MemStorage::default()),
        );
        let err = manager.record_now().await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(TransportError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn record_now_is_refused_during_a_scheduled_cycle() {
        use crate::data_capture::scheduler::Scheduler;
        use std::time::Duration;

        let channel = Arc::new(ScriptedChannel::replying(TWO_CLIENTS).with_delay(Duration::from_secs(30)));
        let storage = Arc::new(MemStorage::default());
        let recorder = Arc::new(Recorder::new(channel.clone(), storage.clone()));
        let manager = SessionManager::new(channel.clone(), storage.clone(), recorder.clone());
        let mut scheduler = Scheduler::new(recorder, Duration::from_secs(60));

        scheduler.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let err = manager.record_now().await.unwrap_err();
        assert!(matches!(err, SessionError::CycleInProgress));

        tokio::time::sleep(Duration::from_secs(34)).await;
        scheduler.stop().await;

        assert_eq!(channel.max_concurrent(), 1);
        assert_eq!(channel.calls(), 1);
        assert_eq!(storage.samples().len(), 2);
    }

    #[tokio::test]
    async fn registration_is_read_from_storage() {
        let storage = Arc::new(MemStorage::with_users(&["alice"]));
        let manager = manager(Arc::new(ScriptedChannel::replying("END\n")), storage);

        assert!(manager.is_registered("alice").await.unwrap());
        assert!(!manager.is_registered("mallory").await.unwrap());
    }

    #[test]
    fn storage_errors_convert_into_session_errors() {
        let err: SessionError = StorageError::ReadFailed.into();
        assert!(matches!(err, SessionError::StorageError(StorageError::ReadFailed)));
    }
}
