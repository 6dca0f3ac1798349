//! Test doubles shared by the unit tests: a loopback fake of the daemon's
//! management socket, a scripted [`CommandChannel`] and an in-memory [`Storage`].

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::configuration::types::ManagementConfig;
use crate::error_handling::types::{StorageError, TransportError};
use crate::management::transport::CommandChannel;
use crate::storage::storage_trait::Storage;
use crate::storage::types::TrafficSample;

/// How the fake daemon treats each accepted connection.
#[derive(Clone, Copy)]
pub(crate) enum DaemonBehaviour {
    /// Greets, reads one command line, waits `delay`, answers.
    Reply {
        banner: &'static str,
        reply: fn(&str) -> String,
        delay: Duration,
        close_after_reply: bool,
    },
    /// Accepts and never writes.
    Silent,
    /// Accepts and closes straight away.
    HangUp,
}

#[derive(Default)]
struct DaemonStats {
    commands: Mutex<Vec<String>>,
    connections: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    hang_ups: AtomicUsize,
}

pub(crate) struct FakeDaemon {
    addr: SocketAddr,
    stats: Arc<DaemonStats>,
    task: JoinHandle<()>,
}

impl FakeDaemon {
    pub(crate) async fn spawn(behaviour: DaemonBehaviour) -> Self {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stats = Arc::new(DaemonStats::default());

        let accept_stats = Arc::clone(&stats);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accept_stats.connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(stream, behaviour, Arc::clone(&accept_stats)));
            }
        });

        Self { addr, stats, task }
    }

    pub(crate) fn config(&self) -> ManagementConfig {
        ManagementConfig {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            timeout_seconds: 2.0,
            banner_wait_ms: 50,
        }
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.stats.commands.lock().unwrap().clone()
    }

    /// Most connections that were between accept and reply at the same time.
    pub(crate) fn max_active(&self) -> usize {
        self.stats.max_active.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait_for_connections(&self, n: usize) {
        wait_until(|| self.stats.connections.load(Ordering::SeqCst) >= n).await
    }

    pub(crate) async fn wait_for_hang_ups(&self, n: usize) {
        wait_until(|| self.stats.hang_ups.load(Ordering::SeqCst) >= n).await
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn wait_until(done: impl Fn() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("fake daemon condition not reached in time");
}

async fn serve(stream: TcpStream, behaviour: DaemonBehaviour, stats: Arc<DaemonStats>) {
    match behaviour {
        DaemonBehaviour::HangUp => drop(stream),
        DaemonBehaviour::Silent => {
            let mut stream = stream;
            let mut sink = Vec::new();
            let _ = stream.read_to_end(&mut sink).await;
            stats.hang_ups.fetch_add(1, Ordering::SeqCst);
        }
        DaemonBehaviour::Reply {
            banner,
            reply,
            delay,
            close_after_reply,
        } => {
            let active = stats.active.fetch_add(1, Ordering::SeqCst) + 1;
            stats.max_active.fetch_max(active, Ordering::SeqCst);

            let (reader, mut writer) = stream.into_split();
            let mut reader = BufReader::new(reader);
            let _ = writer.write_all(banner.as_bytes()).await;

            let mut line = String::new();
            let got = reader.read_line(&mut line).await.unwrap_or(0);
            let command = line.trim_end().to_string();
            if got > 0 {
                stats.commands.lock().unwrap().push(command.clone());
                tokio::time::sleep(delay).await;
            }
            stats.active.fetch_sub(1, Ordering::SeqCst);

            if got > 0 {
                let _ = writer.write_all(reply(&command).as_bytes()).await;
            }
            if !close_after_reply {
                let mut rest = Vec::new();
                let _ = reader.read_to_end(&mut rest).await;
            }
            stats.hang_ups.fetch_add(1, Ordering::SeqCst);
        }
    }
}

enum Outcome {
    Reply(String),
    Respond(fn(&str) -> String),
    Fail(fn() -> TransportError),
    Hang,
}

/// In-process [`CommandChannel`] with a fixed outcome and call accounting.
pub(crate) struct ScriptedChannel {
    outcome: Outcome,
    delay: Duration,
    commands: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_concurrent: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedChannel {
    fn with_outcome(outcome: Outcome) -> Self {
        Self {
            outcome,
            delay: Duration::ZERO,
            commands: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
        }
    }

    pub(crate) fn replying(reply: &str) -> Self {
        Self::with_outcome(Outcome::Reply(reply.to_string()))
    }

    pub(crate) fn responding(respond: fn(&str) -> String) -> Self {
        Self::with_outcome(Outcome::Respond(respond))
    }

    pub(crate) fn failing(make: fn() -> TransportError) -> Self {
        Self::with_outcome(Outcome::Fail(make))
    }

    pub(crate) fn hanging() -> Self {
        Self::with_outcome(Outcome::Hang)
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.commands.lock().unwrap().len()
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub(crate) fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandChannel for ScriptedChannel {
    async fn execute(&self, command: &str) -> Result<String, TransportError> {
        self.commands.lock().unwrap().push(command.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.outcome {
            Outcome::Reply(reply) => Ok(reply.clone()),
            Outcome::Respond(respond) => Ok(respond(command)),
            Outcome::Fail(make) => Err(make()),
            Outcome::Hang => std::future::pending().await,
        }
    }
}

/// In-memory [`Storage`] that can be told to refuse one particular write.
#[derive(Default)]
pub(crate) struct MemStorage {
    samples: Mutex<Vec<TrafficSample>>,
    users: Mutex<Vec<String>>,
    write_attempts: AtomicUsize,
    fail_on_write: Option<usize>,
}

impl MemStorage {
    /// Refuses the `n`th write attempt (1-based).
    pub(crate) fn failing_on_write(n: usize) -> Self {
        Self {
            fail_on_write: Some(n),
            ..Default::default()
        }
    }

    pub(crate) fn with_users(names: &[&str]) -> Self {
        let storage = Self::default();
        storage
            .users
            .lock()
            .unwrap()
            .extend(names.iter().map(|n| n.to_string()));
        storage
    }

    pub(crate) fn samples(&self) -> Vec<TrafficSample> {
        self.samples.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn insert_traffic_sample(&self, sample: &TrafficSample) -> Result<(), StorageError> {
        let attempt = self.write_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_write == Some(attempt) {
            return Err(StorageError::WriteFailed);
        }
        self.samples.lock().unwrap().push(sample.clone());
        Ok(())
    }

    async fn query_traffic(
        &self,
        subject_name: &str,
        limit: u64,
    ) -> Result<Vec<TrafficSample>, StorageError> {
        let mut rows: Vec<TrafficSample> = self
            .samples
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|s| s.subject_name == subject_name)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn user_exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.users.lock().unwrap().iter().any(|u| u == name))
    }
}
