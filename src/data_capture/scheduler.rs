//! Fixed-rate background driver for the [`Recorder`].
//!
//! A [`Scheduler`] owns one tokio task that ticks every `period` and starts a
//! recording cycle on each tick. Ticks are fixed-rate with no catch-up: a tick that
//! fires while a cycle is still running, scheduled or started on demand, is dropped
//! (and counted), so at most one cycle is ever in flight. A failed cycle is logged and the schedule simply
//! continues with the next tick.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use std::time::Duration;
//! # use vpnwatch::data_capture::{Recorder, Scheduler};
//! # async fn run(recorder: Arc<Recorder>) {
//! let mut scheduler = Scheduler::new(recorder, Duration::from_secs(60));
//! scheduler.start();
//! // ... serve requests ...
//! scheduler.stop().await;
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::recorder::Recorder;

pub struct Scheduler {
    recorder: Arc<Recorder>,
    period: Duration,
    started_cycles: Arc<AtomicU64>,
    skipped_ticks: Arc<AtomicU64>,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(recorder: Arc<Recorder>, period: Duration) -> Self {
        Self {
            recorder,
            period,
            started_cycles: Arc::new(AtomicU64::new(0)),
            skipped_ticks: Arc::new(AtomicU64::new(0)),
            shutdown: None,
            task: None,
        }
    }

    /// Spawns the ticking task. The first cycle starts immediately.
    ///
    /// Does nothing if the scheduler is already running.
    pub fn start(&mut self) {
        if self.is_running() {
            warn!("scheduler already running, ignoring start");
            return;
        }

        let (tx, rx) = watch::channel(false);
        let ticker = Ticker {
            recorder: Arc::clone(&self.recorder),
            period: self.period,
            started_cycles: Arc::clone(&self.started_cycles),
            skipped_ticks: Arc::clone(&self.skipped_ticks),
        };
        self.shutdown = Some(tx);
        self.task = Some(tokio::spawn(ticker.run(rx)));
        info!("recording scheduler started, period {:?}", self.period);
    }

    /// Stops ticking and aborts a cycle that is still running.
    ///
    /// Samples the aborted cycle already stored are kept; its socket is closed as the
    /// cycle is dropped.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("scheduler task ended abnormally: {}", e);
            }
            info!("recording scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn started_cycles(&self) -> u64 {
        self.started_cycles.load(Ordering::Acquire)
    }

    /// Ticks dropped because a cycle was still in flight.
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks.load(Ordering::Acquire)
    }
}

/// State moved into the ticking task.
struct Ticker {
    recorder: Arc<Recorder>,
    period: Duration,
    started_cycles: Arc<AtomicU64>,
    skipped_ticks: Arc<AtomicU64>,
}

impl Ticker {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycle: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Some(handle) = self.spawn_cycle() {
                        cycle = Some(handle);
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        if let Some(handle) = cycle {
            if !handle.is_finished() {
                debug!("aborting in-flight recording cycle");
                handle.abort();
            }
            let _ = handle.await;
        }
    }

    fn spawn_cycle(&self) -> Option<JoinHandle<()>> {
        // Claimed before spawning so an abort before the first poll still frees it.
        let Some(guard) = self.recorder.try_begin() else {
            let skipped = self.skipped_ticks.fetch_add(1, Ordering::AcqRel) + 1;
            debug!("a cycle is still running, skipping tick ({} skipped)", skipped);
            return None;
        };
        self.started_cycles.fetch_add(1, Ordering::AcqRel);

        let recorder = Arc::clone(&self.recorder);
        Some(tokio::spawn(async move {
            if let Err(e) = recorder.run_claimed(guard).await {
                warn!("recording cycle skipped: {}", e);
            }
        }))
    }
}
