// src/scheduler.rs

//! Background scheduler and lifecycle controller.
//!
//! Holds a single daily timer entry and a polling loop that wakes at a
//! fixed short interval, checks the wall clock, and runs the cycle when the
//! timer is due. The loop is deliberately poll-based rather than cron-like:
//! reaction latency is bounded by the poll interval, and a stop request is
//! observed between polls.
//!
//! The daily time is read from the env file at `start()` only; editing it
//! while the scheduler is Running takes effect after a stop and restart.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::pipeline::Watcher;

/// Result of a `start()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Loop spawned; daily check armed for this time.
    Started { at: NaiveTime },
    /// A loop is already running; nothing was changed.
    AlreadyRunning,
}

/// Result of a `stop()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Loop signalled and joined; any in-flight cycle ran to completion.
    Stopped,
    /// No loop was running.
    NotRunning,
}

/// Single-entry daily timer.
///
/// Arms for the next occurrence of the configured time: later today if
/// still ahead of the clock, otherwise tomorrow.
#[derive(Debug)]
struct DailyTimer {
    next_due: NaiveDateTime,
}

impl DailyTimer {
    fn new(at: NaiveTime, now: NaiveDateTime) -> Self {
        Self {
            next_due: next_occurrence(now, at),
        }
    }

    /// Fire at most once per due instant, then re-arm for the next day.
    fn fire_if_due(&mut self, now: NaiveDateTime) -> bool {
        if now >= self.next_due {
            self.next_due += chrono::Duration::days(1);
            true
        } else {
            false
        }
    }
}

fn next_occurrence(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if now < today {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// Owns the background loop. Stopped ↔ Running, at most one loop at a time.
pub struct Scheduler {
    watcher: Arc<Watcher>,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
    handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler over the given watcher.
    pub fn new(watcher: Arc<Watcher>, poll_interval: Duration) -> Self {
        Self {
            watcher,
            poll_interval,
            running: Arc::new(AtomicBool::new(false)),
            handle: tokio::sync::Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stopped → Running. Reads the daily time fresh, replaces the timer
    /// entry, and spawns the polling loop.
    ///
    /// Returns `AlreadyRunning` without side effects when a loop exists;
    /// the Running claim is an atomic swap, so two concurrent starts cannot
    /// both spawn. An unparseable daily time aborts the start and returns
    /// the scheduler to Stopped.
    pub async fn start(&self) -> Result<StartOutcome> {
        if self.running.swap(true, Ordering::SeqCst) {
            log::info!("Scheduler already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let at = match self.watcher.channel_config().daily_time() {
            Ok(at) => at,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let mut timer = DailyTimer::new(at, Local::now().naive_local());
        let running = Arc::clone(&self.running);
        let watcher = Arc::clone(&self.watcher);
        let poll_interval = self.poll_interval;

        let task = tokio::spawn(async move {
            log::info!("Scheduled daily check at {}", at.format("%H:%M"));
            while running.load(Ordering::SeqCst) {
                if timer.fire_if_due(Local::now().naive_local()) {
                    // A cycle never panics the loop; all failures are
                    // outcome variants.
                    let outcome = watcher.run_cycle().await;
                    log::info!("Scheduled cycle finished: {:?}", outcome);
                }
                tokio::time::sleep(poll_interval).await;
            }
            log::info!("Scheduler loop exited");
        });

        // Single timer entry: any previous (already-joined) handle is
        // discarded when the new loop is registered.
        *self.handle.lock().await = Some(task);

        Ok(StartOutcome::Started { at })
    }

    /// Running → Stopped. Cooperative: signals the loop and waits for it to
    /// observe the flag; an in-flight cycle runs to completion first.
    pub async fn stop(&self) -> StopOutcome {
        if !self.running.swap(false, Ordering::SeqCst) {
            log::info!("Scheduler not running");
            return StopOutcome::NotRunning;
        }

        if let Some(task) = self.handle.lock().await.take() {
            if let Err(e) = task.await {
                log::error!("Scheduler loop join failed: {}", e);
            }
        }
        StopOutcome::Stopped
    }
}
