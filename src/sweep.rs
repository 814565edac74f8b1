//! Periodic garbage collection of expired window state.
//!
//! Each registered limiter gets a `cleanup` call on every tick. The task is
//! owned rather than free-running: it is constructed and started explicitly
//! and stopped deterministically through its handle, so tests never leave a
//! timer behind.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::ratelimit::FixedWindowLimiter;

/// Builder for the background sweep task.
pub struct Sweeper {
    /// Time between sweep passes
    period: Duration,
    /// Limiters swept on every tick
    limiters: Vec<Arc<FixedWindowLimiter>>,
}

impl Sweeper {
    /// Create a sweeper that fires every `period`.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            limiters: Vec::new(),
        }
    }

    /// Register a limiter to be swept on every tick.
    pub fn register(mut self, limiter: Arc<FixedWindowLimiter>) -> Self {
        self.limiters.push(limiter);
        self
    }

    /// Spawn the sweep task.
    ///
    /// The task runs until the returned handle is shut down. Ticks invoke
    /// `cleanup` on all registered limiters, in registration order,
    /// unconditionally.
    pub fn spawn(self) -> SweeperHandle {
        let Sweeper { period, limiters } = self;
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        info!(
            period_ms = period.as_millis() as u64,
            limiters = limiters.len(),
            "Starting rate limit sweeper"
        );

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // A tokio interval yields immediately; consume that tick so the
            // first sweep only runs after a full period has elapsed.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        for limiter in &limiters {
                            limiter.cleanup();
                        }
                        debug!(limiters = limiters.len(), "Sweep pass complete");
                    }
                    _ = shutdown_rx.changed() => {
                        info!("Rate limit sweeper stopped");
                        break;
                    }
                }
            }
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle controlling a running sweep task.
pub struct SweeperHandle {
    /// Shutdown signal for the task
    shutdown: watch::Sender<bool>,
    /// The spawned task itself
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweep task and wait for it to finish.
    pub async fn shutdown(self) {
        // The receiver lives inside the task; if the send fails the task is
        // already gone and the join below settles it.
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
