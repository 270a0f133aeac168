//! Background removal of idle keys.
//!
//! Keys are never deleted by [`SlidingWindowLimiter::check`]; a client that
//! goes quiet leaves an empty log behind. The sweeper periodically drops those
//! entries so that key cardinality tracks recent activity.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::limiter::SlidingWindowLimiter;
use super::store::LogStore;

/// Periodic sweeper for a [`SlidingWindowLimiter`].
pub struct Sweeper;

impl Sweeper {
    /// Spawn a sweeper task on the current tokio runtime.
    ///
    /// The task sweeps once per `interval` until [`SweeperHandle::shutdown`]
    /// is called or the handle is dropped.
    pub fn spawn<S>(limiter: Arc<SlidingWindowLimiter<S>>, interval: Duration) -> SweeperHandle
    where
        S: LogStore + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        info!(
            interval_secs = interval.as_secs_f64(),
            "Starting idle key sweeper"
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        limiter.sweep(Instant::now());
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            debug!("Idle key sweeper stopped");
        });

        SweeperHandle {
            shutdown_tx,
            task: Some(task),
        }
    }
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for the task to finish.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
