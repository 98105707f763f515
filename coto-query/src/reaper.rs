//! Background eviction of idle connections.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::client::DatabaseClient;
use crate::pool::ConnectionPool;

/// Periodically reaps idle connections from a pool.
pub struct IdleReaper;

impl IdleReaper {
    /// Spawn the reaper on the current tokio runtime.
    ///
    /// Every `interval`, connections unused for longer than `max_idle` are
    /// closed. The first run happens one full interval after spawning.
    pub fn spawn<C: DatabaseClient>(
        pool: ConnectionPool<C>,
        interval: Duration,
        max_idle: Duration,
    ) -> ReaperHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let reaped = pool.reap_idle(max_idle).await;
                        debug!(reaped, remaining = pool.len(), "idle reaper pass");
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("idle reaper stopped");
        });

        info!(
            interval_ms = interval.as_millis() as u64,
            max_idle_ms = max_idle.as_millis() as u64,
            "idle reaper started"
        );

        ReaperHandle {
            stop: stop_tx,
            task,
        }
    }
}

/// Handle to a running [`IdleReaper`].
pub struct ReaperHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Whether the reaper task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the reaper and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(err) = self.task.await {
            warn!(error = %err, "idle reaper task failed");
        }
    }
}
