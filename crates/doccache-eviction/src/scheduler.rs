//! Background cleanup scheduling

use crate::controller::EvictionController;
use doccache_backend::CacheBackend;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Lifecycle of the cleanup task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerStatus {
    /// Between cycles, waiting for the next tick
    Idle,
    /// Currently running a cleanup cycle
    Running,
    /// Torn down; no further cycles will run
    Stopped,
}

/// Periodically drives an `EvictionController` over one backend.
///
/// Owned by the backend's creator and stopped through an explicit lifecycle
/// call; no cycle touches backend state after `stop` returns. A cycle that
/// fails is logged and the task continues.
pub struct CleanupScheduler {
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
    status: Arc<RwLock<SchedulerStatus>>,
}

impl CleanupScheduler {
    /// Spawn the periodic cleanup task. Must be called within a tokio
    /// runtime. `period` must be non-zero; a configuration without
    /// background cleanup simply never constructs a scheduler.
    pub fn start(
        backend: Arc<dyn CacheBackend>,
        controller: EvictionController,
        period: Duration,
    ) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let status = Arc::new(RwLock::new(SchedulerStatus::Idle));
        let task_status = Arc::clone(&status);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::debug!(
                collection = backend.collection_name(),
                period_ms = period.as_millis() as u64,
                "cleanup scheduler started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        *task_status.write() = SchedulerStatus::Running;
                        match controller.run_cleanup_once(backend.as_ref()).await {
                            Ok(report) if report.expired + report.evicted > 0 => {
                                tracing::debug!(
                                    collection = backend.collection_name(),
                                    expired = report.expired,
                                    evicted = report.evicted,
                                    "cleanup cycle reclaimed entries"
                                );
                            }
                            Ok(_) => {}
                            Err(err) => {
                                tracing::warn!(
                                    collection = backend.collection_name(),
                                    error = %err,
                                    "cleanup cycle failed, will retry next tick"
                                );
                            }
                        }
                        *task_status.write() = SchedulerStatus::Idle;
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }

            *task_status.write() = SchedulerStatus::Stopped;
            tracing::debug!(
                collection = backend.collection_name(),
                "cleanup scheduler stopped"
            );
        });

        Self {
            shutdown,
            handle: Mutex::new(Some(handle)),
            status,
        }
    }

    /// Current task status
    pub fn status(&self) -> SchedulerStatus {
        *self.status.read()
    }

    /// Stop the task and wait for the in-flight cycle, if any, to finish.
    /// Idempotent.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for CleanupScheduler {
    fn drop(&mut self) {
        // Signal the task even if stop was never awaited.
        let _ = self.shutdown.send(true);
    }
}
