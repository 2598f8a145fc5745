use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::{AppError, AppResult};

use super::{SyncEngine, SyncReport};

/// Owns the sync lifecycle: the startup pass, the recurring timer, and the
/// manual trigger, with at most one reconciliation pass in flight at a time.
///
/// The guard is a mutex acquired with `try_lock`: a trigger arriving while a
/// pass runs is rejected with [`AppError::SyncInProgress`] rather than queued,
/// and the timer simply skips that tick. Retry comes from the next trigger.
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    interval: Duration,
    guard: Mutex<()>,
    shutdown: watch::Sender<bool>,
}

impl SyncScheduler {
    pub fn new(engine: Arc<SyncEngine>, interval: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            engine,
            interval,
            guard: Mutex::new(()),
            shutdown,
        }
    }

    /// Runs a full sync now unless one is already in flight
    pub async fn trigger_now(&self) -> AppResult<SyncReport> {
        self.run("manual").await
    }

    async fn run(&self, trigger: &'static str) -> AppResult<SyncReport> {
        let _guard = self.guard.try_lock().map_err(|_| AppError::SyncInProgress)?;

        tracing::info!(trigger, "Starting full sync");
        let report = self.engine.full_sync().await;

        if report.success {
            tracing::info!(trigger, users = report.users, ratings = report.ratings, "Full sync succeeded");
        } else {
            tracing::error!(
                trigger,
                error = report.error.as_deref().unwrap_or("unknown"),
                "Full sync failed; next trigger will retry"
            );
        }

        Ok(report)
    }

    /// Spawns the background loop: one immediate startup pass, then one pass
    /// per interval until [`stop`](Self::stop) is called.
    ///
    /// A failed pass does not disturb the schedule; the loop just waits for
    /// the next tick.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let scheduler = self;
        let mut shutdown = scheduler.shutdown.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // The first tick resolves immediately and doubles as the startup
            // sync; later ticks are the recurring schedule.
            let mut trigger = "startup";
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match scheduler.run(trigger).await {
                            Ok(_) => {}
                            Err(AppError::SyncInProgress) => {
                                tracing::warn!(trigger, "Skipping scheduled sync: previous pass still running");
                            }
                            Err(e) => {
                                tracing::error!(trigger, error = %e, "Scheduled sync failed to start");
                            }
                        }
                        trigger = "interval";
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Sync scheduler stopping");
                        break;
                    }
                }
            }
        })
    }

    /// Signals the background loop to exit after its current iteration
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }
}
