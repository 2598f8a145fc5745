use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::{services::catalog::CatalogClient, store::ProfileStore};

pub mod ratings;
pub mod scheduler;
pub mod users;

pub use scheduler::SyncScheduler;

/// Aggregate result of one full reconciliation pass
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub success: bool,
    /// User upsert operations attempted
    pub users: u64,
    /// Per-user rating merges attempted
    pub ratings: u64,
    /// First fatal error, when the pass aborted early
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs user and rating reconciliation as one unit of work.
///
/// Users are reconciled first: ratings reference users by external key, so
/// running the phases in this order within a pass minimizes deferred merges.
pub struct SyncEngine {
    store: Arc<dyn ProfileStore>,
    catalog: Arc<dyn CatalogClient>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn ProfileStore>, catalog: Arc<dyn CatalogClient>) -> Self {
        Self { store, catalog }
    }

    /// One full sync: `sync_users` to completion, then `sync_ratings`.
    ///
    /// A fatal error in either phase (a snapshot that cannot be fetched at
    /// all) ends the pass and is carried in the report; per-record failures
    /// inside a phase are already aggregated there and do not abort.
    pub async fn full_sync(&self) -> SyncReport {
        let start = Instant::now();

        let users = match users::sync_users(self.catalog.as_ref(), self.store.as_ref()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Full sync aborted in user phase");
                return SyncReport {
                    success: false,
                    users: 0,
                    ratings: 0,
                    error: Some(e.to_string()),
                };
            }
        };

        let ratings = match ratings::sync_ratings(self.catalog.as_ref(), self.store.as_ref()).await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Full sync aborted in rating phase");
                return SyncReport {
                    success: false,
                    users: users.attempted,
                    ratings: 0,
                    error: Some(e.to_string()),
                };
            }
        };

        tracing::info!(
            users = users.attempted,
            ratings = ratings.merges,
            deferred = ratings.deferred,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Full sync completed"
        );

        SyncReport {
            success: true,
            users: users.attempted,
            ratings: ratings.merges,
            error: None,
        }
    }
}
