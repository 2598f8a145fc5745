use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{valid_rating, FeedbackAck, FeedbackEvent, WatchlistEntry, RATING_MAX, RATING_MIN},
    movies::MovieCatalog,
    services::catalog::CatalogClient,
    store::{ProfileStore, UpsertOutcome},
};

/// Per-request dual-write path for user ratings.
///
/// A rating is recorded locally first, then forwarded to the remote service.
/// If the local write fails the remote is never called; if the remote call
/// fails afterwards the local write stays in place and the gap is healed by
/// the next full sync.
pub struct FeedbackCoordinator {
    store: Arc<dyn ProfileStore>,
    catalog: Arc<dyn CatalogClient>,
    movies: Arc<MovieCatalog>,
}

impl FeedbackCoordinator {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        catalog: Arc<dyn CatalogClient>,
        movies: Arc<MovieCatalog>,
    ) -> Self {
        Self {
            store,
            catalog,
            movies,
        }
    }

    /// Records that `external_id` rated `movie_id` with `rating`.
    ///
    /// Validation happens before any mutation; the watchlist write is a single
    /// targeted upsert, so a second rating for the same movie replaces the
    /// entry instead of duplicating it, and concurrent ratings for different
    /// movies on the same profile cannot clobber each other.
    pub async fn submit(
        &self,
        external_id: i64,
        movie_id: i64,
        rating: f64,
    ) -> AppResult<FeedbackAck> {
        if !valid_rating(rating) {
            return Err(AppError::InvalidInput(format!(
                "rating must be between {} and {}",
                RATING_MIN, RATING_MAX
            )));
        }

        if !self.movies.contains(movie_id) {
            return Err(AppError::InvalidInput(format!(
                "unknown movie id: {}",
                movie_id
            )));
        }

        let entry = WatchlistEntry {
            movie_id,
            rating,
            rated_at: Utc::now(),
        };

        match self.store.upsert_watchlist_entry(external_id, &entry).await? {
            UpsertOutcome::Applied => {}
            UpsertOutcome::ProfileMissing => {
                return Err(AppError::NotFound(format!(
                    "no profile for user {}",
                    external_id
                )));
            }
        }

        // Local write is committed at this point and is intentionally not
        // rolled back if the forward fails; the stores stay inconsistent
        // until the next reconciliation pass.
        let event = FeedbackEvent {
            user_id: external_id,
            item_id: movie_id,
            rating,
        };
        let ack = self.catalog.submit_feedback(&event).await?;

        tracing::info!(
            external_id,
            movie_id,
            rating,
            "Feedback recorded locally and forwarded"
        );

        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::MockCatalogClient;
    use crate::store::MockProfileStore;

    fn movies() -> Arc<MovieCatalog> {
        Arc::new(
            [(42, "Clerks (1994)".to_string()), (7, "Twelve Monkeys (1995)".to_string())]
                .into_iter()
                .collect(),
        )
    }

    fn coordinator(
        store: MockProfileStore,
        catalog: MockCatalogClient,
    ) -> FeedbackCoordinator {
        FeedbackCoordinator::new(Arc::new(store), Arc::new(catalog), movies())
    }

    #[tokio::test]
    async fn test_submit_happy_path_forwards_after_local_write() {
        let mut store = MockProfileStore::new();
        store
            .expect_upsert_watchlist_entry()
            .withf(|external_id, entry| {
                *external_id == 7 && entry.movie_id == 42 && entry.rating == 4.5
            })
            .times(1)
            .returning(|_, _| Ok(UpsertOutcome::Applied));

        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_submit_feedback()
            .withf(|event| {
                *event
                    == FeedbackEvent {
                        user_id: 7,
                        item_id: 42,
                        rating: 4.5,
                    }
            })
            .times(1)
            .returning(|_| {
                Ok(FeedbackAck {
                    status: "feedback recorded".to_string(),
                })
            });

        let ack = coordinator(store, catalog).submit(7, 42, 4.5).await.unwrap();
        assert_eq!(ack.status, "feedback recorded");
    }

    #[tokio::test]
    async fn test_submit_rejects_out_of_range_rating_before_any_mutation() {
        let mut store = MockProfileStore::new();
        store.expect_upsert_watchlist_entry().times(0);
        let mut catalog = MockCatalogClient::new();
        catalog.expect_submit_feedback().times(0);

        let result = coordinator(store, catalog).submit(7, 42, 5.5).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_submit_rejects_unknown_movie_before_any_mutation() {
        let mut store = MockProfileStore::new();
        store.expect_upsert_watchlist_entry().times(0);
        let mut catalog = MockCatalogClient::new();
        catalog.expect_submit_feedback().times(0);

        let result = coordinator(store, catalog).submit(7, 999, 4.0).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_submit_missing_profile_skips_remote_forward() {
        let mut store = MockProfileStore::new();
        store
            .expect_upsert_watchlist_entry()
            .times(1)
            .returning(|_, _| Ok(UpsertOutcome::ProfileMissing));

        let mut catalog = MockCatalogClient::new();
        catalog.expect_submit_feedback().times(0);

        let result = coordinator(store, catalog).submit(404, 42, 4.0).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_submit_local_failure_skips_remote_forward() {
        let mut store = MockProfileStore::new();
        store
            .expect_upsert_watchlist_entry()
            .times(1)
            .returning(|_, _| Err(AppError::Internal("write failed".to_string())));

        let mut catalog = MockCatalogClient::new();
        catalog.expect_submit_feedback().times(0);

        let result = coordinator(store, catalog).submit(7, 42, 4.0).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_submit_remote_failure_surfaces_without_rolling_back() {
        let mut store = MockProfileStore::new();
        // The local write happened; nothing here expects a compensating call.
        store
            .expect_upsert_watchlist_entry()
            .times(1)
            .returning(|_, _| Ok(UpsertOutcome::Applied));

        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_submit_feedback()
            .times(1)
            .returning(|_| Err(AppError::RemoteUnavailable("down".to_string())));

        let result = coordinator(store, catalog).submit(7, 42, 4.0).await;
        assert!(matches!(result, Err(AppError::RemoteUnavailable(_))));
    }
}
