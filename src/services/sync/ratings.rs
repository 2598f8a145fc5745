use std::collections::BTreeMap;

use crate::{
    error::AppResult,
    models::{valid_rating, RemoteRatingRecord, WatchlistEntry},
    services::catalog::CatalogClient,
    store::{MergeOutcome, ProfileStore},
};

/// Aggregate result of one rating reconciliation pass
#[derive(Debug, Clone, Copy, Default)]
pub struct RatingSyncOutcome {
    /// Per-user merge operations attempted
    pub merges: u64,
    /// Watchlist entries written across all merges
    pub entries: u64,
    /// Merges targeting an external id with no local profile yet; these are
    /// no-ops that self-heal once the user reconciler has created the profile
    pub deferred: u64,
    /// Merges whose store write failed; siblings still committed
    pub failed: u64,
    /// Records dropped for an out-of-range rating
    pub invalid: u64,
}

/// Collapses the raw rating snapshot to at most one entry per (user, movie).
///
/// Where the same pair appears several times, the last occurrence in snapshot
/// order wins. Records with ratings outside the accepted interval are dropped
/// and counted.
pub(crate) fn dedup_ratings(
    records: &[RemoteRatingRecord],
) -> (BTreeMap<i64, Vec<WatchlistEntry>>, u64) {
    let mut invalid = 0u64;
    let mut per_user: BTreeMap<i64, BTreeMap<i64, WatchlistEntry>> = BTreeMap::new();

    for record in records {
        if !valid_rating(record.rating) {
            invalid += 1;
            tracing::warn!(
                external_id = record.user_id,
                movie_id = record.item_id,
                rating = record.rating,
                "Dropping rating record outside accepted interval"
            );
            continue;
        }

        per_user.entry(record.user_id).or_default().insert(
            record.item_id,
            WatchlistEntry {
                movie_id: record.item_id,
                rating: record.rating,
                rated_at: record.rated_at(),
            },
        );
    }

    let deduped = per_user
        .into_iter()
        .map(|(user_id, by_movie)| (user_id, by_movie.into_values().collect()))
        .collect();

    (deduped, invalid)
}

/// Pulls the full remote rating snapshot, deduplicates it, and merges each
/// user's entry set into the profile store.
///
/// One merge statement per user replaces existing entries and inserts missing
/// ones; a merge for a not-yet-synced user writes nothing and is counted as
/// deferred, never as an error. Per-user failures do not stop sibling merges;
/// only a failed snapshot fetch aborts the pass.
pub async fn sync_ratings(
    catalog: &dyn CatalogClient,
    store: &dyn ProfileStore,
) -> AppResult<RatingSyncOutcome> {
    let records = catalog.list_ratings().await?;
    let (deduped, invalid) = dedup_ratings(&records);

    let mut outcome = RatingSyncOutcome {
        invalid,
        ..Default::default()
    };

    for (external_id, entries) in &deduped {
        outcome.merges += 1;

        match store.merge_watchlist(*external_id, entries).await {
            Ok(MergeOutcome::Applied(written)) => outcome.entries += written,
            Ok(MergeOutcome::Deferred) => {
                outcome.deferred += 1;
                tracing::warn!(
                    external_id,
                    entries = entries.len(),
                    "Deferred rating merge: no profile for external id yet"
                );
            }
            Err(e) => {
                outcome.failed += 1;
                tracing::warn!(
                    external_id,
                    error = %e,
                    "Rating merge failed, continuing with remaining users"
                );
            }
        }
    }

    tracing::info!(
        merges = outcome.merges,
        entries = outcome.entries,
        deferred = outcome.deferred,
        failed = outcome.failed,
        invalid = outcome.invalid,
        "Rating reconciliation finished"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::catalog::MockCatalogClient;
    use crate::store::MockProfileStore;

    fn rating(user_id: i64, item_id: i64, rating: f64, timestamp: i64) -> RemoteRatingRecord {
        RemoteRatingRecord {
            user_id,
            item_id,
            rating,
            timestamp: Some(timestamp),
        }
    }

    #[test]
    fn test_dedup_last_occurrence_wins() {
        let records = vec![rating(1, 5, 3.0, 100), rating(1, 5, 4.0, 200)];

        let (deduped, invalid) = dedup_ratings(&records);
        assert_eq!(invalid, 0);
        assert_eq!(deduped.len(), 1);

        let entries = &deduped[&1];
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].movie_id, 5);
        assert_eq!(entries[0].rating, 4.0);
        assert_eq!(entries[0].rated_at.timestamp(), 200);
    }

    #[test]
    fn test_dedup_groups_by_user_then_movie() {
        let records = vec![
            rating(1, 5, 3.0, 100),
            rating(2, 5, 2.0, 110),
            rating(1, 8, 5.0, 120),
            rating(2, 5, 4.5, 130),
        ];

        let (deduped, _) = dedup_ratings(&records);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[&1].len(), 2);
        assert_eq!(deduped[&2].len(), 1);
        assert_eq!(deduped[&2][0].rating, 4.5);
    }

    #[test]
    fn test_dedup_drops_out_of_range_ratings() {
        let records = vec![
            rating(1, 5, 0.0, 100),
            rating(1, 6, 6.0, 110),
            rating(1, 7, 4.0, 120),
        ];

        let (deduped, invalid) = dedup_ratings(&records);
        assert_eq!(invalid, 2);
        assert_eq!(deduped[&1].len(), 1);
        assert_eq!(deduped[&1][0].movie_id, 7);
    }

    #[tokio::test]
    async fn test_sync_ratings_fails_fast_when_snapshot_unavailable() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_list_ratings()
            .returning(|| Err(AppError::RemoteUnavailable("down".to_string())));
        let store = MockProfileStore::new();

        let result = sync_ratings(&catalog, &store).await;
        assert!(matches!(result, Err(AppError::RemoteUnavailable(_))));
    }

    #[tokio::test]
    async fn test_sync_ratings_counts_deferred_merges() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_list_ratings()
            .returning(|| Ok(vec![rating(99, 5, 4.0, 100)]));

        let mut store = MockProfileStore::new();
        store
            .expect_merge_watchlist()
            .times(1)
            .returning(|_, _| Ok(MergeOutcome::Deferred));

        let outcome = sync_ratings(&catalog, &store).await.unwrap();
        assert_eq!(outcome.merges, 1);
        assert_eq!(outcome.deferred, 1);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.entries, 0);
    }

    #[tokio::test]
    async fn test_sync_ratings_isolates_per_user_failures() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_list_ratings().returning(|| {
            Ok(vec![
                rating(1, 5, 3.0, 100),
                rating(2, 5, 4.0, 110),
                rating(3, 9, 2.0, 120),
            ])
        });

        let mut store = MockProfileStore::new();
        store
            .expect_merge_watchlist()
            .times(3)
            .returning(|external_id, entries| {
                if external_id == 2 {
                    Err(AppError::Internal("write failed".to_string()))
                } else {
                    Ok(MergeOutcome::Applied(entries.len() as u64))
                }
            });

        let outcome = sync_ratings(&catalog, &store).await.unwrap();
        assert_eq!(outcome.merges, 3);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.entries, 2);
    }

    #[tokio::test]
    async fn test_sync_ratings_merges_deduplicated_set() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_list_ratings().returning(|| {
            Ok(vec![rating(1, 5, 3.0, 100), rating(1, 5, 4.0, 200)])
        });

        let mut store = MockProfileStore::new();
        store
            .expect_merge_watchlist()
            .withf(|external_id, entries| {
                *external_id == 1 && entries.len() == 1 && entries[0].rating == 4.0
            })
            .times(1)
            .returning(|_, entries| Ok(MergeOutcome::Applied(entries.len() as u64)));

        let outcome = sync_ratings(&catalog, &store).await.unwrap();
        assert_eq!(outcome.merges, 1);
        assert_eq!(outcome.entries, 1);
    }
}
