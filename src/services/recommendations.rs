use serde::Serialize;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::AppResult,
    models::RecommendationSet,
    movies::MovieCatalog,
    services::catalog::CatalogClient,
};

/// Recommendation sets change only when the remote model ingests new feedback,
/// so a short TTL is enough to absorb repeated page loads.
const RECS_CACHE_TTL: u64 = 300;

const UNKNOWN_TITLE: &str = "Unknown Movie";

/// A recommended movie with its catalog title attached
#[derive(Debug, Clone, Serialize)]
pub struct RecommendedMovie {
    pub movie_id: i64,
    pub title: String,
}

/// Fetches the recommendation set for a user and enriches it with titles.
///
/// The remote fetch is cached per user; items missing from the static catalog
/// still come back, with a placeholder title.
pub async fn recommendations_for(
    catalog: &dyn CatalogClient,
    cache: &Cache,
    movies: &MovieCatalog,
    external_id: i64,
) -> AppResult<Vec<RecommendedMovie>> {
    let set: RecommendationSet = cached!(
        cache,
        CacheKey::Recommendations(external_id),
        RECS_CACHE_TTL,
        catalog.recommend(external_id)
    )?;

    let recommendations = set
        .recommended_items
        .iter()
        .map(|&movie_id| RecommendedMovie {
            movie_id,
            title: movies
                .title(movie_id)
                .unwrap_or(UNKNOWN_TITLE)
                .to_string(),
        })
        .collect();

    Ok(recommendations)
}
