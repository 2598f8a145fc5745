use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::FeedbackAck,
    services::recommendations::{self, RecommendedMovie},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub movie_id: i64,
    pub rating: f64,
}

/// A watchlist entry with its catalog title attached
#[derive(Debug, Serialize)]
pub struct WatchlistItem {
    pub movie_id: i64,
    pub title: String,
    pub rating: f64,
    pub rated_at: DateTime<Utc>,
}

/// Handler for per-user recommendations
pub async fn recommendations(
    State(state): State<AppState>,
    Path(external_id): Path<i64>,
) -> AppResult<Json<Vec<RecommendedMovie>>> {
    let recs = recommendations::recommendations_for(
        state.catalog.as_ref(),
        &state.cache,
        &state.movies,
        external_id,
    )
    .await?;

    Ok(Json(recs))
}

/// Handler for fetching a user's watchlist, newest ratings first
pub async fn watchlist(
    State(state): State<AppState>,
    Path(external_id): Path<i64>,
) -> AppResult<Json<Vec<WatchlistItem>>> {
    if state.store.find_by_external_id(external_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "no profile for user {}",
            external_id
        )));
    }

    let entries = state.store.fetch_watchlist(external_id).await?;

    let items = entries
        .into_iter()
        .map(|entry| WatchlistItem {
            movie_id: entry.movie_id,
            title: state
                .movies
                .title(entry.movie_id)
                .unwrap_or("Unknown Movie")
                .to_string(),
            rating: entry.rating,
            rated_at: entry.rated_at,
        })
        .collect();

    Ok(Json(items))
}

/// Handler for submitting a rating
pub async fn feedback(
    State(state): State<AppState>,
    Path(external_id): Path<i64>,
    Json(request): Json<FeedbackRequest>,
) -> AppResult<Json<FeedbackAck>> {
    let ack = state
        .feedback
        .submit(external_id, request.movie_id, request.rating)
        .await?;

    Ok(Json(ack))
}
