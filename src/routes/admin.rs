use axum::{extract::State, Json};

use crate::{error::AppResult, services::sync::SyncReport, state::AppState};

/// Handler for the manual sync trigger.
///
/// Responds with the pass's aggregate report, or 409 when a pass is already
/// in flight. This is the only externally reachable control surface for
/// reconciliation.
pub async fn trigger_sync(State(state): State<AppState>) -> AppResult<Json<SyncReport>> {
    let report = state.scheduler.trigger_now().await?;
    Ok(Json(report))
}
