//! Alert Count Routes

use axum::{extract::State, Json};
use reconciler::AlertCounts;
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Current firing/open entity counts
pub async fn get_counts(State(state): State<Arc<AppState>>) -> Result<Json<AlertCounts>, ApiError> {
    let service = Arc::clone(&state.service);
    let counts = tokio::task::spawn_blocking(move || service.counts()).await??;
    Ok(Json(counts))
}
