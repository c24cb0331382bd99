//! Batch Delivery Routes

use axum::{
    extract::{Path, State},
    Json,
};
use reconciler::{BatchSummary, ReconcileOptions};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::{ApiError, AppState};

/// Body of a batch delivery
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    /// Raw Alertmanager listing, flat or grouped
    pub data: String,
    #[serde(flatten)]
    pub options: ReconcileOptions,
}

/// Reconcile a delivered batch against every open entity
pub async fn post_batch(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchSummary>, ApiError> {
    let receiver = state
        .receivers
        .get(&token)
        .cloned()
        .ok_or(ApiError::UnknownReceiver)?;
    let service = Arc::clone(&state.service);

    let summary = tokio::task::spawn_blocking(move || {
        service.process_batch(&receiver, &request.data, &request.options)
    })
    .await??;

    info!(
        alerts = summary.alerts,
        updated = summary.updated.len(),
        "Batch reconciled"
    );
    Ok(Json(summary))
}
