//! API Error Types

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use reconciler::ReconcileError;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Errors returned by handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unknown receiver token")]
    UnknownReceiver,

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("Reconciliation worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownReceiver => StatusCode::NOT_FOUND,
            ApiError::Reconcile(ReconcileError::InputDecode(_)) => StatusCode::BAD_REQUEST,
            ApiError::Reconcile(_) | ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
