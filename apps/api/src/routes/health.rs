//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::{ok, ApiResponse, AppState};
use crate::error::{ApiError, ErrorCode};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub migrations_applied: usize,
    pub migrations_total: usize,
}

/// GET /health: process is up and the database answers queries.
pub async fn check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    if !state.db.health_check().await {
        tracing::error!("Health check failed: database unreachable");
        return Err(ApiError::new(
            ErrorCode::DatabaseError,
            "Database is unreachable",
        ));
    }

    let (total, applied) = state.db.migration_status().await?;

    Ok(ok(HealthResponse {
        status: "ok",
        database: "ok",
        migrations_applied: applied,
        migrations_total: total,
    }))
}
