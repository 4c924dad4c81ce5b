//! Daily sales report endpoints. Dates are UTC calendar days.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use kasir_core::validation::parse_report_date;
use kasir_core::{DailyReport, ValidationError};

use super::{ok, ApiResponse, AppState};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// `YYYY-MM-DD`
    pub date: Option<String>,
}

/// GET /report/today
#[tracing::instrument(skip(state))]
pub async fn today(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DailyReport>>, ApiError> {
    Ok(ok(state.db.orders().daily_report_today().await?))
}

/// GET /report?date=YYYY-MM-DD
#[tracing::instrument(skip(state, query))]
pub async fn by_date(
    State(state): State<AppState>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<DailyReport>>, ApiError> {
    let Query(query) = query?;

    let raw = query.date.ok_or_else(|| ValidationError::Required {
        field: "date".to_string(),
    })?;
    let date = parse_report_date(&raw)?;

    Ok(ok(state.db.orders().daily_report(date).await?))
}
