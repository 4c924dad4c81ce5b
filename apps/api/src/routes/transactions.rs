//! Checkout and transaction lookup endpoints.
//!
//! Dropping the request future (client disconnect) before COMMIT drops the
//! open unit, and SQLite rolls it back. The configured order timeout can
//! abandon pricing and the writes; a COMMIT already issued is awaited, so a
//! `TIMEOUT` response always means nothing was saved.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use kasir_core::{OrderLine, Transaction};

use super::{created, ok, ApiResponse, AppState};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<OrderLine>,
}

/// POST /transactions: place an order.
#[tracing::instrument(skip(state, payload))]
pub async fn checkout(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Transaction>>), ApiError> {
    let Json(request) = payload?;

    let sale = state
        .db
        .orders()
        .place_order_until(&request.items, tokio::time::sleep(state.order_timeout))
        .await?;

    Ok(created("Transaction created", sale))
}

/// GET /transactions/{id}
#[tracing::instrument(skip(state, id))]
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<Transaction>>, ApiError> {
    let Path(id) = id?;

    let sale = state
        .db
        .transactions()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Transaction", id))?;
    Ok(ok(sale))
}
