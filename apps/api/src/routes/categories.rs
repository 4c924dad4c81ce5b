//! Category CRUD endpoints.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use kasir_core::validation::validate_category;
use kasir_core::{Category, CategoryInput};

use super::{created, ok, ok_with_message, ApiResponse, AppState};
use crate::error::ApiError;

/// GET /categories
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Category>>>, ApiError> {
    Ok(ok(state.db.categories().list().await?))
}

/// POST /categories
#[tracing::instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CategoryInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Category>>), ApiError> {
    let Json(input) = payload?;
    validate_category(&input)?;

    let category = state.db.categories().insert(&input).await?;
    tracing::info!(id = category.id, "Category created");
    Ok(created("Category created", category))
}

/// GET /categories/{id}
#[tracing::instrument(skip(state, id))]
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    let Path(id) = id?;

    let category = state
        .db
        .categories()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category", id))?;
    Ok(ok(category))
}

/// PUT /categories/{id}
#[tracing::instrument(skip(state, id, payload))]
pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CategoryInput>, JsonRejection>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    let Path(id) = id?;
    let Json(input) = payload?;
    validate_category(&input)?;

    let category = state.db.categories().update(id, &input).await?;
    Ok(ok_with_message("Category updated", category))
}

/// DELETE /categories/{id}
#[tracing::instrument(skip(state, id))]
pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Path(id) = id?;

    state.db.categories().delete(id).await?;
    tracing::info!(id, "Category deleted");
    Ok(ok_with_message("Category deleted", ()))
}
