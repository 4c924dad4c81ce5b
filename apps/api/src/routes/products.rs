//! Product CRUD and search endpoints.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use kasir_core::validation::validate_product;
use kasir_core::{Product, ProductInput, ValidationError};

use super::{created, ok, ok_with_message, ApiResponse, AppState};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    /// Case-insensitive substring of the product name.
    pub name: Option<String>,
}

/// Rejects input whose category does not exist, before the insert would
/// trip the foreign key.
async fn check_input(state: &AppState, input: &ProductInput) -> Result<(), ApiError> {
    validate_product(input)?;

    if state
        .db
        .categories()
        .get_by_id(input.category_id)
        .await?
        .is_none()
    {
        return Err(ValidationError::InvalidFormat {
            field: "category_id".to_string(),
            reason: format!("category {} does not exist", input.category_id),
        }
        .into());
    }

    Ok(())
}

/// GET /products?name=
#[tracing::instrument(skip(state, query))]
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<Product>>>, ApiError> {
    let Query(query) = query?;

    let products = state.db.products().list(query.name.as_deref()).await?;
    Ok(ok(products))
}

/// POST /products
#[tracing::instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), ApiError> {
    let Json(input) = payload?;
    check_input(&state, &input).await?;

    let product = state.db.products().insert(&input).await?;
    tracing::info!(id = product.id, name = %product.name, "Product created");
    Ok(created("Product created", product))
}

/// GET /products/{id}
#[tracing::instrument(skip(state, id))]
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let Path(id) = id?;

    let product = state
        .db
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;
    Ok(ok(product))
}

/// PUT /products/{id}
#[tracing::instrument(skip(state, id, payload))]
pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let Path(id) = id?;
    let Json(input) = payload?;
    check_input(&state, &input).await?;

    let product = state.db.products().update(id, &input).await?;
    Ok(ok_with_message("Product updated", product))
}

/// DELETE /products/{id}
#[tracing::instrument(skip(state, id))]
pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Path(id) = id?;

    state.db.products().delete(id).await?;
    tracing::info!(id, "Product deleted");
    Ok(ok_with_message("Product deleted", ()))
}
