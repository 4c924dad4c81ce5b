//! HTTP handlers, shared state, and the success envelope.
//!
//! Every successful response is `{"success": true, "message"?: str, "data": T}`.
//! Failures are produced by [`ApiError`](crate::error::ApiError).

pub mod categories;
pub mod health;
pub mod products;
pub mod report;
pub mod transactions;

use std::time::Duration;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use kasir_db::Database;

/// Shared application state accessible from all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,

    /// Deadline for one order placement.
    pub order_timeout: Duration,
}

impl AppState {
    pub fn new(db: Database, order_timeout: Duration) -> Self {
        AppState { db, order_timeout }
    }
}

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

/// `200 OK` with `data`.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: None,
        data,
    })
}

/// `200 OK` with a message and `data`.
pub fn ok_with_message<T: Serialize>(message: &str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: Some(message.to_string()),
        data,
    })
}

/// `201 Created` with a message and the new resource.
pub fn created<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok_with_message(message, data))
}
