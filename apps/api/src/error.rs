//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Kasir POS                              │
//! │                                                                         │
//! │  Handler: Result<_, ApiError>                                           │
//! │       │                                                                 │
//! │       ├── ValidationError ─────────────────┐                            │
//! │       ├── CoreError ───────────────────────┤                            │
//! │       ├── DbError ─────────────────────────┼──► ApiError { code, msg }  │
//! │       ├── CheckoutError ───────────────────┤          │                 │
//! │       └── Json/Path/Query rejection ───────┘          ▼                 │
//! │                                               status + JSON envelope    │
//! │                                                                         │
//! │  {"success": false, "code": "INSUFFICIENT_STOCK", "error": "..."}       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Store failures are logged here with their detail; clients only see a
//! generic message for them.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use kasir_core::{CoreError, ValidationError};
use kasir_db::{CheckoutError, DbError};

/// API error returned from handlers.
///
/// ## Serialization
/// ```json
/// {
///   "success": false,
///   "code": "NOT_FOUND",
///   "error": "Product not found: 42"
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Resource not found (404)
    NotFound,

    /// Not enough stock for an order line (409)
    InsufficientStock,

    /// Duplicate or still-referenced record (409)
    Conflict,

    /// Order placement exceeded its deadline (503)
    Timeout,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InsufficientStock | ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    code: ErrorCode,
    error: &'a str,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{resource} not found: {id}"))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            code: self.code,
            error: &self.message,
        };
        (self.code.status(), Json(body)).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", id),
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::TotalOverflow => ApiError::validation(err.to_string()),
            CoreError::Validation(inner) => inner.into(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, id),
            DbError::UniqueViolation { field, .. } => {
                ApiError::new(ErrorCode::Conflict, format!("Duplicate value for {field}"))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!(%message, "Foreign key violation");
                ApiError::new(
                    ErrorCode::Conflict,
                    "Record is referenced by, or references, another record",
                )
            }
            DbError::CheckViolation { message } => {
                tracing::warn!(%message, "Check constraint violation");
                ApiError::validation("Value violates a data constraint")
            }
            DbError::StockConflict {
                product_id,
                available,
                requested,
            } => CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            }
            .into(),
            DbError::ProductVanished { product_id } => CoreError::ProductNotFound(product_id).into(),
            DbError::Cancelled => {
                ApiError::new(ErrorCode::Timeout, "Operation abandoned, nothing was saved")
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ApiError::new(ErrorCode::DatabaseError, "Database is busy")
            }
            other => {
                tracing::error!(error = %other, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Rejected(core) => core.into(),
            CheckoutError::Lookup(db) | CheckoutError::Commit(db) | CheckoutError::Report(db) => {
                db.into()
            }
            CheckoutError::Cancelled => {
                tracing::warn!("Order placement exceeded its deadline");
                ApiError::new(ErrorCode::Timeout, "Order placement timed out, nothing was saved")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorCode::ValidationError.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::InsufficientStock.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::DatabaseError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_code_serializes_screaming_snake() {
        let json = serde_json::to_value(ErrorCode::InsufficientStock).unwrap();
        assert_eq!(json, "INSUFFICIENT_STOCK");
    }

    #[test]
    fn test_stock_conflict_maps_like_rejection() {
        let err: ApiError = DbError::StockConflict {
            product_id: 3,
            available: 0,
            requested: 1,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
    }

    #[test]
    fn test_store_detail_is_not_leaked() {
        let err: ApiError = CheckoutError::Commit(DbError::TransactionFailed(
            "disk I/O error at /var/lib/kasir.db".to_string(),
        ))
        .into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("/var/lib"));
    }
}
