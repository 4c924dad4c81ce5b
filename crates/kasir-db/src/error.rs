//! # Store Errors
//!
//! Everything a repository or the sale commit can fail with.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CheckoutError (order engine) / ApiError (HTTP)                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Failures from the SQLite store, classified from `sqlx::Error`.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row with this id (update/delete of a missing category or product).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the write.
    #[error("Duplicate value for {field}: {value}")]
    UniqueViolation { field: String, value: String },

    /// A row references, or is referenced by, another row.
    ///
    /// ## When This Occurs
    /// - Creating a product for a category that does not exist
    /// - Deleting a category that still has products
    /// - Deleting a product that appears on a committed transaction
    #[error("Reference constraint failed: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative stock or price).
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    /// The conditional stock decrement inside a sale commit matched no row.
    ///
    /// ## When This Occurs
    /// Another order consumed the stock between validation and commit.
    /// The enclosing transaction is rolled back.
    #[error("Stock conflict for product {product_id}: available {available}, requested {requested}")]
    StockConflict {
        product_id: i64,
        available: i64,
        requested: i64,
    },

    /// A product row was deleted between pricing and the stock decrement.
    /// The enclosing transaction is rolled back.
    #[error("Product {product_id} no longer exists")]
    ProductVanished { product_id: i64 },

    /// The caller's cancel signal fired before COMMIT was issued; the
    /// transaction was rolled back.
    #[error("Sale commit abandoned before COMMIT")]
    Cancelled,

    /// The store could not be opened, or the pool is closed.
    #[error("Cannot reach store: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    /// SQLite rejected a statement (includes `database is locked` once the
    /// busy timeout expires).
    #[error("Statement failed: {0}")]
    QueryFailed(String),

    /// BEGIN or COMMIT failed; nothing was applied.
    #[error("Atomic unit failed: {0}")]
    TransactionFailed(String),

    /// No pooled connection freed up within the acquire timeout.
    #[error("No database connection available")]
    PoolExhausted,

    #[error("Store error: {0}")]
    Internal(String),
}

impl DbError {
    /// `NotFound` for `entity` with `id`.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Wraps a failed BEGIN/COMMIT.
    pub fn transaction(err: sqlx::Error) -> Self {
        DbError::TransactionFailed(err.to_string())
    }
}

/// ```text
/// RowNotFound          → NotFound
/// Database(..)         → Unique/ForeignKey/Check violation by message, else QueryFailed
/// PoolTimedOut         → PoolExhausted
/// PoolClosed           → ConnectionFailed
/// anything else        → Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "?"),

            sqlx::Error::Database(db_err) => {
                // SQLite reports constraint failures only through the message:
                //   "UNIQUE constraint failed: products.name"
                //   "FOREIGN KEY constraint failed"
                //   "CHECK constraint failed: stock >= 0"
                let message = db_err.message().to_string();
                if let Some(field) = message.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "(existing)".to_string(),
                    }
                } else if message.starts_with("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation { message }
                } else if message.starts_with("CHECK constraint failed") {
                    DbError::CheckViolation { message }
                } else {
                    DbError::QueryFailed(message)
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
