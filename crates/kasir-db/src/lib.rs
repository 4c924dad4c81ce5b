//! # kasir-db: Database Layer for Kasir POS
//!
//! This crate provides database access and the order placement engine.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasir POS Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (POST /transactions)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kasir-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ OrderService  │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │ (checkout.rs) │───►│ CategoryRepo  │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │ 001_init.sql │  │   │
//! │  │   │ via traits in │    │ Transaction-  │    │              │  │   │
//! │  │   │ store.rs      │    │ Repo          │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │  Database (pool.rs)           │   │
//! │  └────────────────────────────────┼────────────────────────────────┘   │
//! │                                   ▼                                     │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (category, product, transaction)
//! - [`store`] - Capability traits the order engine is written against
//! - [`checkout`] - Order placement engine and daily report
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kasir_core::OrderLine;
//! use kasir_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("kasir.db")).await?;
//!
//! let sale = db.orders().place_order(&[OrderLine::new(1, 2)]).await?;
//! let report = db.orders().daily_report_today().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutError, OrderService};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use store::{ProductCatalog, SaleStore};

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::product::ProductRepository;
pub use repository::transaction::TransactionRepository;
