//! # Store Capabilities
//!
//! The two narrow seams the order engine depends on. The SQLite
//! repositories implement them; tests substitute in-memory fakes.
//!
//! ```text
//! OrderService<C, S>
//!   ├── C: ProductCatalog ── get_product(id)         (ProductRepository)
//!   └── S: SaleStore      ── commit_sale(draft, cancel)  (TransactionRepository)
//!                          └─ daily_report(date)
//! ```

use std::future::Future;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::DbResult;
use crate::repository::product::ProductRepository;
use crate::repository::transaction::TransactionRepository;
use kasir_core::{DailyReport, OrderDraft, Product, Transaction};

/// Point lookup of products for order validation.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Returns the product as currently stored, or `None`.
    async fn get_product(&self, id: i64) -> DbResult<Option<Product>>;
}

/// Durable storage for committed sales.
#[async_trait]
pub trait SaleStore: Send + Sync {
    /// Applies a priced order atomically: transaction row, detail rows and
    /// conditional stock decrements all commit together or not at all.
    ///
    /// `cancel` may abandon the unit with `DbError::Cancelled` only before
    /// COMMIT is issued. After that the real commit outcome is returned.
    async fn commit_sale<F>(&self, draft: &OrderDraft, cancel: F) -> DbResult<Transaction>
    where
        F: Future<Output = ()> + Send;

    /// Aggregates sales for one UTC calendar day.
    async fn daily_report(&self, date: NaiveDate) -> DbResult<DailyReport>;
}

#[async_trait]
impl ProductCatalog for ProductRepository {
    async fn get_product(&self, id: i64) -> DbResult<Option<Product>> {
        self.get_by_id(id).await
    }
}

#[async_trait]
impl SaleStore for TransactionRepository {
    async fn commit_sale<F>(&self, draft: &OrderDraft, cancel: F) -> DbResult<Transaction>
    where
        F: Future<Output = ()> + Send,
    {
        self.commit_sale_until(draft, cancel).await
    }

    async fn daily_report(&self, date: NaiveDate) -> DbResult<DailyReport> {
        TransactionRepository::daily_report(self, date).await
    }
}
