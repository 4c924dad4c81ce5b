//! # Order Placement Engine
//!
//! Validates a cart against the catalog, prices it, and commits the sale
//! with its stock decrements as one atomic unit.
//!
//! ## Placement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        place_order(cart)                                │
//! │                                                                         │
//! │  validate_cart ── empty / qty <= 0 ──► Rejected(Validation)             │
//! │       │            (no store access)                                    │
//! │       ▼                                                                 │
//! │  for each line, in cart order                                           │
//! │    catalog.get_product(id) ── None ──► Rejected(ProductNotFound)        │
//! │    draft.add_line(product, qty) ── short ──► Rejected(InsufficientStock)│
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  store.commit_sale(draft, cancel)                                       │
//! │    ├── StockConflict ──► Rejected(InsufficientStock), rolled back       │
//! │    ├── Cancelled ──► Cancelled, rolled back                             │
//! │    ├── other failure ──► Commit(DbError), rolled back, never retried    │
//! │    └── ok ──► Transaction                                               │
//! │                                                                         │
//! │  The cancel future is raced against pricing and the store's writes,     │
//! │  never against COMMIT. `Cancelled` therefore always means nothing was   │
//! │  written; once COMMIT is issued its real outcome is returned.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::DbError;
use crate::store::{ProductCatalog, SaleStore};
use kasir_core::validation::validate_cart;
use kasir_core::{CoreError, DailyReport, OrderDraft, OrderLine, Transaction};

// =============================================================================
// Errors
// =============================================================================

/// Outcome of a failed order placement or report query.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The order was refused; nothing was written.
    #[error(transparent)]
    Rejected(#[from] CoreError),

    /// The catalog lookup failed while validating the cart.
    #[error("Product lookup failed: {0}")]
    Lookup(DbError),

    /// The atomic commit failed and was rolled back.
    #[error("Commit failed: {0}")]
    Commit(DbError),

    /// The caller gave up before the sale committed.
    #[error("Order placement cancelled")]
    Cancelled,

    /// The daily aggregation query failed.
    #[error("Report query failed: {0}")]
    Report(DbError),
}

impl CheckoutError {
    /// Classifies a commit failure. Stock and existence races detected
    /// inside the atomic unit become ordinary rejections.
    fn from_commit(err: DbError) -> Self {
        match err {
            DbError::StockConflict {
                product_id,
                available,
                requested,
            } => CheckoutError::Rejected(CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            }),
            DbError::ProductVanished { product_id } => {
                CheckoutError::Rejected(CoreError::ProductNotFound(product_id))
            }
            DbError::Cancelled => CheckoutError::Cancelled,
            other => CheckoutError::Commit(other),
        }
    }
}

// =============================================================================
// Order Service
// =============================================================================

/// Order placement engine and daily report aggregator.
///
/// Holds no state of its own; every call is independent and correctness
/// under concurrency comes from the store's atomic unit.
///
/// ## Usage
/// ```rust,ignore
/// let orders = db.orders();
/// let sale = orders.place_order(&[OrderLine::new(1, 2)]).await?;
/// let today = orders.daily_report_today().await?;
/// ```
#[derive(Debug, Clone)]
pub struct OrderService<C, S> {
    catalog: C,
    store: S,
}

impl<C, S> OrderService<C, S>
where
    C: ProductCatalog,
    S: SaleStore,
{
    pub fn new(catalog: C, store: S) -> Self {
        OrderService { catalog, store }
    }

    /// Places an order that can only fail, never be abandoned.
    pub async fn place_order(&self, cart: &[OrderLine]) -> Result<Transaction, CheckoutError> {
        self.place_order_until(cart, std::future::pending()).await
    }

    /// Places an order, giving up with `Cancelled` if `cancel` completes
    /// before the sale's COMMIT is issued.
    ///
    /// Validation errors are returned before either the store or `cancel`
    /// is consulted. A `cancel` that fires while COMMIT is in flight is
    /// ignored and the committed sale is returned.
    pub async fn place_order_until<F>(
        &self,
        cart: &[OrderLine],
        cancel: F,
    ) -> Result<Transaction, CheckoutError>
    where
        F: Future<Output = ()> + Send,
    {
        validate_cart(cart).map_err(CoreError::from)?;
        tokio::pin!(cancel);

        let draft = tokio::select! {
            biased;

            _ = &mut cancel => {
                warn!(lines = cart.len(), "Order placement cancelled before commit");
                return Err(CheckoutError::Cancelled);
            }
            draft = self.price(cart) => draft?,
        };

        debug!(
            lines = draft.lines().len(),
            total_cents = draft.total().cents(),
            "Order priced, committing"
        );

        let sale = self
            .store
            .commit_sale(&draft, cancel)
            .await
            .map_err(CheckoutError::from_commit)?;

        info!(
            transaction_id = sale.id,
            total = %sale.total(),
            "Order placed"
        );

        Ok(sale)
    }

    async fn price(&self, cart: &[OrderLine]) -> Result<OrderDraft, CheckoutError> {
        let mut draft = OrderDraft::new();

        for line in cart {
            let product = self
                .catalog
                .get_product(line.product_id)
                .await
                .map_err(CheckoutError::Lookup)?
                .ok_or(CoreError::ProductNotFound(line.product_id))?;

            if let Err(err) = draft.add_line(&product, line.quantity) {
                warn!(product_id = line.product_id, error = %err, "Order rejected");
                return Err(err.into());
            }
        }

        Ok(draft)
    }

    /// Sales total and transaction count for `date` (UTC).
    pub async fn daily_report(&self, date: NaiveDate) -> Result<DailyReport, CheckoutError> {
        self.store
            .daily_report(date)
            .await
            .map_err(CheckoutError::Report)
    }

    /// Report for the current UTC date.
    pub async fn daily_report_today(&self) -> Result<DailyReport, CheckoutError> {
        self.daily_report(Utc::now().date_naive()).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbResult;
    use crate::pool::{Database, DbConfig};
    use async_trait::async_trait;
    use kasir_core::{CategoryInput, Product, ProductInput, ValidationError};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    #[derive(Default)]
    struct FakeCatalog {
        products: HashMap<i64, Product>,
        lookups: AtomicUsize,
        fail: bool,
    }

    impl FakeCatalog {
        fn with(products: &[Product]) -> Self {
            FakeCatalog {
                products: products.iter().map(|p| (p.id, p.clone())).collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ProductCatalog for FakeCatalog {
        async fn get_product(&self, id: i64) -> DbResult<Option<Product>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DbError::PoolExhausted);
            }
            Ok(self.products.get(&id).cloned())
        }
    }

    enum CommitBehavior {
        Succeed,
        Fail(fn() -> DbError),
        /// Writes never finish; honours the cancel signal like SQLite does.
        Hang,
        /// COMMIT already issued; takes this long and ignores the signal.
        SlowCommit(Duration),
    }

    struct FakeStore {
        behavior: CommitBehavior,
        commits: Mutex<Vec<OrderDraft>>,
    }

    impl FakeStore {
        fn new(behavior: CommitBehavior) -> Self {
            FakeStore {
                behavior,
                commits: Mutex::new(Vec::new()),
            }
        }

        fn commit_count(&self) -> usize {
            self.commits.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SaleStore for FakeStore {
        async fn commit_sale<F>(&self, draft: &OrderDraft, cancel: F) -> DbResult<Transaction>
        where
            F: Future<Output = ()> + Send,
        {
            match self.behavior {
                CommitBehavior::Succeed => {}
                CommitBehavior::Fail(make) => return Err(make()),
                CommitBehavior::Hang => {
                    cancel.await;
                    return Err(DbError::Cancelled);
                }
                CommitBehavior::SlowCommit(delay) => tokio::time::sleep(delay).await,
            }
            self.commits.lock().unwrap().push(draft.clone());
            Ok(Transaction {
                id: 1,
                total_cents: draft.total().cents(),
                created_at: Utc::now(),
                details: Vec::new(),
            })
        }

        async fn daily_report(&self, _date: NaiveDate) -> DbResult<DailyReport> {
            Err(DbError::QueryFailed("no such table: transactions".to_string()))
        }
    }

    fn product(id: i64, price_cents: i64, stock: i64) -> Product {
        Product {
            id,
            name: format!("Product {id}"),
            price_cents,
            stock,
            category_id: 1,
        }
    }

    fn fake_service(store: CommitBehavior) -> OrderService<FakeCatalog, FakeStore> {
        OrderService::new(
            FakeCatalog::with(&[product(1, 1000, 5), product(2, 350, 2)]),
            FakeStore::new(store),
        )
    }

    // -------------------------------------------------------------------------
    // Engine behaviour against fakes
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_empty_cart_never_touches_the_store() {
        let service = fake_service(CommitBehavior::Succeed);

        let err = service.place_order(&[]).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Rejected(CoreError::Validation(ValidationError::EmptyCart))
        ));
        assert_eq!(service.catalog.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_positive_quantity_is_validation_error() {
        let service = fake_service(CommitBehavior::Succeed);

        let err = service
            .place_order(&[OrderLine::new(1, 1), OrderLine::new(2, -1)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Rejected(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
        assert_eq!(service.catalog.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejection_never_commits() {
        let service = fake_service(CommitBehavior::Succeed);

        let err = service
            .place_order(&[OrderLine::new(1, 1), OrderLine::new(9, 1)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Rejected(CoreError::ProductNotFound(9))
        ));
        assert_eq!(service.store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_reported() {
        let service = OrderService::new(
            FakeCatalog {
                fail: true,
                ..Default::default()
            },
            FakeStore::new(CommitBehavior::Succeed),
        );

        let err = service.place_order(&[OrderLine::new(1, 1)]).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Lookup(DbError::PoolExhausted)));
    }

    #[tokio::test]
    async fn test_commit_failure_surfaces_verbatim() {
        let service = fake_service(CommitBehavior::Fail(|| {
            DbError::TransactionFailed("disk I/O error".to_string())
        }));

        let err = service.place_order(&[OrderLine::new(1, 1)]).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Commit(DbError::TransactionFailed(_))));
    }

    #[tokio::test]
    async fn test_stock_conflict_becomes_insufficient_stock() {
        let service = fake_service(CommitBehavior::Fail(|| DbError::StockConflict {
            product_id: 2,
            available: 0,
            requested: 1,
        }));

        let err = service.place_order(&[OrderLine::new(2, 1)]).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Rejected(CoreError::InsufficientStock {
                product_id: 2,
                available: 0,
                requested: 1,
            })
        ));
    }

    #[tokio::test]
    async fn test_vanished_product_becomes_not_found() {
        let service = fake_service(CommitBehavior::Fail(|| DbError::ProductVanished {
            product_id: 2,
        }));

        let err = service.place_order(&[OrderLine::new(2, 1)]).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Rejected(CoreError::ProductNotFound(2))
        ));
    }

    #[tokio::test]
    async fn test_cancel_wins_over_hung_commit() {
        let service = fake_service(CommitBehavior::Hang);

        let err = service
            .place_order_until(
                &[OrderLine::new(1, 1)],
                tokio::time::sleep(Duration::from_millis(20)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Cancelled));
        assert_eq!(service.store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_commit_in_flight_is_not_abandoned() {
        let service = fake_service(CommitBehavior::SlowCommit(Duration::from_millis(60)));

        let sale = service
            .place_order_until(
                &[OrderLine::new(1, 2)],
                tokio::time::sleep(Duration::from_millis(10)),
            )
            .await
            .unwrap();
        assert_eq!(sale.total_cents, 2000);
        assert_eq!(service.store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_report_failure_is_report_error() {
        let service = fake_service(CommitBehavior::Succeed);
        let err = service.daily_report_today().await.unwrap_err();
        assert!(matches!(err, CheckoutError::Report(DbError::QueryFailed(_))));
    }

    // -------------------------------------------------------------------------
    // Engine behaviour against SQLite
    // -------------------------------------------------------------------------

    async fn seed(db: &Database, products: &[(&str, i64, i64)]) -> Vec<i64> {
        let category = db
            .categories()
            .insert(&CategoryInput {
                name: "General".to_string(),
                description: None,
            })
            .await
            .unwrap();

        let mut ids = Vec::new();
        for (name, price_cents, stock) in products {
            let product = db
                .products()
                .insert(&ProductInput {
                    name: name.to_string(),
                    price_cents: *price_cents,
                    stock: *stock,
                    category_id: category.id,
                })
                .await
                .unwrap();
            ids.push(product.id);
        }
        ids
    }

    async fn stock_of(db: &Database, id: i64) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_place_order_commits_sale() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ids = seed(&db, &[("A", 1000, 5), ("B", 350, 2), ("C", 500, 7)]).await;
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        let sale = db
            .orders()
            .place_order(&[OrderLine::new(a, 2), OrderLine::new(b, 2)])
            .await
            .unwrap();

        assert_eq!(sale.total().to_string(), "27.00");
        assert_eq!(sale.details_total(), sale.total());
        assert_eq!(sale.details[0].product_id, a);
        assert_eq!(sale.details[0].subtotal_cents, 2000);
        assert_eq!(sale.details[1].product_id, b);
        assert_eq!(sale.details[1].subtotal_cents, 700);
        assert_eq!(stock_of(&db, a).await, 3);
        assert_eq!(stock_of(&db, b).await, 0);
        // Not on the order
        assert_eq!(stock_of(&db, c).await, 7);

        let report = db.orders().daily_report_today().await.unwrap();
        assert_eq!(report.total_sales_cents, 2700);
        assert_eq!(report.transaction_count, 1);
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ids = seed(&db, &[("A", 1000, 5), ("B", 350, 2)]).await;
        let (a, b) = (ids[0], ids[1]);

        let err = db
            .orders()
            .place_order(&[OrderLine::new(a, 1), OrderLine::new(b, 3)])
            .await
            .unwrap_err();

        match err {
            CheckoutError::Rejected(CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            }) => {
                assert_eq!(product_id, b);
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(stock_of(&db, a).await, 5);
        assert_eq!(stock_of(&db, b).await, 2);
        let report = db.orders().daily_report_today().await.unwrap();
        assert_eq!(report.transaction_count, 0);
    }

    #[tokio::test]
    async fn test_unknown_product_changes_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ids = seed(&db, &[("A", 1000, 5)]).await;

        let err = db
            .orders()
            .place_order(&[OrderLine::new(ids[0], 1), OrderLine::new(999, 1)])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Rejected(CoreError::ProductNotFound(999))
        ));
        assert_eq!(stock_of(&db, ids[0]).await, 5);
    }

    #[tokio::test]
    async fn test_duplicate_lines_are_checked_cumulatively() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ids = seed(&db, &[("A", 1000, 5)]).await;
        let a = ids[0];

        let err = db
            .orders()
            .place_order(&[OrderLine::new(a, 3), OrderLine::new(a, 3)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Rejected(CoreError::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            })
        ));
        assert_eq!(stock_of(&db, a).await, 5);

        let sale = db
            .orders()
            .place_order(&[OrderLine::new(a, 2), OrderLine::new(a, 3)])
            .await
            .unwrap();
        assert_eq!(sale.details.len(), 2);
        assert_eq!(stock_of(&db, a).await, 0);
    }

    #[tokio::test]
    async fn test_cancel_before_pricing_changes_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ids = seed(&db, &[("A", 1000, 5)]).await;

        let err = db
            .orders()
            .place_order_until(&[OrderLine::new(ids[0], 1)], async {})
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Cancelled));
        assert_eq!(stock_of(&db, ids[0]).await, 5);
    }

    async fn committed_sales(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancelled_order_is_never_committed() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("kasir.db")).max_connections(2);
        let db = Database::new(config).await.unwrap();
        let ids = seed(&db, &[("A", 1000, 10_000)]).await;
        let a = ids[0];
        let orders = db.orders();

        let mut placed = 0;
        let mut cancelled = 0;
        for round in 0..600u32 {
            // Fires after a varying number of polls, landing in pricing,
            // the writes, or after COMMIT was issued
            let polls = round % 120;
            let cancel = async move {
                for _ in 0..polls {
                    tokio::task::yield_now().await;
                }
            };

            let before = committed_sales(&db).await;
            let result = orders
                .place_order_until(&[OrderLine::new(a, 1)], cancel)
                .await;
            let after = committed_sales(&db).await;

            match result {
                Ok(_) => {
                    placed += 1;
                    assert_eq!(after, before + 1, "round {round}");
                }
                Err(CheckoutError::Cancelled) => {
                    cancelled += 1;
                    assert_eq!(after, before, "cancelled order committed in round {round}");
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert!(cancelled > 0);
        assert_eq!(stock_of(&db, a).await, 10_000 - placed);
        db.close().await;
    }

    #[tokio::test]
    async fn test_report_for_empty_date() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2020, 2, 29).unwrap();

        let report = db.orders().daily_report(date).await.unwrap();
        assert_eq!(report, DailyReport::empty(date));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_orders_for_last_unit() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("kasir.db")).max_connections(4);
        let db = Database::new(config).await.unwrap();
        let ids = seed(&db, &[("C", 500, 1)]).await;
        let c = ids[0];

        let mut handles = Vec::new();
        for _ in 0..2 {
            let orders = db.orders();
            handles.push(tokio::spawn(async move {
                orders.place_order(&[OrderLine::new(c, 1)]).await
            }));
        }

        let mut placed = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(CheckoutError::Rejected(CoreError::InsufficientStock { .. })) => rejected += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(placed, 1);
        assert_eq!(rejected, 1);
        assert_eq!(stock_of(&db, c).await, 0);

        let report = db.orders().daily_report_today().await.unwrap();
        assert_eq!(report.transaction_count, 1);
        db.close().await;
    }
}
