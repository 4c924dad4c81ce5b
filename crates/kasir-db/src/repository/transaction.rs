//! # Transaction Repository
//!
//! Database operations for committed sales and their line items.
//!
//! ## Sale Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   commit_sale(draft): one SQLite transaction            │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├── INSERT transactions (total_cents) RETURNING id, created_at        │
//! │   ├── for each priced line, in cart order:                              │
//! │   │    ├── UPDATE products SET stock = stock - qty                      │
//! │   │    │   WHERE id = ? AND stock >= qty                                │
//! │   │    │      └── 0 rows? ──► StockConflict / ProductVanished, ROLLBACK │
//! │   │    └── INSERT transaction_details (..) RETURNING *                  │
//! │   └── (the writes race the cancel signal ──► Cancelled, ROLLBACK)       │
//! │  COMMIT  (never raced: its real outcome is always reported)             │
//! │                                                                         │
//! │  Any early return drops the sqlx::Transaction, which rolls back.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The conditional UPDATE re-checks stock under SQLite's write lock, so two
//! concurrent sales for the last unit cannot both commit.

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Sqlite, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use kasir_core::{DailyReport, OrderDraft, Transaction, TransactionDetail};

const DETAIL_COLUMNS: &str = "id, transaction_id, product_id, quantity, subtotal_cents";

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    total_cents: i64,
    created_at: DateTime<Utc>,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Writes a priced order as one atomic unit.
    ///
    /// Inserts the transaction row, one detail row per line and decrements
    /// each product's stock. Either all of it becomes visible or none of it.
    ///
    /// ## Errors
    /// - `StockConflict` if a product no longer has enough stock
    /// - `ProductVanished` if a product row disappeared since pricing
    /// - `TransactionFailed` if BEGIN or COMMIT fails
    pub async fn commit_sale(&self, draft: &OrderDraft) -> DbResult<Transaction> {
        self.commit_sale_until(draft, std::future::pending()).await
    }

    /// Like [`commit_sale`](Self::commit_sale), abandoning the unit with
    /// `Cancelled` if `cancel` completes while the writes are in flight.
    ///
    /// Once every write has succeeded, COMMIT is awaited regardless of
    /// `cancel`, so `Cancelled` always means nothing was applied.
    pub async fn commit_sale_until<F>(&self, draft: &OrderDraft, cancel: F) -> DbResult<Transaction>
    where
        F: Future<Output = ()> + Send,
    {
        if draft.is_empty() {
            return Err(DbError::Internal(
                "refusing to commit a sale with no lines".to_string(),
            ));
        }

        debug!(
            lines = draft.lines().len(),
            total_cents = draft.total().cents(),
            "Committing sale"
        );

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let (header, details) = tokio::select! {
            biased;

            _ = cancel => {
                warn!(lines = draft.lines().len(), "Sale abandoned before COMMIT, rolling back");
                return Err(DbError::Cancelled);
            }
            written = write_sale(&mut tx, draft) => written?,
        };

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            transaction_id = header.id,
            total_cents = header.total_cents,
            lines = details.len(),
            "Sale committed"
        );

        Ok(Transaction {
            id: header.id,
            total_cents: header.total_cents,
            created_at: header.created_at,
            details,
        })
    }

    /// Gets a transaction with its details in insertion order.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Transaction>> {
        let header = sqlx::query_as::<_, TransactionRow>(
            "SELECT id, total_cents, created_at FROM transactions WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let details = sqlx::query_as::<_, TransactionDetail>(&format!(
            "SELECT {DETAIL_COLUMNS} FROM transaction_details WHERE transaction_id = ?1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Transaction {
            id: header.id,
            total_cents: header.total_cents,
            created_at: header.created_at,
            details,
        }))
    }

    /// Sums sales and counts transactions created on `date` (UTC).
    ///
    /// A day without sales yields zeros, not an error. `created_at` is
    /// RFC 3339 text, so the day is a half-open range of string prefixes
    /// and the lookup stays on `idx_transactions_created_at`.
    pub async fn daily_report(&self, date: NaiveDate) -> DbResult<DailyReport> {
        let next = date
            .succ_opt()
            .ok_or_else(|| DbError::Internal(format!("no day after {date}")))?;
        let day = date.format("%Y-%m-%d").to_string();

        let (total_sales_cents, transaction_count): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total_cents), 0), COUNT(id)
            FROM transactions
            WHERE created_at >= ?1 AND created_at < ?2
            "#,
        )
        .bind(&day)
        .bind(next.format("%Y-%m-%d").to_string())
        .fetch_one(&self.pool)
        .await?;

        debug!(date = %day, total_sales_cents, transaction_count, "Daily report computed");

        Ok(DailyReport {
            date,
            total_sales_cents,
            transaction_count,
        })
    }
}

/// The statements of one sale, run inside `tx`. Nothing here commits.
async fn write_sale(
    tx: &mut sqlx::Transaction<'static, Sqlite>,
    draft: &OrderDraft,
) -> DbResult<(TransactionRow, Vec<TransactionDetail>)> {
    let header = sqlx::query_as::<_, TransactionRow>(
        "INSERT INTO transactions (total_cents) VALUES (?1) RETURNING id, total_cents, created_at",
    )
    .bind(draft.total().cents())
    .fetch_one(&mut **tx)
    .await?;

    let mut details = Vec::with_capacity(draft.lines().len());
    let mut taken: HashMap<i64, i64> = HashMap::new();

    for line in draft.lines() {
        let decremented =
            sqlx::query("UPDATE products SET stock = stock - ?1 WHERE id = ?2 AND stock >= ?1")
                .bind(line.quantity)
                .bind(line.product_id)
                .execute(&mut **tx)
                .await?;

        let already = taken.get(&line.product_id).copied().unwrap_or(0);

        if decremented.rows_affected() == 0 {
            let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
                .bind(line.product_id)
                .fetch_optional(&mut **tx)
                .await?;

            warn!(
                product_id = line.product_id,
                requested = already + line.quantity,
                "Stock changed before commit, rolling back sale"
            );

            return Err(match stock {
                None => DbError::ProductVanished {
                    product_id: line.product_id,
                },
                Some(stock) => DbError::StockConflict {
                    product_id: line.product_id,
                    available: stock + already,
                    requested: already + line.quantity,
                },
            });
        }

        taken.insert(line.product_id, already + line.quantity);

        let detail = sqlx::query_as::<_, TransactionDetail>(&format!(
            "INSERT INTO transaction_details (transaction_id, product_id, quantity, subtotal_cents) \
             VALUES (?1, ?2, ?3, ?4) RETURNING {DETAIL_COLUMNS}"
        ))
        .bind(header.id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.subtotal_cents)
        .fetch_one(&mut **tx)
        .await?;

        details.push(detail);
    }

    Ok((header, details))
}
