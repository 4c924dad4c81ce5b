//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - CRUD operations
//! - Case-insensitive name search
//! - Point lookup used by the order engine (via [`ProductCatalog`](crate::ProductCatalog))
//!
//! Stock is only decremented inside a sale commit
//! (see [`TransactionRepository::commit_sale`](crate::TransactionRepository::commit_sale)).
//! Here it is set wholesale by `insert`/`update`.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kasir_core::{Product, ProductInput};

const PRODUCT_COLUMNS: &str = "id, name, price_cents, stock, category_id";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// // Search products
/// let results = repo.list(Some("kopi")).await?;
///
/// // Get by ID
/// let product = repo.get_by_id(7).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products ordered by id, optionally filtered by name.
    ///
    /// The filter is a case-insensitive substring match. `%` and `_` in the
    /// filter match literally. A blank filter lists everything.
    pub async fn list(&self, name_filter: Option<&str>) -> DbResult<Vec<Product>> {
        let filter = name_filter.map(str::trim).filter(|f| !f.is_empty());

        debug!(filter = ?filter, "Listing products");

        let products = match filter {
            Some(filter) => {
                let pattern = format!("%{}%", escape_like(filter));
                sqlx::query_as::<_, Product>(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products \
                     WHERE name LIKE ?1 ESCAPE '\\' ORDER BY id"
                ))
                .bind(pattern)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Product>(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        debug!(count = products.len(), "Product list returned");
        Ok(products)
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// Fails with `ForeignKeyViolation` if the category does not exist.
    pub async fn insert(&self, input: &ProductInput) -> DbResult<Product> {
        debug!(name = %input.name, category_id = input.category_id, "Inserting product");

        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (name, price_cents, stock, category_id) \
             VALUES (?1, ?2, ?3, ?4) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(input.price_cents)
        .bind(input.stock)
        .bind(input.category_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(product)
    }

    /// Replaces every editable field of a product.
    pub async fn update(&self, id: i64, input: &ProductInput) -> DbResult<Product> {
        debug!(id, name = %input.name, "Updating product");

        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET name = ?1, price_cents = ?2, stock = ?3, category_id = ?4 \
             WHERE id = ?5 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(input.price_cents)
        .bind(input.stock)
        .bind(input.category_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Deletes a product.
    ///
    /// Fails with `ForeignKeyViolation` once the product appears on a sale.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
