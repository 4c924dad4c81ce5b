//! # Category Repository
//!
//! Database operations for product categories.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kasir_core::{Category, CategoryInput};

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Lists all categories ordered by id.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = categories.len(), "Listed categories");
        Ok(categories)
    }

    /// Gets a category by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Inserts a new category and returns it with its assigned id.
    pub async fn insert(&self, input: &CategoryInput) -> DbResult<Category> {
        debug!(name = %input.name, "Inserting category");

        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description)
            VALUES (?1, ?2)
            RETURNING id, name, description
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    /// Replaces a category's name and description.
    pub async fn update(&self, id: i64, input: &CategoryInput) -> DbResult<Category> {
        debug!(id, name = %input.name, "Updating category");

        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET name = ?1, description = ?2
            WHERE id = ?3
            RETURNING id, name, description
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Deletes a category.
    ///
    /// Fails with `ForeignKeyViolation` while products still reference it.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting category");

        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use crate::DbError;
    use kasir_core::{CategoryInput, ProductInput};

    fn input(name: &str) -> CategoryInput {
        CategoryInput {
            name: name.to_string(),
            description: Some(format!("{name} items")),
        }
    }

    #[tokio::test]
    async fn test_category_crud() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.categories();

        let drinks = repo.insert(&input("Drinks")).await.unwrap();
        assert!(drinks.id > 0);
        assert_eq!(drinks.description.as_deref(), Some("Drinks items"));

        let renamed = repo
            .update(
                drinks.id,
                &CategoryInput {
                    name: "Beverages".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Beverages");
        assert_eq!(renamed.description, None);

        assert_eq!(repo.list().await.unwrap(), vec![renamed.clone()]);

        repo.delete(drinks.id).await.unwrap();
        assert!(repo.get_by_id(drinks.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_category_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.categories();

        assert!(matches!(
            repo.update(99, &input("Ghost")).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(repo.delete(99).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_referenced_category_fails() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let category = db.categories().insert(&input("Snacks")).await.unwrap();
        db.products()
            .insert(&ProductInput {
                name: "Chips".to_string(),
                price_cents: 1200,
                stock: 3,
                category_id: category.id,
            })
            .await
            .unwrap();

        let err = db.categories().delete(category.id).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
