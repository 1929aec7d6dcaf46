//! Repositories for database operations

use common::error::DatabaseResult;
use sqlx::SqlitePool;

use crate::models::{NewProduct, Product, UpdateProduct};

/// Product repository for database operations
#[derive(Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Create a new product repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get all products
    pub async fn get_all(&self) -> DatabaseResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price, stock
            FROM products
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Get a product by ID
    pub async fn get_by_id(&self, id: i64) -> DatabaseResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price, stock
            FROM products
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Create a new product
    pub async fn create(&self, payload: &NewProduct) -> DatabaseResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, description, price, stock)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, description, price, stock
            "#,
        )
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(payload.price)
        .bind(payload.stock)
        .fetch_one(&self.pool)
        .await?;

        Ok(product)
    }

    /// Update only the fields present in `changes`
    ///
    /// Returns `None` when no product has this ID.
    pub async fn update(
        &self,
        id: i64,
        changes: &UpdateProduct,
    ) -> DatabaseResult<Option<Product>> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price, stock
            FROM products
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            return Ok(None);
        };

        let updated = changes.apply(current);

        sqlx::query(
            r#"
            UPDATE products
            SET name = ?, description = ?, price = ?, stock = ?
            WHERE id = ?
            "#,
        )
        .bind(&updated.name)
        .bind(&updated.description)
        .bind(updated.price)
        .bind(updated.stock)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(updated))
    }

    /// Delete a product by ID
    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of stored products
    pub async fn count(&self) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
