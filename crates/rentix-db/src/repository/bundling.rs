//! # Bundling Repository
//!
//! Bundlings and their recipes. No bundle stock is stored anywhere: the
//! bundle ceiling is always recomputed from the recipe.

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::fetch_product;
use rentix_core::validation::{validate_name, validate_price_minor, validate_required_quantity};
use rentix_core::{Bundling, CoreError, RecipeLine};

pub(crate) async fn fetch_bundling<'e, E>(executor: E, id: &str) -> DbResult<Option<Bundling>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let bundling = sqlx::query_as::<_, Bundling>(
        "SELECT id, name, price_minor, is_active, created_at, updated_at FROM bundlings WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(bundling)
}

/// Recipe lines in insertion order.
pub(crate) async fn fetch_recipe<'e, E>(executor: E, bundling_id: &str) -> DbResult<Vec<RecipeLine>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let lines = sqlx::query_as::<_, RecipeLine>(
        r#"
        SELECT bundling_id, product_id, required_quantity
        FROM bundling_recipes
        WHERE bundling_id = ?1
        ORDER BY seq
        "#,
    )
    .bind(bundling_id)
    .fetch_all(executor)
    .await?;
    Ok(lines)
}

/// Repository for bundlings and recipes.
#[derive(Debug, Clone)]
pub struct BundlingRepository {
    pool: SqlitePool,
}

impl BundlingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BundlingRepository { pool }
    }

    /// Creates a bundling with an empty recipe.
    pub async fn create(&self, name: &str, price_minor: i64) -> DbResult<Bundling> {
        validate_name(name).map_err(CoreError::from)?;
        validate_price_minor(price_minor).map_err(CoreError::from)?;

        let now = Utc::now();
        let bundling = Bundling {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            price_minor,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO bundlings (id, name, price_minor, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, 1, ?4, ?5)
            "#,
        )
        .bind(&bundling.id)
        .bind(&bundling.name)
        .bind(bundling.price_minor)
        .bind(bundling.created_at)
        .bind(bundling.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %bundling.id, name = %bundling.name, "Created bundling");
        Ok(bundling)
    }

    /// Appends a recipe line.
    pub async fn add_recipe_line(
        &self,
        bundling_id: &str,
        product_id: &str,
        required_quantity: i64,
    ) -> DbResult<RecipeLine> {
        validate_required_quantity(required_quantity).map_err(CoreError::from)?;

        if fetch_bundling(&self.pool, bundling_id).await?.is_none() {
            return Err(DbError::not_found("Bundling", bundling_id));
        }
        if fetch_product(&self.pool, product_id).await?.is_none() {
            return Err(DbError::not_found("Product", product_id));
        }

        sqlx::query(
            r#"
            INSERT INTO bundling_recipes (id, bundling_id, product_id, required_quantity, seq)
            VALUES (
                ?1, ?2, ?3, ?4,
                (SELECT COALESCE(MAX(seq), 0) + 1 FROM bundling_recipes WHERE bundling_id = ?2)
            )
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(bundling_id)
        .bind(product_id)
        .bind(required_quantity)
        .execute(&self.pool)
        .await?;

        debug!(bundling_id = %bundling_id, product_id = %product_id, required_quantity, "Added recipe line");

        Ok(RecipeLine {
            bundling_id: bundling_id.to_string(),
            product_id: product_id.to_string(),
            required_quantity,
        })
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bundling>> {
        fetch_bundling(&self.pool, id).await
    }

    pub async fn recipe(&self, bundling_id: &str) -> DbResult<Vec<RecipeLine>> {
        fetch_recipe(&self.pool, bundling_id).await
    }

    /// Soft-deletes or restores a bundling.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE bundlings SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Bundling", id));
        }
        Ok(())
    }
}
