//! # Inventory Unit Store
//!
//! Serialized physical units per product.
//!
//! ```text
//! products ──1:N──► inventory_units
//!                   ├── serial_number   UNIQUE per product
//!                   ├── seq             registration order
//!                   ├── is_retired      never hard-deleted
//!                   └── version         bumped on every assignment (CAS)
//! ```

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::fetch_product;
use rentix_core::validation::validate_serial_number;
use rentix_core::{CoreError, InventoryUnit};

pub(crate) const UNIT_COLUMNS: &str =
    "id, product_id, serial_number, is_retired, version, created_at, updated_at";

/// All units of a product in registration order, retired ones included.
pub(crate) async fn fetch_units_for_product<'e, E>(
    executor: E,
    product_id: &str,
) -> DbResult<Vec<InventoryUnit>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM inventory_units WHERE product_id = ?1 ORDER BY seq, id",
        UNIT_COLUMNS
    );
    let units = sqlx::query_as::<_, InventoryUnit>(&sql)
        .bind(product_id)
        .fetch_all(executor)
        .await?;
    Ok(units)
}

/// Repository for inventory units.
#[derive(Debug, Clone)]
pub struct UnitRepository {
    pool: SqlitePool,
}

impl UnitRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UnitRepository { pool }
    }

    /// Registers a new serialized unit for `product_id`.
    ///
    /// ## Errors
    /// - `NotFound` if the product does not exist
    /// - `UniqueViolation` if the serial number is already registered
    pub async fn register(&self, product_id: &str, serial_number: &str) -> DbResult<InventoryUnit> {
        validate_serial_number(serial_number).map_err(CoreError::from)?;

        if fetch_product(&self.pool, product_id).await?.is_none() {
            return Err(DbError::not_found("Product", product_id));
        }

        let now = Utc::now();
        let unit = InventoryUnit {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            serial_number: serial_number.trim().to_string(),
            is_retired: false,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO inventory_units (
                id, product_id, serial_number, is_retired, version, seq, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, 0, 0,
                (SELECT COALESCE(MAX(seq), 0) + 1 FROM inventory_units WHERE product_id = ?2),
                ?4, ?5
            )
            "#,
        )
        .bind(&unit.id)
        .bind(&unit.product_id)
        .bind(&unit.serial_number)
        .bind(unit.created_at)
        .bind(unit.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: unit.serial_number.clone(),
            },
            other => other,
        })?;

        debug!(unit_id = %unit.id, product_id = %product_id, serial = %unit.serial_number, "Registered unit");
        Ok(unit)
    }

    /// Gets a unit by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InventoryUnit>> {
        let sql = format!("SELECT {} FROM inventory_units WHERE id = ?1", UNIT_COLUMNS);
        let unit = sqlx::query_as::<_, InventoryUnit>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(unit)
    }

    /// Lists a product's units in registration order.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<InventoryUnit>> {
        fetch_units_for_product(&self.pool, product_id).await
    }

    /// Retires a unit. It stays referenced by past reservations but is never
    /// offered again.
    pub async fn retire(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE inventory_units SET is_retired = 1, version = version + 1, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("InventoryUnit", id));
        }

        info!(unit_id = %id, "Unit retired");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_register_keeps_order_and_uniqueness() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cam = db.products().create("Sony A7 III", 150_000).await.unwrap();

        for serial in ["A7-003", "A7-001", "A7-002"] {
            db.units().register(&cam.id, serial).await.unwrap();
        }

        let serials: Vec<String> = db
            .units()
            .list_for_product(&cam.id)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.serial_number)
            .collect();
        assert_eq!(serials, vec!["A7-003", "A7-001", "A7-002"]);

        let dup = db.units().register(&cam.id, "A7-001").await;
        assert!(matches!(dup, Err(DbError::UniqueViolation { ref value, .. }) if value == "A7-001"));
    }

    #[tokio::test]
    async fn test_same_serial_on_other_product_is_fine() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = db.products().create("A", 1).await.unwrap();
        let b = db.products().create("B", 1).await.unwrap();

        db.units().register(&a.id, "SN-1").await.unwrap();
        db.units().register(&b.id, "SN-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_register_unknown_product() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(matches!(
            db.units().register("nope", "SN-1").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_retire() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p = db.products().create("Tripod", 10_000).await.unwrap();
        let u = db.units().register(&p.id, "TR-1").await.unwrap();

        db.units().retire(&u.id).await.unwrap();
        let retired = db.units().get_by_id(&u.id).await.unwrap().unwrap();
        assert!(retired.is_retired);
        assert_eq!(retired.version, 1);
    }
}
