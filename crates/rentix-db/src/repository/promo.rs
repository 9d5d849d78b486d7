//! # Promo Repository
//!
//! Read-only promo lookup for the booking transactor, plus promo creation for
//! imports. The rule is stored as tagged JSON in `rule_json`.

use chrono::Utc;
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use rentix_core::validation::validate_name;
use rentix_core::{CoreError, Promo, PromoRule};

#[derive(Debug, FromRow)]
struct PromoRow {
    id: String,
    name: String,
    rule_json: String,
    is_active: bool,
}

impl TryFrom<PromoRow> for Promo {
    type Error = DbError;

    fn try_from(row: PromoRow) -> DbResult<Promo> {
        let rule: PromoRule = serde_json::from_str(&row.rule_json)
            .map_err(|e| DbError::CorruptData(format!("promo {}: {}", row.id, e)))?;
        Ok(Promo {
            id: row.id,
            name: row.name,
            rule,
            is_active: row.is_active,
        })
    }
}

pub(crate) async fn fetch_promo<'e, E>(executor: E, id: &str) -> DbResult<Option<Promo>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, PromoRow>(
        "SELECT id, name, rule_json, is_active FROM promos WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    row.map(Promo::try_from).transpose()
}

#[derive(Debug, Clone)]
pub struct PromoRepository {
    pool: SqlitePool,
}

impl PromoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PromoRepository { pool }
    }

    /// Creates a promo. Malformed rules are rejected here so
    /// they never reach the calculator from this path.
    pub async fn create(&self, name: &str, rule: PromoRule) -> DbResult<Promo> {
        validate_name(name).map_err(CoreError::from)?;
        rule.validate()?;

        let promo = Promo {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            rule,
            is_active: true,
        };
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO promos (id, name, rule_json, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, 1, ?4, ?4)
            "#,
        )
        .bind(&promo.id)
        .bind(&promo.name)
        .bind(serde_json::to_string(&promo.rule)?)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(id = %promo.id, name = %promo.name, "Created promo");
        Ok(promo)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Promo>> {
        fetch_promo(&self.pool, id).await
    }

    /// Enables or disables a promo. Disabled promos give no discount.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE promos SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Promo", id));
        }
        Ok(())
    }
}
