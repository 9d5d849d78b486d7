//! # Event Outbox Repository
//!
//! Booking events written in the same transaction as the change they
//! describe, drained later by the notification dispatcher.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BookingTransactor (BEGIN IMMEDIATE)                                    │
//! │    1. INSERT bookings / reservations / reservation_units                │
//! │    2. INSERT outbox_events (booking_created, JSON payload)              │
//! │  COMMIT ← both or neither                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EventDispatcher (rentix-notify)                                        │
//! │    pending()  → WHERE dispatched_at IS NULL ORDER BY created_at         │
//! │    success    → mark_dispatched                                         │
//! │    failure    → mark_failed (attempts += 1, last_error)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use rentix_core::{BookingEvent, OutboxEvent};

const OUTBOX_COLUMNS: &str =
    "id, event_type, booking_id, payload, attempts, last_error, created_at, attempted_at, dispatched_at";

/// Appends an event inside an open transaction.
pub(crate) async fn enqueue(conn: &mut SqliteConnection, event: &BookingEvent) -> DbResult<OutboxEvent> {
    let entry = OutboxEvent {
        id: Uuid::new_v4().to_string(),
        event_type: event.event_type().to_string(),
        booking_id: event.booking_id().to_string(),
        payload: serde_json::to_string(event)?,
        attempts: 0,
        last_error: None,
        created_at: Utc::now(),
        attempted_at: None,
        dispatched_at: None,
    };

    sqlx::query(
        r#"
        INSERT INTO outbox_events (id, event_type, booking_id, payload, attempts, created_at)
        VALUES (?1, ?2, ?3, ?4, 0, ?5)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.event_type)
    .bind(&entry.booking_id)
    .bind(&entry.payload)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    debug!(event_type = %entry.event_type, booking_id = %entry.booking_id, "Event queued");
    Ok(entry)
}

/// Repository for outbox bookkeeping.
#[derive(Debug, Clone)]
pub struct OutboxRepository {
    pool: SqlitePool,
}

impl OutboxRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OutboxRepository { pool }
    }

    /// Undispatched events, oldest first, skipping ones that failed
    /// `max_attempts` times already.
    pub async fn pending(&self, limit: u32, max_attempts: u32) -> DbResult<Vec<OutboxEvent>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM outbox_events
            WHERE dispatched_at IS NULL AND attempts < ?2
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?1
            "#,
            OUTBOX_COLUMNS
        );
        let events = sqlx::query_as::<_, OutboxEvent>(&sql)
            .bind(limit)
            .bind(max_attempts)
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    /// Decodes an outbox row back into its event.
    pub fn decode(entry: &OutboxEvent) -> DbResult<BookingEvent> {
        Ok(serde_json::from_str(&entry.payload)?)
    }

    pub async fn mark_dispatched(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        sqlx::query("UPDATE outbox_events SET dispatched_at = ?2, attempted_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE outbox_events SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM outbox_events WHERE dispatched_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Gets one outbox row by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<OutboxEvent>> {
        let sql = format!("SELECT {} FROM outbox_events WHERE id = ?1", OUTBOX_COLUMNS);
        let event = sqlx::query_as::<_, OutboxEvent>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use rentix_core::ReservationStatus;

    fn event() -> BookingEvent {
        BookingEvent::StatusChanged {
            booking_id: "b-1".to_string(),
            customer_id: "c-1".to_string(),
            reservation_id: None,
            from: ReservationStatus::Pending,
            to: ReservationStatus::Confirmed,
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_enqueue_and_bookkeeping() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let entry = {
            let mut conn = db.pool().acquire().await.unwrap();
            enqueue(&mut conn, &event()).await.unwrap()
        };

        let outbox = db.outbox();
        let pending = outbox.pending(10, 5).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_type, "booking_status_changed");
        assert!(matches!(
            OutboxRepository::decode(&pending[0]).unwrap(),
            BookingEvent::StatusChanged { .. }
        ));

        outbox.mark_failed(&entry.id, "gateway timeout").await.unwrap();
        let failed = outbox.get_by_id(&entry.id).await.unwrap().unwrap();
        assert_eq!(failed.attempts, 1);
        assert_eq!(failed.last_error.as_deref(), Some("gateway timeout"));
        assert!(outbox.pending(10, 1).await.unwrap().is_empty());

        outbox.mark_dispatched(&entry.id).await.unwrap();
        assert_eq!(outbox.count_pending().await.unwrap(), 0);
    }
}
