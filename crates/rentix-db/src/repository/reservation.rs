//! # Reservation Ledger
//!
//! Bookings, their reservation lines, and the unit assignments that make a
//! reservation occupy specific inventory.
//!
//! ## Ledger Query
//! ```text
//! reservation_units (product_id = ?)          reservations
//! ┌──────────────┬─────────┐                  ┌────┬──────────┬────────────┐
//! │ reservation  │ unit    │ ──── JOIN ────►  │ id │ status   │ start..end │
//! └──────────────┴─────────┘                  └────┴──────────┴────────────┘
//!        WHERE status IN (pending, confirmed, active)
//!          AND start_date <= :end AND end_date >= :start
//!        grouped back into one LedgerEntry per reservation
//! ```
//!
//! Assignment rows are never deleted. Leaving an occupying status is enough
//! for the ledger query to stop counting them.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use rentix_core::overlap::LedgerEntry;
use rentix_core::{Booking, DateRange, Reservation, ReservationStatus, UnitAssignment};

pub(crate) const BOOKING_COLUMNS: &str = "id, customer_id, start_date, end_date, duration_days, promo_id, \
     subtotal_minor, discount_minor, total_minor, down_payment_minor, remaining_minor, \
     status, notes, created_at, updated_at";

pub(crate) const RESERVATION_COLUMNS: &str = "id, booking_id, product_id, bundling_id, quantity, \
     unit_price_minor, line_total_minor, start_date, end_date, status, created_at, updated_at";

#[derive(Debug, FromRow)]
struct LedgerRow {
    reservation_id: String,
    status: ReservationStatus,
    start_date: NaiveDate,
    end_date: NaiveDate,
    unit_id: String,
}

/// Occupying ledger entries for `product_id` that overlap `range`.
pub(crate) async fn fetch_ledger<'e, E>(
    executor: E,
    product_id: &str,
    range: &DateRange,
) -> DbResult<Vec<LedgerEntry>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, LedgerRow>(
        r#"
        SELECT r.id AS reservation_id, r.status, r.start_date, r.end_date, ru.unit_id
        FROM reservation_units ru
        INNER JOIN reservations r ON r.id = ru.reservation_id
        WHERE ru.product_id = ?1
          AND r.status IN ('pending', 'confirmed', 'active')
          AND r.start_date <= ?3
          AND r.end_date >= ?2
        ORDER BY r.id, ru.unit_id
        "#,
    )
    .bind(product_id)
    .bind(range.start())
    .bind(range.end())
    .fetch_all(executor)
    .await?;

    let mut entries: Vec<LedgerEntry> = Vec::new();
    for row in rows {
        match entries.last_mut() {
            Some(last) if last.reservation_id == row.reservation_id => last.unit_ids.push(row.unit_id),
            _ => entries.push(LedgerEntry {
                reservation_id: row.reservation_id,
                status: row.status,
                start_date: row.start_date,
                end_date: row.end_date,
                unit_ids: vec![row.unit_id],
            }),
        }
    }
    Ok(entries)
}

pub(crate) async fn fetch_booking<'e, E>(executor: E, id: &str) -> DbResult<Option<Booking>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM bookings WHERE id = ?1", BOOKING_COLUMNS);
    let booking = sqlx::query_as::<_, Booking>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(booking)
}

pub(crate) async fn fetch_reservation<'e, E>(executor: E, id: &str) -> DbResult<Option<Reservation>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM reservations WHERE id = ?1", RESERVATION_COLUMNS);
    let reservation = sqlx::query_as::<_, Reservation>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(reservation)
}

pub(crate) async fn fetch_reservations_for_booking<'e, E>(
    executor: E,
    booking_id: &str,
) -> DbResult<Vec<Reservation>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM reservations WHERE booking_id = ?1 ORDER BY created_at, rowid",
        RESERVATION_COLUMNS
    );
    let reservations = sqlx::query_as::<_, Reservation>(&sql)
        .bind(booking_id)
        .fetch_all(executor)
        .await?;
    Ok(reservations)
}

// =============================================================================
// Writes (inside the booking transaction)
// =============================================================================

pub(crate) async fn insert_booking(conn: &mut SqliteConnection, booking: &Booking) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO bookings (
            id, customer_id, start_date, end_date, duration_days, promo_id,
            subtotal_minor, discount_minor, total_minor, down_payment_minor, remaining_minor,
            status, notes, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&booking.id)
    .bind(&booking.customer_id)
    .bind(booking.start_date)
    .bind(booking.end_date)
    .bind(booking.duration_days)
    .bind(&booking.promo_id)
    .bind(booking.subtotal_minor)
    .bind(booking.discount_minor)
    .bind(booking.total_minor)
    .bind(booking.down_payment_minor)
    .bind(booking.remaining_minor)
    .bind(booking.status)
    .bind(&booking.notes)
    .bind(booking.created_at)
    .bind(booking.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_reservation(conn: &mut SqliteConnection, reservation: &Reservation) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO reservations (
            id, booking_id, product_id, bundling_id, quantity,
            unit_price_minor, line_total_minor, start_date, end_date, status,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&reservation.id)
    .bind(&reservation.booking_id)
    .bind(&reservation.product_id)
    .bind(&reservation.bundling_id)
    .bind(reservation.quantity)
    .bind(reservation.unit_price_minor)
    .bind(reservation.line_total_minor)
    .bind(reservation.start_date)
    .bind(reservation.end_date)
    .bind(reservation.status)
    .bind(reservation.created_at)
    .bind(reservation.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Binds a unit to a reservation, claiming it by version.
///
/// ## Errors
/// `Conflict` if the unit's version moved since the snapshot was read, or
/// the unit was retired in the meantime.
pub(crate) async fn assign_unit(
    conn: &mut SqliteConnection,
    reservation_id: &str,
    unit_id: &str,
    product_id: &str,
    expected_version: i64,
) -> DbResult<()> {
    let claimed = sqlx::query(
        r#"
        UPDATE inventory_units
        SET version = version + 1, updated_at = ?3
        WHERE id = ?1 AND version = ?2 AND is_retired = 0
        "#,
    )
    .bind(unit_id)
    .bind(expected_version)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if claimed.rows_affected() == 0 {
        return Err(DbError::Conflict(format!(
            "unit {} changed since version {}",
            unit_id, expected_version
        )));
    }

    sqlx::query("INSERT INTO reservation_units (reservation_id, unit_id, product_id) VALUES (?1, ?2, ?3)")
        .bind(reservation_id)
        .bind(unit_id)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    debug!(reservation_id = %reservation_id, unit_id = %unit_id, "Unit assigned");
    Ok(())
}

pub(crate) async fn set_booking_status(
    conn: &mut SqliteConnection,
    booking_id: &str,
    status: ReservationStatus,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query("UPDATE bookings SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(booking_id)
        .bind(status)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn set_reservation_status(
    conn: &mut SqliteConnection,
    reservation_id: &str,
    status: ReservationStatus,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query("UPDATE reservations SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(reservation_id)
        .bind(status)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// =============================================================================
// Repository (read side)
// =============================================================================

/// Read access to bookings, reservations and assignments.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    pub async fn get_booking(&self, id: &str) -> DbResult<Option<Booking>> {
        fetch_booking(&self.pool, id).await
    }

    pub async fn get_reservation(&self, id: &str) -> DbResult<Option<Reservation>> {
        fetch_reservation(&self.pool, id).await
    }

    pub async fn for_booking(&self, booking_id: &str) -> DbResult<Vec<Reservation>> {
        fetch_reservations_for_booking(&self.pool, booking_id).await
    }

    /// Unit assignments of one reservation, kept after release for audit.
    pub async fn assignments(&self, reservation_id: &str) -> DbResult<Vec<UnitAssignment>> {
        let rows = sqlx::query_as::<_, UnitAssignment>(
            r#"
            SELECT reservation_id, unit_id, product_id
            FROM reservation_units
            WHERE reservation_id = ?1
            ORDER BY product_id, unit_id
            "#,
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Occupying ledger entries for a product overlapping `range`.
    pub async fn ledger_for_product(&self, product_id: &str, range: &DateRange) -> DbResult<Vec<LedgerEntry>> {
        fetch_ledger(&self.pool, product_id, range).await
    }

    /// Bookings of a customer, newest first.
    pub async fn bookings_for_customer(&self, customer_id: &str) -> DbResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE customer_id = ?1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        );
        let bookings = sqlx::query_as::<_, Booking>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(bookings)
    }
}
