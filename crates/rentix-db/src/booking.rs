//! # Booking Transactor
//!
//! Validate → compute availability → allocate units → write ledger → emit
//! events, as one unit of work.
//!
//! ## Concurrency Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  pool.begin_with(BEGIN IMMEDIATE)                                       │
//! │       │                   ← takes the SQLite write lock up front;       │
//! │       │                     other writers wait up to busy_timeout       │
//! │       ▼                                                                 │
//! │  load InventorySnapshot   ← products, units (+version), recipes, ledger │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  rentix_core::plan_booking (pure)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT booking, reservations                                           │
//! │  UPDATE inventory_units SET version = version + 1                       │
//! │         WHERE id = ? AND version = ?    ← 0 rows → Conflict             │
//! │  INSERT reservation_units, outbox_events                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT  (error or dropped future → ROLLBACK, nothing written)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Conflict` (lost version race, or `SQLITE_BUSY`) retries the whole unit of
//! work up to `BookingConfig::max_conflict_retries` times. Every other error
//! is returned as-is.
//!
//! While a transaction is open, all SQL runs on that one connection; the pool
//! is never touched, so a single-connection pool cannot deadlock.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, info, warn};

use rentix_core::availability::{available_units, product_status};
use rentix_core::booking::{plan_booking, BookingTotals};
use rentix_core::bundling::{allocate_bundle_units, available_bundles, bundling_status};
use rentix_core::status::transition;
use rentix_core::{
    Booking, BookingConfig, BookingEvent, BookingRequest, Clock, CoreError, DateRange,
    InventoryUnit, ItemRef, ProductStatus, Reservation, ReservationStatus, UnitAssignment,
};

use crate::error::DbResult;
use crate::repository::customer::fetch_customer;
use crate::repository::outbox::enqueue;
use crate::repository::promo::fetch_promo;
use crate::repository::reservation::{
    assign_unit, fetch_booking, fetch_reservation, fetch_reservations_for_booking, insert_booking,
    insert_reservation, set_booking_status, set_reservation_status,
};
use crate::snapshot::load_snapshot;

// =============================================================================
// Results
// =============================================================================

/// Everything written by a successful create-reservation.
#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub booking: Booking,
    pub reservations: Vec<Reservation>,
    pub assignments: Vec<UnitAssignment>,
    pub totals: BookingTotals,
    pub events: Vec<BookingEvent>,
}

/// Result of a status update.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub booking: Booking,
    pub reservations: Vec<Reservation>,
    pub events: Vec<BookingEvent>,
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Write transaction holding the SQLite lock from its first statement.
///
/// Dropping it without `commit` (error, cancelled future) rolls back.
async fn begin_immediate(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

// =============================================================================
// Booking Transactor
// =============================================================================

/// Transactional booking service over a SQLite pool.
#[derive(Clone)]
pub struct BookingTransactor {
    pool: SqlitePool,
    config: BookingConfig,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for BookingTransactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookingTransactor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BookingTransactor {
    pub fn new(pool: SqlitePool, config: BookingConfig, clock: Arc<dyn Clock>) -> Self {
        BookingTransactor { pool, config, clock }
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    /// Runs `op` again while it fails with a retryable error, up to the
    /// configured limit.
    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> DbResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Err(e) if e.is_retryable() && attempt < self.config.max_conflict_retries => {
                    attempt += 1;
                    warn!(operation = what, attempt, error = %e, "Conflict, retrying");
                    tokio::task::yield_now().await;
                }
                other => return other,
            }
        }
    }

    // -------------------------------------------------------------------------
    // Create
    // -------------------------------------------------------------------------

    /// Creates a booking with all its lines, or nothing.
    ///
    /// ## Errors
    /// - `Domain(InvalidRange)` / `Domain(Validation)` for a bad request
    /// - `Domain(NotFound)` for an unknown customer, promo, product or bundling
    /// - `Domain(InsufficientInventory)` naming the first short line
    /// - `Conflict` if retries are exhausted
    pub async fn create_booking(&self, request: &BookingRequest) -> DbResult<BookingOutcome> {
        let outcome = self
            .with_retry("create_booking", || self.try_create_booking(request))
            .await?;

        info!(
            booking_id = %outcome.booking.id,
            customer_id = %outcome.booking.customer_id,
            lines = outcome.reservations.len(),
            units = outcome.assignments.len(),
            total = outcome.booking.total_minor,
            "Booking created"
        );
        Ok(outcome)
    }

    async fn try_create_booking(&self, request: &BookingRequest) -> DbResult<BookingOutcome> {
        let today = self.clock.today();
        // Cheap checks first, before taking the write lock.
        let range = request.validate(&self.config, today)?;

        let mut tx = begin_immediate(&self.pool).await?;
        let outcome = self.create_in_tx(&mut tx, request, &range, today).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn create_in_tx(
        &self,
        conn: &mut SqliteConnection,
        request: &BookingRequest,
        range: &DateRange,
        today: NaiveDate,
    ) -> DbResult<BookingOutcome> {
        if fetch_customer(&mut *conn, &request.customer_id).await?.is_none() {
            return Err(CoreError::not_found("Customer", &request.customer_id).into());
        }

        let promo = match &request.promo_id {
            Some(id) => Some(
                fetch_promo(&mut *conn, id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("Promo", id))?,
            ),
            None => None,
        };

        let items: Vec<ItemRef> = request.lines.iter().map(|l| l.item.clone()).collect();
        let mut snapshot = load_snapshot(&mut *conn, &items, range).await?;
        let plan = plan_booking(&mut snapshot, request, promo.as_ref(), &self.config, today)?;

        let now = self.clock.now();
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: request.customer_id.clone(),
            start_date: plan.range.start(),
            end_date: plan.range.end(),
            duration_days: plan.range.days(),
            promo_id: request.promo_id.clone(),
            subtotal_minor: plan.totals.subtotal.minor(),
            discount_minor: plan.totals.discount.minor(),
            total_minor: plan.totals.total.minor(),
            down_payment_minor: plan.totals.down_payment.minor(),
            remaining_minor: plan.totals.remaining.minor(),
            status: ReservationStatus::Pending,
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        insert_booking(&mut *conn, &booking).await?;

        let mut reservations = Vec::with_capacity(plan.lines.len());
        let mut assignments = Vec::new();

        for line in &plan.lines {
            let (product_id, bundling_id) = match &line.item {
                ItemRef::Product { product_id } => (Some(product_id.clone()), None),
                ItemRef::Bundling { bundling_id } => (None, Some(bundling_id.clone())),
            };
            let reservation = Reservation {
                id: line.reservation_id.clone(),
                booking_id: booking.id.clone(),
                product_id,
                bundling_id,
                quantity: line.quantity,
                unit_price_minor: line.unit_price.minor(),
                line_total_minor: line.line_total.minor(),
                start_date: plan.range.start(),
                end_date: plan.range.end(),
                status: ReservationStatus::Pending,
                created_at: now,
                updated_at: now,
            };
            insert_reservation(&mut *conn, &reservation).await?;

            for unit in &line.units {
                assign_unit(&mut *conn, &reservation.id, &unit.unit_id, &unit.product_id, unit.version).await?;
                assignments.push(UnitAssignment {
                    reservation_id: reservation.id.clone(),
                    unit_id: unit.unit_id.clone(),
                    product_id: unit.product_id.clone(),
                });
            }

            debug!(
                reservation_id = %reservation.id,
                item = %line.item_name,
                quantity = line.quantity,
                "Reservation written"
            );
            reservations.push(reservation);
        }

        let event = BookingEvent::Created {
            booking_id: booking.id.clone(),
            customer_id: booking.customer_id.clone(),
            start_date: booking.start_date,
            end_date: booking.end_date,
            line_count: reservations.len(),
            total: plan.totals.total,
            down_payment: plan.totals.down_payment,
            remaining: plan.totals.remaining,
            occurred_at: now,
        };
        enqueue(&mut *conn, &event).await?;

        Ok(BookingOutcome {
            booking,
            reservations,
            assignments,
            totals: plan.totals,
            events: vec![event],
        })
    }

    // -------------------------------------------------------------------------
    // Status updates
    // -------------------------------------------------------------------------

    /// Moves a booking and its lines to `to`.
    ///
    /// Lines follow when they are still in the booking's status. Cancelling
    /// takes every line that can still be cancelled, whatever its own status.
    /// No units are allocated on occupying transitions; leaving an occupying
    /// status releases units logically (assignments are kept).
    pub async fn update_booking_status(&self, booking_id: &str, to: ReservationStatus) -> DbResult<StatusChange> {
        let change = self
            .with_retry("update_booking_status", || self.try_update_booking(booking_id, to))
            .await?;
        info!(booking_id = %booking_id, status = %to, "Booking status updated");
        Ok(change)
    }

    async fn try_update_booking(&self, booking_id: &str, to: ReservationStatus) -> DbResult<StatusChange> {
        let mut tx = begin_immediate(&self.pool).await?;
        let change = self.update_booking_in_tx(&mut tx, booking_id, to).await?;
        tx.commit().await?;
        Ok(change)
    }

    async fn update_booking_in_tx(
        &self,
        conn: &mut SqliteConnection,
        booking_id: &str,
        to: ReservationStatus,
    ) -> DbResult<StatusChange> {
        let mut booking = fetch_booking(&mut *conn, booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", booking_id))?;
        let from = booking.status;
        transition(from, to)?;

        let now = self.clock.now();
        set_booking_status(&mut *conn, booking_id, to, now).await?;
        booking.status = to;
        booking.updated_at = now;

        let mut reservations = fetch_reservations_for_booking(&mut *conn, booking_id).await?;
        for reservation in reservations.iter_mut() {
            let follows = to == ReservationStatus::Cancelled || reservation.status == from;
            if !follows || !reservation.status.can_transition_to(to) {
                continue;
            }
            set_reservation_status(&mut *conn, &reservation.id, to, now).await?;
            reservation.status = to;
            reservation.updated_at = now;
        }

        let event = BookingEvent::StatusChanged {
            booking_id: booking.id.clone(),
            customer_id: booking.customer_id.clone(),
            reservation_id: None,
            from,
            to,
            occurred_at: now,
        };
        enqueue(&mut *conn, &event).await?;

        Ok(StatusChange {
            booking,
            reservations,
            events: vec![event],
        })
    }

    /// Moves a single reservation line to `to`.
    ///
    /// When every line of the booking ends up in `to`, the booking follows.
    pub async fn update_reservation_status(
        &self,
        reservation_id: &str,
        to: ReservationStatus,
    ) -> DbResult<StatusChange> {
        let change = self
            .with_retry("update_reservation_status", || self.try_update_reservation(reservation_id, to))
            .await?;
        info!(reservation_id = %reservation_id, status = %to, "Reservation status updated");
        Ok(change)
    }

    async fn try_update_reservation(&self, reservation_id: &str, to: ReservationStatus) -> DbResult<StatusChange> {
        let mut tx = begin_immediate(&self.pool).await?;
        let change = self.update_reservation_in_tx(&mut tx, reservation_id, to).await?;
        tx.commit().await?;
        Ok(change)
    }

    async fn update_reservation_in_tx(
        &self,
        conn: &mut SqliteConnection,
        reservation_id: &str,
        to: ReservationStatus,
    ) -> DbResult<StatusChange> {
        let reservation = fetch_reservation(&mut *conn, reservation_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Reservation", reservation_id))?;
        let from = reservation.status;
        transition(from, to)?;

        let now = self.clock.now();
        set_reservation_status(&mut *conn, reservation_id, to, now).await?;

        let mut booking = fetch_booking(&mut *conn, &reservation.booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", &reservation.booking_id))?;
        let reservations = fetch_reservations_for_booking(&mut *conn, &booking.id).await?;

        let mut events = vec![BookingEvent::StatusChanged {
            booking_id: booking.id.clone(),
            customer_id: booking.customer_id.clone(),
            reservation_id: Some(reservation_id.to_string()),
            from,
            to,
            occurred_at: now,
        }];

        if reservations.iter().all(|r| r.status == to) && booking.status.can_transition_to(to) {
            let booking_from = booking.status;
            set_booking_status(&mut *conn, &booking.id, to, now).await?;
            booking.status = to;
            booking.updated_at = now;
            events.push(BookingEvent::StatusChanged {
                booking_id: booking.id.clone(),
                customer_id: booking.customer_id.clone(),
                reservation_id: None,
                from: booking_from,
                to,
                occurred_at: now,
            });
        }

        for event in &events {
            enqueue(&mut *conn, event).await?;
        }

        Ok(StatusChange {
            booking,
            reservations,
            events,
        })
    }

    // -------------------------------------------------------------------------
    // Availability queries (read-only)
    // -------------------------------------------------------------------------

    async fn read_snapshot(&self, item: ItemRef, range: &DateRange) -> DbResult<rentix_core::InventorySnapshot> {
        let mut tx = self.pool.begin().await?;
        let snapshot = load_snapshot(&mut tx, std::slice::from_ref(&item), range).await?;
        tx.commit().await?;
        Ok(snapshot)
    }

    /// Free units of a product for `[start, end]`, in registration order.
    pub async fn available_units(
        &self,
        product_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<InventoryUnit>> {
        let range = DateRange::new(start, end)?;
        let snapshot = self.read_snapshot(ItemRef::product(product_id), &range).await?;
        let units = available_units(&snapshot, product_id, &range)?
            .into_iter()
            .cloned()
            .collect();
        Ok(units)
    }

    /// Number of free units of a product for `[start, end]`.
    pub async fn available_count(&self, product_id: &str, start: NaiveDate, end: NaiveDate) -> DbResult<i64> {
        Ok(self.available_units(product_id, start, end).await?.len() as i64)
    }

    /// How many complete bundles can be rented for `[start, end]`.
    pub async fn available_bundles(&self, bundling_id: &str, start: NaiveDate, end: NaiveDate) -> DbResult<i64> {
        let range = DateRange::new(start, end)?;
        let snapshot = self.read_snapshot(ItemRef::bundling(bundling_id), &range).await?;
        Ok(available_bundles(&snapshot, bundling_id, &range)?)
    }

    /// Which units `bundle_quantity` bundles would get right now.
    ///
    /// Nothing is reserved: `create_booking` re-allocates under the write lock.
    pub async fn allocate_bundle_units(
        &self,
        bundling_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        bundle_quantity: i64,
    ) -> DbResult<BTreeMap<String, Vec<String>>> {
        let range = DateRange::new(start, end)?;
        let snapshot = self.read_snapshot(ItemRef::bundling(bundling_id), &range).await?;
        Ok(allocate_bundle_units(&snapshot, bundling_id, &range, bundle_quantity)?)
    }

    /// Derived status of a product for today's date.
    pub async fn product_status(&self, product_id: &str) -> DbResult<ProductStatus> {
        let today = self.clock.today();
        let snapshot = self
            .read_snapshot(ItemRef::product(product_id), &DateRange::single_day(today))
            .await?;
        Ok(product_status(&snapshot, product_id, today)?)
    }

    /// Derived status of a bundling for today's date.
    pub async fn bundling_status(&self, bundling_id: &str) -> DbResult<ProductStatus> {
        let today = self.clock.today();
        let snapshot = self
            .read_snapshot(ItemRef::bundling(bundling_id), &DateRange::single_day(today))
            .await?;
        Ok(bundling_status(&snapshot, bundling_id, today)?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use rentix_core::{FixedClock, LineItem, PromoRule};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, day).unwrap()
    }

    struct Fixture {
        db: Database,
        bookings: BookingTransactor,
        customer_id: String,
        camera_id: String,
        mic_id: String,
        kit_id: String,
    }

    /// 2 cameras, 3 mics, a kit of 1 camera + 2 mics; today is 1 Aug 2026.
    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = db.customers().create("Budi", "081234567890").await.unwrap();
        let camera = db.products().create("Sony A7 III", 150_000).await.unwrap();
        let mic = db.products().create("Rode Wireless", 50_000).await.unwrap();
        for n in 0..2 {
            db.units().register(&camera.id, &format!("A7-{n}")).await.unwrap();
        }
        for n in 0..3 {
            db.units().register(&mic.id, &format!("RW-{n}")).await.unwrap();
        }
        let kit = db.bundlings().create("Vlog Kit", 180_000).await.unwrap();
        db.bundlings().add_recipe_line(&kit.id, &camera.id, 1).await.unwrap();
        db.bundlings().add_recipe_line(&kit.id, &mic.id, 2).await.unwrap();

        let bookings = db.bookings_with_clock(BookingConfig::default(), Arc::new(FixedClock::on(d(1))));

        Fixture {
            db,
            bookings,
            customer_id: customer.id,
            camera_id: camera.id,
            mic_id: mic.id,
            kit_id: kit.id,
        }
    }

    fn request(customer_id: &str, start: u32, end: u32, lines: Vec<LineItem>) -> BookingRequest {
        BookingRequest {
            customer_id: customer_id.to_string(),
            start_date: d(start),
            end_date: Some(d(end)),
            duration_days: None,
            lines,
            promo_id: None,
            down_payment_minor: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_booking_writes_everything() {
        let f = fixture().await;
        let req = request(
            &f.customer_id,
            10,
            12,
            vec![LineItem::product(&f.camera_id, 1), LineItem::bundling(&f.kit_id, 1)],
        );

        let outcome = f.bookings.create_booking(&req).await.unwrap();
        assert_eq!(outcome.reservations.len(), 2);
        assert_eq!(outcome.assignments.len(), 4);
        assert_eq!(outcome.booking.subtotal_minor, 330_000);
        assert_eq!(outcome.booking.down_payment_minor, 165_000);
        assert_eq!(outcome.booking.status, ReservationStatus::Pending);
        assert_eq!(outcome.events[0].event_type(), "booking_created");

        let stored = f.db.reservations().for_booking(&outcome.booking.id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(f.db.outbox().count_pending().await.unwrap(), 1);

        assert_eq!(f.bookings.available_count(&f.camera_id, d(11), d(13)).await.unwrap(), 0);
        assert_eq!(f.bookings.available_count(&f.mic_id, d(11), d(13)).await.unwrap(), 1);
        assert_eq!(f.bookings.available_count(&f.camera_id, d(13), d(15)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insufficient_inventory_writes_nothing() {
        let f = fixture().await;
        let req = request(
            &f.customer_id,
            10,
            12,
            vec![LineItem::product(&f.mic_id, 2), LineItem::bundling(&f.kit_id, 1)],
        );

        let err = f.bookings.create_booking(&req).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientInventory { line: 1, .. })
        ));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reservations")
            .fetch_one(f.db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(f.db.outbox().count_pending().await.unwrap(), 0);
        assert_eq!(f.bookings.available_count(&f.mic_id, d(10), d(12)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_shared_boundary_day_conflicts() {
        let f = fixture().await;
        let first = request(&f.customer_id, 10, 12, vec![LineItem::product(&f.camera_id, 2)]);
        f.bookings.create_booking(&first).await.unwrap();

        // Pickup on the return day of the previous rental.
        let second = request(&f.customer_id, 12, 14, vec![LineItem::product(&f.camera_id, 1)]);
        let err = f.bookings.create_booking(&second).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientInventory { line: 0, available: 0, requested: 1, .. })
        ));

        let next_day = request(&f.customer_id, 13, 14, vec![LineItem::product(&f.camera_id, 1)]);
        assert!(f.bookings.create_booking(&next_day).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_customer_and_promo() {
        let f = fixture().await;
        let req = request("nobody", 10, 12, vec![LineItem::product(&f.camera_id, 1)]);
        assert!(matches!(
            f.bookings.create_booking(&req).await,
            Err(DbError::Domain(CoreError::NotFound { .. }))
        ));

        let mut req = request(&f.customer_id, 10, 12, vec![LineItem::product(&f.camera_id, 1)]);
        req.promo_id = Some("ghost".to_string());
        assert!(matches!(
            f.bookings.create_booking(&req).await,
            Err(DbError::Domain(CoreError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_past_start_rejected() {
        let f = fixture().await;
        let clock = Arc::new(FixedClock::on(d(20)));
        let late = f.db.bookings_with_clock(BookingConfig::default(), clock);
        let req = request(&f.customer_id, 10, 12, vec![LineItem::product(&f.camera_id, 1)]);

        assert!(matches!(
            late.create_booking(&req).await,
            Err(DbError::Domain(CoreError::InvalidRange { .. }))
        ));
    }

    #[tokio::test]
    async fn test_promo_applied_from_store() {
        let f = fixture().await;
        let promo = f
            .db
            .promos()
            .create("Rent 3 pay 1", PromoRule::DayBased { group_size: 3, pay_days: 1 })
            .await
            .unwrap();

        let mut req = request(&f.customer_id, 10, 10, vec![LineItem::product(&f.camera_id, 1)]);
        req.end_date = None;
        req.duration_days = Some(7);
        req.promo_id = Some(promo.id.clone());
        req.down_payment_minor = Some(0);

        let outcome = f.bookings.create_booking(&req).await.unwrap();
        assert_eq!(outcome.booking.end_date, d(17));
        assert_eq!(outcome.booking.duration_days, 7);
        // 150_000 × 4/7 = 85_714.28… → 85_714
        assert_eq!(outcome.booking.discount_minor, 85_714);
        assert_eq!(outcome.booking.total_minor, 64_286);
        assert_eq!(outcome.booking.remaining_minor, 64_286);
    }

    #[tokio::test]
    async fn test_cancel_releases_and_second_cancel_fails() {
        let f = fixture().await;
        let req = request(&f.customer_id, 10, 12, vec![LineItem::product(&f.camera_id, 2)]);
        let outcome = f.bookings.create_booking(&req).await.unwrap();
        assert_eq!(f.bookings.available_count(&f.camera_id, d(10), d(12)).await.unwrap(), 0);

        let change = f
            .bookings
            .update_booking_status(&outcome.booking.id, ReservationStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(change.booking.status, ReservationStatus::Cancelled);
        assert!(change.reservations.iter().all(|r| r.status == ReservationStatus::Cancelled));
        assert_eq!(f.bookings.available_count(&f.camera_id, d(10), d(12)).await.unwrap(), 2);

        // Assignments stay for audit.
        let kept = f.db.reservations().assignments(&outcome.reservations[0].id).await.unwrap();
        assert_eq!(kept.len(), 2);

        let again = f
            .bookings
            .update_booking_status(&outcome.booking.id, ReservationStatus::Cancelled)
            .await;
        assert!(matches!(
            again,
            Err(DbError::Domain(CoreError::InvalidTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn test_cancel_takes_lines_already_moved_ahead() {
        let f = fixture().await;
        let req = request(
            &f.customer_id,
            10,
            12,
            vec![LineItem::product(&f.camera_id, 1), LineItem::product(&f.mic_id, 1)],
        );
        let outcome = f.bookings.create_booking(&req).await.unwrap();
        let id = outcome.booking.id.clone();

        // The camera line is confirmed on its own; the booking stays pending.
        let change = f
            .bookings
            .update_reservation_status(&outcome.reservations[0].id, ReservationStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(change.booking.status, ReservationStatus::Pending);

        let change = f.bookings.update_booking_status(&id, ReservationStatus::Cancelled).await.unwrap();
        assert_eq!(change.booking.status, ReservationStatus::Cancelled);
        assert!(change.reservations.iter().all(|r| r.status == ReservationStatus::Cancelled));

        let stored = f.db.reservations().for_booking(&id).await.unwrap();
        assert!(stored.iter().all(|r| r.status == ReservationStatus::Cancelled));
        assert_eq!(f.bookings.available_count(&f.camera_id, d(10), d(12)).await.unwrap(), 2);
        assert_eq!(f.bookings.available_count(&f.mic_id, d(10), d(12)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_confirm_leaves_lines_cancelled_on_their_own() {
        let f = fixture().await;
        let req = request(
            &f.customer_id,
            10,
            12,
            vec![LineItem::product(&f.camera_id, 1), LineItem::product(&f.mic_id, 1)],
        );
        let outcome = f.bookings.create_booking(&req).await.unwrap();
        f.bookings
            .update_reservation_status(&outcome.reservations[1].id, ReservationStatus::Cancelled)
            .await
            .unwrap();

        let change = f
            .bookings
            .update_booking_status(&outcome.booking.id, ReservationStatus::Confirmed)
            .await
            .unwrap();
        let statuses: Vec<_> = change.reservations.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![ReservationStatus::Confirmed, ReservationStatus::Cancelled]);
    }

    #[tokio::test]
    async fn test_missing_targets_are_domain_not_found() {
        let f = fixture().await;
        assert!(matches!(
            f.bookings.update_booking_status("nope", ReservationStatus::Confirmed).await,
            Err(DbError::Domain(CoreError::NotFound { .. }))
        ));
        assert!(matches!(
            f.bookings.update_reservation_status("nope", ReservationStatus::Confirmed).await,
            Err(DbError::Domain(CoreError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_oversized_price_rejected_before_booking() {
        let f = fixture().await;
        let err = f.db.products().create("Cinema rig", i64::MAX / 2).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_dropped_write_transaction_rolls_back() {
        let f = fixture().await;
        {
            let mut tx = begin_immediate(f.db.pool()).await.unwrap();
            sqlx::query("UPDATE products SET name = 'half-written' WHERE id = ?1")
                .bind(&f.camera_id)
                .execute(&mut *tx)
                .await
                .unwrap();
            // Dropped without commit, as when a caller abandons the future.
        }

        let camera = f.db.products().get_by_id(&f.camera_id).await.unwrap().unwrap();
        assert_eq!(camera.name, "Sony A7 III");

        // The single pooled connection is usable for the next writer.
        let req = request(&f.customer_id, 10, 12, vec![LineItem::product(&f.camera_id, 1)]);
        assert!(f.bookings.create_booking(&req).await.is_ok());
    }

    #[tokio::test]
    async fn test_full_lifecycle_and_invalid_skip() {
        let f = fixture().await;
        let req = request(&f.customer_id, 10, 12, vec![LineItem::product(&f.camera_id, 1)]);
        let id = f.bookings.create_booking(&req).await.unwrap().booking.id;

        assert!(matches!(
            f.bookings.update_booking_status(&id, ReservationStatus::Completed).await,
            Err(DbError::Domain(CoreError::InvalidTransition { .. }))
        ));

        for status in [ReservationStatus::Confirmed, ReservationStatus::Active] {
            f.bookings.update_booking_status(&id, status).await.unwrap();
            // Occupying transitions keep the unit taken.
            assert_eq!(f.bookings.available_count(&f.camera_id, d(10), d(12)).await.unwrap(), 1);
        }
        f.bookings.update_booking_status(&id, ReservationStatus::Completed).await.unwrap();
        assert_eq!(f.bookings.available_count(&f.camera_id, d(10), d(12)).await.unwrap(), 2);
        // 1 created + 3 status changes
        assert_eq!(f.db.outbox().count_pending().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_reservation_status_rolls_up_to_booking() {
        let f = fixture().await;
        let req = request(
            &f.customer_id,
            10,
            12,
            vec![LineItem::product(&f.camera_id, 1), LineItem::product(&f.mic_id, 1)],
        );
        let outcome = f.bookings.create_booking(&req).await.unwrap();
        let (first, second) = (&outcome.reservations[0].id, &outcome.reservations[1].id);

        let change = f
            .bookings
            .update_reservation_status(first, ReservationStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(change.booking.status, ReservationStatus::Pending);
        assert_eq!(change.events.len(), 1);
        assert_eq!(f.bookings.available_count(&f.camera_id, d(10), d(12)).await.unwrap(), 2);
        assert_eq!(f.bookings.available_count(&f.mic_id, d(10), d(12)).await.unwrap(), 2);

        let change = f
            .bookings
            .update_reservation_status(second, ReservationStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(change.booking.status, ReservationStatus::Cancelled);
        assert_eq!(change.events.len(), 2);
    }

    #[tokio::test]
    async fn test_bundle_queries() {
        let f = fixture().await;
        assert_eq!(f.bookings.available_bundles(&f.kit_id, d(10), d(12)).await.unwrap(), 1);

        let preview = f
            .bookings
            .allocate_bundle_units(&f.kit_id, d(10), d(12), 1)
            .await
            .unwrap();
        assert_eq!(preview[&f.camera_id].len(), 1);
        assert_eq!(preview[&f.mic_id].len(), 2);

        assert!(matches!(
            f.bookings.allocate_bundle_units(&f.kit_id, d(10), d(12), 2).await,
            Err(DbError::Domain(CoreError::InsufficientInventory { .. }))
        ));
        assert!(matches!(
            f.bookings.available_bundles(&f.kit_id, d(12), d(10)).await,
            Err(DbError::Domain(CoreError::InvalidRange { .. }))
        ));
    }

    #[tokio::test]
    async fn test_derived_status() {
        let f = fixture().await;
        assert_eq!(f.bookings.product_status(&f.camera_id).await.unwrap(), ProductStatus::Available);

        // Today is 1 Aug: book both cameras over it.
        let req = request(&f.customer_id, 1, 3, vec![LineItem::product(&f.camera_id, 2)]);
        f.bookings.create_booking(&req).await.unwrap();

        assert_eq!(f.bookings.product_status(&f.camera_id).await.unwrap(), ProductStatus::Unavailable);
        assert_eq!(f.bookings.bundling_status(&f.kit_id).await.unwrap(), ProductStatus::Unavailable);
        assert_eq!(f.bookings.product_status(&f.mic_id).await.unwrap(), ProductStatus::Available);
    }

    #[tokio::test]
    async fn test_retired_unit_not_offered() {
        let f = fixture().await;
        let units = f.db.units().list_for_product(&f.camera_id).await.unwrap();
        f.db.units().retire(&units[0].id).await.unwrap();

        let free = f.bookings.available_units(&f.camera_id, d(10), d(12)).await.unwrap();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].id, units[1].id);
    }

    #[tokio::test]
    async fn test_concurrent_bookings_single_winner() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("race.db")).max_connections(8))
            .await
            .unwrap();
        let customer = db.customers().create("Sari", "081298765432").await.unwrap();
        let lens = db.products().create("Canon 70-200", 120_000).await.unwrap();
        db.units().register(&lens.id, "L-1").await.unwrap();

        let bookings = db.bookings_with_clock(BookingConfig::default(), Arc::new(FixedClock::on(d(1))));

        fn assert_send<T: Send>(_: &T) {}
        let sample = request(&customer.id, 10, 12, vec![LineItem::product(&lens.id, 1)]);
        assert_send(&bookings.create_booking(&sample));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let bookings = bookings.clone();
            let req = request(&customer.id, 10, 12, vec![LineItem::product(&lens.id, 1)]);
            handles.push(tokio::spawn(async move { bookings.create_booking(&req).await }));
        }

        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(DbError::Domain(CoreError::InsufficientInventory { .. })) | Err(DbError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(wins, 1);

        let assigned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reservation_units")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(assigned, 1);
        db.close().await;
    }
}
