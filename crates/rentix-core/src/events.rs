//! # Booking Events
//!
//! Side effects of the booking transactor, expressed as data.
//!
//! ```text
//! BookingTransactor ──► Vec<BookingEvent> ──► outbox_events (same tx)
//!                                                   │
//!                                                   ▼
//!                                   rentix-notify::EventDispatcher
//! ```
//!
//! Events are serialized as JSON into the outbox `payload` column.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::ReservationStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingEvent {
    /// A booking and all of its reservation lines were written.
    Created {
        booking_id: String,
        customer_id: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        line_count: usize,
        total: Money,
        down_payment: Money,
        remaining: Money,
        occurred_at: DateTime<Utc>,
    },
    /// A booking, or one of its lines when `reservation_id` is set, changed status.
    StatusChanged {
        booking_id: String,
        customer_id: String,
        reservation_id: Option<String>,
        from: ReservationStatus,
        to: ReservationStatus,
        occurred_at: DateTime<Utc>,
    },
}

impl BookingEvent {
    /// Outbox `event_type` column value.
    pub fn event_type(&self) -> &'static str {
        match self {
            BookingEvent::Created { .. } => "booking_created",
            BookingEvent::StatusChanged { .. } => "booking_status_changed",
        }
    }

    pub fn booking_id(&self) -> &str {
        match self {
            BookingEvent::Created { booking_id, .. }
            | BookingEvent::StatusChanged { booking_id, .. } => booking_id,
        }
    }

    pub fn customer_id(&self) -> &str {
        match self {
            BookingEvent::Created { customer_id, .. }
            | BookingEvent::StatusChanged { customer_id, .. } => customer_id,
        }
    }
}
