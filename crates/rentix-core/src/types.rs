//! # Domain Types
//!
//! Core domain types used throughout Rentix.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐ 1:N ┌─────────────────┐                           │
//! │  │    Product      │────►│  InventoryUnit  │  serial_number, retired   │
//! │  └───────▲─────────┘     └────────▲────────┘                           │
//! │          │ N:M (RecipeLine)       │ assigned via                        │
//! │  ┌───────┴─────────┐     ┌────────┴────────┐                           │
//! │  │    Bundling     │     │ UnitAssignment  │                           │
//! │  └─────────────────┘     └────────▲────────┘                           │
//! │                                   │ N:1                                 │
//! │  ┌─────────────────┐ 1:N ┌────────┴────────┐                           │
//! │  │    Booking      │────►│   Reservation   │  product XOR bundling     │
//! │  └─────────────────┘     └─────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity uses a UUID v4 string `id`. Serial numbers are unique per product.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};
use crate::money::Money;

// =============================================================================
// Weekday
// =============================================================================

/// Day of week used by promo `applicable_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A rentable catalog item.
///
/// There is no stored status column: see [`ProductStatus`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, e.g. "Sony A7 III".
    pub name: String,

    /// Rental price in minor currency units.
    pub price_minor: i64,

    /// Catalog soft delete.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_minor(self.price_minor)
    }
}

/// Availability-derived status of a product or bundling.
///
/// Always computed from the ledger at query time, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// At least one unit (or one full bundle) is free today.
    Available,
    /// Everything is out, retired, or the item has no stock.
    Unavailable,
}

// =============================================================================
// Inventory Unit
// =============================================================================

/// One physical, individually serialized instance of a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryUnit {
    pub id: String,

    /// Owning product.
    pub product_id: String,

    /// Serial number, unique within the product.
    pub serial_number: String,

    /// Retired units are excluded from every availability query.
    pub is_retired: bool,

    /// Optimistic concurrency counter, bumped on every assignment.
    pub version: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Bundling
// =============================================================================

/// A named package of products sold as one line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Bundling {
    pub id: String,
    pub name: String,
    pub price_minor: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Bundling {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_minor(self.price_minor)
    }
}

/// One line of a bundling recipe: `required_quantity` units of a product per bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RecipeLine {
    pub bundling_id: String,
    pub product_id: String,
    pub required_quantity: i64,
}

// =============================================================================
// Customer
// =============================================================================

/// A renter. `phone` is the WhatsApp contact used for notifications.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Reservation Status
// =============================================================================

/// Status shared by bookings and their reservation lines.
///
/// Transition rules live in [`crate::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Booked, waiting for payment.
    Pending,
    /// Down payment received.
    Confirmed,
    /// Equipment is out with the customer.
    Active,
    /// Equipment returned.
    Completed,
    /// Booking cancelled.
    Cancelled,
}

impl Default for ReservationStatus {
    fn default() -> Self {
        ReservationStatus::Pending
    }
}

impl ReservationStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [ReservationStatus; 5] = [
        ReservationStatus::Pending,
        ReservationStatus::Confirmed,
        ReservationStatus::Active,
        ReservationStatus::Completed,
        ReservationStatus::Cancelled,
    ];

    /// Statuses that count against availability.
    pub const OCCUPYING: [ReservationStatus; 3] = [
        ReservationStatus::Pending,
        ReservationStatus::Confirmed,
        ReservationStatus::Active,
    ];

    /// Storage / wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Active => "active",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses canonical names and the legacy spreadsheet values
/// (`booking`, `paid`, `on_rented`, `done`, `finished`, `cancel`).
impl FromStr for ReservationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "booking" => Ok(ReservationStatus::Pending),
            "confirmed" | "paid" => Ok(ReservationStatus::Confirmed),
            "active" | "on_rented" => Ok(ReservationStatus::Active),
            "completed" | "done" | "finished" => Ok(ReservationStatus::Completed),
            "cancelled" | "canceled" | "cancel" => Ok(ReservationStatus::Cancelled),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: ReservationStatus::ALL
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            }
            .into()),
        }
    }
}

// =============================================================================
// Item Reference
// =============================================================================

/// What a booking line rents: a single product or a bundling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemRef {
    Product { product_id: String },
    Bundling { bundling_id: String },
}

impl ItemRef {
    pub fn product(id: impl Into<String>) -> Self {
        ItemRef::Product {
            product_id: id.into(),
        }
    }

    pub fn bundling(id: impl Into<String>) -> Self {
        ItemRef::Bundling {
            bundling_id: id.into(),
        }
    }
}

// =============================================================================
// Booking & Reservation
// =============================================================================

/// A customer booking (the parent "transaction").
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Booking {
    pub id: String,
    pub customer_id: String,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub duration_days: i64,
    pub promo_id: Option<String>,
    pub subtotal_minor: i64,
    pub discount_minor: i64,
    pub total_minor: i64,
    pub down_payment_minor: i64,
    pub remaining_minor: i64,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_minor(self.total_minor)
    }

    #[inline]
    pub fn remaining(&self) -> Money {
        Money::from_minor(self.remaining_minor)
    }
}

/// One line of a booking. Exactly one of `product_id` / `bundling_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Reservation {
    pub id: String,
    pub booking_id: String,
    pub product_id: Option<String>,
    pub bundling_id: Option<String>,
    pub quantity: i64,
    /// Price at time of booking (frozen).
    pub unit_price_minor: i64,
    pub line_total_minor: i64,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub status: ReservationStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Returns what this line rents, or `None` if the row violates the
    /// product-XOR-bundling rule.
    pub fn item(&self) -> Option<ItemRef> {
        match (&self.product_id, &self.bundling_id) {
            (Some(p), None) => Some(ItemRef::product(p.clone())),
            (None, Some(b)) => Some(ItemRef::bundling(b.clone())),
            _ => None,
        }
    }
}

/// Binds a reservation to one specific inventory unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct UnitAssignment {
    pub reservation_id: String,
    pub unit_id: String,
    pub product_id: String,
}

// =============================================================================
// Event Outbox
// =============================================================================

/// A domain event persisted in the same transaction as the change it describes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OutboxEvent {
    pub id: String,
    /// "booking_created", "booking_status_changed", ...
    pub event_type: String,
    pub booking_id: String,
    /// The full event as JSON.
    pub payload: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub attempted_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub dispatched_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_default() {
        assert_eq!(ReservationStatus::default(), ReservationStatus::Pending);
    }

    #[test]
    fn test_status_parses_legacy_names() {
        assert_eq!("booking".parse::<ReservationStatus>().unwrap(), ReservationStatus::Pending);
        assert_eq!("paid".parse::<ReservationStatus>().unwrap(), ReservationStatus::Confirmed);
        assert_eq!("on_rented".parse::<ReservationStatus>().unwrap(), ReservationStatus::Active);
        assert_eq!("done".parse::<ReservationStatus>().unwrap(), ReservationStatus::Completed);
        assert_eq!("finished".parse::<ReservationStatus>().unwrap(), ReservationStatus::Completed);
        assert_eq!("cancel".parse::<ReservationStatus>().unwrap(), ReservationStatus::Cancelled);
        assert_eq!(" Active ".parse::<ReservationStatus>().unwrap(), ReservationStatus::Active);
        assert!("returned".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn test_item_ref_serde_shape() {
        let json = serde_json::to_string(&ItemRef::product("p-1")).unwrap();
        assert_eq!(json, r#"{"kind":"product","product_id":"p-1"}"#);
    }

    #[test]
    fn test_weekday_from_chrono() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(Weekday::from(chrono::Datelike::weekday(&date)), Weekday::Monday);
    }
}
