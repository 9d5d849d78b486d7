//! # rentix-core: Pure Availability & Booking Logic for Rentix
//!
//! This crate holds every rule of the rental engine as pure functions over
//! plain data. It never touches the database, the network or the clock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Rentix Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Web panel / spreadsheet import (external)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │     rentix-db: BookingTransactor, repositories, outbox          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ InventorySnapshot                      │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ rentix-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   overlap ──► availability ──► bundling ──► booking ◄── promo   │   │
//! │  │                                               │                 │   │
//! │  │                                   status ─────┴──► events       │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  rentix-notify: drains booking events, sends WhatsApp messages          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, InventoryUnit, Bundling, Booking, ...)
//! - [`money`] - Integer money with half-up ratio math
//! - [`range`] - Inclusive rental date ranges and the overlap predicate
//! - [`overlap`] - Which units a ledger occupies for a range
//! - [`availability`] - Free units per product
//! - [`bundling`] - Bundle ceilings and all-or-nothing bundle allocation
//! - [`booking`] - Request validation, unit planning and pricing
//! - [`promo`] - Discount calculator
//! - [`status`] - Reservation state machine
//! - [`events`] - Booking events for the outbox
//! - [`clock`] - Injected "now"
//! - [`validation`] - Input rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use rentix_core::money::Money;
//! use rentix_core::promo::{calculate_discount, Promo, PromoRule};
//! use rentix_core::types::Weekday;
//!
//! let promo = Promo {
//!     id: "weekly".into(),
//!     name: "Rent 3 pay 1".into(),
//!     rule: PromoRule::DayBased { group_size: 3, pay_days: 1 },
//!     is_active: true,
//! };
//!
//! let out = calculate_discount(Some(&promo), Money::from_minor(700_000), 7, Weekday::Monday);
//! assert_eq!(out.final_amount.minor(), 300_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod availability;
pub mod booking;
pub mod bundling;
pub mod clock;
pub mod error;
pub mod events;
pub mod money;
pub mod overlap;
pub mod promo;
pub mod range;
pub mod status;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use availability::InventorySnapshot;
pub use booking::{BookingConfig, BookingPlan, BookingRequest, LineItem};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use events::BookingEvent;
pub use money::Money;
pub use promo::{Promo, PromoRule};
pub use range::DateRange;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines on one booking.
pub const MAX_LINE_ITEMS: usize = 50;

/// Maximum quantity on a single booking line.
///
/// ## Business Reason
/// Catches typos like 100 instead of 10 before they lock a whole shelf.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Longest rental accepted, in days.
pub const MAX_DURATION_DAYS: i64 = 365;

/// Highest catalog price in minor units (Rp1.000.000.000.000).
pub const MAX_PRICE_MINOR: i64 = 1_000_000_000_000;

/// Highest per-bundle requirement on one recipe line.
pub const MAX_REQUIRED_QUANTITY: i64 = 999;
