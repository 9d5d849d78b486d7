//! # rentix-db: Persistence and Booking Transactions for Rentix
//!
//! SQLite storage for the rental catalog and reservation ledger, plus the
//! `BookingTransactor` that turns a booking request into committed rows.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Rentix Data Flow                                 │
//! │                                                                         │
//! │  caller (admin UI, API, seed binary)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     rentix-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌────────────────┐  │   │
//! │  │   │   Database    │   │ BookingTrans-  │   │  Repositories  │  │   │
//! │  │   │   (pool.rs)   │──►│ actor          │──►│  + snapshot    │  │   │
//! │  │   │ SqlitePool    │   │ BEGIN IMMEDIATE│   │  loader        │  │   │
//! │  │   └───────────────┘   └───────┬────────┘   └────────────────┘  │   │
//! │  │                               │ rentix_core::plan_booking       │   │
//! │  └───────────────────────────────┼─────────────────────────────────┘   │
//! │                                  ▼                                      │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SQLite: products, inventory_units, bundlings, reservations,   │   │
//! │  │          reservation_units, outbox_events                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Catalog, ledger and outbox repositories
//! - [`snapshot`] - Loads an `InventorySnapshot` for the calculators
//! - [`booking`] - The transactional booking service
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rentix_core::{BookingConfig, BookingRequest, LineItem};
//! use rentix_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("rentix.db")).await?;
//! let bookings = db.bookings(BookingConfig::default());
//!
//! let free = bookings.available_count(&camera_id, start, end).await?;
//! let outcome = bookings.create_booking(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod booking;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod snapshot;

// =============================================================================
// Re-exports
// =============================================================================

pub use booking::{BookingOutcome, BookingTransactor, StatusChange};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bundling::BundlingRepository;
pub use repository::customer::CustomerRepository;
pub use repository::outbox::OutboxRepository;
pub use repository::product::ProductRepository;
pub use repository::promo::PromoRepository;
pub use repository::reservation::ReservationRepository;
pub use repository::unit::UnitRepository;
