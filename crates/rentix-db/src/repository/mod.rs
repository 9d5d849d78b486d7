//! # Repository Module
//!
//! Database repository implementations for Rentix.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Repository structs (hold a SqlitePool)                                 │
//! │    db.products().create(..)     db.units().register(..)                 │
//! │    db.bundlings().add_recipe_line(..)                                   │
//! │                                                                         │
//! │  pub(crate) fetch_* / insert_* functions                                │
//! │    generic over sqlx::Executor, so the booking transaction can run      │
//! │    the exact same SQL on its own connection                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog products
//! - [`UnitRepository`](unit::UnitRepository) - Serialized inventory units
//! - [`BundlingRepository`](bundling::BundlingRepository) - Bundlings and recipes
//! - [`CustomerRepository`](customer::CustomerRepository) - Renters
//! - [`PromoRepository`](promo::PromoRepository) - Promo definitions
//! - [`ReservationRepository`](reservation::ReservationRepository) - Ledger reads
//! - [`OutboxRepository`](outbox::OutboxRepository) - Event outbox

pub mod bundling;
pub mod customer;
pub mod outbox;
pub mod product;
pub mod promo;
pub mod reservation;
pub mod unit;
