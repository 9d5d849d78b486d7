//! # Seed Data Generator
//!
//! Populates the database with a small photo/video rental catalog for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed ./rentix_dev.db
//! cargo run -p rentix-db --bin seed
//!
//! # Specify database path
//! cargo run -p rentix-db --bin seed -- --db ./data/rentix.db
//!
//! # Also place a demo booking starting tomorrow
//! cargo run -p rentix-db --bin seed -- --with-booking
//! ```
//!
//! ## Generated Data
//! - Products with 1-4 serialized units each: `{CODE}-{NN}`
//! - Two bundlings built from those products
//! - A percentage promo and a "rent 3 days, pay 2" promo
//! - One demo customer

use std::env;

use chrono::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rentix_core::{BookingConfig, BookingRequest, LineItem, PromoRule, Weekday};
use rentix_db::{Database, DbConfig};

/// (code, name, daily price in minor units, unit count)
const PRODUCTS: &[(&str, &str, i64, usize)] = &[
    ("A7III", "Sony A7 III", 150_000, 3),
    ("R6", "Canon EOS R6", 175_000, 2),
    ("FE2470", "Sony FE 24-70mm f/2.8 GM", 90_000, 2),
    ("RF70200", "Canon RF 70-200mm f/2.8", 110_000, 1),
    ("RWGO", "Rode Wireless GO II", 50_000, 4),
    ("NANLITE", "Nanlite Forza 60", 60_000, 2),
    ("TRIPOD", "Manfrotto 055 Tripod", 25_000, 4),
];

/// (name, price, recipe as (product code, quantity))
const BUNDLINGS: &[(&str, i64, &[(&str, i64)])] = &[
    (
        "Vlog Kit",
        220_000,
        &[("A7III", 1), ("RWGO", 2), ("TRIPOD", 1)],
    ),
    (
        "Interview Kit",
        380_000,
        &[("R6", 1), ("FE2470", 1), ("RWGO", 2), ("NANLITE", 2)],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,rentix=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./rentix_dev.db");
    let mut with_booking = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--with-booking" => with_booking = true,
            "--help" | "-h" => {
                println!("Rentix Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./rentix_dev.db)");
                println!("      --with-booking Place a demo booking starting tomorrow");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, "Seeding database");
    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        return Ok(());
    }

    // Products and units
    let mut product_ids = std::collections::HashMap::new();
    let mut units = 0;
    for (code, name, price, count) in PRODUCTS {
        let product = db.products().create(name, *price).await?;
        for n in 1..=*count {
            db.units().register(&product.id, &format!("{}-{:02}", code, n)).await?;
            units += 1;
        }
        product_ids.insert(*code, product.id);
    }
    info!(products = PRODUCTS.len(), units, "Catalog created");

    // Bundlings
    let mut bundling_ids = Vec::new();
    for (name, price, recipe) in BUNDLINGS {
        let bundling = db.bundlings().create(name, *price).await?;
        for (code, quantity) in recipe.iter() {
            let Some(product_id) = product_ids.get(code) else {
                warn!(code, "Recipe references unknown product code");
                continue;
            };
            db.bundlings().add_recipe_line(&bundling.id, product_id, *quantity).await?;
        }
        bundling_ids.push(bundling.id);
    }
    info!(bundlings = bundling_ids.len(), "Bundlings created");

    // Promos
    db.promos()
        .create(
            "Weekend 15%",
            PromoRule::Percentage {
                percent: 15,
                applicable_days: vec![Weekday::Saturday, Weekday::Sunday],
            },
        )
        .await?;
    let promo = db
        .promos()
        .create("Rent 3 Pay 2", PromoRule::DayBased { group_size: 3, pay_days: 2 })
        .await?;

    let customer = db.customers().create("Demo Customer", "081234567890").await?;
    info!(customer_id = %customer.id, "Customer created");

    if with_booking {
        let bookings = db.bookings(BookingConfig::default());
        let start = chrono::Utc::now().date_naive() + Duration::days(1);

        let mut lines = vec![LineItem::product(&product_ids["FE2470"], 1)];
        if let Some(kit) = bundling_ids.first() {
            lines.push(LineItem::bundling(kit, 1));
        }

        let request = BookingRequest {
            customer_id: customer.id.clone(),
            start_date: start,
            end_date: None,
            duration_days: Some(3),
            lines,
            promo_id: Some(promo.id.clone()),
            down_payment_minor: None,
            notes: Some("Seeded demo booking".to_string()),
        };
        let outcome = bookings.create_booking(&request).await?;
        info!(
            booking_id = %outcome.booking.id,
            total = %outcome.totals.total,
            down_payment = %outcome.totals.down_payment,
            "Demo booking placed"
        );
    }

    info!("Seed complete");
    Ok(())
}
