//! # Snapshot Loader
//!
//! Reads just enough of the database to run the pure calculators for a set
//! of items and one date range.
//!
//! ```text
//! items: [Product cam, Bundling kit]        range: 12-14 Aug
//!        │                   │
//!        │                   └─► bundling row + recipe ─► products {cam, mic}
//!        ▼                                                    │
//!   product ids {cam, mic} ◄──────────────────────────────────┘
//!        │
//!        ├─► product row
//!        ├─► units (registration order)
//!        └─► ledger entries overlapping 12-14 Aug
//! ```
//!
//! Missing products or bundlings are simply absent from the snapshot; the
//! calculators report them as `NotFound`.

use std::collections::BTreeSet;

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::bundling::{fetch_bundling, fetch_recipe};
use crate::repository::product::fetch_product;
use crate::repository::reservation::fetch_ledger;
use crate::repository::unit::fetch_units_for_product;
use rentix_core::{DateRange, InventorySnapshot, ItemRef};

/// Loads products, bundlings, recipes, units and ledger for `items`.
pub async fn load_snapshot(
    conn: &mut SqliteConnection,
    items: &[ItemRef],
    range: &DateRange,
) -> DbResult<InventorySnapshot> {
    let mut snapshot = InventorySnapshot::new();
    let mut product_ids: BTreeSet<String> = BTreeSet::new();
    let mut seen_bundlings: BTreeSet<String> = BTreeSet::new();

    for item in items {
        match item {
            ItemRef::Product { product_id } => {
                product_ids.insert(product_id.clone());
            }
            ItemRef::Bundling { bundling_id } => {
                if !seen_bundlings.insert(bundling_id.clone()) {
                    continue;
                }
                let Some(bundling) = fetch_bundling(&mut *conn, bundling_id).await? else {
                    continue;
                };
                snapshot.add_bundling(bundling);
                for line in fetch_recipe(&mut *conn, bundling_id).await? {
                    product_ids.insert(line.product_id.clone());
                    snapshot.add_recipe_line(line);
                }
            }
        }
    }

    for product_id in &product_ids {
        let Some(product) = fetch_product(&mut *conn, product_id).await? else {
            continue;
        };
        snapshot.add_product(product);

        for unit in fetch_units_for_product(&mut *conn, product_id).await? {
            snapshot.add_unit(unit);
        }
        for entry in fetch_ledger(&mut *conn, product_id, range).await? {
            snapshot.add_ledger_entry(product_id.clone(), entry);
        }
    }

    debug!(
        products = product_ids.len(),
        bundlings = seen_bundlings.len(),
        start = %range.start(),
        end = %range.end(),
        "Snapshot loaded"
    );

    Ok(snapshot)
}
