//! # Product Availability Calculator
//!
//! Answers "which units of product P are free in [start, end]" from an
//! [`InventorySnapshot`]: every non-retired unit minus what the
//! [overlap resolver](crate::overlap) reports as occupied.
//!
//! ## Snapshot Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  rentix-db (inside the booking transaction)                             │
//! │    load products, units, recipes, overlapping ledger rows               │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  InventorySnapshot  (plain data, indexed by product_id)                 │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  available_units / available_bundles / plan_booking   ← pure, no I/O    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Units come back in the order they were added to the snapshot (the loader
//! adds them in registration order). Callers must not treat that order as a
//! priority.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

use crate::error::{CoreError, CoreResult};
use crate::overlap::{occupied_units, LedgerEntry};
use crate::range::DateRange;
use crate::types::{Bundling, InventoryUnit, Product, ProductStatus, RecipeLine, ReservationStatus};

/// Everything the pure calculators need, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct InventorySnapshot {
    products: HashMap<String, Product>,
    bundlings: HashMap<String, Bundling>,
    units: HashMap<String, Vec<InventoryUnit>>,
    recipes: HashMap<String, Vec<RecipeLine>>,
    ledger: HashMap<String, Vec<LedgerEntry>>,
}

impl InventorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&mut self, product: Product) {
        self.products.insert(product.id.clone(), product);
    }

    pub fn add_bundling(&mut self, bundling: Bundling) {
        self.bundlings.insert(bundling.id.clone(), bundling);
    }

    /// Appends a unit to its product's ordered unit list.
    pub fn add_unit(&mut self, unit: InventoryUnit) {
        self.units.entry(unit.product_id.clone()).or_default().push(unit);
    }

    pub fn add_recipe_line(&mut self, line: RecipeLine) {
        self.recipes.entry(line.bundling_id.clone()).or_default().push(line);
    }

    /// Adds a ledger entry under the product whose units it references.
    pub fn add_ledger_entry(&mut self, product_id: impl Into<String>, entry: LedgerEntry) {
        self.ledger.entry(product_id.into()).or_default().push(entry);
    }

    /// Marks units as taken by a not-yet-persisted reservation, so later
    /// lines of the same booking see them as occupied.
    pub fn record_allocation(
        &mut self,
        reservation_id: &str,
        product_id: &str,
        range: &DateRange,
        unit_ids: Vec<String>,
    ) {
        self.add_ledger_entry(
            product_id,
            LedgerEntry {
                reservation_id: reservation_id.to_string(),
                status: ReservationStatus::Pending,
                start_date: range.start(),
                end_date: range.end(),
                unit_ids,
            },
        );
    }

    pub fn product(&self, product_id: &str) -> Option<&Product> {
        self.products.get(product_id)
    }

    pub fn bundling(&self, bundling_id: &str) -> Option<&Bundling> {
        self.bundlings.get(bundling_id)
    }

    pub fn units(&self, product_id: &str) -> &[InventoryUnit] {
        self.units.get(product_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn recipe(&self, bundling_id: &str) -> &[RecipeLine] {
        self.recipes.get(bundling_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn ledger(&self, product_id: &str) -> &[LedgerEntry] {
        self.ledger.get(product_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

// =============================================================================
// Calculators
// =============================================================================

/// Free, non-retired units of `product_id` for `range`, in stable order.
///
/// ## Errors
/// `NotFound` if the product is not in the snapshot.
pub fn available_units<'a>(
    snapshot: &'a InventorySnapshot,
    product_id: &str,
    range: &DateRange,
) -> CoreResult<Vec<&'a InventoryUnit>> {
    if snapshot.product(product_id).is_none() {
        return Err(CoreError::not_found("Product", product_id));
    }

    let occupied: BTreeSet<String> = occupied_units(snapshot.ledger(product_id), range);

    Ok(snapshot
        .units(product_id)
        .iter()
        .filter(|unit| !unit.is_retired && !occupied.contains(&unit.id))
        .collect())
}

/// Number of free units of `product_id` for `range`.
pub fn available_count(
    snapshot: &InventorySnapshot,
    product_id: &str,
    range: &DateRange,
) -> CoreResult<i64> {
    Ok(available_units(snapshot, product_id, range)?.len() as i64)
}

/// Derived status: available if any unit is free on `today`.
pub fn product_status(
    snapshot: &InventorySnapshot,
    product_id: &str,
    today: NaiveDate,
) -> CoreResult<ProductStatus> {
    let free = available_count(snapshot, product_id, &DateRange::single_day(today))?;
    let active = snapshot
        .product(product_id)
        .map(|p| p.is_active)
        .unwrap_or(false);

    Ok(if active && free > 0 {
        ProductStatus::Available
    } else {
        ProductStatus::Unavailable
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
