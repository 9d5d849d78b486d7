//! # Bundling Availability Calculator
//!
//! A bundle is only as available as its scarcest ingredient.
//!
//! ```text
//! Recipe "Vlog Kit"          free in range     bundles supported
//! ─────────────────          ─────────────     ─────────────────
//! Sony A7 III     × 1              3                 3 / 1 = 3
//! Rode Mic        × 2              5                 5 / 2 = 2   ◄── min
//! ─────────────────────────────────────────────────────────────
//! available_bundles = 2
//! ```
//!
//! Nothing is cached: the number is re-derived from the recipe and the
//! ledger on every call, so recipe edits take effect immediately.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::availability::{available_units, InventorySnapshot};
use crate::error::{CoreError, CoreResult};
use crate::range::DateRange;
use crate::types::{InventoryUnit, ProductStatus};

/// Recipe requirements per product, duplicate lines summed, recipe order kept.
fn requirements(snapshot: &InventorySnapshot, bundling_id: &str) -> Vec<(String, i64)> {
    let mut merged: Vec<(String, i64)> = Vec::new();
    for line in snapshot.recipe(bundling_id) {
        if line.required_quantity <= 0 {
            continue;
        }
        match merged.iter_mut().find(|(p, _)| *p == line.product_id) {
            Some((_, qty)) => *qty = qty.saturating_add(line.required_quantity),
            None => merged.push((line.product_id.clone(), line.required_quantity)),
        }
    }
    merged
}

fn ensure_bundling(snapshot: &InventorySnapshot, bundling_id: &str) -> CoreResult<()> {
    if snapshot.bundling(bundling_id).is_none() {
        return Err(CoreError::not_found("Bundling", bundling_id));
    }
    Ok(())
}

/// How many complete bundles can be rented for `range`.
///
/// An empty recipe yields 0, never "unbounded".
pub fn available_bundles(
    snapshot: &InventorySnapshot,
    bundling_id: &str,
    range: &DateRange,
) -> CoreResult<i64> {
    ensure_bundling(snapshot, bundling_id)?;

    let mut ceiling: Option<i64> = None;
    for (product_id, required) in requirements(snapshot, bundling_id) {
        let free = available_units(snapshot, &product_id, range)?.len() as i64;
        let supported = free / required;
        ceiling = Some(ceiling.map_or(supported, |c| c.min(supported)));
    }

    Ok(ceiling.unwrap_or(0))
}

/// Derived status: available if at least one full bundle is free on `today`.
pub fn bundling_status(
    snapshot: &InventorySnapshot,
    bundling_id: &str,
    today: NaiveDate,
) -> CoreResult<ProductStatus> {
    let bundles = available_bundles(snapshot, bundling_id, &DateRange::single_day(today))?;
    let active = snapshot
        .bundling(bundling_id)
        .map(|b| b.is_active)
        .unwrap_or(false);

    Ok(if active && bundles > 0 {
        ProductStatus::Available
    } else {
        ProductStatus::Unavailable
    })
}

/// Picks concrete units for `bundle_quantity` bundles, or fails as a whole.
///
/// `line` is only used to label an `InsufficientInventory` error.
pub fn allocate_bundle<'a>(
    snapshot: &'a InventorySnapshot,
    bundling_id: &str,
    range: &DateRange,
    bundle_quantity: i64,
    line: usize,
) -> CoreResult<Vec<(String, Vec<&'a InventoryUnit>)>> {
    ensure_bundling(snapshot, bundling_id)?;
    if bundle_quantity <= 0 {
        return Err(CoreError::invalid_range("bundle quantity must be positive"));
    }

    let needs = requirements(snapshot, bundling_id);
    let bundle_name = snapshot
        .bundling(bundling_id)
        .map(|b| b.name.clone())
        .unwrap_or_default();

    if needs.is_empty() {
        return Err(CoreError::InsufficientInventory {
            line,
            item: bundle_name,
            available: 0,
            requested: bundle_quantity,
        });
    }

    let mut allocation = Vec::with_capacity(needs.len());
    for (product_id, required) in needs {
        let wanted = required
            .checked_mul(bundle_quantity)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(usize::MAX);
        let mut free = available_units(snapshot, &product_id, range)?;
        if free.len() < wanted {
            return Err(CoreError::InsufficientInventory {
                line,
                item: bundle_name,
                available: available_bundles(snapshot, bundling_id, range)?,
                requested: bundle_quantity,
            });
        }
        free.truncate(wanted);
        allocation.push((product_id, free));
    }

    Ok(allocation)
}

/// Unit ids per product for `bundle_quantity` bundles.
pub fn allocate_bundle_units(
    snapshot: &InventorySnapshot,
    bundling_id: &str,
    range: &DateRange,
    bundle_quantity: i64,
) -> CoreResult<BTreeMap<String, Vec<String>>> {
    Ok(allocate_bundle(snapshot, bundling_id, range, bundle_quantity, 0)?
        .into_iter()
        .map(|(product_id, units)| {
            (product_id, units.into_iter().map(|u| u.id.clone()).collect())
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::tests::{d, stocked};
    use crate::overlap::occupied_units;
    use crate::types::{Bundling, RecipeLine};
    use chrono::Utc;

    fn bundling(snapshot: &mut InventorySnapshot, id: &str, recipe: &[(&str, i64)]) {
        snapshot.add_bundling(Bundling {
            id: id.to_string(),
            name: format!("Bundle {}", id),
            price_minor: 1000,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        for (product_id, qty) in recipe {
            snapshot.add_recipe_line(RecipeLine {
                bundling_id: id.to_string(),
                product_id: product_id.to_string(),
                required_quantity: *qty,
            });
        }
    }

    #[test]
    fn test_min_rule() {
        let mut snap = InventorySnapshot::new();
        stocked(&mut snap, "p1", 10, 5);
        stocked(&mut snap, "p2", 10, 3);
        bundling(&mut snap, "kit", &[("p1", 2), ("p2", 1)]);
        let range = DateRange::new(d(1), d(3)).unwrap();

        assert_eq!(available_bundles(&snap, "kit", &range).unwrap(), 2);
    }

    #[test]
    fn test_empty_recipe_yields_zero() {
        let mut snap = InventorySnapshot::new();
        bundling(&mut snap, "empty", &[]);
        let range = DateRange::new(d(1), d(3)).unwrap();

        assert_eq!(available_bundles(&snap, "empty", &range).unwrap(), 0);
        assert!(matches!(
            allocate_bundle_units(&snap, "empty", &range, 1),
            Err(CoreError::InsufficientInventory { .. })
        ));
    }

    #[test]
    fn test_duplicate_recipe_lines_are_summed() {
        let mut snap = InventorySnapshot::new();
        stocked(&mut snap, "bat", 5, 4);
        bundling(&mut snap, "kit", &[("bat", 1), ("bat", 1)]);
        let range = DateRange::new(d(1), d(3)).unwrap();

        assert_eq!(available_bundles(&snap, "kit", &range).unwrap(), 2);
        let alloc = allocate_bundle_units(&snap, "kit", &range, 2).unwrap();
        assert_eq!(alloc["bat"].len(), 4);
    }

    #[test]
    fn test_allocation_slices_first_units() {
        let mut snap = InventorySnapshot::new();
        stocked(&mut snap, "p1", 10, 5);
        stocked(&mut snap, "p2", 10, 3);
        bundling(&mut snap, "kit", &[("p1", 2), ("p2", 1)]);
        let range = DateRange::new(d(1), d(3)).unwrap();

        let alloc = allocate_bundle_units(&snap, "kit", &range, 2).unwrap();
        assert_eq!(alloc["p1"], vec!["p1-0", "p1-1", "p1-2", "p1-3"]);
        assert_eq!(alloc["p2"], vec!["p2-0", "p2-1"]);
    }

    #[test]
    fn test_allocation_is_all_or_nothing() {
        let mut snap = InventorySnapshot::new();
        stocked(&mut snap, "p1", 10, 5);
        stocked(&mut snap, "p2", 10, 3);
        bundling(&mut snap, "kit", &[("p1", 2), ("p2", 1)]);
        let range = DateRange::new(d(1), d(3)).unwrap();

        let err = allocate_bundle_units(&snap, "kit", &range, 3).unwrap_err();
        match err {
            CoreError::InsufficientInventory { available, requested, .. } => {
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Requirement × quantity past i64 is just short stock.
        assert!(matches!(
            allocate_bundle_units(&snap, "kit", &range, i64::MAX),
            Err(CoreError::InsufficientInventory { .. })
        ));
    }

    #[test]
    fn test_allocation_round_trips_through_resolver() {
        let mut snap = InventorySnapshot::new();
        stocked(&mut snap, "p1", 10, 5);
        stocked(&mut snap, "p2", 10, 3);
        bundling(&mut snap, "kit", &[("p1", 2), ("p2", 1)]);
        let range = DateRange::new(d(1), d(3)).unwrap();

        let alloc = allocate_bundle_units(&snap, "kit", &range, 1).unwrap();
        for (product_id, unit_ids) in &alloc {
            snap.record_allocation("r-kit", product_id, &range, unit_ids.clone());
        }

        for (product_id, unit_ids) in &alloc {
            let occupied = occupied_units(snap.ledger(product_id), &range);
            let expected = unit_ids.iter().cloned().collect();
            assert_eq!(occupied, expected);
        }
        assert_eq!(available_bundles(&snap, "kit", &range).unwrap(), 1);
    }

    #[test]
    fn test_bundling_status_follows_scarcest_product() {
        let mut snap = InventorySnapshot::new();
        stocked(&mut snap, "p1", 10, 2);
        stocked(&mut snap, "p2", 10, 1);
        bundling(&mut snap, "kit", &[("p1", 2), ("p2", 1)]);
        assert_eq!(bundling_status(&snap, "kit", d(5)).unwrap(), ProductStatus::Available);

        let range = DateRange::new(d(4), d(6)).unwrap();
        snap.record_allocation("r-p2", "p2", &range, vec!["p2-0".to_string()]);
        assert_eq!(bundling_status(&snap, "kit", d(5)).unwrap(), ProductStatus::Unavailable);
        assert_eq!(bundling_status(&snap, "kit", d(7)).unwrap(), ProductStatus::Available);
    }

    #[test]
    fn test_unknown_bundling_is_not_found() {
        let snap = InventorySnapshot::new();
        let range = DateRange::new(d(1), d(3)).unwrap();
        assert!(matches!(
            available_bundles(&snap, "nope", &range),
            Err(CoreError::NotFound { .. })
        ));
    }
}
