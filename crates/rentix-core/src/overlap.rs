//! # Overlap Resolver
//!
//! Given ledger entries and a query range, find the units that are taken.
//!
//! ```text
//! ledger entries (per product)         query [12 Aug, 14 Aug]
//! ─────────────────────────────        ──────────────────────
//! R1 pending   10-12 Aug  {U1}    ──►  overlaps  → U1 occupied
//! R2 cancelled 12-13 Aug  {U2}    ──►  not occupying status
//! R3 active    15-18 Aug  {U3}    ──►  no overlap
//! ```
//!
//! A linear scan is enough for a single product's ledger; callers index
//! entries by product so the scan never touches unrelated rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::range::{ranges_overlap, DateRange};
use crate::status::is_occupying;
use crate::types::ReservationStatus;

/// One reservation as seen by the resolver: its status, range and the units
/// assigned to it (for one product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub reservation_id: String,
    pub status: ReservationStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub unit_ids: Vec<String>,
}

impl LedgerEntry {
    /// True if this entry blocks its units for `query`.
    #[inline]
    pub fn blocks(&self, query: &DateRange) -> bool {
        is_occupying(self.status)
            && ranges_overlap(self.start_date, self.end_date, query.start(), query.end())
    }
}

/// Returns the set of unit ids that are unavailable for `query`.
pub fn occupied_units<'a, I>(entries: I, query: &DateRange) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    entries
        .into_iter()
        .filter(|entry| entry.blocks(query))
        .flat_map(|entry| entry.unit_ids.iter().cloned())
        .collect()
}
