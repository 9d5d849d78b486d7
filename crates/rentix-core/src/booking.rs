//! # Booking Planner
//!
//! The pure half of the Booking Transactor. Given a request and an
//! [`InventorySnapshot`] loaded inside the write transaction, it decides which
//! units each line gets and what the customer pays. The persistence layer
//! then writes the plan as-is.
//!
//! ## Create Flow
//! ```text
//! BookingRequest
//!      │
//!      ▼
//! validate (customer, lines, quantities, range, past start)
//!      │
//!      ▼
//! for each line, in order ─────────────────────────────────────────────┐
//! │  product  → available_units → take first `quantity`               │
//! │  bundling → allocate_bundle (all products or nothing)             │
//! │  short?   → InsufficientInventory { line } → whole booking fails  │
//! │  record provisional ledger entry (later lines see it)             │
//! └────────────────────────────────────────────────────────────────────┘
//!      │
//!      ▼
//! subtotal ──► calculate_discount ──► total ──► down payment / remaining
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::availability::{available_units, InventorySnapshot};
use crate::bundling::allocate_bundle;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::promo::{calculate_discount, Promo};
use crate::range::DateRange;
use crate::types::{ItemRef, Weekday};
use crate::validation::{validate_down_payment, validate_line_count, validate_quantity};
use crate::MAX_DURATION_DAYS;

// =============================================================================
// Configuration
// =============================================================================

/// Booking policy knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// Default down payment as a percentage of the total.
    pub down_payment_percent: u32,

    /// Accept bookings whose start date is before today.
    pub allow_past_start: bool,

    /// Multiply line totals by the rental duration.
    pub charge_per_day: bool,

    /// How many times a unit of work is retried after a `Conflict`.
    pub max_conflict_retries: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        BookingConfig {
            down_payment_percent: 50,
            allow_past_start: false,
            charge_per_day: false,
            max_conflict_retries: 3,
        }
    }
}

// =============================================================================
// Request
// =============================================================================

/// One requested line: what to rent and how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub item: ItemRef,
    pub quantity: i64,
}

impl LineItem {
    pub fn product(product_id: impl Into<String>, quantity: i64) -> Self {
        LineItem {
            item: ItemRef::product(product_id),
            quantity,
        }
    }

    pub fn bundling(bundling_id: impl Into<String>, quantity: i64) -> Self {
        LineItem {
            item: ItemRef::bundling(bundling_id),
            quantity,
        }
    }
}

/// Input to create-reservation.
///
/// When both are present, `duration_days` wins over `end_date`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BookingRequest {
    pub customer_id: String,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub duration_days: Option<i64>,
    pub lines: Vec<LineItem>,
    #[serde(default)]
    pub promo_id: Option<String>,
    #[serde(default)]
    pub down_payment_minor: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookingRequest {
    /// Resolves the rental range from start + duration or start + end.
    pub fn rental_range(&self) -> CoreResult<DateRange> {
        let range = match (self.duration_days, self.end_date) {
            (Some(days), _) => DateRange::from_duration(self.start_date, days)?,
            (None, Some(end)) => DateRange::new(self.start_date, end)?,
            (None, None) => {
                return Err(ValidationError::Required {
                    field: "end_date or duration_days".to_string(),
                }
                .into())
            }
        };

        if range.days() > MAX_DURATION_DAYS {
            return Err(CoreError::invalid_range(format!(
                "duration {} exceeds {} days",
                range.days(),
                MAX_DURATION_DAYS
            )));
        }

        Ok(range)
    }

    /// Checks everything that does not need inventory and returns the range.
    pub fn validate(&self, config: &BookingConfig, today: NaiveDate) -> CoreResult<DateRange> {
        if self.customer_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "customer_id".to_string(),
            }
            .into());
        }

        validate_line_count(self.lines.len())?;

        for (index, line) in self.lines.iter().enumerate() {
            if line.quantity <= 0 {
                return Err(CoreError::invalid_range(format!(
                    "line {} quantity must be positive",
                    index
                )));
            }
            validate_quantity(line.quantity)?;
        }

        let range = self.rental_range()?;

        if !config.allow_past_start && range.start() < today {
            return Err(CoreError::invalid_range(format!(
                "start {} is in the past",
                range.start()
            )));
        }

        Ok(range)
    }
}

// =============================================================================
// Plan
// =============================================================================

/// A unit picked for a line, with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedUnit {
    pub unit_id: String,
    pub product_id: String,
    pub version: i64,
}

/// A line ready to be written as a reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedLine {
    pub reservation_id: String,
    pub item: ItemRef,
    pub item_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    pub units: Vec<AllocatedUnit>,
}

/// Money side of a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BookingTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub down_payment: Money,
    pub remaining: Money,
    pub promo_explanation: String,
}

/// Everything the persistence layer needs to write a booking.
#[derive(Debug, Clone)]
pub struct BookingPlan {
    pub range: DateRange,
    pub lines: Vec<PlannedLine>,
    pub totals: BookingTotals,
}

impl BookingPlan {
    pub fn units(&self) -> impl Iterator<Item = &AllocatedUnit> {
        self.lines.iter().flat_map(|line| line.units.iter())
    }
}

// =============================================================================
// Allocation
// =============================================================================

fn line_total(unit_price: Money, quantity: i64, range: &DateRange, config: &BookingConfig) -> CoreResult<Money> {
    let days = if config.charge_per_day { range.days() } else { 1 };
    unit_price
        .checked_multiply(quantity)
        .and_then(|total| total.checked_multiply(days))
        .ok_or_else(|| amount_overflow("line_total"))
}

fn amount_overflow(field: &str) -> CoreError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
    .into()
}

fn plan_product_line(
    snapshot: &mut InventorySnapshot,
    index: usize,
    product_id: &str,
    quantity: i64,
    range: &DateRange,
    config: &BookingConfig,
) -> CoreResult<PlannedLine> {
    let product = snapshot
        .product(product_id)
        .filter(|p| p.is_active)
        .ok_or_else(|| CoreError::not_found("Product", product_id))?;
    let name = product.name.clone();
    let unit_price = product.price();

    let free = available_units(snapshot, product_id, range)?;
    if (free.len() as i64) < quantity {
        return Err(CoreError::InsufficientInventory {
            line: index,
            item: name,
            available: free.len() as i64,
            requested: quantity,
        });
    }

    let units: Vec<AllocatedUnit> = free
        .into_iter()
        .take(quantity as usize)
        .map(|u| AllocatedUnit {
            unit_id: u.id.clone(),
            product_id: u.product_id.clone(),
            version: u.version,
        })
        .collect();

    let reservation_id = uuid::Uuid::new_v4().to_string();
    snapshot.record_allocation(
        &reservation_id,
        product_id,
        range,
        units.iter().map(|u| u.unit_id.clone()).collect(),
    );

    Ok(PlannedLine {
        reservation_id,
        item: ItemRef::product(product_id),
        item_name: name,
        quantity,
        unit_price,
        line_total: line_total(unit_price, quantity, range, config)?,
        units,
    })
}

fn plan_bundling_line(
    snapshot: &mut InventorySnapshot,
    index: usize,
    bundling_id: &str,
    quantity: i64,
    range: &DateRange,
    config: &BookingConfig,
) -> CoreResult<PlannedLine> {
    let bundling = snapshot
        .bundling(bundling_id)
        .filter(|b| b.is_active)
        .ok_or_else(|| CoreError::not_found("Bundling", bundling_id))?;
    let name = bundling.name.clone();
    let unit_price = bundling.price();

    let per_product: Vec<(String, Vec<AllocatedUnit>)> =
        allocate_bundle(snapshot, bundling_id, range, quantity, index)?
            .into_iter()
            .map(|(product_id, units)| {
                let units = units
                    .into_iter()
                    .map(|u| AllocatedUnit {
                        unit_id: u.id.clone(),
                        product_id: u.product_id.clone(),
                        version: u.version,
                    })
                    .collect();
                (product_id, units)
            })
            .collect();

    let reservation_id = uuid::Uuid::new_v4().to_string();
    let mut units = Vec::new();
    for (product_id, picked) in per_product {
        snapshot.record_allocation(
            &reservation_id,
            &product_id,
            range,
            picked.iter().map(|u| u.unit_id.clone()).collect(),
        );
        units.extend(picked);
    }

    Ok(PlannedLine {
        reservation_id,
        item: ItemRef::bundling(bundling_id),
        item_name: name,
        quantity,
        unit_price,
        line_total: line_total(unit_price, quantity, range, config)?,
        units,
    })
}

/// Allocates every line in order against `snapshot`.
///
/// Earlier lines are recorded as provisional ledger entries, so two lines
/// asking for the same product compete for the same stock.
pub fn plan_lines(
    snapshot: &mut InventorySnapshot,
    lines: &[LineItem],
    range: &DateRange,
    config: &BookingConfig,
) -> CoreResult<Vec<PlannedLine>> {
    let mut planned = Vec::with_capacity(lines.len());

    for (index, line) in lines.iter().enumerate() {
        let plan = match &line.item {
            ItemRef::Product { product_id } => {
                plan_product_line(snapshot, index, product_id, line.quantity, range, config)?
            }
            ItemRef::Bundling { bundling_id } => {
                plan_bundling_line(snapshot, index, bundling_id, line.quantity, range, config)?
            }
        };
        planned.push(plan);
    }

    Ok(planned)
}

// =============================================================================
// Pricing
// =============================================================================

/// Applies the promo and splits the total into down payment and remainder.
///
/// ## Errors
/// A caller-supplied down payment outside `[0, total]`.
pub fn price_booking(
    subtotal: Money,
    promo: Option<&Promo>,
    duration_days: i64,
    weekday: Weekday,
    down_payment_minor: Option<i64>,
    config: &BookingConfig,
) -> CoreResult<BookingTotals> {
    let outcome = calculate_discount(promo, subtotal, duration_days, weekday);
    let total = outcome.final_amount;

    let down_payment = match down_payment_minor {
        Some(minor) => {
            validate_down_payment(minor, total.minor())?;
            Money::from_minor(minor)
        }
        None => total.percent(config.down_payment_percent).clamp_to(Money::zero(), total),
    };

    Ok(BookingTotals {
        subtotal,
        discount: outcome.discount,
        total,
        down_payment,
        remaining: total - down_payment,
        promo_explanation: outcome.explanation,
    })
}

/// Validates, allocates and prices a booking request.
///
/// On error nothing in the plan is usable; the caller discards `snapshot`.
pub fn plan_booking(
    snapshot: &mut InventorySnapshot,
    request: &BookingRequest,
    promo: Option<&Promo>,
    config: &BookingConfig,
    today: NaiveDate,
) -> CoreResult<BookingPlan> {
    let range = request.validate(config, today)?;
    let lines = plan_lines(snapshot, &request.lines, &range, config)?;
    let subtotal = lines
        .iter()
        .try_fold(Money::zero(), |acc, l| acc.checked_add(l.line_total))
        .ok_or_else(|| amount_overflow("subtotal"))?;
    let weekday = chrono::Datelike::weekday(&today).into();
    let totals = price_booking(
        subtotal,
        promo,
        range.days(),
        weekday,
        request.down_payment_minor,
        config,
    )?;

    Ok(BookingPlan {
        range,
        lines,
        totals,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::tests::{d, stocked};
    use crate::overlap::LedgerEntry;
    use crate::promo::PromoRule;
    use crate::types::{Bundling, RecipeLine, ReservationStatus};
    use chrono::Utc;

    fn request(lines: Vec<LineItem>) -> BookingRequest {
        BookingRequest {
            customer_id: "c-1".to_string(),
            start_date: d(10),
            end_date: Some(d(12)),
            duration_days: None,
            lines,
            promo_id: None,
            down_payment_minor: None,
            notes: None,
        }
    }

    fn kit(snapshot: &mut InventorySnapshot) {
        snapshot.add_bundling(Bundling {
            id: "kit".to_string(),
            name: "Vlog Kit".to_string(),
            price_minor: 300_000,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        for (product_id, qty) in [("cam", 1), ("mic", 2)] {
            snapshot.add_recipe_line(RecipeLine {
                bundling_id: "kit".to_string(),
                product_id: product_id.to_string(),
                required_quantity: qty,
            });
        }
    }

    #[test]
    fn test_duration_takes_precedence() {
        let mut req = request(vec![LineItem::product("cam", 1)]);
        req.duration_days = Some(5);
        let range = req.rental_range().unwrap();
        assert_eq!(range.end(), d(15));

        req.duration_days = None;
        req.end_date = None;
        assert!(req.rental_range().is_err());
    }

    #[test]
    fn test_validation_rules() {
        let config = BookingConfig::default();

        let empty = request(vec![]);
        assert!(matches!(empty.validate(&config, d(1)), Err(CoreError::Validation(_))));

        let zero = request(vec![LineItem::product("cam", 0)]);
        assert!(matches!(zero.validate(&config, d(1)), Err(CoreError::InvalidRange { .. })));

        let mut inverted = request(vec![LineItem::product("cam", 1)]);
        inverted.end_date = Some(d(9));
        assert!(matches!(inverted.validate(&config, d(1)), Err(CoreError::InvalidRange { .. })));

        let past = request(vec![LineItem::product("cam", 1)]);
        assert!(matches!(past.validate(&config, d(11)), Err(CoreError::InvalidRange { .. })));

        let lenient = BookingConfig {
            allow_past_start: true,
            ..BookingConfig::default()
        };
        assert!(past.validate(&lenient, d(11)).is_ok());
    }

    #[test]
    fn test_plan_prices_lines_and_default_down_payment() {
        let mut snap = InventorySnapshot::new();
        stocked(&mut snap, "cam", 150_000, 3);
        stocked(&mut snap, "lens", 75_000, 1);

        let req = request(vec![LineItem::product("cam", 2), LineItem::product("lens", 1)]);
        let plan = plan_booking(&mut snap, &req, None, &BookingConfig::default(), d(1)).unwrap();

        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].units.len(), 2);
        assert_eq!(plan.totals.subtotal.minor(), 375_000);
        assert_eq!(plan.totals.total.minor(), 375_000);
        assert_eq!(plan.totals.down_payment.minor(), 187_500);
        assert_eq!(plan.totals.remaining.minor(), 187_500);
    }

    #[test]
    fn test_charge_per_day() {
        let mut snap = InventorySnapshot::new();
        stocked(&mut snap, "cam", 100_000, 1);
        let config = BookingConfig {
            charge_per_day: true,
            ..BookingConfig::default()
        };

        let plan = plan_booking(&mut snap, &request(vec![LineItem::product("cam", 1)]), None, &config, d(1))
            .unwrap();
        assert_eq!(plan.totals.subtotal.minor(), 200_000);
    }

    #[test]
    fn test_oversized_totals_are_rejected_not_wrapped() {
        let mut snap = InventorySnapshot::new();
        stocked(&mut snap, "cam", i64::MAX / 2, 3);

        let req = request(vec![LineItem::product("cam", 3)]);
        let err = plan_booking(&mut snap, &req, None, &BookingConfig::default(), d(1)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Overflow { .. })));

        // Each line fits on its own, the sum does not.
        let req = request(vec![LineItem::product("cam", 1), LineItem::product("cam", 2)]);
        let err = plan_booking(&mut snap, &req, None, &BookingConfig::default(), d(1)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Overflow { .. })));
    }

    #[test]
    fn test_insufficient_line_names_the_line() {
        let mut snap = InventorySnapshot::new();
        stocked(&mut snap, "cam", 100, 2);
        stocked(&mut snap, "lens", 100, 1);
        snap.add_ledger_entry(
            "lens",
            LedgerEntry {
                reservation_id: "r-old".to_string(),
                status: ReservationStatus::Confirmed,
                start_date: d(12),
                end_date: d(14),
                unit_ids: vec!["lens-0".to_string()],
            },
        );

        let req = request(vec![LineItem::product("cam", 1), LineItem::product("lens", 1)]);
        let err = plan_booking(&mut snap, &req, None, &BookingConfig::default(), d(1)).unwrap_err();
        match err {
            CoreError::InsufficientInventory { line, available, requested, .. } => {
                assert_eq!(line, 1);
                assert_eq!(available, 0);
                assert_eq!(requested, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_later_lines_see_earlier_allocations() {
        let mut snap = InventorySnapshot::new();
        stocked(&mut snap, "cam", 100, 3);
        stocked(&mut snap, "mic", 10, 2);
        kit(&mut snap);

        // 2 cameras standalone leave 1 for the kit; the kit needs 1 cam + 2 mics.
        let ok = request(vec![LineItem::product("cam", 2), LineItem::bundling("kit", 1)]);
        let plan = plan_booking(&mut snap.clone(), &ok, None, &BookingConfig::default(), d(1)).unwrap();
        let kit_units: Vec<&str> = plan.lines[1].units.iter().map(|u| u.unit_id.as_str()).collect();
        assert_eq!(kit_units, vec!["cam-2", "mic-0", "mic-1"]);

        let too_many = request(vec![LineItem::product("cam", 3), LineItem::bundling("kit", 1)]);
        let err = plan_booking(&mut snap, &too_many, None, &BookingConfig::default(), d(1)).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientInventory { line: 1, .. }));
    }

    #[test]
    fn test_inactive_product_is_not_bookable() {
        let mut snap = InventorySnapshot::new();
        stocked(&mut snap, "cam", 100, 1);
        let mut retired = snap.product("cam").cloned().unwrap();
        retired.is_active = false;
        snap.add_product(retired);

        let err = plan_booking(
            &mut snap,
            &request(vec![LineItem::product("cam", 1)]),
            None,
            &BookingConfig::default(),
            d(1),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn test_promo_and_explicit_down_payment() {
        let promo = Promo {
            id: "p".to_string(),
            name: "3 for 1".to_string(),
            rule: PromoRule::DayBased {
                group_size: 3,
                pay_days: 1,
            },
            is_active: true,
        };
        let config = BookingConfig::default();

        let totals = price_booking(Money::from_minor(700_000), Some(&promo), 7, Weekday::Monday, Some(100_000), &config)
            .unwrap();
        assert_eq!(totals.discount.minor(), 400_000);
        assert_eq!(totals.total.minor(), 300_000);
        assert_eq!(totals.remaining.minor(), 200_000);

        let err = price_booking(Money::from_minor(700_000), Some(&promo), 7, Weekday::Monday, Some(300_001), &config);
        assert!(matches!(err, Err(CoreError::Validation(_))));
    }
}
