//! # Discount / Promo Calculator
//!
//! Pure price adjustment for a booking subtotal.
//!
//! ## Promo Variants
//! ```text
//! ┌───────────────┬─────────────────────────────────────────────────────────┐
//! │ Percentage    │ base × percent / 100, only on applicable weekdays       │
//! │ Nominal       │ min(amount, base), once per booking                     │
//! │ DayBased      │ "rent G days, pay P": base × free_days / duration       │
//! │               │ days_to_pay = (duration / G) × P + duration % G         │
//! └───────────────┴─────────────────────────────────────────────────────────┘
//! ```
//!
//! Whatever the rule, `0 <= discount <= base` and `final = base - discount`.
//! A malformed rule is reported in the explanation and gives no discount.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Weekday;

/// Rule part of a promo, stored as JSON by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromoRule {
    /// Percent off. Empty `applicable_days` means every day.
    Percentage {
        percent: u32,
        #[serde(default)]
        applicable_days: Vec<Weekday>,
    },
    /// Fixed amount off, once per booking.
    Nominal {
        amount_minor: i64,
        #[serde(default)]
        applicable_days: Vec<Weekday>,
    },
    /// Every `group_size` rented days, pay only `pay_days`.
    DayBased { group_size: i64, pay_days: i64 },
}

impl PromoRule {
    /// Checks the rule for values that would produce nonsense prices.
    pub fn validate(&self) -> CoreResult<()> {
        match self {
            PromoRule::Percentage { percent, .. } if *percent > 100 => {
                Err(CoreError::InvalidPromoConfig {
                    reason: format!("percent {} exceeds 100", percent),
                })
            }
            PromoRule::Nominal { amount_minor, .. } if *amount_minor < 0 => {
                Err(CoreError::InvalidPromoConfig {
                    reason: format!("nominal amount {} is negative", amount_minor),
                })
            }
            PromoRule::DayBased {
                group_size,
                pay_days,
            } if !(0 < *pay_days && *pay_days < *group_size) => Err(CoreError::InvalidPromoConfig {
                reason: format!(
                    "pay_days {} must be between 1 and group_size {} exclusive",
                    pay_days, group_size
                ),
            }),
            _ => Ok(()),
        }
    }
}

/// A promo definition as returned by the promo source.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Promo {
    pub id: String,
    pub name: String,
    pub rule: PromoRule,
    pub is_active: bool,
}

/// Result of applying a promo to a base amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountOutcome {
    pub discount: Money,
    pub final_amount: Money,
    pub explanation: String,
}

impl DiscountOutcome {
    fn none(base: Money, explanation: impl Into<String>) -> Self {
        DiscountOutcome {
            discount: Money::zero(),
            final_amount: base.max(Money::zero()),
            explanation: explanation.into(),
        }
    }

    fn applied(base: Money, raw: Money, explanation: String) -> Self {
        let discount = raw.clamp_to(Money::zero(), base);
        DiscountOutcome {
            discount,
            final_amount: base - discount,
            explanation,
        }
    }
}

fn applies_on(days: &[Weekday], today: Weekday) -> bool {
    days.is_empty() || days.contains(&today)
}

/// Applies `promo` to `base` for a rental of `duration_days`, evaluated on `today`.
pub fn calculate_discount(
    promo: Option<&Promo>,
    base: Money,
    duration_days: i64,
    today: Weekday,
) -> DiscountOutcome {
    let Some(promo) = promo else {
        return DiscountOutcome::none(base, "No promo");
    };
    if base.minor() <= 0 {
        return DiscountOutcome::none(base, "Nothing to discount");
    }
    if !promo.is_active {
        return DiscountOutcome::none(base, format!("Promo {} is inactive", promo.name));
    }
    if let Err(e) = promo.rule.validate() {
        return DiscountOutcome::none(base, format!("Promo {} ignored: {}", promo.name, e));
    }

    match &promo.rule {
        PromoRule::Percentage {
            percent,
            applicable_days,
        } => {
            if !applies_on(applicable_days, today) {
                return DiscountOutcome::none(
                    base,
                    format!("Promo {} does not apply on {:?}", promo.name, today),
                );
            }
            DiscountOutcome::applied(
                base,
                base.percent(*percent),
                format!("{}: {}% off", promo.name, percent),
            )
        }
        PromoRule::Nominal {
            amount_minor,
            applicable_days,
        } => {
            if !applies_on(applicable_days, today) {
                return DiscountOutcome::none(
                    base,
                    format!("Promo {} does not apply on {:?}", promo.name, today),
                );
            }
            let amount = Money::from_minor(*amount_minor);
            DiscountOutcome::applied(base, amount, format!("{}: {} off", promo.name, amount))
        }
        PromoRule::DayBased {
            group_size,
            pay_days,
        } => {
            if duration_days <= 0 {
                return DiscountOutcome::none(
                    base,
                    format!("Promo {} ignored: duration must be positive", promo.name),
                );
            }
            let days_to_pay = (duration_days / group_size) * pay_days + duration_days % group_size;
            let free_days = duration_days - days_to_pay;
            DiscountOutcome::applied(
                base,
                base.ratio(free_days, duration_days),
                format!(
                    "{}: pay {} of {} days",
                    promo.name, days_to_pay, duration_days
                ),
            )
        }
    }
}
