//! # Clock
//!
//! "Today" is an input, not a global. The transactor asks a [`Clock`] for the
//! current time so past-start checks and weekday promos are testable.

use chrono::{DateTime, NaiveDate, Utc};

use crate::types::Weekday;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day used for past-start checks and derived status.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Weekday used by promo `applicable_days`.
    fn weekday(&self) -> Weekday {
        chrono::Datelike::weekday(&self.today()).into()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Frozen clock for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        FixedClock { time }
    }

    /// Midnight UTC of `day`.
    pub fn on(day: NaiveDate) -> Self {
        FixedClock {
            time: day.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}
