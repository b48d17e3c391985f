//! Recurring bill templates.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::date_math::{add_days, add_months, add_years};

use super::activity::HealthcareAttrs;
use super::amount::AmountSpec;

/// Recurrence step unit for a bill's `(periods, everyN)` descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PeriodUnit {
    Day,
    Week,
    Month,
    Year,
}

impl PeriodUnit {
    /// Step a date forward by `n` of this unit. Month/year steps preserve the
    /// calendar day, clamping at month end.
    #[inline]
    pub fn step(self, d: Date, n: i32) -> Date {
        match self {
            PeriodUnit::Day => add_days(d, n),
            PeriodUnit::Week => add_days(d, 7 * n),
            PeriodUnit::Month => add_months(d, n),
            PeriodUnit::Year => add_years(d, n),
        }
    }
}

fn default_every_n() -> i32 {
    1
}

/// A recurring activity template: `startDate`, optional `endDate`, and a
/// period descriptor such as `(MONTH, 1)` or `(DAY, 14)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    pub name: String,
    pub start_date: Date,
    #[serde(default)]
    pub end_date: Option<Date>,
    pub periods: PeriodUnit,
    #[serde(default = "default_every_n")]
    pub every_n: i32,
    #[serde(flatten)]
    pub amount: AmountSpec,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_transfer: bool,
    #[serde(default)]
    pub fro: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(flatten)]
    pub healthcare: HealthcareAttrs,
    #[serde(default)]
    pub flag: bool,
}

impl Bill {
    /// Materialise the occurrence dates that fall inside `[window_start,
    /// window_end]`, honouring `end_date`. Occurrences before the window are
    /// rolled past without emission so the phase of the recurrence is kept.
    pub fn occurrences(&self, window_start: Date, window_end: Date) -> Vec<Date> {
        let step = self.every_n.max(1);
        let last = match self.end_date {
            Some(end) if end < window_end => end,
            _ => window_end,
        };

        let mut out = Vec::new();
        let mut k: i32 = 0;
        // Each occurrence is computed from the anchor rather than the
        // previous occurrence, so Jan 31 → Feb 28 → Mar 31 (not Mar 28).
        loop {
            let d = self.periods.step(self.start_date, step * k);
            if d > last {
                break;
            }
            if d >= window_start {
                out.push(d);
            }
            k += 1;
        }
        out
    }
}
