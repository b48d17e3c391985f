//! Per-account interest schedules.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::date_math::{add_days, add_months, add_years};

/// Posting cadence for an interest rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compounding {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Compounding {
    /// Fraction of a year covered by one posting period.
    #[inline]
    pub fn fraction_of_year(self) -> f64 {
        match self {
            Compounding::Day => 1.0 / 365.0,
            Compounding::Week => 7.0 / 365.0,
            Compounding::Month => 1.0 / 12.0,
            Compounding::Quarter => 1.0 / 4.0,
            Compounding::Year => 1.0,
        }
    }

    /// The posting date following `d`.
    #[inline]
    pub fn next_posting(self, d: Date) -> Date {
        match self {
            Compounding::Day => add_days(d, 1),
            Compounding::Week => add_days(d, 7),
            Compounding::Month => add_months(d, 1),
            Compounding::Quarter => add_months(d, 3),
            Compounding::Year => add_years(d, 1),
        }
    }
}

/// One entry in an account's interest schedule. Rules are kept sorted by
/// `applicable_date`; a rule is in effect until the next rule takes over.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InterestRule {
    pub id: String,
    pub apr: f64,
    #[serde(default)]
    pub apr_is_variable: bool,
    #[serde(default)]
    pub apr_variable: Option<String>,
    pub compounded: Compounding,
    pub applicable_date: Date,
}
