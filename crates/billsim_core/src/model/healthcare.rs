//! Healthcare plan configurations.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::date_math::add_years;

/// A healthcare plan: covered persons, deductible and out-of-pocket limits,
/// and the plan-year reset anchor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthcareConfig {
    pub id: String,
    pub name: String,
    pub covered_persons: Vec<String>,
    pub start_date: Date,
    #[serde(default)]
    pub end_date: Option<Date>,
    pub individual_deductible: f64,
    pub family_deductible: f64,
    pub individual_out_of_pocket_max: f64,
    pub family_out_of_pocket_max: f64,
    /// Plan-year reset anchor, e.g. (1, 1) for calendar-year plans.
    pub reset_month: i8,
    pub reset_day: i8,
    #[serde(default)]
    pub hsa_account_id: Option<String>,
    #[serde(default)]
    pub hsa_reimbursement_enabled: bool,
}

impl HealthcareConfig {
    /// Whether the plan covers the given date (inclusive range).
    pub fn active_on(&self, date: Date) -> bool {
        date >= self.start_date && self.end_date.is_none_or(|end| date <= end)
    }

    /// Start of the 12-month plan year containing `date`.
    pub fn plan_year_start(&self, date: Date) -> Date {
        let anchor = jiff::civil::date(date.year(), self.reset_month, self.reset_day);
        if date >= anchor { anchor } else { add_years(anchor, -1) }
    }

    pub fn covers_person(&self, person: &str) -> bool {
        self.covered_persons.iter().any(|p| p == person)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    fn plan(reset_month: i8, reset_day: i8) -> HealthcareConfig {
        HealthcareConfig {
            id: "hc-1".into(),
            name: "PPO".into(),
            covered_persons: vec!["Alex".into(), "Sam".into()],
            start_date: date(2020, 1, 1),
            end_date: None,
            individual_deductible: 1500.0,
            family_deductible: 3000.0,
            individual_out_of_pocket_max: 5000.0,
            family_out_of_pocket_max: 10000.0,
            reset_month,
            reset_day,
            hsa_account_id: None,
            hsa_reimbursement_enabled: false,
        }
    }

    #[test]
    fn calendar_year_plan() {
        let p = plan(1, 1);
        assert_eq!(p.plan_year_start(date(2024, 6, 1)), date(2024, 1, 1));
        assert_eq!(p.plan_year_start(date(2024, 1, 1)), date(2024, 1, 1));
        assert_eq!(p.plan_year_start(date(2023, 12, 31)), date(2023, 1, 1));
    }

    #[test]
    fn mid_year_reset() {
        let p = plan(7, 1);
        assert_eq!(p.plan_year_start(date(2024, 6, 30)), date(2023, 7, 1));
        assert_eq!(p.plan_year_start(date(2024, 7, 1)), date(2024, 7, 1));
    }

    #[test]
    fn active_range() {
        let mut p = plan(1, 1);
        p.end_date = Some(date(2025, 12, 31));
        assert!(p.active_on(date(2025, 12, 31)));
        assert!(!p.active_on(date(2026, 1, 1)));
        assert!(!p.active_on(date(2019, 12, 31)));
    }
}
