//! Spending-tracker categories: thresholds tracked per weekly/monthly/yearly
//! period over one account's expenses.

use jiff::civil::{Date, Weekday};
use serde::{Deserialize, Serialize};

use crate::date_math::{add_days, add_months, add_years, days_in_month};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerInterval {
    Weekly,
    Monthly,
    Yearly,
}

/// Where a period begins: a day of month (monthly), a weekday name (weekly),
/// or an `MM/DD` anchor (yearly). Stored untagged so the JSON stays a bare
/// number or string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntervalStart {
    Day(u8),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdChange {
    pub date: Date,
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpendingTrackerCategory {
    pub id: String,
    pub name: String,
    pub threshold: f64,
    #[serde(default)]
    pub threshold_is_variable: bool,
    #[serde(default)]
    pub threshold_variable: Option<String>,
    pub interval: TrackerInterval,
    pub interval_start: IntervalStart,
    pub account_id: String,
    /// Unspent threshold rolls into the next period.
    #[serde(default)]
    pub carry_over: bool,
    /// Overspend is deducted from the next period's threshold.
    #[serde(default)]
    pub carry_under: bool,
    /// Annual percentage increase applied on `increase_by_date`.
    #[serde(default)]
    pub increase_by: f64,
    /// `MM/DD` anchor for the annual increase.
    #[serde(default)]
    pub increase_by_date: Option<String>,
    /// Dated threshold overrides, strictly ascending by date.
    #[serde(default)]
    pub threshold_changes: Vec<ThresholdChange>,
    /// Periods before this date are skipped entirely.
    #[serde(default)]
    pub start_date: Option<Date>,
}

fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.to_ascii_lowercase().as_str() {
        "monday" => Some(Weekday::Monday),
        "tuesday" => Some(Weekday::Tuesday),
        "wednesday" => Some(Weekday::Wednesday),
        "thursday" => Some(Weekday::Thursday),
        "friday" => Some(Weekday::Friday),
        "saturday" => Some(Weekday::Saturday),
        "sunday" => Some(Weekday::Sunday),
        _ => None,
    }
}

/// Parse an `MM/DD` anchor into `(month, day)`.
pub(crate) fn parse_month_day(s: &str) -> Option<(i8, i8)> {
    let (m, d) = s.split_once('/')?;
    let month: i8 = m.parse().ok()?;
    let day: i8 = d.parse().ok()?;
    if !(1..=12).contains(&month) || day < 1 || day > days_in_month(2024, month) {
        return None;
    }
    Some((month, day))
}

impl SpendingTrackerCategory {
    /// Start of the period containing `date`.
    pub fn period_start(&self, date: Date) -> Date {
        match (&self.interval, &self.interval_start) {
            (TrackerInterval::Weekly, IntervalStart::Text(name)) => {
                let target = parse_weekday(name).unwrap_or(Weekday::Monday);
                let mut d = date;
                while d.weekday() != target {
                    d = add_days(d, -1);
                }
                d
            }
            (TrackerInterval::Monthly, IntervalStart::Day(day)) => {
                let day = *day as i8;
                let anchor = jiff::civil::date(date.year(), date.month(), day);
                if date >= anchor { anchor } else { add_months(anchor, -1) }
            }
            (TrackerInterval::Yearly, IntervalStart::Text(md)) => {
                let (month, day) = parse_month_day(md).unwrap_or((1, 1));
                let year = date.year();
                let day = day.min(days_in_month(year, month));
                let anchor = jiff::civil::date(year, month, day);
                if date >= anchor { anchor } else { add_years(anchor, -1) }
            }
            // Interval/start mismatches are rejected by validation; fall back
            // to a calendar-month period so stale data cannot panic.
            _ => jiff::civil::date(date.year(), date.month(), 1),
        }
    }

    /// Start of the period following the one that starts at `start`.
    pub fn next_period_start(&self, start: Date) -> Date {
        match self.interval {
            TrackerInterval::Weekly => add_days(start, 7),
            TrackerInterval::Monthly => add_months(start, 1),
            TrackerInterval::Yearly => add_years(start, 1),
        }
    }
}

/// Loosely-typed CRUD payload for a spending-tracker category. Handlers bind
/// this shape, validate it against the live catalog, and only then obtain the
/// typed [`SpendingTrackerCategory`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingTrackerDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub threshold_is_variable: bool,
    #[serde(default)]
    pub threshold_variable: Option<String>,
    #[serde(default)]
    pub interval: String,
    #[serde(default)]
    pub interval_start: Option<IntervalStart>,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub carry_over: bool,
    #[serde(default)]
    pub carry_under: bool,
    #[serde(default)]
    pub increase_by: f64,
    #[serde(default)]
    pub increase_by_date: Option<String>,
    #[serde(default)]
    pub threshold_changes: Vec<ThresholdChange>,
    #[serde(default)]
    pub start_date: Option<Date>,
}

impl SpendingTrackerDraft {
    /// Validate the payload; `taken_names` are the other categories' names
    /// (uniqueness check) and `fallback_id` is used when the payload carries
    /// no id (create path).
    pub fn validate(
        self,
        taken_names: &[&str],
        fallback_id: &str,
    ) -> Result<SpendingTrackerCategory, Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Name must not be empty".to_string());
        } else if taken_names.iter().any(|n| *n == self.name) {
            errors.push("Name must be unique".to_string());
        }

        if self.threshold < 0.0 {
            errors.push("Threshold must be >= 0".to_string());
        }

        let interval = match self.interval.as_str() {
            "weekly" => Some(TrackerInterval::Weekly),
            "monthly" => Some(TrackerInterval::Monthly),
            "yearly" => Some(TrackerInterval::Yearly),
            _ => {
                errors.push("Interval must be one of: weekly, monthly, yearly".to_string());
                None
            }
        };

        let interval_start = match (interval, &self.interval_start) {
            (Some(TrackerInterval::Monthly), Some(IntervalStart::Day(day)))
                if (1..=28).contains(day) =>
            {
                Some(IntervalStart::Day(*day))
            }
            (Some(TrackerInterval::Monthly), _) => {
                errors.push("Interval start must be a day of month between 1 and 28".to_string());
                None
            }
            (Some(TrackerInterval::Weekly), Some(IntervalStart::Text(name)))
                if parse_weekday(name).is_some() =>
            {
                Some(IntervalStart::Text(name.clone()))
            }
            (Some(TrackerInterval::Weekly), _) => {
                errors.push("Interval start must be a weekday name".to_string());
                None
            }
            (Some(TrackerInterval::Yearly), Some(IntervalStart::Text(md)))
                if parse_month_day(md).is_some() =>
            {
                Some(IntervalStart::Text(md.clone()))
            }
            (Some(TrackerInterval::Yearly), _) => {
                errors.push("Interval start must be MM/DD".to_string());
                None
            }
            (None, _) => None,
        };

        if self.account_id.trim().is_empty() {
            errors.push("Account is required".to_string());
        }

        for pair in self.threshold_changes.windows(2) {
            if pair[1].date <= pair[0].date {
                errors.push("Threshold changes must be in ascending date order".to_string());
                break;
            }
        }
        if self.threshold_changes.iter().any(|c| c.threshold < 0.0) {
            errors.push("Threshold changes must be >= 0".to_string());
        }

        if let Some(md) = &self.increase_by_date
            && parse_month_day(md).is_none()
        {
            errors.push("Increase by date must be MM/DD".to_string());
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(SpendingTrackerCategory {
            id: self.id.unwrap_or_else(|| fallback_id.to_string()),
            name: self.name,
            threshold: self.threshold,
            threshold_is_variable: self.threshold_is_variable,
            threshold_variable: self.threshold_variable,
            interval: interval.unwrap_or(TrackerInterval::Monthly),
            interval_start: interval_start.unwrap_or(IntervalStart::Day(1)),
            account_id: self.account_id,
            carry_over: self.carry_over,
            carry_under: self.carry_under,
            increase_by: self.increase_by,
            increase_by_date: self.increase_by_date,
            threshold_changes: self.threshold_changes,
            start_date: self.start_date,
        })
    }
}
