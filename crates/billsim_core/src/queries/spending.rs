//! Spending-tracker chart: per-period spend against a moving threshold.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::date_math::round_cents;
use crate::engine::EngineResult;
use crate::error::Result;
use crate::model::{Catalog, SpendingTrackerCategory, spending::parse_month_day};
use crate::timeline::Window;

/// One tracker period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackerPeriod {
    /// Half-open `[start, end)` period bounds.
    pub start: Date,
    pub end: Date,
    pub spent: f64,
    /// Threshold after carry-over/under and dated adjustments.
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackerChart {
    pub category_id: String,
    pub name: String,
    pub periods: Vec<TrackerPeriod>,
}

/// Build the chart for one category over the window.
///
/// Per period, in order: dated `threshold_changes` replace the base
/// threshold, the annual `increase_by` percentage compounds on its `MM/DD`
/// anniversary, and carry-over/carry-under from the previous period adjusts
/// the effective threshold. Periods that start before the category's
/// `start_date` are skipped.
pub fn tracker_chart(
    catalog: &Catalog,
    result: &EngineResult,
    category: &SpendingTrackerCategory,
    window: Window,
    scenario: &str,
) -> Result<TrackerChart> {
    let base = catalog.scenarios.resolve_rate(
        category.threshold,
        if category.threshold_is_variable {
            category.threshold_variable.as_deref()
        } else {
            None
        },
        scenario,
    )?;

    let account_entries: Vec<(Date, f64)> = result
        .accounts
        .iter()
        .filter(|a| a.account_id == category.account_id || a.name == category.account_id)
        .flat_map(|a| a.consolidated_activity.iter())
        .filter(|e| !e.is_transfer && e.amount < 0.0)
        .map(|e| (e.date, e.amount))
        .collect();

    let increase_anchor = category.increase_by_date.as_deref().and_then(parse_month_day);

    let mut periods = Vec::new();
    let mut threshold = base;
    let mut carry = 0.0;
    let mut change_cursor = 0usize;

    let mut start = category.period_start(window.start);
    // Changes dated before the first period fold into the starting value.
    while change_cursor < category.threshold_changes.len()
        && category.threshold_changes[change_cursor].date <= start
    {
        threshold = category.threshold_changes[change_cursor].threshold;
        change_cursor += 1;
    }

    while start <= window.end {
        let end = category.next_period_start(start);

        // Dated threshold overrides taking effect inside this period.
        while change_cursor < category.threshold_changes.len()
            && category.threshold_changes[change_cursor].date < end
        {
            threshold = category.threshold_changes[change_cursor].threshold;
            change_cursor += 1;
        }

        // Annual increase on its anniversary.
        if let Some((month, day)) = increase_anchor
            && category.increase_by != 0.0
        {
            for year in start.year()..=end.year() {
                let day = day.min(crate::date_math::days_in_month(year, month));
                let anniversary = jiff::civil::date(year, month, day);
                if anniversary >= start && anniversary < end {
                    threshold = round_cents(threshold * (1.0 + category.increase_by / 100.0));
                }
            }
        }

        if category.start_date.is_some_and(|sd| start < sd) {
            start = end;
            continue;
        }

        let spent: f64 = account_entries
            .iter()
            .filter(|(d, _)| *d >= start && *d < end)
            .map(|(_, amount)| -amount)
            .sum();
        let spent = round_cents(spent);

        let effective = round_cents(threshold + carry);
        periods.push(TrackerPeriod {
            start,
            end,
            spent,
            threshold: effective,
        });

        let leftover = effective - spent;
        carry = if leftover > 0.0 && category.carry_over {
            leftover
        } else if leftover < 0.0 && category.carry_under {
            leftover
        } else {
            0.0
        };

        start = end;
    }

    Ok(TrackerChart {
        category_id: category.id.clone(),
        name: category.name.clone(),
        periods,
    })
}
