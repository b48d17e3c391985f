//! Account balance graphs.
//!
//! Short windows render in activity mode (one point per day that has
//! entries, carrying that day's entries); long windows fall back to one
//! minimum-balance point per calendar year.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::engine::EngineResult;
use crate::model::ConsolidatedEntry;
use crate::timeline::Window;

use super::{ChartData, Dataset, filter_accounts};

/// Windows longer than this many years bin by calendar year instead of by
/// day.
pub const YEARLY_MODE_THRESHOLD_YEARS: i32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPoint {
    pub date: Date,
    /// Combined balance across the filtered accounts after this day.
    pub balance: f64,
    pub entries: Vec<ConsolidatedEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum GraphData {
    Activity { points: Vec<ActivityPoint> },
    Yearly { chart: ChartData },
}

/// Build the balance graph for the window, picking the bin mode from the
/// window length.
pub fn account_graph(
    result: &EngineResult,
    window: Window,
    selection: Option<&[String]>,
) -> GraphData {
    let span_years = window.end.year() as i32 - window.start.year() as i32;
    if span_years <= YEARLY_MODE_THRESHOLD_YEARS {
        GraphData::Activity {
            points: activity_points(result, window, selection),
        }
    } else {
        let minima = yearly_minima(result, selection);
        let in_window: Vec<(i16, f64)> = minima
            .into_iter()
            .filter(|(y, _)| *y >= window.start.year() && *y <= window.end.year())
            .collect();
        GraphData::Yearly {
            chart: ChartData {
                labels: in_window.iter().map(|(y, _)| y.to_string()).collect(),
                datasets: vec![Dataset {
                    label: "Minimum Balance".to_string(),
                    data: in_window.iter().map(|(_, v)| *v).collect(),
                }],
            },
        }
    }
}

/// One point per day that has entries; empty interior days are dropped.
fn activity_points(
    result: &EngineResult,
    window: Window,
    selection: Option<&[String]>,
) -> Vec<ActivityPoint> {
    let accounts = filter_accounts(result, selection);

    // Balance entering the window, per account.
    let mut balances: Vec<f64> = accounts
        .iter()
        .map(|a| {
            let mut balance = match a.consolidated_activity.first() {
                Some(first) => first.balance - first.amount,
                None => a.balance,
            };
            for entry in &a.consolidated_activity {
                if entry.date >= window.start {
                    break;
                }
                balance = entry.balance;
            }
            balance
        })
        .collect();

    let mut merged: Vec<(usize, &ConsolidatedEntry)> = Vec::new();
    for (i, account) in accounts.iter().enumerate() {
        for entry in &account.consolidated_activity {
            if window.contains(entry.date) {
                merged.push((i, entry));
            }
        }
    }
    merged.sort_by(|(ai, a), (bi, b)| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.sort_key().cmp(&b.sort_key()))
            .then_with(|| ai.cmp(bi))
    });

    let mut combined: f64 = balances.iter().sum();
    let mut points: Vec<ActivityPoint> = Vec::new();
    for (i, entry) in merged {
        combined += entry.balance - balances[i];
        balances[i] = entry.balance;
        match points.last_mut() {
            Some(point) if point.date == entry.date => {
                point.balance = combined;
                point.entries.push(entry.clone());
            }
            _ => points.push(ActivityPoint {
                date: entry.date,
                balance: combined,
                entries: vec![entry.clone()],
            }),
        }
    }
    points
}

/// Minimum daily combined balance per calendar year of the result window.
///
/// The combined balance only changes at ledger entries, so the scan walks
/// entries chronologically and carries the running value across years. Also
/// the reduction behind the Monte Carlo summary graph.
pub fn yearly_minima(result: &EngineResult, selection: Option<&[String]>) -> Vec<(i16, f64)> {
    let accounts = filter_accounts(result, selection);

    let mut balances: Vec<f64> = accounts
        .iter()
        .map(|a| match a.consolidated_activity.first() {
            Some(first) => first.balance - first.amount,
            None => a.balance,
        })
        .collect();

    let mut points: Vec<(Date, usize, f64)> = Vec::new();
    for (i, account) in accounts.iter().enumerate() {
        for entry in &account.consolidated_activity {
            points.push((entry.date, i, entry.balance));
        }
    }
    points.sort_by_key(|(date, i, _)| (*date, *i));

    let mut combined: f64 = balances.iter().sum();
    let mut out = Vec::new();
    let mut cursor = 0usize;

    // Fold prefix entries from before the first window year without
    // letting them contribute to any year's minimum.
    let first_year_start = jiff::civil::date(result.window.start.year(), 1, 1);
    while cursor < points.len() && points[cursor].0 < first_year_start {
        let (_, i, balance) = points[cursor];
        combined += balance - balances[i];
        balances[i] = balance;
        cursor += 1;
    }

    for year in result.window.start.year()..=result.window.end.year() {
        let year_end = jiff::civil::date(year, 12, 31);
        let mut min = combined;
        while cursor < points.len() && points[cursor].0 <= year_end {
            let (_, i, balance) = points[cursor];
            combined += balance - balances[i];
            balances[i] = balance;
            if combined < min {
                min = combined;
            }
            cursor += 1;
        }
        out.push((year, min));
    }
    out
}
