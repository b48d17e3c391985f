//! Money movement: per-year, per-account net flow over the window.

use crate::date_math::round_cents;
use crate::engine::EngineResult;
use crate::timeline::Window;

use super::{ChartData, Dataset, filter_accounts};

/// Chart with one label per year and one dataset per account, each data
/// point being the net sum of that account's entry amounts in that year.
pub fn money_movement(
    result: &EngineResult,
    window: Window,
    selection: Option<&[String]>,
) -> ChartData {
    let accounts = filter_accounts(result, selection);
    let years: Vec<i16> = (window.start.year()..=window.end.year()).collect();

    let datasets = accounts
        .iter()
        .map(|account| {
            let mut data = vec![0.0; years.len()];
            for entry in &account.consolidated_activity {
                if !window.contains(entry.date) {
                    continue;
                }
                let idx = (entry.date.year() - years[0]) as usize;
                data[idx] += entry.amount;
            }
            for value in &mut data {
                *value = round_cents(*value);
            }
            Dataset {
                label: account.name.clone(),
                data,
            }
        })
        .collect();

    ChartData {
        labels: years.iter().map(|y| y.to_string()).collect(),
        datasets,
    }
}
