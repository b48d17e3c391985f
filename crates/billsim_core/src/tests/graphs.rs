//! Balance graph binning: activity vs. yearly mode, multi-account merging.

use jiff::civil::date;

use crate::model::AccountKind;
use crate::queries::graph::{GraphData, YEARLY_MODE_THRESHOLD_YEARS, account_graph, yearly_minima};
use crate::tests::support::{account, activity, catalog, run};
use crate::timeline::Window;

/// Two accounts, three dated entries between them: Checking dips then
/// partially recovers, Savings takes one deposit.
fn graph_catalog() -> crate::model::Catalog {
    let mut checking = account("c", "Checking", AccountKind::Checking, 1000.0);
    checking.activity.push(activity("dip", "Car repair", date(2024, 2, 10), -600.0, "Auto.Repair"));
    checking.activity.push(activity("ref", "Refund", date(2024, 3, 5), 300.0, "Auto.Repair"));

    let mut savings = account("s", "Savings", AccountKind::Savings, 500.0);
    savings.activity.push(activity("dep", "Deposit", date(2024, 2, 10), 100.0, "Income.Deposit"));

    catalog(vec![checking, savings])
}

/// Short windows bin by day: one point per day that has entries, carrying
/// that day's entries and the combined balance across the filter.
#[test]
fn activity_mode_merges_accounts_per_day() {
    let cat = graph_catalog();
    let window = Window::new(date(2024, 1, 1), date(2024, 12, 31));
    let result = run(&cat, window.start, window.end);

    let GraphData::Activity { points } = account_graph(&result, window, None) else {
        panic!("one-year window must bin by day");
    };

    // Only the two days with entries appear; empty interior days are gone.
    assert_eq!(points.len(), 2);

    // Feb 10: both accounts move on the same day. Combined 1500 - 600 + 100.
    assert_eq!(points[0].date, date(2024, 2, 10));
    assert_eq!(points[0].balance, 1000.0);
    assert_eq!(points[0].entries.len(), 2);

    // Mar 5: only the refund. Combined 1000 + 300.
    assert_eq!(points[1].date, date(2024, 3, 5));
    assert_eq!(points[1].balance, 1300.0);
    assert_eq!(points[1].entries.len(), 1);
    assert_eq!(points[1].entries[0].id, "ref");
}

/// An explicit selection scopes the running balance to those accounts.
#[test]
fn activity_mode_respects_selection() {
    let cat = graph_catalog();
    let window = Window::new(date(2024, 1, 1), date(2024, 12, 31));
    let result = run(&cat, window.start, window.end);

    let selection = vec!["Checking".to_string()];
    let GraphData::Activity { points } = account_graph(&result, window, Some(&selection)) else {
        panic!("one-year window must bin by day");
    };
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].balance, 400.0); // 1000 - 600, Savings excluded
    assert_eq!(points[1].balance, 700.0);
}

/// Past the threshold the graph switches to one minimum-balance point per
/// calendar year.
#[test]
fn long_windows_bin_by_year() {
    let cat = graph_catalog();
    // 11 whole years of span crosses the 10-year threshold
    let window = Window::new(date(2024, 1, 1), date(2035, 12, 31));
    let result = run(&cat, window.start, window.end);

    let GraphData::Yearly { chart } = account_graph(&result, window, None) else {
        panic!("a multi-decade window must bin by year");
    };
    assert_eq!(chart.labels.len(), 12);
    assert_eq!(chart.labels[0], "2024");
    assert_eq!(chart.labels[11], "2035");
    assert_eq!(chart.datasets.len(), 1);

    // 2024 dips to 900 (1500 - 600) before the deposit and refund land;
    // every later year sits at the settled 1300.
    assert_eq!(chart.datasets[0].data[0], 900.0);
    assert!(chart.datasets[0].data[1..].iter().all(|v| *v == 1300.0));
}

/// The mode switch keys off whole years of window span.
#[test]
fn threshold_boundary_stays_in_activity_mode() {
    let cat = graph_catalog();
    let start = date(2024, 1, 1);
    let at_threshold = Window::new(
        start,
        date(start.year() + YEARLY_MODE_THRESHOLD_YEARS as i16, 12, 31),
    );
    let result = run(&cat, at_threshold.start, at_threshold.end);
    assert!(matches!(
        account_graph(&result, at_threshold, None),
        GraphData::Activity { .. }
    ));
}

/// The yearly reduction carries the running balance across entry-free years
/// and scopes to a single account when asked.
#[test]
fn yearly_minima_carries_and_scopes() {
    let cat = graph_catalog();
    let result = run(&cat, date(2024, 1, 1), date(2026, 12, 31));

    let combined = yearly_minima(&result, None);
    assert_eq!(combined, vec![(2024, 900.0), (2025, 1300.0), (2026, 1300.0)]);

    let selection = vec!["Checking".to_string()];
    let scoped = yearly_minima(&result, Some(&selection));
    assert_eq!(scoped[0], (2024, 400.0));
    assert_eq!(scoped[1], (2025, 700.0));
}
