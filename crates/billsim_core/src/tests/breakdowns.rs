//! Category and section breakdown semantics.

use jiff::civil::date;

use crate::model::{AccountKind, Amount};
use crate::queries::breakdown::{
    category_breakdown, item_transactions, section_breakdown, section_transactions,
};
use crate::tests::support::{account, activity, catalog, run, transfer};
use crate::timeline::Window;

/// Expenses only, Ignore/Income skipped, positive magnitudes.
#[test]
fn category_breakdown_filters_sections() {
    let mut a = account("a", "A", AccountKind::Checking, 0.0);
    a.activity.push(activity("1", "Rent", date(2024, 1, 5), -1500.0, "Housing.Rent"));
    a.activity.push(activity("2", "Groceries", date(2024, 1, 8), -300.0, "Food.Groceries"));
    a.activity.push(activity("3", "Salary", date(2024, 1, 15), 5000.0, "Income.Salary"));
    a.activity.push(activity("4", "Xfer", date(2024, 1, 20), -100.0, "Ignore.Xfer"));
    let result = run(&catalog(vec![a]), date(2024, 1, 1), date(2024, 1, 31));

    let window = Window::new(date(2024, 1, 1), date(2024, 1, 31));
    let breakdown = category_breakdown(&result, window, None);

    assert_eq!(breakdown.len(), 2);
    assert_eq!(breakdown.get("Housing"), Some(&1500.0));
    assert_eq!(breakdown.get("Food"), Some(&300.0));
    assert!(!breakdown.contains_key("Income"));
    assert!(!breakdown.contains_key("Ignore"));
}

/// Refunds offset spend within a section; net-positive sections drop out.
#[test]
fn refunds_offset_spend() {
    let mut a = account("a", "A", AccountKind::Checking, 0.0);
    a.activity.push(activity("1", "TV", date(2024, 1, 5), -400.0, "Shopping.Electronics"));
    a.activity.push(activity("2", "TV return", date(2024, 1, 9), 400.0, "Shopping.Electronics"));
    a.activity.push(activity("3", "Couch", date(2024, 1, 12), -900.0, "Shopping.Furniture"));
    let result = run(&catalog(vec![a]), date(2024, 1, 1), date(2024, 1, 31));

    let window = Window::new(date(2024, 1, 1), date(2024, 1, 31));
    let breakdown = category_breakdown(&result, window, None);
    assert_eq!(breakdown.get("Shopping"), Some(&900.0));
}

/// Transfer half rule: both endpoints inside the filter count half.
#[test]
fn section_breakdown_halves_internal_transfers() {
    let mut a = account("a", "A", AccountKind::Checking, 500.0);
    let mut t = transfer("t", "Food swap", date(2024, 1, 10), Amount::Fixed(200.0), "A", "B");
    t.category = Some("Food.Transfer".into());
    a.activity.push(t);
    let b = account("b", "B", AccountKind::Checking, 0.0);
    let result = run(&catalog(vec![a, b]), date(2024, 1, 1), date(2024, 1, 31));

    let window = Window::new(date(2024, 1, 1), date(2024, 1, 31));
    let by_item = section_breakdown(&result, "Food", window, None);
    assert_eq!(by_item.get("Transfer"), Some(&100.0));
}

/// Only one endpoint in the filter: the expense half counts in full.
#[test]
fn external_transfers_count_in_full() {
    let mut a = account("a", "A", AccountKind::Checking, 500.0);
    let mut t = transfer("t", "Food swap", date(2024, 1, 10), Amount::Fixed(200.0), "A", "B");
    t.category = Some("Food.Transfer".into());
    a.activity.push(t);
    let b = account("b", "B", AccountKind::Checking, 0.0);
    let result = run(&catalog(vec![a, b]), date(2024, 1, 1), date(2024, 1, 31));

    let window = Window::new(date(2024, 1, 1), date(2024, 1, 31));
    let selection = vec!["A".to_string()];
    let by_item = section_breakdown(&result, "Food", window, Some(&selection));
    assert_eq!(by_item.get("Transfer"), Some(&200.0));
}

/// Transactions dedupe mirror halves by entry id.
#[test]
fn transactions_dedupe_by_id() {
    let mut a = account("a", "A", AccountKind::Checking, 500.0);
    let mut t = transfer("t", "Food swap", date(2024, 1, 10), Amount::Fixed(200.0), "A", "B");
    t.category = Some("Food.Transfer".into());
    a.activity.push(t);
    a.activity.push(activity("g", "Groceries", date(2024, 1, 4), -80.0, "Food.Groceries"));
    let b = account("b", "B", AccountKind::Checking, 0.0);
    let result = run(&catalog(vec![a, b]), date(2024, 1, 1), date(2024, 1, 31));

    let window = Window::new(date(2024, 1, 1), date(2024, 1, 31));
    let all = section_transactions(&result, "Food", window, None);
    assert_eq!(all.len(), 2); // the transfer pair collapses to one entry

    let only_groceries = item_transactions(&result, "Food", "Groceries", window, None);
    assert_eq!(only_groceries.len(), 1);
    assert_eq!(only_groceries[0].id, "g");
}

/// Conservation (no transfers involved): breakdown totals plus skipped
/// sections account for every entry magnitude.
#[test]
fn breakdown_conserves_magnitudes() {
    let mut a = account("a", "A", AccountKind::Checking, 0.0);
    a.activity.push(activity("1", "Rent", date(2024, 1, 5), -1500.0, "Housing.Rent"));
    a.activity.push(activity("2", "Salary", date(2024, 1, 15), 5000.0, "Income.Salary"));
    a.activity.push(activity("3", "Skip", date(2024, 1, 16), -40.0, "Ignore.Fee"));
    a.activity.push(activity("4", "Gift", date(2024, 1, 17), 120.0, "Gifts.Received"));
    let result = run(&catalog(vec![a]), date(2024, 1, 1), date(2024, 1, 31));

    let window = Window::new(date(2024, 1, 1), date(2024, 1, 31));
    let breakdown = category_breakdown(&result, window, None);

    let breakdown_total: f64 = breakdown.values().sum();
    let positives_dropped = 120.0; // Gifts section nets positive
    let skipped = 5000.0 + 40.0; // Income + Ignore magnitudes
    let all_magnitudes = 1500.0 + 5000.0 + 40.0 + 120.0;
    assert_eq!(breakdown_total + positives_dropped + skipped, all_magnitudes);
}
