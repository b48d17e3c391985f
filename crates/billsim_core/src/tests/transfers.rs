//! Transfer mirroring and fractional sentinel resolution.

use jiff::civil::date;

use crate::error::EngineError;
use crate::model::{AccountKind, Amount, AmountSpec, TRANSFER_CATEGORY};
use crate::tests::support::{account, activity, assert_ledger_recurrence, catalog, run, transfer};
use crate::timeline::{Window, build_timeline};
use crate::engine::{self, EngineOptions};

/// Transfer mirror: $200 A→B leaves A at 800 and B at 200, with two entries
/// on the same date in category Ignore.Transfer.
#[test]
fn transfer_mirror() {
    let mut a = account("a", "A", AccountKind::Checking, 1000.0);
    a.activity.push(transfer(
        "x1",
        "Move",
        date(2024, 2, 1),
        Amount::Fixed(200.0),
        "A",
        "B",
    ));
    let b = account("b", "B", AccountKind::Savings, 0.0);
    let result = run(&catalog(vec![a, b]), date(2024, 1, 1), date(2024, 3, 31));

    let a_ledger = &result.account("A").unwrap().consolidated_activity;
    let b_ledger = &result.account("B").unwrap().consolidated_activity;
    assert_eq!(a_ledger.len(), 1);
    assert_eq!(b_ledger.len(), 1);
    assert_eq!(a_ledger[0].date, date(2024, 2, 1));
    assert_eq!(a_ledger[0].date, b_ledger[0].date);
    assert_eq!(a_ledger[0].amount, -200.0);
    assert_eq!(b_ledger[0].amount, 200.0);
    assert_eq!(a_ledger[0].amount + b_ledger[0].amount, 0.0);
    assert_eq!(a_ledger[0].category.as_deref(), Some(TRANSFER_CATEGORY));
    assert_eq!(b_ledger[0].category.as_deref(), Some(TRANSFER_CATEGORY));
    assert_eq!(a_ledger[0].fro.as_deref(), Some("A"));
    assert_eq!(a_ledger[0].to.as_deref(), Some("B"));

    assert_eq!(result.account("A").unwrap().balance, 800.0);
    assert_eq!(result.account("B").unwrap().balance, 200.0);
    assert_ledger_recurrence(&result);
}

/// `{HALF}` moves half of the source balance at that moment.
#[test]
fn half_sentinel_resolves_against_source() {
    let mut a = account("a", "A", AccountKind::Checking, 1000.0);
    a.activity.push(transfer(
        "x1",
        "Sweep",
        date(2024, 2, 1),
        Amount::HalfOf,
        "A",
        "B",
    ));
    let b = account("b", "B", AccountKind::Savings, 0.0);
    let result = run(&catalog(vec![a, b]), date(2024, 1, 1), date(2024, 2, 28));

    assert_eq!(result.account("A").unwrap().balance, 500.0);
    assert_eq!(result.account("B").unwrap().balance, 500.0);
}

/// `-{FULL}` pays the destination's (negative) balance down to zero.
#[test]
fn neg_full_sentinel_pays_off_destination() {
    let mut a = account("a", "Checking", AccountKind::Checking, 2000.0);
    a.activity.push(transfer(
        "pay",
        "Card payoff",
        date(2024, 2, 5),
        Amount::NegFullOf,
        "Checking",
        "Card",
    ));
    let card = account("c", "Card", AccountKind::Credit, -750.0);
    let result = run(&catalog(vec![a, card]), date(2024, 1, 1), date(2024, 2, 28));

    assert_eq!(result.account("Card").unwrap().balance, 0.0);
    assert_eq!(result.account("Checking").unwrap().balance, 1250.0);
}

/// A sentinel outside a transfer has no counterparty and aborts the run.
#[test]
fn sentinel_on_plain_activity_fails() {
    let mut a = account("a", "A", AccountKind::Checking, 100.0);
    let mut act = activity("x", "Broken", date(2024, 1, 5), 0.0, "Misc.Oops");
    act.amount = AmountSpec {
        amount: Amount::HalfOf,
        ..Default::default()
    };
    a.activity.push(act);
    let cat = catalog(vec![a]);
    let timeline = build_timeline(
        &cat,
        "Default",
        Window::new(date(2024, 1, 1), date(2024, 1, 31)),
    )
    .unwrap();
    let err = engine::run(&cat, &timeline, None, &EngineOptions::default()).unwrap_err();
    assert!(matches!(err, EngineError::UnresolvedTransferAmount { .. }));
}

/// Transfers to and from the same pair on one day settle deterministically.
#[test]
fn same_day_transfers_are_ordered_stably() {
    let mut a = account("a", "A", AccountKind::Checking, 300.0);
    a.activity.push(transfer(
        "t1",
        "First",
        date(2024, 3, 1),
        Amount::Fixed(100.0),
        "A",
        "B",
    ));
    a.activity.push(transfer(
        "t2",
        "Second",
        date(2024, 3, 1),
        Amount::Fixed(50.0),
        "B",
        "A",
    ));
    let b = account("b", "B", AccountKind::Savings, 0.0);
    let result = run(&catalog(vec![a, b]), date(2024, 1, 1), date(2024, 3, 31));

    assert_eq!(result.account("A").unwrap().balance, 250.0);
    assert_eq!(result.account("B").unwrap().balance, 50.0);
    assert_ledger_recurrence(&result);
}
