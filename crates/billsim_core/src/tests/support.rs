//! Shared fixture builders for the engine tests.

use jiff::civil::Date;

use crate::engine::{self, EngineOptions, EngineResult};
use crate::model::{
    Account, AccountKind, AccountsAndTransfers, Activity, Amount, AmountSpec, Bill, Catalog,
    DateSpec, PeriodUnit,
};
use crate::timeline::{Window, build_timeline};

pub fn account(id: &str, name: &str, kind: AccountKind, balance: f64) -> Account {
    Account {
        id: id.into(),
        name: name.into(),
        kind,
        hidden: false,
        balance,
        activity: Vec::new(),
        bills: Vec::new(),
        interests: Vec::new(),
        uses_rmd: false,
        account_owner_dob: None,
        rmd_account: None,
        pull_priority: None,
    }
}

pub fn activity(id: &str, name: &str, date: Date, amount: f64, category: &str) -> Activity {
    Activity {
        id: id.into(),
        name: name.into(),
        date: DateSpec::fixed(date),
        amount: AmountSpec::fixed(amount),
        category: Some(category.into()),
        is_transfer: false,
        fro: None,
        to: None,
        bill_id: None,
        healthcare: Default::default(),
        flag: false,
    }
}

pub fn transfer(id: &str, name: &str, date: Date, amount: Amount, fro: &str, to: &str) -> Activity {
    Activity {
        id: id.into(),
        name: name.into(),
        date: DateSpec::fixed(date),
        amount: AmountSpec {
            amount,
            ..Default::default()
        },
        category: None,
        is_transfer: true,
        fro: Some(fro.into()),
        to: Some(to.into()),
        bill_id: None,
        healthcare: Default::default(),
        flag: false,
    }
}

pub fn monthly_bill(id: &str, name: &str, start: Date, amount: f64, category: &str) -> Bill {
    Bill {
        id: id.into(),
        name: name.into(),
        start_date: start,
        end_date: None,
        periods: PeriodUnit::Month,
        every_n: 1,
        amount: AmountSpec::fixed(amount),
        category: Some(category.into()),
        is_transfer: false,
        fro: None,
        to: None,
        healthcare: Default::default(),
        flag: false,
    }
}

pub fn catalog(accounts: Vec<Account>) -> Catalog {
    Catalog {
        accounts_and_transfers: AccountsAndTransfers {
            accounts,
            transfers: Default::default(),
        },
        ..Default::default()
    }
}

/// Build the timeline and run the day-walk with default options.
pub fn run(catalog: &Catalog, start: Date, end: Date) -> EngineResult {
    let timeline = build_timeline(catalog, "Default", Window::new(start, end)).unwrap();
    engine::run(catalog, &timeline, None, &EngineOptions::default()).unwrap()
}

/// Run with monthly snapshot capture enabled.
pub fn run_with_snapshots(catalog: &Catalog, start: Date, end: Date) -> EngineResult {
    let timeline = build_timeline(catalog, "Default", Window::new(start, end)).unwrap();
    engine::run(
        catalog,
        &timeline,
        None,
        &EngineOptions {
            write_snapshots: true,
            stochastic: None,
        },
    )
    .unwrap()
}

/// Assert the running-balance recurrence on every account ledger, to within
/// one cent.
pub fn assert_ledger_recurrence(result: &EngineResult) {
    for account in &result.accounts {
        let entries = &account.consolidated_activity;
        let opening = match entries.first() {
            Some(first) => first.balance - first.amount,
            None => continue,
        };
        let mut previous = opening;
        for (i, entry) in entries.iter().enumerate() {
            let expected = previous + entry.amount;
            assert!(
                (entry.balance - expected).abs() <= 0.01,
                "{}[{}]: balance {} != {} + {}",
                account.name,
                i,
                entry.balance,
                previous,
                entry.amount
            );
            previous = entry.balance;
        }
        // Ledger must be sorted by (date, name, id)
        for pair in entries.windows(2) {
            assert!(
                pair[0].sort_key() <= pair[1].sort_key(),
                "{}: entries out of order: {:?} then {:?}",
                account.name,
                pair[0].sort_key(),
                pair[1].sort_key()
            );
        }
    }
}
