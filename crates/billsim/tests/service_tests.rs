//! End-to-end service tests: storage round trips, the snapshot cache, the
//! compute-with-resume path, CRUD invalidation, and the Monte Carlo runner.

use std::time::{Duration, Instant};

use billsim::app::{App, AppConfig};
use billsim::cache::SnapshotCache;
use billsim::jobs::{JobRequest, JobState};
use billsim::loader::{self, QueryParams};
use billsim::storage::DataStore;
use billsim::ServiceError;
use billsim_core::model::{
    Account, AccountKind, AccountsAndTransfers, Activity, AmountSpec, Bill, Compounding, DateSpec,
    InterestRule, PeriodUnit, SpendingTrackerDraft,
};
use billsim_core::montecarlo::{StochasticConfig, StochasticVariable, VariableDistribution};
use billsim_core::scenario::VariableValue;
use billsim_core::snapshot::{BalanceSnapshot, CACHE_VERSION};
use billsim_core::timeline::Window;
use jiff::civil::date;
use tempfile::tempdir;

fn checking(id: &str, name: &str, balance: f64) -> Account {
    Account {
        id: id.into(),
        name: name.into(),
        kind: AccountKind::Checking,
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

fn rent_bill() -> Bill {
    Bill {
        id: "rent".into(),
        name: "Rent".into(),
        start_date: date(2024, 1, 15),
        end_date: None,
        periods: PeriodUnit::Month,
        every_n: 1,
        amount: AmountSpec::fixed(-1500.0),
        category: Some("Housing.Rent".into()),
        is_transfer: false,
        fro: None,
        to: None,
        healthcare: Default::default(),
        flag: false,
    }
}

fn seed_store(store: &DataStore) {
    let mut account = checking("a", "Checking", 10_000.0);
    account.bills.push(rent_bill());
    account.interests.push(InterestRule {
        id: "int".into(),
        apr: 0.03,
        apr_is_variable: true,
        apr_variable: Some("marketReturn".into()),
        compounded: Compounding::Month,
        applicable_date: date(2024, 1, 1),
    });
    store
        .save_accounts(&AccountsAndTransfers {
            accounts: vec![account, checking("s", "Savings", 500.0)],
            transfers: Default::default(),
        })
        .unwrap();

    let mut scenarios = billsim_core::Scenarios::default();
    scenarios
        .variables
        .entry("marketReturn".to_string())
        .or_default()
        .insert("Default".to_string(), VariableValue::Amount(0.05));
    store.save_scenarios(&scenarios).unwrap();
}

fn open_app(root: &std::path::Path) -> App {
    let config = AppConfig::under_root(root, 5002);
    let store = DataStore::new(&config.data_dir).unwrap();
    seed_store(&store);
    App::open(config).unwrap()
}

#[test]
fn catalog_round_trips_through_the_store() {
    let dir = tempdir().unwrap();
    let store = DataStore::new(dir.path()).unwrap();
    seed_store(&store);

    let catalog = store.load_catalog().unwrap();
    assert_eq!(catalog.accounts_and_transfers.accounts.len(), 2);
    assert_eq!(catalog.accounts_and_transfers.accounts[0].bills.len(), 1);
    assert!(catalog.scenarios.contains("Default"));
    assert!(catalog.scenarios.variables.contains_key("marketReturn"));
    // The default RMD table rides along even without an rmd.json
    assert_eq!(catalog.rmd_table.start_age(), Some(73));
}

#[test]
fn variables_csv_round_trips() {
    let dir = tempdir().unwrap();
    let store = DataStore::new(dir.path()).unwrap();

    let mut scenarios = billsim_core::Scenarios::default();
    let per = scenarios
        .variables
        .entry("retireDate".to_string())
        .or_default();
    per.insert(
        "Default".to_string(),
        VariableValue::Date(date(2045, 6, 1)),
    );
    scenarios
        .variables
        .entry("rentAmount".to_string())
        .or_default()
        .insert("Default".to_string(), VariableValue::Amount(-1500.0));
    store.save_scenarios(&scenarios).unwrap();

    let loaded = store.load_catalog().unwrap().scenarios;
    assert_eq!(
        loaded.variables["retireDate"]["Default"],
        VariableValue::Date(date(2045, 6, 1))
    );
    assert_eq!(
        loaded.variables["rentAmount"]["Default"],
        VariableValue::Amount(-1500.0)
    );
}

#[test]
fn backups_rotate_on_cadence() {
    let dir = tempdir().unwrap();
    let store = DataStore::new(dir.path()).unwrap();
    let data = AccountsAndTransfers {
        accounts: vec![checking("a", "Checking", 1.0)],
        transfers: Default::default(),
    };
    // Every 5th save snapshots the prior file into backup/
    for _ in 0..11 {
        store.save_accounts(&data).unwrap();
    }
    let backups: Vec<_> = std::fs::read_dir(dir.path().join("backup"))
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert!(!backups.is_empty());
}

#[test]
fn cache_two_tiers_and_corruption() {
    let dir = tempdir().unwrap();
    let cache = SnapshotCache::new(dir.path()).unwrap();

    let snapshot = BalanceSnapshot {
        cache_version: CACHE_VERSION,
        date: date(2024, 3, 1),
        monte_carlo: false,
        balances: [("a".to_string(), 42.0)].into_iter().collect(),
        ledger_prefix: Default::default(),
        cost_sharing: Vec::new(),
    };
    cache.put("k1", snapshot.clone()).unwrap();
    assert_eq!(cache.get("k1").unwrap().balances["a"], 42.0);

    // A fresh instance over the same directory hits the disk tier
    let rehydrated = SnapshotCache::new(dir.path()).unwrap();
    assert_eq!(rehydrated.memory_len(), 0);
    assert!(rehydrated.get("k1").is_some());
    assert_eq!(rehydrated.memory_len(), 1);

    // Corrupt blob: miss, removed
    std::fs::write(dir.path().join("bad"), b"{not json").unwrap();
    assert!(rehydrated.get("bad").is_none());
    assert!(!dir.path().join("bad").exists());

    // Date-based invalidation drops the snapshot from both tiers
    rehydrated.invalidate_from(date(2024, 3, 1));
    assert!(rehydrated.get("k1").is_none());
}

#[test]
fn cache_invalidation_keeps_older_snapshots() {
    let dir = tempdir().unwrap();
    let cache = SnapshotCache::new(dir.path()).unwrap();
    for (key, month) in [("feb", 2), ("jun", 6)] {
        cache
            .put(
                key,
                BalanceSnapshot {
                    cache_version: CACHE_VERSION,
                    date: date(2024, month, 1),
                    monte_carlo: false,
                    balances: Default::default(),
                    ledger_prefix: Default::default(),
                    cost_sharing: Vec::new(),
                },
            )
            .unwrap();
    }
    cache.invalidate_from(date(2024, 4, 1));
    assert!(cache.get("feb").is_some());
    assert!(cache.get("jun").is_none());
}

#[test]
fn compute_resumes_identically_from_snapshots() {
    let dir = tempdir().unwrap();
    let app = open_app(dir.path());

    // Cold pass over the whole year populates monthly snapshots.
    let full_year = Window::new(date(2024, 1, 1), date(2024, 12, 31));
    app.compute("Default", full_year).unwrap();
    assert!(app.cache.memory_len() > 0);

    // A later-window compute resumes from the June snapshot...
    let late = Window::new(date(2024, 6, 1), date(2024, 12, 31));
    let resumed = app.compute("Default", late).unwrap();

    // ...and must equal the same compute done from genesis with no cache.
    app.reset_cache();
    let from_scratch = app.compute("Default", late).unwrap();
    for (a, b) in resumed.accounts.iter().zip(&from_scratch.accounts) {
        assert_eq!(a.balance, b.balance);
        assert_eq!(
            serde_json::to_string(&a.consolidated_activity).unwrap(),
            serde_json::to_string(&b.consolidated_activity).unwrap()
        );
    }
}

#[test]
fn crud_mutations_change_results() {
    let dir = tempdir().unwrap();
    let app = open_app(dir.path());
    let window = Window::new(date(2024, 1, 1), date(2024, 6, 30));

    let before = app.compute("Default", window).unwrap();
    app.add_activity(
        "a",
        Activity {
            id: "bonus".into(),
            name: "Bonus".into(),
            date: DateSpec::fixed(date(2024, 2, 20)),
            amount: AmountSpec::fixed(2500.0),
            category: Some("Income.Bonus".into()),
            is_transfer: false,
            fro: None,
            to: None,
            bill_id: None,
            healthcare: Default::default(),
            flag: false,
        },
    )
    .unwrap();

    let after = app.compute("Default", window).unwrap();
    let delta = after.account("Checking").unwrap().balance
        - before.account("Checking").unwrap().balance;
    assert!((delta - 2500.0).abs() < 0.01);

    // The mutation also survives a fresh load from disk
    let reloaded = app.store.load_catalog().unwrap();
    assert!(
        reloaded.accounts_and_transfers.accounts[0]
            .activity
            .iter()
            .any(|a| a.id == "bonus")
    );
}

#[test]
fn consolidated_activity_slices_to_the_window() {
    let dir = tempdir().unwrap();
    let app = open_app(dir.path());
    let params = QueryParams::from_pairs([
        ("startDate", "2024-02-01"),
        ("endDate", "2024-03-31"),
    ]);
    let entries =
        loader::consolidated_activity(&app, "Checking", &params, date(2024, 6, 1)).unwrap();
    assert!(!entries.is_empty());
    assert!(entries.iter().all(|e| e.date >= date(2024, 2, 1)));
    assert!(entries.iter().all(|e| e.date <= date(2024, 3, 31)));
}

#[test]
fn unknown_account_is_not_found() {
    let dir = tempdir().unwrap();
    let app = open_app(dir.path());
    let params = QueryParams::default();
    let err =
        loader::consolidated_activity(&app, "Nope", &params, date(2024, 6, 1)).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    assert_eq!(err.http_status(), 404);
}

#[test]
fn spending_tracker_validation_maps_to_400() {
    let dir = tempdir().unwrap();
    let app = open_app(dir.path());

    let err = app
        .create_spending_tracker(SpendingTrackerDraft {
            name: "Groceries".into(),
            threshold: -1.0,
            interval: "monthly".into(),
            interval_start: Some(billsim_core::model::IntervalStart::Day(1)),
            account_id: "a".into(),
            ..Default::default()
        })
        .unwrap_err();
    assert_eq!(err.http_status(), 400);
    assert!(err.to_string().contains("Threshold must be >= 0"));

    let err = app
        .create_spending_tracker(SpendingTrackerDraft {
            name: "Groceries".into(),
            threshold: 100.0,
            interval: "biweekly".into(),
            interval_start: Some(billsim_core::model::IntervalStart::Day(1)),
            account_id: "a".into(),
            ..Default::default()
        })
        .unwrap_err();
    assert!(
        err.to_string()
            .contains("Interval must be one of: weekly, monthly, yearly")
    );
}

#[test]
fn monte_carlo_job_runs_to_completion() {
    let dir = tempdir().unwrap();
    let app = open_app(dir.path());

    let id = app
        .start_monte_carlo(JobRequest {
            scenario: "Default".into(),
            start_date: date(2024, 1, 1),
            end_date: date(2025, 12, 31),
            simulations: 4,
            batch_size: 2,
            percentiles: vec![0.0, 50.0, 100.0],
            stochastic: StochasticConfig {
                variables: vec![StochasticVariable {
                    variable: "marketReturn".into(),
                    distribution: VariableDistribution::Normal { mean: 0.05, std_dev: 0.1 },
                }],
            },
            seed: 11,
        })
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(30);
    let status = loop {
        let status = app.runner.status(&id).unwrap();
        match status.state {
            JobState::Completed | JobState::Failed => break status,
            _ if Instant::now() > deadline => panic!("job did not finish in time"),
            _ => std::thread::sleep(Duration::from_millis(50)),
        }
    };
    assert_eq!(status.state, JobState::Completed);
    assert_eq!(status.completed_simulations, 4);
    assert!(status.duration_millis.is_some());

    // Shards are gone, the merged result and graph exist
    let temp_files: Vec<_> = std::fs::read_dir(dir.path().join("monte_carlo").join("temp"))
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert!(temp_files.is_empty());

    let graph = app.runner.graph(&id).unwrap();
    assert_eq!(graph.combined.labels, vec!["2024", "2025"]);
    // p0/p50/p100 plus the deterministic overlay
    assert_eq!(graph.combined.datasets.len(), 4);
    for year in 0..graph.combined.labels.len() {
        assert!(graph.combined.datasets[0].data[year] <= graph.combined.datasets[1].data[year]);
        assert!(graph.combined.datasets[1].data[year] <= graph.combined.datasets[2].data[year]);
    }
    assert!(!graph.per_account.is_empty());

    // Historical listing includes the finished job
    assert!(app.runner.list_jobs().iter().any(|j| j.id == id));
}

#[test]
fn graph_of_unknown_job_is_not_found() {
    let dir = tempdir().unwrap();
    let app = open_app(dir.path());
    let err = app.runner.graph("mc-0-0").unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
