//! Process-owned application state.
//!
//! The `App` owns the catalog behind a single writer lock, the snapshot
//! cache, and the Monte Carlo runner; the entrypoint constructs one and
//! hands it to whatever front end is wired up (HTTP handlers, the CLI).
//! Catalog-mutating operations serialise on the write lock, save through the
//! store, and invalidate the snapshot cache from the first affected date.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use billsim_core::engine::{self, EngineOptions, EngineResult};
use billsim_core::date_math::add_months;
use billsim_core::model::{
    Account, Activity, Bill, Catalog, InterestRule, SpendingTrackerCategory, SpendingTrackerDraft,
};
use billsim_core::timeline::{Window, build_timeline};
use jiff::civil::Date;

use crate::cache::SnapshotCache;
use crate::error::{Result, ServiceError};
use crate::fingerprint::{catalog_fingerprint, snapshot_key};
use crate::jobs::{JobRequest, SimulationRunner};
use crate::storage::DataStore;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub monte_carlo_dir: PathBuf,
    pub port: u16,
}

impl AppConfig {
    /// Conventional layout under one root directory.
    pub fn under_root(root: impl Into<PathBuf>, port: u16) -> Self {
        let root = root.into();
        AppConfig {
            data_dir: root.join("data"),
            cache_dir: root.join("cache"),
            monte_carlo_dir: root.join("monte_carlo"),
            port,
        }
    }
}

pub struct App {
    pub config: AppConfig,
    pub store: DataStore,
    pub cache: SnapshotCache,
    pub runner: Arc<SimulationRunner>,
    catalog: RwLock<Catalog>,
}

impl App {
    pub fn open(config: AppConfig) -> Result<Self> {
        let store = DataStore::new(&config.data_dir)?;
        let catalog = store.load_catalog()?;
        let cache = SnapshotCache::new(&config.cache_dir)?;
        let runner = Arc::new(SimulationRunner::new(&config.monte_carlo_dir)?);
        Ok(App {
            config,
            store,
            cache,
            runner,
            catalog: RwLock::new(catalog),
        })
    }

    /// Snapshotted read view of the catalog.
    pub fn catalog(&self) -> Catalog {
        match self.catalog.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    // ========================================================================
    // Engine invocation with snapshot resume
    // ========================================================================

    /// Deterministic compute for one scenario: resume from the nearest
    /// usable snapshot at or before the window start, walk to the window
    /// end, and persist the month snapshots the walk produced.
    pub fn compute(&self, scenario: &str, window: Window) -> Result<EngineResult> {
        let catalog = self.catalog();
        self.compute_catalog(&catalog, scenario, window)
    }

    pub(crate) fn compute_catalog(
        &self,
        catalog: &Catalog,
        scenario: &str,
        window: Window,
    ) -> Result<EngineResult> {
        let fingerprint = catalog_fingerprint(catalog, false)?;
        let genesis = catalog.genesis_date().unwrap_or(window.start);
        let earliest = genesis.min(window.start);

        // Probe month firsts from the window start backwards for the
        // nearest usable snapshot.
        let mut resume = None;
        let mut compute_start = earliest;
        let mut probe = jiff::civil::date(window.start.year(), window.start.month(), 1);
        while probe >= earliest {
            if let Some(snapshot) = self.cache.get(&snapshot_key(scenario, &fingerprint, probe))
                && snapshot.usable_for(window.start, false)
            {
                compute_start = snapshot.date;
                resume = Some(snapshot);
                break;
            }
            probe = add_months(probe, -1);
        }

        let timeline = build_timeline(catalog, scenario, Window::new(compute_start, window.end))?;
        let options = EngineOptions {
            write_snapshots: true,
            stochastic: None,
        };
        let result = engine::run(catalog, &timeline, resume.as_deref(), &options)?;

        for snapshot in &result.snapshots {
            let key = snapshot_key(scenario, &fingerprint, snapshot.date);
            if let Err(err) = self.cache.put(&key, snapshot.clone()) {
                tracing::warn!("failed to persist snapshot {key}: {err}");
            }
        }
        Ok(result)
    }

    /// Start a Monte Carlo job against the current catalog.
    pub fn start_monte_carlo(&self, request: JobRequest) -> Result<String> {
        self.runner.start_simulation(self.catalog(), request)
    }

    /// Blanket cache reset (manual endpoint).
    pub fn reset_cache(&self) {
        self.cache.clear();
    }

    // ========================================================================
    // Catalog CRUD
    // ========================================================================

    fn mutate_accounts<T>(
        &self,
        first_affected: Option<Date>,
        op: impl FnOnce(&mut Catalog) -> Result<T>,
    ) -> Result<T> {
        let mut catalog = match self.catalog.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let value = op(&mut catalog)?;
        self.store.save_accounts(&catalog.accounts_and_transfers)?;
        drop(catalog);
        match first_affected {
            Some(date) => self.cache.invalidate_from(date),
            None => self.cache.clear(),
        }
        Ok(value)
    }

    pub fn add_account(&self, account: Account) -> Result<()> {
        self.mutate_accounts(None, |catalog| {
            if catalog.account_by_id(&account.id).is_some() {
                return Err(ServiceError::ValidationFailed(vec![format!(
                    "Account id {} already exists",
                    account.id
                )]));
            }
            catalog.accounts_and_transfers.accounts.push(account);
            Ok(())
        })
    }

    pub fn update_account(&self, account: Account) -> Result<()> {
        self.mutate_accounts(None, |catalog| {
            let slot = catalog
                .accounts_and_transfers
                .accounts
                .iter_mut()
                .find(|a| a.id == account.id)
                .ok_or_else(|| ServiceError::NotFound(format!("account {}", account.id)))?;
            *slot = account;
            Ok(())
        })
    }

    pub fn delete_account(&self, id: &str) -> Result<()> {
        self.mutate_accounts(None, |catalog| {
            let accounts = &mut catalog.accounts_and_transfers.accounts;
            let before = accounts.len();
            accounts.retain(|a| a.id != id);
            if accounts.len() == before {
                return Err(ServiceError::NotFound(format!("account {id}")));
            }
            Ok(())
        })
    }

    pub fn add_activity(&self, account_id: &str, activity: Activity) -> Result<()> {
        let affected = activity.date.date;
        self.mutate_accounts(Some(affected), |catalog| {
            let account = account_mut(catalog, account_id)?;
            account.activity.push(activity);
            Ok(())
        })
    }

    pub fn update_activity(&self, account_id: &str, activity: Activity) -> Result<()> {
        self.mutate_accounts(None, |catalog| {
            let account = account_mut(catalog, account_id)?;
            let slot = account
                .activity
                .iter_mut()
                .find(|a| a.id == activity.id)
                .ok_or_else(|| ServiceError::NotFound(format!("activity {}", activity.id)))?;
            *slot = activity;
            Ok(())
        })
    }

    pub fn delete_activity(&self, account_id: &str, activity_id: &str) -> Result<()> {
        self.mutate_accounts(None, |catalog| {
            let account = account_mut(catalog, account_id)?;
            let before = account.activity.len();
            account.activity.retain(|a| a.id != activity_id);
            if account.activity.len() == before {
                return Err(ServiceError::NotFound(format!("activity {activity_id}")));
            }
            Ok(())
        })
    }

    pub fn add_bill(&self, account_id: &str, bill: Bill) -> Result<()> {
        let affected = bill.start_date;
        self.mutate_accounts(Some(affected), |catalog| {
            let account = account_mut(catalog, account_id)?;
            account.bills.push(bill);
            Ok(())
        })
    }

    pub fn update_bill(&self, account_id: &str, bill: Bill) -> Result<()> {
        self.mutate_accounts(None, |catalog| {
            let account = account_mut(catalog, account_id)?;
            let slot = account
                .bills
                .iter_mut()
                .find(|b| b.id == bill.id)
                .ok_or_else(|| ServiceError::NotFound(format!("bill {}", bill.id)))?;
            *slot = bill;
            Ok(())
        })
    }

    pub fn delete_bill(&self, account_id: &str, bill_id: &str) -> Result<()> {
        self.mutate_accounts(None, |catalog| {
            let account = account_mut(catalog, account_id)?;
            let before = account.bills.len();
            account.bills.retain(|b| b.id != bill_id);
            if account.bills.len() == before {
                return Err(ServiceError::NotFound(format!("bill {bill_id}")));
            }
            Ok(())
        })
    }

    pub fn add_interest(&self, account_id: &str, rule: InterestRule) -> Result<()> {
        let affected = rule.applicable_date;
        self.mutate_accounts(Some(affected), |catalog| {
            let account = account_mut(catalog, account_id)?;
            account.interests.push(rule);
            Ok(())
        })
    }

    pub fn update_interest(&self, account_id: &str, rule: InterestRule) -> Result<()> {
        self.mutate_accounts(None, |catalog| {
            let account = account_mut(catalog, account_id)?;
            let slot = account
                .interests
                .iter_mut()
                .find(|r| r.id == rule.id)
                .ok_or_else(|| ServiceError::NotFound(format!("interest {}", rule.id)))?;
            *slot = rule;
            Ok(())
        })
    }

    pub fn delete_interest(&self, account_id: &str, rule_id: &str) -> Result<()> {
        self.mutate_accounts(None, |catalog| {
            let account = account_mut(catalog, account_id)?;
            let before = account.interests.len();
            account.interests.retain(|r| r.id != rule_id);
            if account.interests.len() == before {
                return Err(ServiceError::NotFound(format!("interest {rule_id}")));
            }
            Ok(())
        })
    }

    // ========================================================================
    // Category list
    // ========================================================================

    /// Add an item to a category section (creating the section on first
    /// use). Serialised behind the writer lock like every other catalog
    /// mutation; the read-modify-write never races a concurrent handler.
    pub fn add_category_item(&self, section: &str, item: &str) -> Result<()> {
        if section.trim().is_empty() || item.trim().is_empty() {
            return Err(ServiceError::ValidationFailed(vec![
                "Category section and item must not be empty".to_string(),
            ]));
        }
        let mut catalog = match self.catalog.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let items = catalog.categories.entry(section.to_string()).or_default();
        if !items.iter().any(|i| i == item) {
            items.push(item.to_string());
        }
        self.store.save_categories(&catalog.categories)?;
        Ok(())
    }

    pub fn delete_category_item(&self, section: &str, item: &str) -> Result<()> {
        let mut catalog = match self.catalog.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(items) = catalog.categories.get_mut(section) else {
            return Err(ServiceError::NotFound(format!("category {section}")));
        };
        let before = items.len();
        items.retain(|i| i != item);
        if items.len() == before {
            return Err(ServiceError::NotFound(format!("category {section}.{item}")));
        }
        self.store.save_categories(&catalog.categories)?;
        Ok(())
    }

    // ========================================================================
    // Spending tracker CRUD
    // ========================================================================

    pub fn spending_tracker_categories(&self) -> Vec<SpendingTrackerCategory> {
        self.catalog().spending_tracker
    }

    pub fn create_spending_tracker(
        &self,
        draft: SpendingTrackerDraft,
    ) -> Result<SpendingTrackerCategory> {
        let mut catalog = match self.catalog.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let taken: Vec<&str> = catalog
            .spending_tracker
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        let fallback_id = format!("st-{}", generated_id());
        let category = draft
            .validate(&taken, &fallback_id)
            .map_err(ServiceError::ValidationFailed)?;
        catalog.spending_tracker.push(category.clone());
        self.store.save_spending_tracker(&catalog.spending_tracker)?;
        drop(catalog);
        self.cache.clear();
        Ok(category)
    }

    pub fn update_spending_tracker(
        &self,
        id: &str,
        draft: SpendingTrackerDraft,
    ) -> Result<SpendingTrackerCategory> {
        let mut catalog = match self.catalog.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !catalog.spending_tracker.iter().any(|c| c.id == id) {
            return Err(ServiceError::NotFound(format!("spending tracker {id}")));
        }
        let taken: Vec<&str> = catalog
            .spending_tracker
            .iter()
            .filter(|c| c.id != id)
            .map(|c| c.name.as_str())
            .collect();
        let mut draft = draft;
        draft.id = Some(id.to_string());
        let category = draft
            .validate(&taken, id)
            .map_err(ServiceError::ValidationFailed)?;
        if let Some(slot) = catalog.spending_tracker.iter_mut().find(|c| c.id == id) {
            *slot = category.clone();
        }
        self.store.save_spending_tracker(&catalog.spending_tracker)?;
        drop(catalog);
        self.cache.clear();
        Ok(category)
    }

    pub fn delete_spending_tracker(&self, id: &str) -> Result<()> {
        let mut catalog = match self.catalog.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = catalog.spending_tracker.len();
        catalog.spending_tracker.retain(|c| c.id != id);
        if catalog.spending_tracker.len() == before {
            return Err(ServiceError::NotFound(format!("spending tracker {id}")));
        }
        self.store.save_spending_tracker(&catalog.spending_tracker)?;
        Ok(())
    }
}

fn account_mut<'a>(catalog: &'a mut Catalog, account_id: &str) -> Result<&'a mut Account> {
    catalog
        .accounts_and_transfers
        .accounts
        .iter_mut()
        .find(|a| a.id == account_id || a.name == account_id)
        .ok_or_else(|| ServiceError::NotFound(format!("account {account_id}")))
}

fn generated_id() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
