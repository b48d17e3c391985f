//! The on-disk catalog store.
//!
//! Each catalog file is loaded independently (missing files fall back to
//! defaults) and saved atomically: write a tmp file, rename over the target.
//! Every Nth save of a file copies the prior version into `backup/` with an
//! epoch-millis suffix, keeping the most recent ten.

pub mod variables;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use billsim_core::model::{
    AccountsAndTransfers, HealthcareConfig, RmdTable, SpendingTrackerCategory, WageIndex,
};
use billsim_core::model::pension::PensionAndSocialSecurity;
use billsim_core::scenario::{Scenario, Scenarios};
use billsim_core::Catalog;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

pub const DATA_FILE: &str = "data.json";
pub const SIMULATIONS_FILE: &str = "simulations.json";
pub const VARIABLES_FILE: &str = "variables.csv";
pub const CATEGORIES_FILE: &str = "categories.json";
pub const PENSION_FILE: &str = "pension_and_social_security.json";
pub const SPENDING_TRACKER_FILE: &str = "spending-tracker.json";
pub const HEALTHCARE_FILE: &str = "healthcare_configs.json";
pub const RMD_FILE: &str = "rmd.json";
pub const WAGE_INDEX_FILE: &str = "averageWageIndex.json";
pub const PORTFOLIO_FILE: &str = "portfolio.json";

/// Copy the previous version aside on every Nth save of a file.
const BACKUP_EVERY: u64 = 5;
/// Backups retained per file.
const BACKUPS_KEPT: usize = 10;

/// Write content to a file atomically using the write-then-rename pattern.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

pub struct DataStore {
    data_dir: PathBuf,
    /// Per-file save counters driving the backup cadence.
    save_counts: Mutex<BTreeMap<String, u64>>,
}

impl DataStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(DataStore {
            data_dir,
            save_counts: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    fn load_json<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(T::default());
        }
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        self.rotate_backup(name)?;
        let mut bytes = serde_json::to_vec_pretty(value)?;
        bytes.push(b'\n');
        atomic_write(&self.path(name), &bytes)?;
        Ok(())
    }

    /// Copy the existing file into `backup/` on the configured cadence and
    /// prune old backups.
    fn rotate_backup(&self, name: &str) -> Result<()> {
        let count = {
            let mut counts = match self.save_counts.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let counter = counts.entry(name.to_string()).or_insert(0);
            *counter += 1;
            *counter
        };
        if count % BACKUP_EVERY != 0 {
            return Ok(());
        }
        let path = self.path(name);
        if !path.exists() {
            return Ok(());
        }

        let backup_dir = self.data_dir.join("backup");
        fs::create_dir_all(&backup_dir)?;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        fs::copy(&path, backup_dir.join(format!("{name}.{millis}")))?;

        // Prune to the most recent BACKUPS_KEPT copies of this file.
        let prefix = format!("{name}.");
        let mut backups: Vec<PathBuf> = fs::read_dir(&backup_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix))
            })
            .collect();
        backups.sort();
        while backups.len() > BACKUPS_KEPT {
            let oldest = backups.remove(0);
            if let Err(err) = fs::remove_file(&oldest) {
                tracing::warn!("failed to prune backup {}: {err}", oldest.display());
            }
        }
        Ok(())
    }

    // === Loading ===

    /// Assemble the full catalog from the individual files.
    pub fn load_catalog(&self) -> Result<Catalog> {
        let accounts_and_transfers: AccountsAndTransfers = self.load_json(DATA_FILE)?;
        let categories: BTreeMap<String, Vec<String>> = self.load_json(CATEGORIES_FILE)?;
        let pension: PensionAndSocialSecurity = self.load_json(PENSION_FILE)?;
        let spending_tracker: Vec<SpendingTrackerCategory> =
            self.load_json(SPENDING_TRACKER_FILE)?;
        let healthcare_configs: Vec<HealthcareConfig> = self.load_json(HEALTHCARE_FILE)?;

        let rmd_table = if self.path(RMD_FILE).exists() {
            self.load_json::<RmdTable>(RMD_FILE)?
        } else {
            RmdTable::uniform_lifetime()
        };
        let wage_index: WageIndex = self.load_json(WAGE_INDEX_FILE)?;

        let scenario_list: Vec<Scenario> = self.load_json(SIMULATIONS_FILE)?;
        let variables = variables::load_variables(&self.path(VARIABLES_FILE))?;
        let scenarios = if scenario_list.is_empty() {
            Scenarios {
                variables,
                ..Default::default()
            }
        } else {
            Scenarios {
                scenarios: scenario_list,
                variables,
            }
        };

        Ok(Catalog {
            accounts_and_transfers,
            categories,
            scenarios,
            pensions: pension.pensions,
            social_security: pension.social_security,
            spending_tracker,
            healthcare_configs,
            rmd_table,
            wage_index,
        })
    }

    /// Opaque portfolio payload; carried through untouched.
    pub fn load_portfolio(&self) -> Result<serde_json::Value> {
        self.load_json(PORTFOLIO_FILE)
    }

    // === Saving ===

    pub fn save_accounts(&self, data: &AccountsAndTransfers) -> Result<()> {
        self.save_json(DATA_FILE, data)
    }

    pub fn save_categories(&self, categories: &BTreeMap<String, Vec<String>>) -> Result<()> {
        self.save_json(CATEGORIES_FILE, categories)
    }

    pub fn save_spending_tracker(&self, tracker: &[SpendingTrackerCategory]) -> Result<()> {
        self.save_json(SPENDING_TRACKER_FILE, &tracker.to_vec())
    }

    pub fn save_healthcare_configs(&self, configs: &[HealthcareConfig]) -> Result<()> {
        self.save_json(HEALTHCARE_FILE, &configs.to_vec())
    }

    pub fn save_scenarios(&self, scenarios: &Scenarios) -> Result<()> {
        self.save_json(SIMULATIONS_FILE, &scenarios.scenarios)?;
        variables::save_variables(&self.path(VARIABLES_FILE), &scenarios.variables)
    }

    pub fn save_pensions(&self, pension: &PensionAndSocialSecurity) -> Result<()> {
        self.save_json(PENSION_FILE, pension)
    }

    pub fn save_portfolio(&self, portfolio: &serde_json::Value) -> Result<()> {
        self.save_json(PORTFOLIO_FILE, portfolio)
    }
}
