//! The catalog root: everything the engine reads, assembled from the
//! individual data files by the service layer.

use std::collections::BTreeMap;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::scenario::Scenarios;

use super::account::Account;
use super::activity::Activity;
use super::bill::Bill;
use super::healthcare::HealthcareConfig;
use super::pension::{Pension, SocialSecurity};
use super::rmd::RmdTable;
use super::spending::SpendingTrackerCategory;
use super::wage_index::WageIndex;

/// Standalone transfers that are not embedded in any account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Transfers {
    #[serde(default)]
    pub activity: Vec<Activity>,
    #[serde(default)]
    pub bills: Vec<Bill>,
}

/// On-disk shape of `data.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountsAndTransfers {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transfers: Transfers,
}

/// The full input catalog. Serialisation order is deterministic (struct
/// fields plus `BTreeMap`s), which the fingerprint relies on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub accounts_and_transfers: AccountsAndTransfers,
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub scenarios: Scenarios,
    #[serde(default)]
    pub pensions: Vec<Pension>,
    #[serde(default)]
    pub social_security: Vec<SocialSecurity>,
    #[serde(default)]
    pub spending_tracker: Vec<SpendingTrackerCategory>,
    #[serde(default)]
    pub healthcare_configs: Vec<HealthcareConfig>,
    #[serde(default)]
    pub rmd_table: RmdTable,
    #[serde(default)]
    pub wage_index: WageIndex,
}

impl Catalog {
    pub fn account_by_id(&self, id: &str) -> Option<&Account> {
        self.accounts_and_transfers
            .accounts
            .iter()
            .find(|a| a.id == id)
    }

    pub fn account_by_name(&self, name: &str) -> Option<&Account> {
        self.accounts_and_transfers
            .accounts
            .iter()
            .find(|a| a.name == name)
    }

    /// Accounts a query touches: the explicit selection when one is given
    /// (ids), otherwise every non-hidden account.
    pub fn selected_accounts(&self, selection: Option<&[String]>) -> Vec<&Account> {
        match selection {
            Some(ids) if !ids.is_empty() => self
                .accounts_and_transfers
                .accounts
                .iter()
                .filter(|a| ids.iter().any(|id| *id == a.id || *id == a.name))
                .collect(),
            _ => self
                .accounts_and_transfers
                .accounts
                .iter()
                .filter(|a| !a.hidden)
                .collect(),
        }
    }

    /// The earliest dated item anywhere in the catalog; computations with no
    /// usable snapshot start here.
    pub fn genesis_date(&self) -> Option<Date> {
        let mut min: Option<Date> = None;
        let mut consider = |d: Date| {
            min = Some(match min {
                Some(m) if m <= d => m,
                _ => d,
            });
        };

        for account in &self.accounts_and_transfers.accounts {
            for a in &account.activity {
                consider(a.date.date);
            }
            for b in &account.bills {
                consider(b.start_date);
            }
            for i in &account.interests {
                consider(i.applicable_date);
            }
        }
        for a in &self.accounts_and_transfers.transfers.activity {
            consider(a.date.date);
        }
        for b in &self.accounts_and_transfers.transfers.bills {
            consider(b.start_date);
        }
        for p in &self.pensions {
            consider(p.start_date);
        }
        for s in &self.social_security {
            consider(s.start_date);
        }
        min
    }

    /// All account names, ordered by `pull_priority` (then name) for
    /// listings.
    pub fn account_names(&self) -> Vec<String> {
        let mut accounts: Vec<&Account> = self.accounts_and_transfers.accounts.iter().collect();
        accounts.sort_by(|a, b| {
            let pa = a.pull_priority.unwrap_or(i32::MAX);
            let pb = b.pull_priority.unwrap_or(i32::MAX);
            pa.cmp(&pb).then_with(|| a.name.cmp(&b.name))
        });
        accounts.into_iter().map(|a| a.name.clone()).collect()
    }
}
