//! Accounts and their embedded activity/bill/interest collections.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use super::activity::Activity;
use super::bill::Bill;
use super::interest::InterestRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Checking,
    Savings,
    Investment,
    Hsa,
    Loan,
    Credit,
    Retirement,
    Other,
}

impl<'de> Deserialize<'de> for AccountKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Unrecognised account types fold into Other rather than failing the
        // whole catalog load.
        let tag = String::deserialize(deserializer)?;
        Ok(match tag.as_str() {
            "checking" => AccountKind::Checking,
            "savings" => AccountKind::Savings,
            "investment" => AccountKind::Investment,
            "hsa" => AccountKind::Hsa,
            "loan" => AccountKind::Loan,
            "credit" => AccountKind::Credit,
            "retirement" => AccountKind::Retirement,
            _ => AccountKind::Other,
        })
    }
}

/// A catalog account. `consolidated_activity` is deliberately absent: the
/// computed ledger belongs to the engine result and is re-materialised on
/// every compute, never persisted back into the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AccountKind,
    #[serde(default)]
    pub hidden: bool,
    /// Opening balance at genesis (the earliest dated item in the catalog).
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub activity: Vec<Activity>,
    #[serde(default)]
    pub bills: Vec<Bill>,
    #[serde(default)]
    pub interests: Vec<InterestRule>,
    #[serde(default, rename = "usesRMD")]
    pub uses_rmd: bool,
    #[serde(default, rename = "accountOwnerDOB")]
    pub account_owner_dob: Option<Date>,
    /// Name of the account RMD distributions are swept into.
    #[serde(default, rename = "RMDAccount")]
    pub rmd_account: Option<String>,
    /// Ordering hint for account listings; lower sorts first.
    #[serde(default)]
    pub pull_priority: Option<i32>,
}

impl Account {
    /// Interest rules sorted by `applicable_date` (the order the engine
    /// consumes them in).
    pub fn sorted_interests(&self) -> Vec<&InterestRule> {
        let mut rules: Vec<&InterestRule> = self.interests.iter().collect();
        rules.sort_by_key(|r| r.applicable_date);
        rules
    }
}
