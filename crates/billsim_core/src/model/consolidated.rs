//! The consolidated ledger: per-account output entries with running balances.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use super::activity::{HealthcareAttrs, split_category};

/// Category assigned to both halves of a transfer (and to RMD sweeps).
pub const TRANSFER_CATEGORY: &str = "Ignore.Transfer";

/// What produced a consolidated entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Activity,
    Bill,
    Interest,
    Transfer,
    Pension,
    SocialSecurity,
    Rmd,
}

/// One row of an account's computed ledger.
///
/// Entries are sorted by `(date, name, id)` and satisfy the running-balance
/// recurrence `balance_i = balance_{i-1} + amount_i` to within one cent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedEntry {
    pub id: String,
    pub name: String,
    pub date: Date,
    /// Signed amount applied to the account balance. For healthcare entries
    /// this is the patient responsibility after cost sharing.
    pub amount: f64,
    /// Running balance after this entry.
    pub balance: f64,
    pub kind: EntryKind,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_transfer: bool,
    #[serde(default)]
    pub fro: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub bill_id: Option<String>,
    /// Cost-sharing attributes, present on healthcare entries so the query
    /// layer can replay the ladder.
    #[serde(default)]
    pub healthcare: Option<HealthcareAttrs>,
    /// Pre-cost-sharing amount, kept on healthcare entries so the query
    /// layer can rebuild accumulator snapshots.
    #[serde(default)]
    pub gross_amount: Option<f64>,
    #[serde(default)]
    pub flag: bool,
}

impl ConsolidatedEntry {
    /// `(section, item)` halves of the dotted category.
    pub fn category_parts(&self) -> (&str, &str) {
        split_category(self.category.as_deref())
    }

    /// Sort key shared by the engine and the invariant tests.
    pub fn sort_key(&self) -> (Date, &str, &str) {
        (self.date, self.name.as_str(), self.id.as_str())
    }
}
