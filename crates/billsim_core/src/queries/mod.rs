//! Derived queries over a completed engine result.
//!
//! Each submodule consumes `EngineResult` ledgers (plus the catalog where
//! needed) and produces a response payload. Shared conventions: an explicit
//! account selection wins; otherwise hidden accounts are excluded.

pub mod breakdown;
pub mod graph;
pub mod healthcare;
pub mod movement;
pub mod spending;

use serde::{Deserialize, Serialize};

use crate::engine::{AccountLedger, EngineResult};

/// Chart payload shared by the yearly graph, money movement, and Monte Carlo
/// summaries: one label per bin, one dataset per series.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
}

/// Apply the shared account filter to a result's ledgers.
pub fn filter_accounts<'a>(
    result: &'a EngineResult,
    selection: Option<&[String]>,
) -> Vec<&'a AccountLedger> {
    match selection {
        Some(ids) if !ids.is_empty() => result
            .accounts
            .iter()
            .filter(|a| ids.iter().any(|id| *id == a.account_id || *id == a.name))
            .collect(),
        _ => result.accounts.iter().filter(|a| !a.hidden).collect(),
    }
}
