//! Balance snapshots: the value half of the segmented snapshot cache.
//!
//! A snapshot captures everything the day-walk needs to resume at a date
//! without replaying from genesis: per-account balances, the ledger prefix
//! (entries strictly before the snapshot date), and the healthcare
//! cost-sharing accumulators in flight.

use std::collections::BTreeMap;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::cost_sharing::PlanAccumulators;
use crate::model::ConsolidatedEntry;

/// Bumped on incompatible engine changes; mismatched snapshots are treated
/// as cache misses.
pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    pub cache_version: u32,
    /// Start-of-day state: every entry dated strictly before this is in the
    /// prefix, nothing on or after it is.
    pub date: Date,
    /// Whether this snapshot belongs to a stochastic (Monte Carlo) pass.
    /// Part of the identity so deterministic overlays can never collide
    /// with stochastic runs.
    pub monte_carlo: bool,
    /// Account id → balance as of `date`.
    pub balances: BTreeMap<String, f64>,
    /// Account id → ledger entries from genesis up to (excluding) `date`.
    pub ledger_prefix: BTreeMap<String, Vec<ConsolidatedEntry>>,
    /// Healthcare accumulators mid-plan-year.
    pub cost_sharing: Vec<PlanAccumulators>,
}

impl BalanceSnapshot {
    /// A snapshot is usable when its version matches and it is dated at or
    /// before the requested start.
    pub fn usable_for(&self, start: Date, monte_carlo: bool) -> bool {
        self.cache_version == CACHE_VERSION
            && self.monte_carlo == monte_carlo
            && self.date <= start
    }
}
