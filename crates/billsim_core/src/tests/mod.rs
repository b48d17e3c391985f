//! Integration tests for the simulation engine
//!
//! Tests are organized by topic:
//! - `bills` - recurring bill expansion and ledger balances
//! - `transfers` - transfer mirroring and fractional sentinels
//! - `breakdowns` - category/section breakdowns and transactions
//! - `graphs` - balance graph binning and the yearly-minima reduction
//! - `snapshots` - snapshot resume equivalence and idempotence
//! - `monte_carlo` - stochastic runs and percentile summaries
//! - `rmd` - required minimum distribution sweeps
//! - `pensions` - pension and social-security paychecks
//! - `healthcare` - cost-sharing progress and expense snapshots
//! - `spending_tracker` - period boundaries, carry rules
//! - `ledger` - universal ledger invariants on a busy catalog

mod support;

mod breakdowns;
mod graphs;
mod pensions;
mod transfers;
