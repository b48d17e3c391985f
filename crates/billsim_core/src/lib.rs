//! Personal-finance simulation engine
//!
//! This crate projects per-day, per-account balances over multi-decade
//! horizons from a catalog of accounts, recurring bills, ad-hoc activities,
//! interest schedules, transfers, pensions, social-security streams, RMDs,
//! and healthcare cost-sharing rules. It supports:
//! - Named scenarios that parametrise dates and amounts via variables
//! - A deterministic event timeline plus a day-walk producing consolidated
//!   per-account ledgers with running balances
//! - Monthly balance snapshots so later runs resume instead of recomputing
//! - Monte Carlo fan-outs with seeded stochastic variable overrides
//! - Derived queries: balance graphs, category breakdowns, healthcare
//!   deductible progress, spending-tracker charts, money movement
//!
//! The crate is pure computation: no disk, no logging, no clock. The service
//! layer owns persistence, the snapshot cache store, and job scheduling.

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod cost_sharing;
pub mod date_math;
pub mod engine;
pub mod error;
pub mod montecarlo;
pub mod queries;
pub mod snapshot;
pub mod timeline;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod model;
pub mod scenario;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use engine::{AccountLedger, EngineOptions, EngineResult, StochasticOverrides};
pub use error::{EngineError, Result};
pub use model::{Account, Activity, Bill, Catalog, ConsolidatedEntry};
pub use scenario::{DEFAULT_SCENARIO, Scenarios};
pub use snapshot::{BalanceSnapshot, CACHE_VERSION};
pub use timeline::{Timeline, Window, build_timeline};
