//! Engine error types.
//!
//! The engine fails fast: any of these aborts the whole run and partial
//! results are discarded. The service layer maps them onto its own error
//! kinds (and ultimately HTTP statuses).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("unknown variable {variable:?} in scenario {scenario:?}")]
    UnknownVariable { variable: String, scenario: String },

    #[error("variable {variable:?} resolved to a {found}, expected a {expected}")]
    VariableTypeMismatch {
        variable: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("transfer {name:?} does not resolve to two sides (fro={fro:?}, to={to:?})")]
    BrokenTransfer {
        name: String,
        fro: Option<String>,
        to: Option<String>,
    },

    #[error("transfer {name:?} on {date}: fractional amount has no concrete counterparty")]
    UnresolvedTransferAmount { name: String, date: jiff::civil::Date },

    #[error("no RMD divisor for age {age} (account {account:?})")]
    RmdAgeOutOfTable { account: String, age: i32 },

    #[error("account {account:?} has an interest rule dated {date} before the preceding rule")]
    InvalidInterestSchedule {
        account: String,
        date: jiff::civil::Date,
    },
}
