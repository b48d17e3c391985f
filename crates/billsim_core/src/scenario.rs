//! Named scenarios and variable resolution.
//!
//! A scenario is a named set of variable bindings (loaded from
//! `simulations.json` plus one CSV column per scenario in `variables.csv`).
//! Everything a scenario can bind is a number, a date, or a fractional
//! transfer sentinel; sentinels pass through resolution untouched and are
//! resolved by the day-walk engine.

use std::collections::{BTreeMap, BTreeSet};

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::model::{Amount, AmountSpec, Catalog};

/// The scenario every query falls back to.
pub const DEFAULT_SCENARIO: &str = "Default";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    /// Scenario pre-selected by the UI layer; carried through untouched.
    #[serde(default)]
    pub selected: bool,
}

/// A value a variable can take in one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Date(Date),
    Amount(f64),
    Fraction(Amount),
}

impl VariableValue {
    fn kind(&self) -> &'static str {
        match self {
            VariableValue::Amount(_) => "amount",
            VariableValue::Date(_) => "date",
            VariableValue::Fraction(_) => "fraction",
        }
    }

    /// Parse a raw CSV cell: ISO date, fractional sentinel, or number.
    pub fn parse_cell(cell: &str) -> Option<VariableValue> {
        let cell = cell.trim();
        if let Some(sentinel) = Amount::parse_sentinel(cell) {
            return Some(VariableValue::Fraction(sentinel));
        }
        if let Ok(date) = cell.parse::<Date>() {
            return Some(VariableValue::Date(date));
        }
        cell.parse::<f64>().ok().map(VariableValue::Amount)
    }
}

/// Scenario registry: the scenario list plus the per-variable value table
/// (`variable → scenario → value`). `BTreeMap`s keep serialisation (and the
/// catalog fingerprint) deterministic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenarios {
    pub scenarios: Vec<Scenario>,
    #[serde(default)]
    pub variables: BTreeMap<String, BTreeMap<String, VariableValue>>,
}

impl Default for Scenarios {
    fn default() -> Self {
        Scenarios {
            scenarios: vec![Scenario {
                name: DEFAULT_SCENARIO.to_string(),
                enabled: true,
                selected: true,
            }],
            variables: BTreeMap::new(),
        }
    }
}

impl Scenarios {
    pub fn contains(&self, name: &str) -> bool {
        self.scenarios.iter().any(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.name.as_str()).collect()
    }

    fn lookup(&self, variable: &str, scenario: &str) -> Result<VariableValue> {
        if !self.contains(scenario) {
            return Err(EngineError::ScenarioNotFound(scenario.to_string()));
        }
        self.variables
            .get(variable)
            .and_then(|per_scenario| per_scenario.get(scenario))
            .copied()
            .ok_or_else(|| EngineError::UnknownVariable {
                variable: variable.to_string(),
                scenario: scenario.to_string(),
            })
    }

    /// Resolve an amount spec. Fractional sentinels (inline or via a
    /// variable) are returned as-is for the engine to resolve at transfer
    /// time.
    pub fn resolve_amount(&self, spec: &AmountSpec, scenario: &str) -> Result<Amount> {
        let Some(variable) = variable_name(spec.amount_is_variable, &spec.amount_variable) else {
            return Ok(spec.amount);
        };
        match self.lookup(variable, scenario)? {
            VariableValue::Amount(v) => Ok(Amount::Fixed(v)),
            VariableValue::Fraction(sentinel) => Ok(sentinel),
            other @ VariableValue::Date(_) => Err(EngineError::VariableTypeMismatch {
                variable: variable.to_string(),
                expected: "amount",
                found: other.kind(),
            }),
        }
    }

    /// Resolve a date with an optional variable binding.
    pub fn resolve_date(
        &self,
        date: Date,
        is_variable: bool,
        variable: &Option<String>,
        scenario: &str,
    ) -> Result<Date> {
        let Some(variable) = variable_name(is_variable, variable) else {
            return Ok(date);
        };
        match self.lookup(variable, scenario)? {
            VariableValue::Date(d) => Ok(d),
            other => Err(EngineError::VariableTypeMismatch {
                variable: variable.to_string(),
                expected: "date",
                found: other.kind(),
            }),
        }
    }

    /// Resolve a plain numeric variable (interest rates, thresholds).
    pub fn resolve_rate(&self, base: f64, variable: Option<&str>, scenario: &str) -> Result<f64> {
        let Some(variable) = variable else {
            return Ok(base);
        };
        match self.lookup(variable, scenario)? {
            VariableValue::Amount(v) => Ok(v),
            other => Err(EngineError::VariableTypeMismatch {
                variable: variable.to_string(),
                expected: "amount",
                found: other.kind(),
            }),
        }
    }
}

fn variable_name(is_variable: bool, variable: &Option<String>) -> Option<&str> {
    if is_variable {
        variable.as_deref().filter(|v| !v.is_empty())
    } else {
        None
    }
}

fn note_variable(used: &mut BTreeSet<String>, is_variable: bool, variable: &Option<String>) {
    if let Some(v) = variable_name(is_variable, variable) {
        used.insert(v.to_string());
    }
}

/// Every variable name the catalog references anywhere. Feeds the
/// used-variables listing so stale CSV columns can be spotted.
pub fn used_variables(catalog: &Catalog) -> BTreeSet<String> {
    let mut used = BTreeSet::new();
    let mut activities = Vec::new();
    let mut bills = Vec::new();

    for account in &catalog.accounts_and_transfers.accounts {
        activities.extend(account.activity.iter());
        bills.extend(account.bills.iter());
    }
    activities.extend(catalog.accounts_and_transfers.transfers.activity.iter());
    bills.extend(catalog.accounts_and_transfers.transfers.bills.iter());

    for a in activities {
        note_variable(&mut used, a.amount.amount_is_variable, &a.amount.amount_variable);
        note_variable(&mut used, a.date.date_is_variable, &a.date.date_variable);
    }
    for b in bills {
        note_variable(&mut used, b.amount.amount_is_variable, &b.amount.amount_variable);
    }
    for account in &catalog.accounts_and_transfers.accounts {
        for rule in &account.interests {
            note_variable(&mut used, rule.apr_is_variable, &rule.apr_variable);
        }
    }
    for p in &catalog.pensions {
        note_variable(&mut used, p.start_date_is_variable, &p.start_date_variable);
    }
    for s in &catalog.social_security {
        note_variable(&mut used, s.start_date_is_variable, &s.start_date_variable);
    }
    for t in &catalog.spending_tracker {
        note_variable(&mut used, t.threshold_is_variable, &t.threshold_variable);
    }
    used
}
