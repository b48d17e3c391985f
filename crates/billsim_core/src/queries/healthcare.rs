//! Healthcare deductible progress and per-expense accumulator snapshots.
//!
//! Both queries replay the cost-sharing ladder over the `is_healthcare`
//! entries of a completed result, using the gross amounts the engine kept on
//! each entry. Family totals aggregate the persons of one config only;
//! configs are never merged.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::cost_sharing::{CostShareState, config_for};
use crate::date_math::days_between;
use crate::engine::EngineResult;
use crate::model::{Catalog, ConsolidatedEntry, HealthcareConfig};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonProgress {
    pub person: String,
    pub deductible_paid: f64,
    pub deductible_remaining: f64,
    pub deductible_met: bool,
    pub out_of_pocket_paid: f64,
    pub out_of_pocket_remaining: f64,
    pub out_of_pocket_met: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FamilyProgress {
    pub deductible_paid: f64,
    pub deductible_remaining: f64,
    pub deductible_met: bool,
    pub out_of_pocket_paid: f64,
    pub out_of_pocket_remaining: f64,
    pub out_of_pocket_met: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigProgress {
    pub config_id: String,
    pub name: String,
    pub plan_year_start: Date,
    pub persons: Vec<PersonProgress>,
    pub family: FamilyProgress,
}

/// All healthcare entries across every account (ledgers already carry the
/// full history), sorted chronologically.
fn healthcare_entries<'a>(
    result: &'a EngineResult,
    up_to: Option<Date>,
) -> Vec<(&'a str, &'a ConsolidatedEntry)> {
    let mut entries: Vec<(&str, &ConsolidatedEntry)> = Vec::new();
    for account in &result.accounts {
        for entry in &account.consolidated_activity {
            if entry.healthcare.is_none() {
                continue;
            }
            if up_to.is_some_and(|limit| entry.date > limit) {
                continue;
            }
            entries.push((account.name.as_str(), entry));
        }
    }
    entries.sort_by(|(_, a), (_, b)| a.sort_key().cmp(&b.sort_key()));
    entries
}

fn gross_of(entry: &ConsolidatedEntry) -> f64 {
    entry.gross_amount.unwrap_or(entry.amount).abs()
}

/// Deductible and out-of-pocket progress for each active config and covered
/// person as of `on`.
pub fn healthcare_progress(
    catalog: &Catalog,
    result: &EngineResult,
    on: Date,
) -> Vec<ConfigProgress> {
    let mut out = Vec::new();

    for config in &catalog.healthcare_configs {
        if !config.active_on(on) {
            continue;
        }
        let plan_year_start = config.plan_year_start(on);
        let configs = std::slice::from_ref(config);
        let mut state = CostShareState::new(configs, plan_year_start);

        for (_, entry) in healthcare_entries(result, Some(on)) {
            if entry.date < plan_year_start {
                continue;
            }
            let Some(attrs) = &entry.healthcare else {
                continue;
            };
            let covered = attrs
                .healthcare_person
                .as_deref()
                .is_some_and(|p| config.covers_person(p));
            if covered {
                state.apply_expense(configs, attrs, entry.date, gross_of(entry));
            }
        }

        let acc = state.accumulators(&config.id).cloned().unwrap_or_else(|| {
            crate::cost_sharing::PlanAccumulators::new(config, plan_year_start)
        });

        let persons = config
            .covered_persons
            .iter()
            .map(|person| {
                let p = acc.persons.get(person).copied().unwrap_or_default();
                PersonProgress {
                    person: person.clone(),
                    deductible_paid: p.deductible_paid,
                    deductible_remaining: (config.individual_deductible - p.deductible_paid)
                        .max(0.0),
                    deductible_met: p.deductible_paid >= config.individual_deductible,
                    out_of_pocket_paid: p.out_of_pocket_paid,
                    out_of_pocket_remaining: (config.individual_out_of_pocket_max
                        - p.out_of_pocket_paid)
                        .max(0.0),
                    out_of_pocket_met: p.out_of_pocket_paid >= config.individual_out_of_pocket_max,
                }
            })
            .collect();

        out.push(ConfigProgress {
            config_id: config.id.clone(),
            name: config.name.clone(),
            plan_year_start,
            persons,
            family: FamilyProgress {
                deductible_paid: acc.family_deductible_paid,
                deductible_remaining: (config.family_deductible - acc.family_deductible_paid)
                    .max(0.0),
                deductible_met: acc.family_deductible_paid >= config.family_deductible,
                out_of_pocket_paid: acc.family_out_of_pocket_paid,
                out_of_pocket_remaining: (config.family_out_of_pocket_max
                    - acc.family_out_of_pocket_paid)
                    .max(0.0),
                out_of_pocket_met: acc.family_out_of_pocket_paid
                    >= config.family_out_of_pocket_max,
            },
        });
    }
    out
}

/// One healthcare expense with the ladder state *before* it applied, plus
/// the matched HSA reimbursement if one exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthcareExpense {
    pub entry_id: String,
    pub name: String,
    pub date: Date,
    pub account: String,
    pub person: Option<String>,
    pub gross_amount: f64,
    pub patient_amount: f64,
    pub deductible_remaining_before: f64,
    pub out_of_pocket_remaining_before: f64,
    pub family_deductible_remaining_before: f64,
    pub family_out_of_pocket_remaining_before: f64,
    pub hsa_reimbursed: bool,
    pub hsa_reimbursement_id: Option<String>,
}

/// Maximum date distance and amount slack for HSA reimbursement matching.
const HSA_MATCH_DAYS: i32 = 1;
const HSA_MATCH_TOLERANCE: f64 = 0.01;

/// Every healthcare expense in the result, each with the accumulator
/// snapshot as it stood before that expense applied.
pub fn healthcare_expenses(catalog: &Catalog, result: &EngineResult) -> Vec<HealthcareExpense> {
    let entries = healthcare_entries(result, None);
    let Some(first_date) = entries.first().map(|(_, e)| e.date) else {
        return Vec::new();
    };

    let configs = &catalog.healthcare_configs;
    let mut state = CostShareState::new(configs, first_date);
    let mut out = Vec::new();

    for (account_name, entry) in entries {
        let Some(attrs) = &entry.healthcare else {
            continue;
        };
        let person = attrs.healthcare_person.clone();
        let config = person
            .as_deref()
            .and_then(|p| config_for(configs, p, entry.date));

        let (ded_before, oop_before, fam_ded_before, fam_oop_before) = match (config, &person) {
            (Some(config), Some(person)) => {
                // A stale plan year in the accumulators means a reset is due;
                // the pre-state of this expense is then a fresh year.
                match state.accumulators(&config.id) {
                    Some(a) if a.plan_year_start == config.plan_year_start(entry.date) => {
                        let p = a.persons.get(person).copied().unwrap_or_default();
                        (
                            (config.individual_deductible - p.deductible_paid).max(0.0),
                            (config.individual_out_of_pocket_max - p.out_of_pocket_paid).max(0.0),
                            (config.family_deductible - a.family_deductible_paid).max(0.0),
                            (config.family_out_of_pocket_max - a.family_out_of_pocket_paid)
                                .max(0.0),
                        )
                    }
                    _ => (
                        config.individual_deductible,
                        config.individual_out_of_pocket_max,
                        config.family_deductible,
                        config.family_out_of_pocket_max,
                    ),
                }
            }
            _ => (0.0, 0.0, 0.0, 0.0),
        };

        let gross = gross_of(entry);
        state.apply_expense(configs, attrs, entry.date, gross);

        let reimbursement = config.and_then(|c| find_reimbursement(result, c, account_name, entry));

        out.push(HealthcareExpense {
            entry_id: entry.id.clone(),
            name: entry.name.clone(),
            date: entry.date,
            account: account_name.to_string(),
            person,
            gross_amount: gross,
            patient_amount: entry.amount.abs(),
            deductible_remaining_before: ded_before,
            out_of_pocket_remaining_before: oop_before,
            family_deductible_remaining_before: fam_ded_before,
            family_out_of_pocket_remaining_before: fam_oop_before,
            hsa_reimbursed: reimbursement.is_some(),
            hsa_reimbursement_id: reimbursement,
        });
    }
    out
}

/// An HSA reimbursement matches when the HSA account holds a transfer into
/// the expense account within a day of the expense for (almost) the same
/// amount.
fn find_reimbursement(
    result: &EngineResult,
    config: &HealthcareConfig,
    expense_account: &str,
    expense: &ConsolidatedEntry,
) -> Option<String> {
    if !config.hsa_reimbursement_enabled {
        return None;
    }
    let hsa = result.account(config.hsa_account_id.as_deref()?)?;
    hsa.consolidated_activity
        .iter()
        .find(|e| {
            e.is_transfer
                && e.amount < 0.0
                && e.to.as_deref() == Some(expense_account)
                && (e.amount.abs() - expense.amount.abs()).abs() <= HSA_MATCH_TOLERANCE
                && days_between(expense.date, e.date).abs() <= HSA_MATCH_DAYS
        })
        .map(|e| e.id.clone())
}
