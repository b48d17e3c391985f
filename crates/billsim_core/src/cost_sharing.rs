//! Healthcare cost sharing: the deductible → coinsurance → out-of-pocket
//! ladder.
//!
//! The engine prices every `is_healthcare` entry through this module at
//! emission time, and the query layer replays the same ladder to reconstruct
//! accumulator snapshots. Each covered person is tracked within exactly one
//! config; family totals aggregate that config's persons only.

use std::collections::BTreeMap;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::date_math::round_cents;
use crate::model::{HealthcareAttrs, HealthcareConfig};

/// One person's accumulators within a plan year.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonAccums {
    pub deductible_paid: f64,
    pub out_of_pocket_paid: f64,
}

/// Accumulators for one healthcare config, reset on the plan-year boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanAccumulators {
    pub config_id: String,
    pub plan_year_start: Date,
    pub persons: BTreeMap<String, PersonAccums>,
    pub family_deductible_paid: f64,
    pub family_out_of_pocket_paid: f64,
}

impl PlanAccumulators {
    pub fn new(config: &HealthcareConfig, on: Date) -> Self {
        PlanAccumulators {
            config_id: config.id.clone(),
            plan_year_start: config.plan_year_start(on),
            persons: BTreeMap::new(),
            family_deductible_paid: 0.0,
            family_out_of_pocket_paid: 0.0,
        }
    }

    fn reset_for(&mut self, start: Date) {
        self.plan_year_start = start;
        self.persons.clear();
        self.family_deductible_paid = 0.0;
        self.family_out_of_pocket_paid = 0.0;
    }
}

/// Cost-sharing state across every configured plan.
#[derive(Debug, Clone, Default)]
pub struct CostShareState {
    pub plans: Vec<PlanAccumulators>,
}

impl CostShareState {
    pub fn new(configs: &[HealthcareConfig], on: Date) -> Self {
        CostShareState {
            plans: configs
                .iter()
                .map(|c| PlanAccumulators::new(c, on))
                .collect(),
        }
    }

    /// Restore from snapshotted accumulators, keeping alignment with the
    /// config list.
    pub fn from_saved(configs: &[HealthcareConfig], saved: &[PlanAccumulators], on: Date) -> Self {
        CostShareState {
            plans: configs
                .iter()
                .map(|c| {
                    saved
                        .iter()
                        .find(|p| p.config_id == c.id)
                        .cloned()
                        .unwrap_or_else(|| PlanAccumulators::new(c, on))
                })
                .collect(),
        }
    }

    /// Accumulators for one config, if tracked.
    pub fn accumulators(&self, config_id: &str) -> Option<&PlanAccumulators> {
        self.plans.iter().find(|p| p.config_id == config_id)
    }

    /// Price a healthcare expense and update the accumulators.
    ///
    /// `gross` is the positive cost of the service. Returns the patient
    /// responsibility (also positive). Expenses with no active covering
    /// config pass through at full cost.
    pub fn apply_expense(
        &mut self,
        configs: &[HealthcareConfig],
        attrs: &HealthcareAttrs,
        date: Date,
        gross: f64,
    ) -> f64 {
        let Some(person) = attrs.healthcare_person.as_deref() else {
            return gross;
        };
        let Some(config) = config_for(configs, person, date) else {
            return gross;
        };
        let Some(plan_idx) = self.plans.iter().position(|p| p.config_id == config.id) else {
            return gross;
        };
        let acc = &mut self.plans[plan_idx];

        // Plan-year rollover
        let current_start = config.plan_year_start(date);
        if current_start != acc.plan_year_start {
            acc.reset_for(current_start);
        }

        let mut person_acc = acc.persons.get(person).copied().unwrap_or_default();

        let share = if let Some(copay) = attrs.copay_amount {
            copay.min(gross)
        } else {
            let deductible_remaining = (config.individual_deductible
                - person_acc.deductible_paid)
                .min(config.family_deductible - acc.family_deductible_paid)
                .max(0.0);
            let deductible_part = gross.min(deductible_remaining);
            let coinsurance_rate = attrs.coinsurance_percent.unwrap_or(0.0) / 100.0;
            let coinsured = (gross - deductible_part) * coinsurance_rate;

            let part = deductible_part + coinsured;
            if attrs.counts_toward_deductible {
                person_acc.deductible_paid = (person_acc.deductible_paid + deductible_part)
                    .min(config.individual_deductible);
                acc.family_deductible_paid =
                    (acc.family_deductible_paid + deductible_part).min(config.family_deductible);
            }
            part
        };

        // The out-of-pocket maximum caps the patient share for the plan year.
        let oop_remaining = (config.individual_out_of_pocket_max - person_acc.out_of_pocket_paid)
            .min(config.family_out_of_pocket_max - acc.family_out_of_pocket_paid)
            .max(0.0);
        let share = round_cents(share.min(oop_remaining));

        if attrs.counts_toward_out_of_pocket {
            person_acc.out_of_pocket_paid = (person_acc.out_of_pocket_paid + share)
                .min(config.individual_out_of_pocket_max);
            acc.family_out_of_pocket_paid =
                (acc.family_out_of_pocket_paid + share).min(config.family_out_of_pocket_max);
        }

        acc.persons.insert(person.to_string(), person_acc);
        share
    }
}

/// The config covering `person` on `date`: the first active match, so each
/// person is tracked within exactly one plan.
pub fn config_for<'a>(
    configs: &'a [HealthcareConfig],
    person: &str,
    date: Date,
) -> Option<&'a HealthcareConfig> {
    configs
        .iter()
        .find(|c| c.active_on(date) && c.covers_person(person))
}
