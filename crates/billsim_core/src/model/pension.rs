//! Pension and social-security paycheck streams.
//!
//! Both are dated stream generators: from a (possibly scenario-variable)
//! start date they deposit a monthly paycheck into a target account, scaled
//! by a claim-age reduction factor supplied in the catalog. Social-security
//! benefits may additionally be derived from an indexed earnings history via
//! the average-wage-index table.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::date_math::age_on;

use super::wage_index::WageIndex;

/// Claim-age factor: the factor whose `age` is the greatest value at or
/// below the claim age applies; with no matching entry the factor is 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReductionFactor {
    pub age: u8,
    pub factor: f64,
}

pub(crate) fn factor_for_age(factors: &[ReductionFactor], age: i32) -> f64 {
    factors
        .iter()
        .filter(|f| (f.age as i32) <= age)
        .max_by_key(|f| f.age)
        .map(|f| f.factor)
        .unwrap_or(1.0)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pension {
    pub id: String,
    pub name: String,
    /// Name of the account paychecks land in.
    pub account: String,
    pub start_date: Date,
    #[serde(default)]
    pub start_date_is_variable: bool,
    #[serde(default)]
    pub start_date_variable: Option<String>,
    pub birth_date: Date,
    pub monthly_amount: f64,
    #[serde(default)]
    pub reduction_factors: Vec<ReductionFactor>,
}

impl Pension {
    /// Monthly paycheck after the claim-age factor.
    pub fn monthly_benefit(&self, start: Date) -> f64 {
        self.monthly_amount * factor_for_age(&self.reduction_factors, age_on(self.birth_date, start))
    }
}

/// How a social-security benefit is derived.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum BenefitBasis {
    /// Directly specified monthly amount.
    Fixed { monthly: f64 },
    /// Earnings history indexed by the average-wage-index table, averaged
    /// over the top 35 indexed years, divided by 12.
    IndexedEarnings { earnings: Vec<YearEarning> },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct YearEarning {
    pub year: i16,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SocialSecurity {
    pub id: String,
    pub name: String,
    pub account: String,
    pub start_date: Date,
    #[serde(default)]
    pub start_date_is_variable: bool,
    #[serde(default)]
    pub start_date_variable: Option<String>,
    pub birth_date: Date,
    pub basis: BenefitBasis,
    #[serde(default)]
    pub reduction_factors: Vec<ReductionFactor>,
}

impl SocialSecurity {
    /// Monthly paycheck at the given claim date.
    pub fn monthly_benefit(&self, start: Date, wage_index: &WageIndex) -> f64 {
        let base = match &self.basis {
            BenefitBasis::Fixed { monthly } => *monthly,
            BenefitBasis::IndexedEarnings { earnings } => {
                indexed_monthly_basis(earnings, wage_index)
            }
        };
        base * factor_for_age(&self.reduction_factors, age_on(self.birth_date, start))
    }
}

/// Index each year's earnings to the table's latest year, keep the top 35,
/// and average down to a monthly figure.
fn indexed_monthly_basis(earnings: &[YearEarning], wage_index: &WageIndex) -> f64 {
    let Some(base_year) = wage_index.latest_year() else {
        return 0.0;
    };
    let base_index = wage_index.index_for(base_year).unwrap_or(1.0);

    let mut indexed: Vec<f64> = earnings
        .iter()
        .map(|e| {
            let factor = wage_index
                .index_for(e.year)
                .map(|idx| base_index / idx)
                .unwrap_or(1.0);
            e.amount * factor
        })
        .collect();
    indexed.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    indexed.truncate(35);

    if indexed.is_empty() {
        return 0.0;
    }
    let yearly_average = indexed.iter().sum::<f64>() / 35.0;
    yearly_average / 12.0
}

/// On-disk shape of `pension_and_social_security.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PensionAndSocialSecurity {
    #[serde(default)]
    pub pensions: Vec<Pension>,
    #[serde(default)]
    pub social_security: Vec<SocialSecurity>,
}
