//! Pension and social-security paycheck streams.

use jiff::civil::date;

use crate::model::{
    AccountKind, BenefitBasis, EntryKind, Pension, ReductionFactor, SocialSecurity,
};
use crate::scenario::VariableValue;
use crate::tests::support::{account, assert_ledger_recurrence, catalog, run};

fn factors() -> Vec<ReductionFactor> {
    vec![
        ReductionFactor { age: 62, factor: 0.70 },
        ReductionFactor { age: 67, factor: 1.0 },
        ReductionFactor { age: 70, factor: 1.24 },
    ]
}

#[test]
fn pension_pays_monthly_into_target_account() {
    let checking = account("c", "Checking", AccountKind::Checking, 0.0);
    let mut cat = catalog(vec![checking]);
    cat.pensions.push(Pension {
        id: "p1".into(),
        name: "County pension".into(),
        account: "Checking".into(),
        start_date: date(2024, 3, 10),
        start_date_is_variable: false,
        start_date_variable: None,
        birth_date: date(1957, 1, 2), // age 67 at start → factor 1.0
        monthly_amount: 1800.0,
        reduction_factors: factors(),
    });

    let result = run(&cat, date(2024, 1, 1), date(2024, 7, 31));
    let ledger = &result.account("Checking").unwrap().consolidated_activity;
    let paydays: Vec<_> = ledger
        .iter()
        .filter(|e| e.kind == EntryKind::Pension)
        .collect();
    assert_eq!(paydays.len(), 5); // Mar..Jul on the 10th
    assert!(paydays.iter().all(|e| e.date.day() == 10));
    assert!(paydays.iter().all(|e| e.amount == 1800.0));
    assert_eq!(result.account("Checking").unwrap().balance, 9000.0);
    assert_ledger_recurrence(&result);
}

#[test]
fn early_claim_reduces_the_paycheck() {
    let checking = account("c", "Checking", AccountKind::Checking, 0.0);
    let mut cat = catalog(vec![checking]);
    cat.pensions.push(Pension {
        id: "p1".into(),
        name: "County pension".into(),
        account: "Checking".into(),
        start_date: date(2024, 3, 1),
        start_date_is_variable: false,
        start_date_variable: None,
        birth_date: date(1962, 1, 2), // age 62 at start → factor 0.70
        monthly_amount: 1000.0,
        reduction_factors: factors(),
    });
    let result = run(&cat, date(2024, 3, 1), date(2024, 3, 31));
    let ledger = &result.account("Checking").unwrap().consolidated_activity;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].amount, 700.0);
}

#[test]
fn social_security_start_date_can_be_a_variable() {
    let checking = account("c", "Checking", AccountKind::Checking, 0.0);
    let mut cat = catalog(vec![checking]);
    cat.social_security.push(SocialSecurity {
        id: "ss".into(),
        name: "Social Security".into(),
        account: "Checking".into(),
        start_date: date(2024, 1, 15),
        start_date_is_variable: true,
        start_date_variable: Some("ssStart".into()),
        birth_date: date(1957, 6, 1),
        basis: BenefitBasis::Fixed { monthly: 2200.0 },
        reduction_factors: factors(),
    });
    cat.scenarios
        .variables
        .entry("ssStart".to_string())
        .or_default()
        .insert("Default".to_string(), VariableValue::Date(date(2024, 6, 20)));

    let result = run(&cat, date(2024, 1, 1), date(2024, 12, 31));
    let ledger = &result.account("Checking").unwrap().consolidated_activity;
    let paydays: Vec<_> = ledger
        .iter()
        .filter(|e| e.kind == EntryKind::SocialSecurity)
        .collect();
    // Scenario moves the stream start to June 20; age 67 → factor 1.0
    assert_eq!(paydays.len(), 7);
    assert_eq!(paydays[0].date, date(2024, 6, 20));
    assert!(paydays.iter().all(|e| e.amount == 2200.0));
}
