//! Event timeline: expansion of the catalog into a flattened, chronologically
//! ordered stream of typed per-day events.
//!
//! The timeline is a pure producer. It resolves *dates* against the scenario
//! (so a shared timeline can be reused across every sim of a Monte Carlo
//! job) but leaves *amounts* as specs; the day-walk resolves those per run.

use jiff::civil::Date;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::date_math::{add_months, age_on};
use crate::error::{EngineError, Result};
use crate::model::{
    Account, AccountIdx, AccountKind, Activity, AmountSpec, Bill, Catalog, Compounding,
    HealthcareAttrs,
};
use crate::scenario::Scenarios;

/// Inclusive computation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: Date,
    pub end: Date,
}

impl Window {
    pub fn new(start: Date, end: Date) -> Self {
        Window { start, end }
    }

    #[inline]
    pub fn contains(&self, d: Date) -> bool {
        d >= self.start && d <= self.end
    }
}

/// Interned view of one catalog account.
#[derive(Debug, Clone)]
pub struct AccountRef {
    pub id: String,
    pub name: String,
    pub kind: AccountKind,
    pub hidden: bool,
    pub opening_balance: f64,
}

/// Payload of a timeline event. Variant order mirrors same-date priority.
#[derive(Debug, Clone)]
pub enum EventPayload {
    InterestPost {
        apr: f64,
        apr_variable: Option<String>,
        compounded: Compounding,
    },
    RmdCheck {
        owner_dob: Date,
        target: AccountIdx,
    },
    PensionPayday {
        amount: f64,
    },
    SocialSecurityPayday {
        amount: f64,
    },
    OneShotActivity {
        amount: AmountSpec,
        category: Option<String>,
        bill_id: Option<String>,
        healthcare: HealthcareAttrs,
        flag: bool,
    },
    RecurringOccurrence {
        amount: AmountSpec,
        category: Option<String>,
        bill_id: Option<String>,
        healthcare: HealthcareAttrs,
        flag: bool,
    },
    TransferPair {
        to: AccountIdx,
        amount: AmountSpec,
        category: Option<String>,
        bill_id: Option<String>,
        flag: bool,
    },
}

impl EventPayload {
    /// Same-date ordering priority (lower drains first).
    #[inline]
    pub fn priority(&self) -> u8 {
        match self {
            EventPayload::InterestPost { .. } => 0,
            EventPayload::RmdCheck { .. } => 1,
            EventPayload::PensionPayday { .. } => 2,
            EventPayload::SocialSecurityPayday { .. } => 2,
            EventPayload::OneShotActivity { .. } => 3,
            EventPayload::RecurringOccurrence { .. } => 4,
            EventPayload::TransferPair { .. } => 5,
        }
    }
}

/// One dated event. `account` is the owning account (the `fro` side for
/// transfers); `(name, id)` is the stable secondary sort key.
#[derive(Debug, Clone)]
pub struct TimelineEvent {
    pub date: Date,
    pub account: AccountIdx,
    pub name: String,
    pub id: String,
    pub payload: EventPayload,
}

/// The expanded event stream for one scenario and window.
#[derive(Debug, Clone)]
pub struct Timeline {
    pub scenario: String,
    pub window: Window,
    pub accounts: Vec<AccountRef>,
    /// Events sorted by `(date, priority, name, id)`.
    pub events: Vec<TimelineEvent>,
    index_by_name: FxHashMap<String, AccountIdx>,
    index_by_id: FxHashMap<String, AccountIdx>,
}

impl Timeline {
    pub fn account_index(&self, name_or_id: &str) -> Option<AccountIdx> {
        self.index_by_name
            .get(name_or_id)
            .or_else(|| self.index_by_id.get(name_or_id))
            .copied()
    }

    pub fn account(&self, idx: AccountIdx) -> &AccountRef {
        &self.accounts[idx.as_usize()]
    }
}

/// Expand the catalog into a sorted event stream for `scenario` over
/// `window`.
pub fn build_timeline(catalog: &Catalog, scenario: &str, window: Window) -> Result<Timeline> {
    if !catalog.scenarios.contains(scenario) {
        return Err(EngineError::ScenarioNotFound(scenario.to_string()));
    }

    let accounts: Vec<AccountRef> = catalog
        .accounts_and_transfers
        .accounts
        .iter()
        .map(|a| AccountRef {
            id: a.id.clone(),
            name: a.name.clone(),
            kind: a.kind,
            hidden: a.hidden,
            opening_balance: a.balance,
        })
        .collect();

    let mut index_by_name = FxHashMap::default();
    let mut index_by_id = FxHashMap::default();
    for (i, a) in accounts.iter().enumerate() {
        index_by_name.insert(a.name.clone(), AccountIdx(i as u16));
        index_by_id.insert(a.id.clone(), AccountIdx(i as u16));
    }
    let resolve_account = |name_or_id: &str| -> Result<AccountIdx> {
        index_by_name
            .get(name_or_id)
            .or_else(|| index_by_id.get(name_or_id))
            .copied()
            .ok_or_else(|| EngineError::AccountNotFound(name_or_id.to_string()))
    };

    let mut events: Vec<TimelineEvent> = Vec::new();
    let scenarios = &catalog.scenarios;

    for (i, account) in catalog.accounts_and_transfers.accounts.iter().enumerate() {
        let idx = AccountIdx(i as u16);
        expand_activities(
            &account.activity,
            Some(idx),
            scenarios,
            scenario,
            window,
            &resolve_account,
            &mut events,
        )?;
        expand_bills(
            &account.bills,
            Some(idx),
            scenario,
            window,
            &resolve_account,
            &mut events,
        )?;
        expand_interest(account, idx, window, &mut events)?;
        expand_rmd_checks(account, idx, window, &resolve_account, &mut events)?;
    }

    expand_activities(
        &catalog.accounts_and_transfers.transfers.activity,
        None,
        scenarios,
        scenario,
        window,
        &resolve_account,
        &mut events,
    )?;
    expand_bills(
        &catalog.accounts_and_transfers.transfers.bills,
        None,
        scenario,
        window,
        &resolve_account,
        &mut events,
    )?;

    for pension in &catalog.pensions {
        let start = scenarios.resolve_date(
            pension.start_date,
            pension.start_date_is_variable,
            &pension.start_date_variable,
            scenario,
        )?;
        let target = resolve_account(&pension.account)?;
        let amount = pension.monthly_benefit(start);
        expand_paydays(start, window, |date| TimelineEvent {
            date,
            account: target,
            name: pension.name.clone(),
            id: format!("{}:{}", pension.id, date),
            payload: EventPayload::PensionPayday { amount },
        }, &mut events);
    }

    for ss in &catalog.social_security {
        let start = scenarios.resolve_date(
            ss.start_date,
            ss.start_date_is_variable,
            &ss.start_date_variable,
            scenario,
        )?;
        let target = resolve_account(&ss.account)?;
        let amount = ss.monthly_benefit(start, &catalog.wage_index);
        expand_paydays(start, window, |date| TimelineEvent {
            date,
            account: target,
            name: ss.name.clone(),
            id: format!("{}:{}", ss.id, date),
            payload: EventPayload::SocialSecurityPayday { amount },
        }, &mut events);
    }

    // Same-date ordering: kind priority, then the stable (name, id) key.
    events.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.payload.priority().cmp(&b.payload.priority()))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });

    Ok(Timeline {
        scenario: scenario.to_string(),
        window,
        accounts,
        events,
        index_by_name,
        index_by_id,
    })
}

fn expand_activities(
    activities: &[Activity],
    owner: Option<AccountIdx>,
    scenarios: &Scenarios,
    scenario: &str,
    window: Window,
    resolve_account: &impl Fn(&str) -> Result<AccountIdx>,
    events: &mut Vec<TimelineEvent>,
) -> Result<()> {
    for activity in activities {
        let date = scenarios.resolve_date(
            activity.date.date,
            activity.date.date_is_variable,
            &activity.date.date_variable,
            scenario,
        )?;
        if !window.contains(date) {
            continue;
        }
        if activity.is_transfer || owner.is_none() {
            let (fro, to) = transfer_sides(
                &activity.name,
                activity.fro.as_deref(),
                activity.to.as_deref(),
                resolve_account,
            )?;
            events.push(TimelineEvent {
                date,
                account: fro,
                name: activity.name.clone(),
                id: activity.id.clone(),
                payload: EventPayload::TransferPair {
                    to,
                    amount: activity.amount.clone(),
                    category: activity.category.clone(),
                    bill_id: activity.bill_id.clone(),
                    flag: activity.flag,
                },
            });
        } else if let Some(owner) = owner {
            events.push(TimelineEvent {
                date,
                account: owner,
                name: activity.name.clone(),
                id: activity.id.clone(),
                payload: EventPayload::OneShotActivity {
                    amount: activity.amount.clone(),
                    category: activity.category.clone(),
                    bill_id: activity.bill_id.clone(),
                    healthcare: activity.healthcare.clone(),
                    flag: activity.flag,
                },
            });
        }
    }
    Ok(())
}

fn expand_bills(
    bills: &[Bill],
    owner: Option<AccountIdx>,
    _scenario: &str,
    window: Window,
    resolve_account: &impl Fn(&str) -> Result<AccountIdx>,
    events: &mut Vec<TimelineEvent>,
) -> Result<()> {
    for bill in bills {
        let is_transfer = bill.is_transfer || owner.is_none();
        let sides = if is_transfer {
            Some(transfer_sides(
                &bill.name,
                bill.fro.as_deref(),
                bill.to.as_deref(),
                resolve_account,
            )?)
        } else {
            None
        };
        for date in bill.occurrences(window.start, window.end) {
            let occurrence_id = format!("{}:{}", bill.id, date);
            match (sides, owner) {
                (Some((fro, to)), _) => events.push(TimelineEvent {
                    date,
                    account: fro,
                    name: bill.name.clone(),
                    id: occurrence_id,
                    payload: EventPayload::TransferPair {
                        to,
                        amount: bill.amount.clone(),
                        category: bill.category.clone(),
                        bill_id: Some(bill.id.clone()),
                        flag: bill.flag,
                    },
                }),
                (None, Some(owner)) => events.push(TimelineEvent {
                    date,
                    account: owner,
                    name: bill.name.clone(),
                    id: occurrence_id,
                    payload: EventPayload::RecurringOccurrence {
                        amount: bill.amount.clone(),
                        category: bill.category.clone(),
                        bill_id: Some(bill.id.clone()),
                        healthcare: bill.healthcare.clone(),
                        flag: bill.flag,
                    },
                }),
                (None, None) => unreachable!("standalone bills are always transfers"),
            }
        }
    }
    Ok(())
}

fn transfer_sides(
    name: &str,
    fro: Option<&str>,
    to: Option<&str>,
    resolve_account: &impl Fn(&str) -> Result<AccountIdx>,
) -> Result<(AccountIdx, AccountIdx)> {
    match (fro, to) {
        (Some(f), Some(t)) if !f.is_empty() && !t.is_empty() => {
            Ok((resolve_account(f)?, resolve_account(t)?))
        }
        _ => Err(EngineError::BrokenTransfer {
            name: name.to_string(),
            fro: fro.map(str::to_string),
            to: to.map(str::to_string),
        }),
    }
}

fn expand_interest(
    account: &Account,
    idx: AccountIdx,
    window: Window,
    events: &mut Vec<TimelineEvent>,
) -> Result<()> {
    let rules = account.sorted_interests();
    for pair in rules.windows(2) {
        if pair[1].applicable_date <= pair[0].applicable_date {
            return Err(EngineError::InvalidInterestSchedule {
                account: account.name.clone(),
                date: pair[1].applicable_date,
            });
        }
    }

    for (i, rule) in rules.iter().enumerate() {
        // A rule posts from its first full period until the next rule (or
        // the window end) takes over.
        let takeover = rules.get(i + 1).map(|r| r.applicable_date);
        let mut post = rule.compounded.next_posting(rule.applicable_date);
        loop {
            if post > window.end {
                break;
            }
            if let Some(t) = takeover
                && post >= t
            {
                break;
            }
            if post >= window.start {
                events.push(TimelineEvent {
                    date: post,
                    account: idx,
                    name: format!("{} Interest", account.name),
                    id: format!("{}:{}", rule.id, post),
                    payload: EventPayload::InterestPost {
                        apr: rule.apr,
                        apr_variable: if rule.apr_is_variable {
                            rule.apr_variable.clone()
                        } else {
                            None
                        },
                        compounded: rule.compounded,
                    },
                });
            }
            post = rule.compounded.next_posting(post);
        }
    }
    Ok(())
}

fn expand_rmd_checks(
    account: &Account,
    idx: AccountIdx,
    window: Window,
    resolve_account: &impl Fn(&str) -> Result<AccountIdx>,
    events: &mut Vec<TimelineEvent>,
) -> Result<()> {
    if !account.uses_rmd {
        return Ok(());
    }
    let (Some(dob), Some(target_name)) = (account.account_owner_dob, &account.rmd_account) else {
        return Ok(());
    };
    let target = resolve_account(target_name)?;

    for year in window.start.year()..=window.end.year() {
        let year_end = jiff::civil::date(year, 12, 31);
        if !window.contains(year_end) {
            continue;
        }
        // No check before the owner can possibly owe a distribution.
        if age_on(dob, year_end) < 0 {
            continue;
        }
        events.push(TimelineEvent {
            date: year_end,
            account: idx,
            name: format!("{} RMD", account.name),
            id: format!("{}:rmd:{}", account.id, year),
            payload: EventPayload::RmdCheck {
                owner_dob: dob,
                target,
            },
        });
    }
    Ok(())
}

fn expand_paydays(
    start: Date,
    window: Window,
    mut make_event: impl FnMut(Date) -> TimelineEvent,
    events: &mut Vec<TimelineEvent>,
) {
    if start > window.end {
        return;
    }
    let mut k = 0;
    loop {
        let date = add_months(start, k);
        if date > window.end {
            break;
        }
        if date >= window.start {
            events.push(make_event(date));
        }
        k += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccountsAndTransfers, Catalog, InterestRule};
    use jiff::civil::date;

    fn catalog_with_accounts(accounts: Vec<Account>) -> Catalog {
        Catalog {
            accounts_and_transfers: AccountsAndTransfers {
                accounts,
                transfers: Default::default(),
            },
            ..Default::default()
        }
    }

    fn checking(id: &str, name: &str) -> Account {
        Account {
            id: id.into(),
            name: name.into(),
            kind: AccountKind::Checking,
            hidden: false,
            balance: 0.0,
            activity: Vec::new(),
            bills: Vec::new(),
            interests: Vec::new(),
            uses_rmd: false,
            account_owner_dob: None,
            rmd_account: None,
            pull_priority: None,
        }
    }

    #[test]
    fn same_day_events_drain_in_kind_priority_order() {
        let mut acc = checking("a", "Checking");
        let day = date(2024, 3, 1);
        acc.activity.push(Activity {
            id: "act".into(),
            name: "Ad hoc".into(),
            date: crate::model::DateSpec::fixed(day),
            amount: AmountSpec::fixed(-10.0),
            category: None,
            is_transfer: false,
            fro: None,
            to: None,
            bill_id: None,
            healthcare: Default::default(),
            flag: false,
        });
        acc.bills.push(Bill {
            id: "bill".into(),
            name: "Rent".into(),
            start_date: day,
            end_date: None,
            periods: crate::model::PeriodUnit::Month,
            every_n: 1,
            amount: AmountSpec::fixed(-100.0),
            category: None,
            is_transfer: false,
            fro: None,
            to: None,
            healthcare: Default::default(),
            flag: false,
        });
        acc.interests.push(InterestRule {
            id: "int".into(),
            apr: 0.12,
            apr_is_variable: false,
            apr_variable: None,
            compounded: Compounding::Month,
            applicable_date: date(2024, 2, 1),
        });

        let catalog = catalog_with_accounts(vec![acc]);
        let timeline = build_timeline(
            &catalog,
            "Default",
            Window::new(date(2024, 3, 1), date(2024, 3, 31)),
        )
        .unwrap();

        let on_day: Vec<u8> = timeline
            .events
            .iter()
            .filter(|e| e.date == day)
            .map(|e| e.payload.priority())
            .collect();
        let mut sorted = on_day.clone();
        sorted.sort_unstable();
        assert_eq!(on_day, sorted);
        assert_eq!(on_day.len(), 3); // interest post + activity + bill
    }

    #[test]
    fn interest_rule_takeover() {
        let mut acc = checking("a", "Savings");
        acc.interests = vec![
            InterestRule {
                id: "lo".into(),
                apr: 0.01,
                apr_is_variable: false,
                apr_variable: None,
                compounded: Compounding::Month,
                applicable_date: date(2024, 1, 1),
            },
            InterestRule {
                id: "hi".into(),
                apr: 0.05,
                apr_is_variable: false,
                apr_variable: None,
                compounded: Compounding::Month,
                applicable_date: date(2024, 4, 1),
            },
        ];
        let catalog = catalog_with_accounts(vec![acc]);
        let timeline = build_timeline(
            &catalog,
            "Default",
            Window::new(date(2024, 1, 1), date(2024, 6, 30)),
        )
        .unwrap();

        let postings: Vec<(Date, f64)> = timeline
            .events
            .iter()
            .filter_map(|e| match &e.payload {
                EventPayload::InterestPost { apr, .. } => Some((e.date, *apr)),
                _ => None,
            })
            .collect();
        assert_eq!(
            postings,
            vec![
                (date(2024, 2, 1), 0.01),
                (date(2024, 3, 1), 0.01),
                (date(2024, 5, 1), 0.05),
                (date(2024, 6, 1), 0.05),
            ]
        );
    }

    #[test]
    fn duplicate_interest_dates_are_contradictory() {
        let mut acc = checking("a", "Savings");
        let rule = InterestRule {
            id: "r1".into(),
            apr: 0.01,
            apr_is_variable: false,
            apr_variable: None,
            compounded: Compounding::Month,
            applicable_date: date(2024, 1, 1),
        };
        let mut dup = rule.clone();
        dup.id = "r2".into();
        acc.interests = vec![rule, dup];
        let catalog = catalog_with_accounts(vec![acc]);
        let err = build_timeline(
            &catalog,
            "Default",
            Window::new(date(2024, 1, 1), date(2024, 6, 30)),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInterestSchedule { .. }));
    }

    #[test]
    fn transfer_requires_both_sides() {
        let mut a = checking("a", "Checking");
        a.activity.push(Activity {
            id: "x".into(),
            name: "Broken".into(),
            date: crate::model::DateSpec::fixed(date(2024, 2, 1)),
            amount: AmountSpec::fixed(200.0),
            category: None,
            is_transfer: true,
            fro: Some("Checking".into()),
            to: None,
            bill_id: None,
            healthcare: Default::default(),
            flag: false,
        });
        let catalog = catalog_with_accounts(vec![a, checking("b", "Savings")]);
        let err = build_timeline(
            &catalog,
            "Default",
            Window::new(date(2024, 1, 1), date(2024, 12, 31)),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::BrokenTransfer { .. }));
    }

    #[test]
    fn rmd_checks_fire_each_year_end() {
        let mut retirement = checking("r", "Retirement");
        retirement.kind = AccountKind::Retirement;
        retirement.uses_rmd = true;
        retirement.account_owner_dob = Some(date(1950, 6, 15));
        retirement.rmd_account = Some("Checking".into());
        let catalog = catalog_with_accounts(vec![retirement, checking("c", "Checking")]);
        let timeline = build_timeline(
            &catalog,
            "Default",
            Window::new(date(2024, 1, 1), date(2026, 6, 30)),
        )
        .unwrap();

        let checks: Vec<Date> = timeline
            .events
            .iter()
            .filter(|e| matches!(e.payload, EventPayload::RmdCheck { .. }))
            .map(|e| e.date)
            .collect();
        // 2026's year end is outside the window
        assert_eq!(checks, vec![date(2024, 12, 31), date(2025, 12, 31)]);
    }

    #[test]
    fn unknown_scenario_is_rejected() {
        let catalog = catalog_with_accounts(vec![checking("a", "Checking")]);
        assert!(matches!(
            build_timeline(
                &catalog,
                "Missing",
                Window::new(date(2024, 1, 1), date(2024, 2, 1))
            ),
            Err(EngineError::ScenarioNotFound(_))
        ));
    }
}
