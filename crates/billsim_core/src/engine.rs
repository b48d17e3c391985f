//! The day-walk engine.
//!
//! Consumes the event timeline in order, maintains per-account running
//! balances, and appends typed entries to per-account consolidated ledgers.
//! This is where fractional sentinels resolve, interest posts, transfers
//! split into mirrored halves, healthcare cost sharing applies, and monthly
//! snapshots are captured.

use jiff::civil::Date;
use rustc_hash::FxHashMap;

use crate::cost_sharing::CostShareState;
use crate::date_math::{add_days, round_cents};
use crate::error::{EngineError, Result};
use crate::model::{
    AccountIdx, AccountKind, Amount, AmountSpec, Catalog, ConsolidatedEntry, EntryKind,
    HealthcareAttrs, TRANSFER_CATEGORY,
};
use crate::snapshot::{BalanceSnapshot, CACHE_VERSION};
use crate::timeline::{EventPayload, Timeline, TimelineEvent, Window};

/// Pre-drawn stochastic overrides: variable name → value for this run.
pub type StochasticOverrides = FxHashMap<String, f64>;

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Capture a snapshot at each month boundary inside the walk.
    pub write_snapshots: bool,
    /// Present on Monte Carlo runs; replaces matching variable bindings.
    pub stochastic: Option<StochasticOverrides>,
}

/// One account's computed ledger.
#[derive(Debug, Clone)]
pub struct AccountLedger {
    pub account_id: String,
    pub name: String,
    pub kind: AccountKind,
    pub hidden: bool,
    /// Balance after the last entry.
    pub balance: f64,
    pub consolidated_activity: Vec<ConsolidatedEntry>,
}

/// Result of one engine run. Never partial: any failure discards the run.
#[derive(Debug, Clone)]
pub struct EngineResult {
    pub scenario: String,
    pub window: Window,
    pub accounts: Vec<AccountLedger>,
    pub snapshots: Vec<BalanceSnapshot>,
}

impl EngineResult {
    pub fn account(&self, name_or_id: &str) -> Option<&AccountLedger> {
        self.accounts
            .iter()
            .find(|a| a.account_id == name_or_id || a.name == name_or_id)
    }
}

struct WalkState<'a> {
    catalog: &'a Catalog,
    timeline: &'a Timeline,
    options: &'a EngineOptions,
    balances: Vec<f64>,
    opening: Vec<f64>,
    ledgers: Vec<Vec<ConsolidatedEntry>>,
    cost_sharing: CostShareState,
    snapshots: Vec<BalanceSnapshot>,
}

/// Run the day-walk over `timeline`, optionally resuming from a snapshot
/// dated at the timeline's window start.
pub fn run(
    catalog: &Catalog,
    timeline: &Timeline,
    resume: Option<&BalanceSnapshot>,
    options: &EngineOptions,
) -> Result<EngineResult> {
    let n = timeline.accounts.len();
    let window = timeline.window;

    let mut balances = vec![0.0; n];
    let mut opening = vec![0.0; n];
    let mut ledgers: Vec<Vec<ConsolidatedEntry>> = vec![Vec::new(); n];

    for (i, account) in timeline.accounts.iter().enumerate() {
        opening[i] = account.opening_balance;
        balances[i] = account.opening_balance;
    }

    let cost_sharing = match resume {
        Some(snapshot) => {
            for (i, account) in timeline.accounts.iter().enumerate() {
                if let Some(balance) = snapshot.balances.get(&account.id) {
                    balances[i] = *balance;
                }
                if let Some(prefix) = snapshot.ledger_prefix.get(&account.id) {
                    ledgers[i] = prefix.clone();
                }
            }
            CostShareState::from_saved(
                &catalog.healthcare_configs,
                &snapshot.cost_sharing,
                window.start,
            )
        }
        None => CostShareState::new(&catalog.healthcare_configs, window.start),
    };

    let mut state = WalkState {
        catalog,
        timeline,
        options,
        balances,
        opening,
        ledgers,
        cost_sharing,
        snapshots: Vec::new(),
    };

    let mut cursor = 0usize;
    let events = &timeline.events;
    let mut current = window.start;
    while current <= window.end {
        if options.write_snapshots && current.day() == 1 && current > window.start {
            let snapshot = state.capture_snapshot(current);
            state.snapshots.push(snapshot);
        }

        while cursor < events.len() && events[cursor].date == current {
            state.apply_event(&events[cursor])?;
            cursor += 1;
        }

        current = add_days(current, 1);
    }

    let mut accounts = Vec::with_capacity(n);
    for (i, account) in timeline.accounts.iter().enumerate() {
        let mut entries = std::mem::take(&mut state.ledgers[i]);
        let balance = finalise_ledger(&mut entries, state.opening[i]);
        accounts.push(AccountLedger {
            account_id: account.id.clone(),
            name: account.name.clone(),
            kind: account.kind,
            hidden: account.hidden,
            balance,
            consolidated_activity: entries,
        });
    }

    Ok(EngineResult {
        scenario: timeline.scenario.clone(),
        window,
        accounts,
        snapshots: state.snapshots,
    })
}

/// Sort a ledger by `(date, name, id)` and rebuild the running balances from
/// the opening balance. Returns the final balance.
pub fn finalise_ledger(entries: &mut [ConsolidatedEntry], opening: f64) -> f64 {
    entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    let mut balance = opening;
    for entry in entries.iter_mut() {
        balance = round_cents(balance + entry.amount);
        entry.balance = balance;
    }
    balance
}

impl WalkState<'_> {
    fn resolve_amount(&self, spec: &AmountSpec) -> Result<Amount> {
        if let Some(overrides) = &self.options.stochastic
            && spec.amount_is_variable
            && let Some(variable) = spec.amount_variable.as_deref()
            && let Some(value) = overrides.get(variable)
        {
            return Ok(Amount::Fixed(*value));
        }
        self.catalog
            .scenarios
            .resolve_amount(spec, &self.timeline.scenario)
    }

    fn resolve_rate(&self, base: f64, variable: Option<&str>) -> Result<f64> {
        if let Some(overrides) = &self.options.stochastic
            && let Some(variable) = variable
            && let Some(value) = overrides.get(variable)
        {
            return Ok(*value);
        }
        self.catalog
            .scenarios
            .resolve_rate(base, variable, &self.timeline.scenario)
    }

    fn push_entry(&mut self, account: AccountIdx, entry: ConsolidatedEntry) {
        self.balances[account.as_usize()] =
            round_cents(self.balances[account.as_usize()] + entry.amount);
        self.ledgers[account.as_usize()].push(entry);
    }

    fn apply_event(&mut self, event: &TimelineEvent) -> Result<()> {
        match &event.payload {
            EventPayload::InterestPost {
                apr,
                apr_variable,
                compounded,
            } => {
                let rate = self.resolve_rate(*apr, apr_variable.as_deref())?;
                let balance = self.balances[event.account.as_usize()];
                let interest = round_cents(balance * rate * compounded.fraction_of_year());
                // Every posting period emits exactly one entry, even when the
                // interest rounds to zero.
                self.push_entry(
                    event.account,
                    ConsolidatedEntry {
                        id: event.id.clone(),
                        name: event.name.clone(),
                        date: event.date,
                        amount: interest,
                        balance: 0.0,
                        kind: EntryKind::Interest,
                        category: Some("Ignore.Interest".to_string()),
                        is_transfer: false,
                        fro: None,
                        to: None,
                        bill_id: None,
                        healthcare: None,
                        gross_amount: None,
                        flag: false,
                    },
                );
            }

            EventPayload::RmdCheck { owner_dob, target } => {
                self.apply_rmd(event, *owner_dob, *target)?;
            }

            EventPayload::PensionPayday { amount } => {
                self.push_paycheck(event, *amount, EntryKind::Pension, "Income.Pension");
            }
            EventPayload::SocialSecurityPayday { amount } => {
                self.push_paycheck(
                    event,
                    *amount,
                    EntryKind::SocialSecurity,
                    "Income.SocialSecurity",
                );
            }

            EventPayload::OneShotActivity {
                amount,
                category,
                bill_id,
                healthcare,
                flag,
            } => {
                self.apply_account_entry(
                    event,
                    amount,
                    category,
                    bill_id,
                    healthcare,
                    *flag,
                    EntryKind::Activity,
                )?;
            }
            EventPayload::RecurringOccurrence {
                amount,
                category,
                bill_id,
                healthcare,
                flag,
            } => {
                self.apply_account_entry(
                    event,
                    amount,
                    category,
                    bill_id,
                    healthcare,
                    *flag,
                    EntryKind::Bill,
                )?;
            }

            EventPayload::TransferPair {
                to,
                amount,
                category,
                bill_id,
                flag,
            } => {
                let resolved = self.resolve_amount(amount)?;
                // Positive sentinels mean a fraction of the source balance
                // ("move half of checking"); negated sentinels a fraction of
                // the destination balance, sign-flipped ("pay off the card").
                let value = match resolved {
                    Amount::Fixed(v) => v,
                    Amount::HalfOf | Amount::FullOf => {
                        resolved.resolve_against(self.balances[event.account.as_usize()])
                    }
                    Amount::NegHalfOf | Amount::NegFullOf => {
                        resolved.resolve_against(self.balances[to.as_usize()])
                    }
                };
                let value = round_cents(value);
                self.push_transfer_pair(
                    event.account,
                    *to,
                    value,
                    event,
                    category.clone(),
                    bill_id.clone(),
                    *flag,
                    EntryKind::Transfer,
                );
            }
        }
        Ok(())
    }

    fn apply_rmd(&mut self, event: &TimelineEvent, owner_dob: Date, target: AccountIdx) -> Result<()> {
        let account = self.timeline.account(event.account);
        let age = crate::date_math::age_on(owner_dob, event.date);
        if age < 0 {
            return Err(EngineError::RmdAgeOutOfTable {
                account: account.name.clone(),
                age,
            });
        }
        let Some(divisor) = self.catalog.rmd_table.divisor_for_age(age) else {
            // Below the first table age: no distribution required yet.
            return Ok(());
        };
        let balance = self.balances[event.account.as_usize()];
        let required = round_cents(balance / divisor);
        if required <= 0.0 {
            return Ok(());
        }
        self.push_transfer_pair(
            event.account,
            target,
            required,
            event,
            Some(TRANSFER_CATEGORY.to_string()),
            None,
            false,
            EntryKind::Rmd,
        );
        Ok(())
    }

    fn push_paycheck(
        &mut self,
        event: &TimelineEvent,
        amount: f64,
        kind: EntryKind,
        category: &str,
    ) {
        self.push_entry(
            event.account,
            ConsolidatedEntry {
                id: event.id.clone(),
                name: event.name.clone(),
                date: event.date,
                amount: round_cents(amount),
                balance: 0.0,
                kind,
                category: Some(category.to_string()),
                is_transfer: false,
                fro: None,
                to: None,
                bill_id: None,
                healthcare: None,
                gross_amount: None,
                flag: false,
            },
        );
    }

    fn apply_account_entry(
        &mut self,
        event: &TimelineEvent,
        amount: &AmountSpec,
        category: &Option<String>,
        bill_id: &Option<String>,
        healthcare: &HealthcareAttrs,
        flag: bool,
        kind: EntryKind,
    ) -> Result<()> {
        let resolved = self.resolve_amount(amount)?;
        let Some(value) = resolved.fixed() else {
            // Fractional sentinels only make sense between two transfer sides.
            return Err(EngineError::UnresolvedTransferAmount {
                name: event.name.clone(),
                date: event.date,
            });
        };
        let mut value = round_cents(value);
        let mut gross_amount = None;

        if healthcare.is_healthcare && value < 0.0 {
            let gross = -value;
            let share =
                self.cost_sharing
                    .apply_expense(&self.catalog.healthcare_configs, healthcare, event.date, gross);
            gross_amount = Some(value);
            value = -share;
        }

        self.push_entry(
            event.account,
            ConsolidatedEntry {
                id: event.id.clone(),
                name: event.name.clone(),
                date: event.date,
                amount: value,
                balance: 0.0,
                kind,
                category: category.clone(),
                is_transfer: false,
                fro: None,
                to: None,
                bill_id: bill_id.clone(),
                healthcare: if healthcare.is_healthcare {
                    Some(healthcare.clone())
                } else {
                    None
                },
                gross_amount,
                flag,
            },
        );
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn push_transfer_pair(
        &mut self,
        fro: AccountIdx,
        to: AccountIdx,
        value: f64,
        event: &TimelineEvent,
        category: Option<String>,
        bill_id: Option<String>,
        flag: bool,
        kind: EntryKind,
    ) {
        let fro_name = self.timeline.account(fro).name.clone();
        let to_name = self.timeline.account(to).name.clone();
        let category = category.unwrap_or_else(|| TRANSFER_CATEGORY.to_string());

        let template = ConsolidatedEntry {
            id: event.id.clone(),
            name: event.name.clone(),
            date: event.date,
            amount: 0.0,
            balance: 0.0,
            kind,
            category: Some(category),
            is_transfer: true,
            fro: Some(fro_name),
            to: Some(to_name),
            bill_id,
            healthcare: None,
            gross_amount: None,
            flag,
        };

        let mut out = template.clone();
        out.amount = -value;
        self.push_entry(fro, out);

        let mut inn = template;
        inn.amount = value;
        self.push_entry(to, inn);
    }

    /// Start-of-day snapshot: state before any of `date`'s events.
    fn capture_snapshot(&self, date: Date) -> BalanceSnapshot {
        let mut balances = std::collections::BTreeMap::new();
        let mut ledger_prefix = std::collections::BTreeMap::new();
        for (i, account) in self.timeline.accounts.iter().enumerate() {
            let mut entries = self.ledgers[i].clone();
            let balance = finalise_ledger(&mut entries, self.opening[i]);
            balances.insert(account.id.clone(), balance);
            ledger_prefix.insert(account.id.clone(), entries);
        }
        BalanceSnapshot {
            cache_version: CACHE_VERSION,
            date,
            monte_carlo: self.options.stochastic.is_some(),
            balances,
            ledger_prefix,
            cost_sharing: self.cost_sharing.plans.clone(),
        }
    }
}
