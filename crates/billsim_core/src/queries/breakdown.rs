//! Category and section breakdowns, and transaction listings.
//!
//! Breakdowns report spending as positive magnitudes. The `Ignore` and
//! `Income` sections never appear. A transfer's expense half counts at half
//! magnitude when both endpoints are inside the account filter (the money
//! stayed inside the filtered set) and at full magnitude otherwise; the
//! credit half never counts.

use std::collections::BTreeMap;

use crate::date_math::round_cents;
use crate::engine::EngineResult;
use crate::model::ConsolidatedEntry;
use crate::timeline::Window;

use super::filter_accounts;

const SKIPPED_SECTIONS: [&str; 2] = ["Ignore", "Income"];

fn in_filter(names: &[&str], account: Option<&str>) -> bool {
    account.is_some_and(|a| names.contains(&a))
}

/// Signed contribution of one entry to a breakdown sum, or `None` when the
/// entry does not participate.
fn contribution(entry: &ConsolidatedEntry, filtered_names: &[&str]) -> Option<f64> {
    if entry.is_transfer {
        if entry.amount >= 0.0 {
            return None;
        }
        let both_inside = in_filter(filtered_names, entry.fro.as_deref())
            && in_filter(filtered_names, entry.to.as_deref());
        return Some(if both_inside {
            entry.amount / 2.0
        } else {
            entry.amount
        });
    }
    Some(entry.amount)
}

fn breakdown<K: Ord>(
    result: &EngineResult,
    window: Window,
    selection: Option<&[String]>,
    mut key: impl FnMut(&ConsolidatedEntry) -> Option<K>,
) -> BTreeMap<K, f64> {
    let accounts = filter_accounts(result, selection);
    let names: Vec<&str> = accounts.iter().map(|a| a.name.as_str()).collect();

    let mut sums: BTreeMap<K, f64> = BTreeMap::new();
    for account in &accounts {
        for entry in &account.consolidated_activity {
            if !window.contains(entry.date) {
                continue;
            }
            let (section, _) = entry.category_parts();
            if section.is_empty() || SKIPPED_SECTIONS.contains(&section) {
                continue;
            }
            let Some(k) = key(entry) else { continue };
            let Some(value) = contribution(entry, &names) else {
                continue;
            };
            *sums.entry(k).or_insert(0.0) += value;
        }
    }

    // Keep expenses only, as positive magnitudes.
    sums.retain(|_, total| *total < 0.0);
    for total in sums.values_mut() {
        *total = round_cents(-*total);
    }
    sums
}

/// Spend per top-level category section.
pub fn category_breakdown(
    result: &EngineResult,
    window: Window,
    selection: Option<&[String]>,
) -> BTreeMap<String, f64> {
    breakdown(result, window, selection, |entry| {
        let (section, _) = entry.category_parts();
        Some(section.to_string())
    })
}

/// Spend per item within one section.
pub fn section_breakdown(
    result: &EngineResult,
    section: &str,
    window: Window,
    selection: Option<&[String]>,
) -> BTreeMap<String, f64> {
    breakdown(result, window, selection, |entry| {
        let (s, item) = entry.category_parts();
        (s == section).then(|| item.to_string())
    })
}

/// All entries in a section, deduplicated by entry id (a transfer's two
/// halves share one id and collapse to the first seen).
pub fn section_transactions(
    result: &EngineResult,
    section: &str,
    window: Window,
    selection: Option<&[String]>,
) -> Vec<ConsolidatedEntry> {
    transactions(result, window, selection, |s, _| s == section)
}

/// All entries matching `section.item`, deduplicated by entry id.
pub fn item_transactions(
    result: &EngineResult,
    section: &str,
    item: &str,
    window: Window,
    selection: Option<&[String]>,
) -> Vec<ConsolidatedEntry> {
    transactions(result, window, selection, |s, i| s == section && i == item)
}

fn transactions(
    result: &EngineResult,
    window: Window,
    selection: Option<&[String]>,
    mut matches: impl FnMut(&str, &str) -> bool,
) -> Vec<ConsolidatedEntry> {
    let accounts = filter_accounts(result, selection);
    let mut seen = std::collections::BTreeSet::new();
    let mut out = Vec::new();
    for account in accounts {
        for entry in &account.consolidated_activity {
            if !window.contains(entry.date) {
                continue;
            }
            let (section, item) = entry.category_parts();
            if matches(section, item) && seen.insert(entry.id.clone()) {
                out.push(entry.clone());
            }
        }
    }
    out.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    out
}
