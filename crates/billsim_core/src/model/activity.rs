//! One-shot activities.

use serde::{Deserialize, Serialize};

use super::amount::{AmountSpec, DateSpec};

/// Cost-sharing attributes shared by activities and bills.
///
/// Missing attributes default to false/none; an entry only participates in
/// the healthcare ladder when `is_healthcare` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthcareAttrs {
    #[serde(default)]
    pub is_healthcare: bool,
    #[serde(default)]
    pub healthcare_person: Option<String>,
    #[serde(default)]
    pub copay_amount: Option<f64>,
    #[serde(default)]
    pub coinsurance_percent: Option<f64>,
    #[serde(default)]
    pub counts_toward_deductible: bool,
    #[serde(default)]
    pub counts_toward_out_of_pocket: bool,
}

/// A single dated balance change on an account, or one side of a transfer
/// when `is_transfer` is set (then `fro`/`to` name the two accounts).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub date: DateSpec,
    #[serde(flatten)]
    pub amount: AmountSpec,
    /// Dotted `section.item` category.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_transfer: bool,
    #[serde(default)]
    pub fro: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    /// Links a healthcare expense back to the bill that generated it.
    #[serde(default)]
    pub bill_id: Option<String>,
    #[serde(flatten)]
    pub healthcare: HealthcareAttrs,
    #[serde(default)]
    pub flag: bool,
}

impl Activity {
    /// Split a dotted category into `(section, item)`; the item is empty when
    /// the category has no dot.
    pub fn category_parts(&self) -> (&str, &str) {
        split_category(self.category.as_deref())
    }
}

pub(crate) fn split_category(category: Option<&str>) -> (&str, &str) {
    match category {
        Some(c) => match c.split_once('.') {
            Some((section, item)) => (section, item),
            None => (c, ""),
        },
        None => ("", ""),
    }
}
