//! Monetary amounts and the fractional transfer sentinels.
//!
//! An amount in the catalog is either a concrete number or one of the
//! markers `{HALF}`, `{FULL}`, `-{HALF}`, `-{FULL}`, meaning "this side of a
//! transfer equals half/the whole of the opposing side, with sign". The
//! markers survive scenario resolution untouched and are only resolved by the
//! day-walk engine when the opposing balance is known.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const HALF: &str = "{HALF}";
pub const FULL: &str = "{FULL}";
pub const NEG_HALF: &str = "-{HALF}";
pub const NEG_FULL: &str = "-{FULL}";

/// A concrete amount or a fractional sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount {
    Fixed(f64),
    HalfOf,
    FullOf,
    NegHalfOf,
    NegFullOf,
}

impl Amount {
    /// The concrete value, if this is not a sentinel.
    #[inline]
    pub fn fixed(self) -> Option<f64> {
        match self {
            Amount::Fixed(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn is_sentinel(self) -> bool {
        !matches!(self, Amount::Fixed(_))
    }

    /// Resolve a sentinel against the opposing side's concrete value.
    /// Concrete amounts pass through unchanged.
    #[inline]
    pub fn resolve_against(self, counterparty: f64) -> f64 {
        match self {
            Amount::Fixed(v) => v,
            Amount::HalfOf => counterparty / 2.0,
            Amount::FullOf => counterparty,
            Amount::NegHalfOf => -counterparty / 2.0,
            Amount::NegFullOf => -counterparty,
        }
    }

    fn sentinel_str(self) -> Option<&'static str> {
        match self {
            Amount::Fixed(_) => None,
            Amount::HalfOf => Some(HALF),
            Amount::FullOf => Some(FULL),
            Amount::NegHalfOf => Some(NEG_HALF),
            Amount::NegFullOf => Some(NEG_FULL),
        }
    }

    pub fn parse_sentinel(s: &str) -> Option<Amount> {
        match s {
            HALF => Some(Amount::HalfOf),
            FULL => Some(Amount::FullOf),
            NEG_HALF => Some(Amount::NegHalfOf),
            NEG_FULL => Some(Amount::NegFullOf),
            _ => None,
        }
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Amount::Fixed(v) => serializer.serialize_f64(*v),
            other => serializer.serialize_str(other.sentinel_str().unwrap_or_default()),
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl Visitor<'_> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "a number or one of {HALF}, {FULL}, {NEG_HALF}, {NEG_FULL}")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
                Ok(Amount::Fixed(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
                Ok(Amount::Fixed(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(Amount::Fixed(v as f64))
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<Amount, E> {
                Amount::parse_sentinel(s)
                    .ok_or_else(|| E::custom(format!("unknown amount marker {s:?}")))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::Fixed(0.0)
    }
}

/// An amount together with its optional scenario-variable binding.
///
/// Flattened into activities and bills, so the on-disk shape stays
/// `{"amount": …, "amountIsVariable": …, "amountVariable": …}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AmountSpec {
    pub amount: Amount,
    #[serde(default)]
    pub amount_is_variable: bool,
    #[serde(default)]
    pub amount_variable: Option<String>,
}

impl AmountSpec {
    pub fn fixed(v: f64) -> Self {
        AmountSpec {
            amount: Amount::Fixed(v),
            ..Default::default()
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        AmountSpec {
            amount: Amount::Fixed(0.0),
            amount_is_variable: true,
            amount_variable: Some(name.into()),
        }
    }
}

/// A date together with its optional scenario-variable binding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DateSpec {
    pub date: jiff::civil::Date,
    #[serde(default)]
    pub date_is_variable: bool,
    #[serde(default)]
    pub date_variable: Option<String>,
}

impl DateSpec {
    pub fn fixed(date: jiff::civil::Date) -> Self {
        DateSpec {
            date,
            date_is_variable: false,
            date_variable: None,
        }
    }
}
