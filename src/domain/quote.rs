//! Fund quote records.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::tags::is_reserved;

/// The catch-all tag every fund belongs to. Never stored on a record.
pub const ALL_TAG: &str = "All";

const LOADING: &str = "loading";
const UNAVAILABLE: &str = "--";

/// A net value or percentage as shown in the watchlist.
///
/// Persisted as a string: `"loading"`, `"--"` or the decimal itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Nav {
    #[default]
    Loading,
    Unavailable,
    Value(Decimal),
}

impl Nav {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            Nav::Value(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Nav::Loading)
    }
}

impl From<Option<Decimal>> for Nav {
    fn from(value: Option<Decimal>) -> Self {
        value.map_or(Nav::Unavailable, Nav::Value)
    }
}

impl fmt::Display for Nav {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nav::Loading => f.write_str(LOADING),
            Nav::Unavailable => f.write_str(UNAVAILABLE),
            Nav::Value(v) => write!(f, "{v}"),
        }
    }
}

impl From<Nav> for String {
    fn from(nav: Nav) -> Self {
        nav.to_string()
    }
}

impl TryFrom<String> for Nav {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        match raw.trim() {
            LOADING => Ok(Nav::Loading),
            UNAVAILABLE | "" => Ok(Nav::Unavailable),
            s => Decimal::from_str(s)
                .map(Nav::Value)
                .map_err(|e| format!("invalid value {s:?}: {e}")),
        }
    }
}

/// When the displayed value was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "at", rename_all = "snake_case")]
pub enum ValuationStamp {
    #[default]
    Pending,
    Intraday(NaiveDateTime),
    Settled(NaiveDate),
}

impl ValuationStamp {
    pub fn label(&self) -> String {
        match self {
            ValuationStamp::Pending => UNAVAILABLE.to_string(),
            ValuationStamp::Intraday(at) => at.format("%H:%M").to_string(),
            ValuationStamp::Settled(date) => format!("settled as of {}", date.format("%Y-%m-%d")),
        }
    }
}

/// Intraday estimate for one fund.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateQuote {
    pub code: String,
    pub name: String,
    pub value: Decimal,
    pub change_percent: Decimal,
    /// Beijing wall clock time of the estimate.
    pub as_of: NaiveDateTime,
    pub last_settled: Option<Decimal>,
    pub last_settled_date: Option<NaiveDate>,
}

/// Official end-of-day net value for one fund.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementQuote {
    pub code: String,
    pub name: String,
    pub value: Decimal,
    pub change_percent: Option<Decimal>,
    pub as_of_date: NaiveDate,
}

/// Quote fields produced by reconciliation, without user annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingQuote {
    pub code: String,
    pub display_name: String,
    pub last_settled_value: Nav,
    pub current_estimated_value: Nav,
    pub estimated_change_percent: Nav,
    pub valuation_stamp: ValuationStamp,
    pub is_settled_value_applied: bool,
}

/// One row in the watchlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundQuote {
    pub code: String,
    pub display_name: String,
    pub last_settled_value: Nav,
    pub current_estimated_value: Nav,
    pub estimated_change_percent: Nav,
    pub valuation_stamp: ValuationStamp,
    pub is_settled_value_applied: bool,
    /// User tags only; `All` is added by [`FundQuote::tags`].
    #[serde(rename = "tags", default)]
    pub user_tags: Vec<String>,
    #[serde(default)]
    pub is_starred: bool,
}

impl FundQuote {
    /// A freshly added fund awaiting its first fetch.
    pub fn placeholder(code: &str) -> Self {
        Self {
            code: code.to_string(),
            display_name: LOADING.to_string(),
            last_settled_value: Nav::Loading,
            current_estimated_value: Nav::Loading,
            estimated_change_percent: Nav::Loading,
            valuation_stamp: ValuationStamp::Pending,
            is_settled_value_applied: false,
            user_tags: Vec::new(),
            is_starred: false,
        }
    }

    pub fn from_incoming(incoming: IncomingQuote) -> Self {
        let mut quote = Self::placeholder(&incoming.code);
        quote.apply(incoming);
        quote
    }

    /// Overwrite the quote fields, keeping tags and the starred flag.
    pub fn apply(&mut self, incoming: IncomingQuote) {
        if !incoming.display_name.is_empty() {
            self.display_name = incoming.display_name;
        }
        self.last_settled_value = incoming.last_settled_value;
        self.current_estimated_value = incoming.current_estimated_value;
        self.estimated_change_percent = incoming.estimated_change_percent;
        self.valuation_stamp = incoming.valuation_stamp;
        self.is_settled_value_applied = incoming.is_settled_value_applied;
    }

    /// Tags as seen by readers: `All` first, then the user tags.
    pub fn tags(&self) -> Vec<&str> {
        std::iter::once(ALL_TAG)
            .chain(self.user_tags.iter().map(String::as_str))
            .collect()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        tag == ALL_TAG || self.user_tags.iter().any(|t| t == tag)
    }

    /// Trim tag names and drop blanks, built-in names and duplicates.
    pub fn normalize_tags(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.user_tags = std::mem::take(&mut self.user_tags)
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && !is_reserved(t) && seen.insert(t.clone()))
            .collect();
    }

    pub fn is_up(&self) -> bool {
        self.estimated_change_percent
            .value()
            .is_some_and(|v| v >= Decimal::ZERO)
    }
}
