//! Per-fund detail: NAV history over a range and the top stock holdings.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::domain::error::FundwatchError;
use crate::domain::fund_code::validate_code;
use crate::ports::feed_port::{FundDetailFeed, IndexFeed};

pub const MAX_HOLDINGS: usize = 10;

/// History window, named the way the CLI takes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavRange {
    #[default]
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    ThreeYears,
    FiveYears,
}

impl NavRange {
    /// Value of the upstream `RANGE` parameter.
    pub fn as_param(self) -> &'static str {
        match self {
            NavRange::OneMonth => "y",
            NavRange::ThreeMonths => "3y",
            NavRange::SixMonths => "6y",
            NavRange::OneYear => "n",
            NavRange::ThreeYears => "3n",
            NavRange::FiveYears => "5n",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NavRange::OneMonth => "1m",
            NavRange::ThreeMonths => "3m",
            NavRange::SixMonths => "6m",
            NavRange::OneYear => "1y",
            NavRange::ThreeYears => "3y",
            NavRange::FiveYears => "5y",
        }
    }
}

impl FromStr for NavRange {
    type Err = FundwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1m" => Ok(NavRange::OneMonth),
            "3m" => Ok(NavRange::ThreeMonths),
            "6m" => Ok(NavRange::SixMonths),
            "1y" => Ok(NavRange::OneYear),
            "3y" => Ok(NavRange::ThreeYears),
            "5y" => Ok(NavRange::FiveYears),
            _ => Err(FundwatchError::UnknownRange(s.to_string())),
        }
    }
}

impl fmt::Display for NavRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub nav: Decimal,
    /// Accumulated NAV, dividends included.
    pub accumulated: Option<Decimal>,
    pub change_percent: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Holding {
    pub stock_code: String,
    pub stock_name: String,
    /// Percent of net assets.
    pub weight: Option<Decimal>,
    pub price: Option<Decimal>,
    pub change_percent: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoldingsReport {
    /// Disclosure date as the upstream reports it.
    pub as_of: Option<String>,
    pub holdings: Vec<Holding>,
    /// False when the live stock quotes could not be fetched.
    pub quotes_live: bool,
}

/// Market prefix for a stock code: Shanghai `1`, Shenzhen and Beijing `0`,
/// five-digit Hong Kong codes `116`.
pub fn stock_secid(stock_code: &str) -> String {
    let prefix = if stock_code.len() == 5 {
        "116"
    } else if stock_code.starts_with('6') || stock_code.starts_with('9') {
        "1"
    } else {
        "0"
    };
    format!("{prefix}.{stock_code}")
}

/// NAV history in ascending date order with duplicate dates dropped.
pub async fn load_nav_history(
    feed: &dyn FundDetailFeed,
    code: &str,
    range: NavRange,
) -> Result<Vec<NavPoint>, FundwatchError> {
    let code = validate_code(code)?;
    let mut points = feed.fetch_nav_history(&code, range).await?;
    points.sort_by_key(|p| p.date);
    points.dedup_by_key(|p| p.date);
    Ok(points)
}

/// Top holdings, filled with live stock quotes when those can be fetched.
pub async fn load_holdings(
    feed: &dyn FundDetailFeed,
    quotes: &dyn IndexFeed,
    code: &str,
) -> Result<HoldingsReport, FundwatchError> {
    let code = validate_code(code)?;
    let mut report = feed.fetch_holdings(&code).await?;
    report.holdings.truncate(MAX_HOLDINGS);
    report.quotes_live = false;
    if report.holdings.is_empty() {
        return Ok(report);
    }

    let secids: Vec<String> = report
        .holdings
        .iter()
        .map(|h| stock_secid(&h.stock_code))
        .collect();
    match quotes.fetch_indices(&secids).await {
        Ok(live) => {
            let by_secid: HashMap<_, _> = live.into_iter().map(|q| (q.code.clone(), q)).collect();
            for (holding, secid) in report.holdings.iter_mut().zip(&secids) {
                if let Some(quote) = by_secid.get(secid) {
                    holding.price = quote.price;
                    holding.change_percent = quote.change_percent;
                }
            }
            report.quotes_live = true;
        }
        Err(e) => warn!(code = %code, error = %e, "stock quotes unavailable, showing weights only"),
    }
    Ok(report)
}
