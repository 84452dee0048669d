//! Upstream market data feeds.
//!
//! Every fetch is a single attempt. `Ok(None)` means the upstream answered
//! but has nothing for that code (a new fund without an estimate, say).

use async_trait::async_trait;

use crate::domain::calendar::HolidayTable;
use crate::domain::detail::{HoldingsReport, NavPoint, NavRange};
use crate::domain::error::FundwatchError;
use crate::domain::indices::IndexQuote;
use crate::domain::quote::{EstimateQuote, SettlementQuote};
use crate::domain::search::FundSearchHit;

#[async_trait]
pub trait EstimateFeed: Send + Sync {
    async fn fetch_estimate(&self, code: &str) -> Result<Option<EstimateQuote>, FundwatchError>;
}

#[async_trait]
pub trait SettlementFeed: Send + Sync {
    async fn fetch_settlement(&self, code: &str)
    -> Result<Option<SettlementQuote>, FundwatchError>;
}

#[async_trait]
pub trait HolidayFeed: Send + Sync {
    async fn fetch_holidays(&self) -> Result<HolidayTable, FundwatchError>;
}

#[async_trait]
pub trait FundSearch: Send + Sync {
    async fn search(&self, key: &str) -> Result<Vec<FundSearchHit>, FundwatchError>;
}

#[async_trait]
pub trait IndexFeed: Send + Sync {
    /// Quotes for East Money `secid`s such as `1.000001`.
    async fn fetch_indices(&self, secids: &[String]) -> Result<Vec<IndexQuote>, FundwatchError>;
}

#[async_trait]
pub trait FundDetailFeed: Send + Sync {
    async fn fetch_nav_history(
        &self,
        code: &str,
        range: NavRange,
    ) -> Result<Vec<NavPoint>, FundwatchError>;

    /// Latest disclosed stock holdings, without live quotes.
    async fn fetch_holdings(&self, code: &str) -> Result<HoldingsReport, FundwatchError>;
}
