#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use fundwatch::adapters::memory_store_adapter::MemoryStoreAdapter;
use fundwatch::domain::calendar::{HolidayEntry, HolidayTable};
use fundwatch::domain::error::FundwatchError;
use fundwatch::domain::indices::IndexQuote;
use fundwatch::domain::quote::{EstimateQuote, SettlementQuote};
use fundwatch::domain::refresh::QuoteFeeds;
use fundwatch::domain::session::WatchlistSession;
use fundwatch::ports::feed_port::{EstimateFeed, HolidayFeed, IndexFeed, SettlementFeed};
use fundwatch::ports::store_port::KvStore;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

pub fn make_estimate(code: &str, value: Decimal, as_of: &str) -> EstimateQuote {
    EstimateQuote {
        code: code.to_string(),
        name: format!("Fund {code}"),
        value,
        change_percent: Decimal::new(150, 2),
        as_of: datetime(as_of),
        last_settled: Some(Decimal::new(125, 2)),
        last_settled_date: None,
    }
}

pub fn make_settlement(code: &str, value: Decimal, as_of: &str) -> SettlementQuote {
    SettlementQuote {
        code: code.to_string(),
        name: format!("Fund {code}"),
        value,
        change_percent: Some(Decimal::new(-30, 2)),
        as_of_date: date(as_of),
    }
}

/// Canned answers per code; codes in `errors` fail, everything else is absent.
#[derive(Default)]
pub struct MockEstimateFeed {
    pub quotes: HashMap<String, EstimateQuote>,
    pub errors: HashMap<String, String>,
    pub calls: AtomicUsize,
}

impl MockEstimateFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, quote: EstimateQuote) -> Self {
        self.quotes.insert(quote.code.clone(), quote);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

#[async_trait]
impl EstimateFeed for MockEstimateFeed {
    async fn fetch_estimate(&self, code: &str) -> Result<Option<EstimateQuote>, FundwatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.errors.get(code) {
            return Err(FundwatchError::http("mock://estimate", reason));
        }
        Ok(self.quotes.get(code).cloned())
    }
}

#[derive(Default)]
pub struct MockSettlementFeed {
    pub quotes: HashMap<String, SettlementQuote>,
    pub errors: HashMap<String, String>,
}

impl MockSettlementFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, quote: SettlementQuote) -> Self {
        self.quotes.insert(quote.code.clone(), quote);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

#[async_trait]
impl SettlementFeed for MockSettlementFeed {
    async fn fetch_settlement(&self, code: &str) -> Result<Option<SettlementQuote>, FundwatchError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(FundwatchError::http("mock://settlement", reason));
        }
        Ok(self.quotes.get(code).cloned())
    }
}

pub fn feeds(estimate: MockEstimateFeed, settlement: MockSettlementFeed) -> QuoteFeeds {
    QuoteFeeds {
        estimate: Arc::new(estimate),
        settlement: Arc::new(settlement),
    }
}

pub struct MockHolidayFeed {
    pub table: Option<HolidayTable>,
}

impl MockHolidayFeed {
    pub fn with_holidays(days: &[&str]) -> Self {
        let mut table = HolidayTable::default();
        for day in days {
            table.insert(
                date(day),
                HolidayEntry {
                    holiday: true,
                    name: None,
                },
            );
        }
        Self { table: Some(table) }
    }

    pub fn failing() -> Self {
        Self { table: None }
    }
}

#[async_trait]
impl HolidayFeed for MockHolidayFeed {
    async fn fetch_holidays(&self) -> Result<HolidayTable, FundwatchError> {
        self.table
            .clone()
            .ok_or_else(|| FundwatchError::http("mock://holidays", "unreachable"))
    }
}

/// Answers every secid with a fixed price and counts requests.
#[derive(Default)]
pub struct MockIndexFeed {
    pub calls: AtomicUsize,
}

#[async_trait]
impl IndexFeed for MockIndexFeed {
    async fn fetch_indices(&self, secids: &[String]) -> Result<Vec<IndexQuote>, FundwatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(secids
            .iter()
            .map(|secid| IndexQuote {
                code: secid.clone(),
                name: format!("Index {secid}"),
                price: Some(Decimal::new(312525, 2)),
                change: Some(Decimal::new(1402, 2)),
                change_percent: Some(Decimal::new(45, 2)),
            })
            .collect())
    }
}

pub fn memory_store() -> Arc<dyn KvStore> {
    Arc::new(MemoryStoreAdapter::new())
}

pub fn memory_session(codes: &[&str]) -> WatchlistSession {
    let codes: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
    WatchlistSession::open(memory_store(), &codes).unwrap()
}
