//! Typed settings read from the config port, validated before use.

use crate::domain::error::FundwatchError;
use crate::domain::fund_code::parse_codes;
use crate::domain::indices::{DEFAULT_INDEX_CODES, parse_index_codes};
use crate::ports::config_port::ConfigPort;
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_STORE_PATH: &str = "fundwatch.db";
pub const DEFAULT_POOL_SIZE: i64 = 4;
pub const DEFAULT_ESTIMATE_URL: &str = "http://fundgz.1234567.com.cn/js";
pub const DEFAULT_SETTLEMENT_URL: &str = "https://fundmobapi.eastmoney.com/FundMNewApi/FundMNFInfo";
pub const DEFAULT_HOLIDAY_URL: &str = "http://x2rr.github.io/funds/holiday.json";
pub const DEFAULT_SEARCH_URL: &str =
    "https://fundsuggest.eastmoney.com/FundSearch/api/FundSearchAPI.ashx";
pub const DEFAULT_INDEX_URL: &str = "https://push2.eastmoney.com/api/qt/ulist.np/get";
pub const DEFAULT_DETAIL_URL: &str = "https://fundmobapi.eastmoney.com/FundMApi";
pub const DEFAULT_TIMEOUT_SECS: i64 = 10;
pub const DEFAULT_INTERVAL_SECS: i64 = 60;
pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub path: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSettings {
    pub estimate_url: String,
    pub settlement_url: String,
    pub holiday_url: String,
    pub search_url: String,
    pub index_url: String,
    pub detail_url: String,
    pub timeout: Duration,
    pub device_id: Option<String>,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            estimate_url: DEFAULT_ESTIMATE_URL.to_string(),
            settlement_url: DEFAULT_SETTLEMENT_URL.to_string(),
            holiday_url: DEFAULT_HOLIDAY_URL.to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            index_url: DEFAULT_INDEX_URL.to_string(),
            detail_url: DEFAULT_DETAIL_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS as u64),
            device_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub auto_refresh: bool,
    pub interval: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS as u64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub store: StoreSettings,
    pub feeds: FeedSettings,
    pub refresh: RefreshPolicy,
    pub seed_codes: Vec<String>,
    pub index_codes: Vec<String>,
    pub listen: String,
}

impl Settings {
    /// Read and validate every section; missing keys fall back to defaults.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, FundwatchError> {
        Ok(Self {
            store: store_settings(config)?,
            feeds: feed_settings(config)?,
            refresh: refresh_policy(config)?,
            seed_codes: seed_codes(config)?,
            index_codes: index_codes(config)?,
            listen: non_blank(config, "web", "listen").unwrap_or_else(|| DEFAULT_LISTEN.into()),
        })
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> FundwatchError {
    FundwatchError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn non_blank(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn positive_secs(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<Duration, FundwatchError> {
    let value = config.get_int(section, key, default);
    if value <= 0 {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    Ok(Duration::from_secs(value as u64))
}

fn store_settings(config: &dyn ConfigPort) -> Result<StoreSettings, FundwatchError> {
    let pool_size = config.get_int("store", "pool_size", DEFAULT_POOL_SIZE);
    if !(1..=64).contains(&pool_size) {
        return Err(invalid("store", "pool_size", "pool_size must be between 1 and 64"));
    }
    Ok(StoreSettings {
        path: non_blank(config, "store", "path").unwrap_or_else(|| DEFAULT_STORE_PATH.into()),
        pool_size: pool_size as u32,
    })
}

fn url(config: &dyn ConfigPort, key: &str, default: &str) -> Result<String, FundwatchError> {
    let value = non_blank(config, "feeds", key).unwrap_or_else(|| default.to_string());
    let parsed = Url::parse(&value).map_err(|e| invalid("feeds", key, e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("feeds", key, "expected an http:// or https:// URL"));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("feeds", key, "URL has no host"));
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn feed_settings(config: &dyn ConfigPort) -> Result<FeedSettings, FundwatchError> {
    Ok(FeedSettings {
        estimate_url: url(config, "estimate_url", DEFAULT_ESTIMATE_URL)?,
        settlement_url: url(config, "settlement_url", DEFAULT_SETTLEMENT_URL)?,
        holiday_url: url(config, "holiday_url", DEFAULT_HOLIDAY_URL)?,
        search_url: url(config, "search_url", DEFAULT_SEARCH_URL)?,
        index_url: url(config, "index_url", DEFAULT_INDEX_URL)?,
        detail_url: url(config, "detail_url", DEFAULT_DETAIL_URL)?,
        timeout: positive_secs(config, "feeds", "timeout_secs", DEFAULT_TIMEOUT_SECS)?,
        device_id: non_blank(config, "feeds", "device_id"),
    })
}

fn refresh_policy(config: &dyn ConfigPort) -> Result<RefreshPolicy, FundwatchError> {
    Ok(RefreshPolicy {
        auto_refresh: config.get_bool("refresh", "auto_refresh", true),
        interval: positive_secs(config, "refresh", "interval_secs", DEFAULT_INTERVAL_SECS)?,
    })
}

fn seed_codes(config: &dyn ConfigPort) -> Result<Vec<String>, FundwatchError> {
    match non_blank(config, "watchlist", "seed_codes") {
        None => Ok(Vec::new()),
        Some(raw) => parse_codes(&raw).map_err(|e| invalid("watchlist", "seed_codes", e.to_string())),
    }
}

fn index_codes(config: &dyn ConfigPort) -> Result<Vec<String>, FundwatchError> {
    match non_blank(config, "indices", "codes") {
        None => Ok(DEFAULT_INDEX_CODES.iter().map(|c| c.to_string()).collect()),
        Some(raw) => parse_index_codes(&raw),
    }
}
