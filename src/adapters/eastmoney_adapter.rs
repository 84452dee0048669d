//! East Money / Tiantian fund HTTP feeds.
//!
//! Each feed takes its base URL from the `[feeds]` settings so tests can
//! point it at a local server.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rand::Rng;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, ORIGIN, REFERER};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::domain::detail::{Holding, HoldingsReport, NavPoint, NavRange};
use crate::domain::error::FundwatchError;
use crate::domain::indices::IndexQuote;
use crate::domain::quote::{EstimateQuote, SettlementQuote};
use crate::domain::search::FundSearchHit;
use crate::ports::feed_port::{EstimateFeed, FundDetailFeed, FundSearch, IndexFeed, SettlementFeed};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

pub fn build_client(timeout: Duration) -> Result<reqwest::Client, FundwatchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );
    headers.insert(REFERER, HeaderValue::from_static("https://fund.eastmoney.com/"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://fund.eastmoney.com"));

    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()
        .map_err(|e| FundwatchError::http("client", e))
}

/// Random id in the `xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx` layout.
pub fn generate_device_id() -> String {
    let mut rng = rand::thread_rng();
    "xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx"
        .chars()
        .map(|c| match c {
            'x' => char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'),
            'y' => char::from_digit(rng.gen_range(8..12), 16).unwrap_or('8'),
            other => other,
        })
        .collect()
}

async fn get_text(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<String, FundwatchError> {
    debug!(url, "GET");
    client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| FundwatchError::http(url, e))?
        .error_for_status()
        .map_err(|e| FundwatchError::http(url, e))?
        .text()
        .await
        .map_err(|e| FundwatchError::http(url, e))
}

async fn get_json(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
    source_name: &str,
) -> Result<Value, FundwatchError> {
    let text = get_text(client, url, query).await?;
    serde_json::from_str(&text).map_err(|e| FundwatchError::payload(source_name, e.to_string()))
}

/// Body of `jsonpgz(...)`, or `None` for an empty call.
fn extract_jsonpgz_payload(text: &str) -> Option<&str> {
    let text = text.trim();
    let start = text.find("jsonpgz(")? + "jsonpgz(".len();
    let tail = text[start..].trim_end();
    let tail = tail.strip_suffix(';').unwrap_or(tail).trim_end();
    let end = tail.rfind(')')?;
    let payload = tail[..end].trim();
    if payload.is_empty() { None } else { Some(payload) }
}

/// Numbers arrive as strings, numbers or placeholders such as `"--"`.
fn decimal_field(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.chars().all(|c| c == '-') {
                None
            } else {
                Decimal::from_str_exact(s).ok()
            }
        }
        Value::Number(n) => Decimal::from_str_exact(&n.to_string()).ok(),
        _ => None,
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct FundGzPayload {
    #[serde(default)]
    fundcode: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    jzrq: String,
    #[serde(default)]
    dwjz: String,
    #[serde(default)]
    gsz: String,
    #[serde(default)]
    gszzl: String,
    #[serde(default)]
    gztime: String,
}

fn parse_estimate(code: &str, text: &str) -> Result<Option<EstimateQuote>, FundwatchError> {
    const SOURCE: &str = "estimate feed";
    let Some(json) = extract_jsonpgz_payload(text) else {
        return Ok(None);
    };
    let raw: FundGzPayload =
        serde_json::from_str(json).map_err(|e| FundwatchError::payload(SOURCE, e.to_string()))?;
    if raw.gsz.trim().is_empty() || raw.gztime.trim().is_empty() {
        return Ok(None);
    }
    if !raw.fundcode.is_empty() && raw.fundcode != code {
        return Err(FundwatchError::payload(
            SOURCE,
            format!("asked for {code}, got {}", raw.fundcode),
        ));
    }

    let value = Decimal::from_str_exact(raw.gsz.trim())
        .map_err(|e| FundwatchError::payload(SOURCE, format!("gsz: {e}")))?;
    let change_percent = Decimal::from_str_exact(raw.gszzl.trim())
        .map_err(|e| FundwatchError::payload(SOURCE, format!("gszzl: {e}")))?;
    let as_of = NaiveDateTime::parse_from_str(raw.gztime.trim(), "%Y-%m-%d %H:%M")
        .map_err(|e| FundwatchError::payload(SOURCE, format!("gztime: {e}")))?;

    Ok(Some(EstimateQuote {
        code: code.to_string(),
        name: raw.name.trim().to_string(),
        value,
        change_percent,
        as_of,
        last_settled: Decimal::from_str_exact(raw.dwjz.trim()).ok(),
        last_settled_date: NaiveDate::parse_from_str(raw.jzrq.trim(), "%Y-%m-%d").ok(),
    }))
}

pub struct EastmoneyEstimateFeed {
    client: reqwest::Client,
    base_url: String,
}

impl EastmoneyEstimateFeed {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EstimateFeed for EastmoneyEstimateFeed {
    async fn fetch_estimate(&self, code: &str) -> Result<Option<EstimateQuote>, FundwatchError> {
        let url = format!("{}/{code}.js", self.base_url);
        let text = get_text(&self.client, &url, &[]).await?;
        parse_estimate(code, &text)
    }
}

/// Mobile API bodies carry `ErrCode`; anything but zero is a failure.
fn check_err_code(source_name: &str, body: &Value) -> Result<(), FundwatchError> {
    let err_code = body.get("ErrCode").and_then(Value::as_i64).unwrap_or(0);
    if err_code != 0 {
        let msg = string_field(body.get("ErrMsg")).unwrap_or_default();
        return Err(FundwatchError::payload(
            source_name,
            format!("ErrCode {err_code} {msg}"),
        ));
    }
    Ok(())
}

fn parse_settlement(code: &str, body: &Value) -> Result<Option<SettlementQuote>, FundwatchError> {
    check_err_code("settlement feed", body)?;
    let Some(rows) = body.get("Datas").and_then(Value::as_array) else {
        return Ok(None);
    };
    let Some(row) = rows
        .iter()
        .find(|r| string_field(r.get("FCODE")).as_deref() == Some(code))
    else {
        return Ok(None);
    };

    let value = decimal_field(row.get("NAV"));
    let date = string_field(row.get("PDATE"))
        .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok());
    let (Some(value), Some(as_of_date)) = (value, date) else {
        return Ok(None);
    };

    Ok(Some(SettlementQuote {
        code: code.to_string(),
        name: string_field(row.get("SHORTNAME")).unwrap_or_default(),
        value,
        change_percent: decimal_field(row.get("NAVCHGRT")),
        as_of_date,
    }))
}

pub struct EastmoneySettlementFeed {
    client: reqwest::Client,
    url: String,
    device_id: String,
}

impl EastmoneySettlementFeed {
    pub fn new(client: reqwest::Client, url: &str, device_id: Option<String>) -> Self {
        Self {
            client,
            url: url.to_string(),
            device_id: device_id.unwrap_or_else(generate_device_id),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

#[async_trait]
impl SettlementFeed for EastmoneySettlementFeed {
    async fn fetch_settlement(&self, code: &str) -> Result<Option<SettlementQuote>, FundwatchError> {
        let query = [
            ("pageIndex", "1"),
            ("pageSize", "200"),
            ("plat", "Android"),
            ("appType", "ttjj"),
            ("product", "EFund"),
            ("Version", "1"),
            ("deviceid", self.device_id.as_str()),
            ("Fcodes", code),
        ];
        let body = get_json(&self.client, &self.url, &query, "settlement feed").await?;
        parse_settlement(code, &body)
    }
}

fn parse_search(body: &Value) -> Vec<FundSearchHit> {
    body.get("Datas")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    Some(FundSearchHit {
                        code: string_field(row.get("CODE"))?,
                        name: string_field(row.get("NAME"))?,
                        category: string_field(row.get("CATEGORYDESC")),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

pub struct EastmoneySearch {
    client: reqwest::Client,
    url: String,
}

impl EastmoneySearch {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl FundSearch for EastmoneySearch {
    async fn search(&self, key: &str) -> Result<Vec<FundSearchHit>, FundwatchError> {
        let body = get_json(&self.client, &self.url, &[("m", "9"), ("key", key)], "fund search")
            .await?;
        Ok(parse_search(&body))
    }
}

fn parse_indices(body: &Value) -> Vec<IndexQuote> {
    let Some(rows) = body
        .get("data")
        .and_then(|d| d.get("diff"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| {
            let market = string_field(row.get("f13"))?;
            let symbol = string_field(row.get("f12"))?;
            Some(IndexQuote {
                code: format!("{market}.{symbol}"),
                name: string_field(row.get("f14")).unwrap_or_default(),
                price: decimal_field(row.get("f2")),
                change: decimal_field(row.get("f4")),
                change_percent: decimal_field(row.get("f3")),
            })
        })
        .collect()
}

pub struct EastmoneyIndexFeed {
    client: reqwest::Client,
    url: String,
}

impl EastmoneyIndexFeed {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl IndexFeed for EastmoneyIndexFeed {
    async fn fetch_indices(&self, secids: &[String]) -> Result<Vec<IndexQuote>, FundwatchError> {
        if secids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = secids.join(",");
        let query = [
            ("fltt", "2"),
            ("fields", "f2,f3,f4,f12,f13,f14"),
            ("secids", joined.as_str()),
        ];
        let body = get_json(&self.client, &self.url, &query, "index feed").await?;
        Ok(parse_indices(&body))
    }
}

fn parse_nav_history(body: &Value) -> Result<Vec<NavPoint>, FundwatchError> {
    check_err_code("NAV history", body)?;
    let Some(rows) = body.get("Datas").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    Ok(rows
        .iter()
        .filter_map(|row| {
            let date = string_field(row.get("PDATE")).or_else(|| string_field(row.get("FSRQ")))?;
            Some(NavPoint {
                date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()?,
                nav: decimal_field(row.get("DWJZ"))?,
                accumulated: decimal_field(row.get("LJJZ")),
                change_percent: decimal_field(row.get("JZZZL")),
            })
        })
        .collect())
}

fn parse_holdings(body: &Value) -> Result<HoldingsReport, FundwatchError> {
    check_err_code("holdings", body)?;
    let datas = body.get("Datas");
    let rows = datas
        .and_then(Value::as_array)
        .or_else(|| datas.and_then(|d| d.get("fundStocks")).and_then(Value::as_array));
    let holdings = rows
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    Some(Holding {
                        stock_code: string_field(row.get("GPDM"))?,
                        stock_name: string_field(row.get("GPJC")).unwrap_or_default(),
                        weight: decimal_field(row.get("JZBL")),
                        price: None,
                        change_percent: None,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(HoldingsReport {
        as_of: string_field(body.get("Expansion")),
        holdings,
        quotes_live: false,
    })
}

/// NAV history and holdings from the fund mobile API.
pub struct EastmoneyDetailFeed {
    client: reqwest::Client,
    base_url: String,
}

impl EastmoneyDetailFeed {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

const MOBILE_QUERY: [(&str, &str); 4] = [
    ("deviceid", "Wap"),
    ("plat", "Wap"),
    ("product", "EFund"),
    ("version", "2.0.0"),
];

#[async_trait]
impl FundDetailFeed for EastmoneyDetailFeed {
    async fn fetch_nav_history(
        &self,
        code: &str,
        range: NavRange,
    ) -> Result<Vec<NavPoint>, FundwatchError> {
        let url = format!("{}/FundNetDiagram.ashx", self.base_url);
        let mut query = vec![("FCODE", code), ("RANGE", range.as_param())];
        query.extend(MOBILE_QUERY);
        let body = get_json(&self.client, &url, &query, "NAV history").await?;
        parse_nav_history(&body)
    }

    async fn fetch_holdings(&self, code: &str) -> Result<HoldingsReport, FundwatchError> {
        let url = format!("{}/FundMNPeriodIncrease.ashx", self.base_url);
        let mut query = vec![("FCODE", code)];
        query.extend(MOBILE_QUERY);
        let body = get_json(&self.client, &url, &query, "holdings").await?;
        parse_holdings(&body)
    }
}
