//! Holiday table over HTTP.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::domain::calendar::HolidayTable;
use crate::domain::error::FundwatchError;
use crate::ports::feed_port::HolidayFeed;

const SOURCE: &str = "holiday feed";

/// Accepts the year table itself or the same table wrapped in `data`.
pub fn parse_holiday_table(body: Value) -> Result<HolidayTable, FundwatchError> {
    let table = match body {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => map
            .remove("data")
            .unwrap_or(Value::Null),
        other => other,
    };
    serde_json::from_value(table).map_err(|e| FundwatchError::payload(SOURCE, e.to_string()))
}

pub struct HttpHolidayFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpHolidayFeed {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl HolidayFeed for HttpHolidayFeed {
    async fn fetch_holidays(&self) -> Result<HolidayTable, FundwatchError> {
        let body: Value = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FundwatchError::http(&self.url, e))?
            .error_for_status()
            .map_err(|e| FundwatchError::http(&self.url, e))?
            .json()
            .await
            .map_err(|e| FundwatchError::payload(SOURCE, e.to_string()))?;
        let table = parse_holiday_table(body)?;
        debug!(years = table.years.len(), "holiday table loaded");
        Ok(table)
    }
}
