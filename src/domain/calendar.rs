//! A-share trading calendar and market status.
//!
//! All checks run on Beijing wall clock time (UTC+8). Trading windows are
//! half-open: `[09:30, 11:30)` and `[13:00, 15:00)`.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::ports::feed_port::HolidayFeed;

pub const BEIJING_OFFSET_SECS: i32 = 8 * 3600;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct HolidayEntry {
    pub holiday: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Holiday table keyed by four digit year, then `"MM-DD"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct HolidayTable {
    pub years: HashMap<String, HashMap<String, HolidayEntry>>,
}

impl HolidayTable {
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        let year = format!("{:04}", date.year());
        let day = date.format("%m-%d").to_string();
        self.years
            .get(&year)
            .and_then(|days| days.get(&day))
            .is_some_and(|entry| entry.holiday)
    }

    pub fn insert(&mut self, date: NaiveDate, entry: HolidayEntry) {
        self.years
            .entry(format!("{:04}", date.year()))
            .or_default()
            .insert(date.format("%m-%d").to_string(), entry);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarketState {
    Open,
    LunchBreak,
    NonTradingTime,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Orange,
    Red,
}

impl MarketState {
    pub fn color(&self) -> StatusColor {
        match self {
            MarketState::Open => StatusColor::Green,
            MarketState::LunchBreak | MarketState::NonTradingTime => StatusColor::Orange,
            MarketState::Closed => StatusColor::Red,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MarketState::Open => "open",
            MarketState::LunchBreak => "lunch-break",
            MarketState::NonTradingTime => "non-trading-time",
            MarketState::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketStatus {
    pub state: MarketState,
    pub color: StatusColor,
    pub is_trading_day: bool,
    pub is_trading_time: bool,
    /// Beijing wall clock time the status was computed for.
    pub current_time: NaiveDateTime,
    /// False when the holiday table was unavailable and only weekends were checked.
    pub holidays_checked: bool,
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

pub fn morning_open() -> NaiveTime {
    hm(9, 30)
}

pub fn morning_close() -> NaiveTime {
    hm(11, 30)
}

pub fn afternoon_open() -> NaiveTime {
    hm(13, 0)
}

pub fn afternoon_close() -> NaiveTime {
    hm(15, 0)
}

pub fn to_beijing(now: DateTime<Utc>) -> NaiveDateTime {
    match FixedOffset::east_opt(BEIJING_OFFSET_SECS) {
        Some(offset) => now.with_timezone(&offset).naive_local(),
        None => now.naive_utc(),
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Weekends are never trading days; without a table every weekday trades.
pub fn is_trading_day(date: NaiveDate, holidays: Option<&HolidayTable>) -> bool {
    if is_weekend(date) {
        return false;
    }
    !holidays.is_some_and(|table| table.is_holiday(date))
}

pub fn is_trading_time(time: NaiveTime) -> bool {
    (time >= morning_open() && time < morning_close())
        || (time >= afternoon_open() && time < afternoon_close())
}

pub fn is_lunch_break(time: NaiveTime) -> bool {
    time >= morning_close() && time < afternoon_open()
}

/// Market status for a Beijing wall clock instant.
pub fn market_status_at(local: NaiveDateTime, holidays: Option<&HolidayTable>) -> MarketStatus {
    let trading_day = is_trading_day(local.date(), holidays);
    let in_window = trading_day && is_trading_time(local.time());

    let state = if !trading_day {
        MarketState::Closed
    } else if in_window {
        MarketState::Open
    } else if is_lunch_break(local.time()) {
        MarketState::LunchBreak
    } else {
        MarketState::NonTradingTime
    };

    MarketStatus {
        state,
        color: state.color(),
        is_trading_day: trading_day,
        is_trading_time: in_window,
        current_time: local,
        holidays_checked: holidays.is_some(),
    }
}

pub fn market_status(now: DateTime<Utc>, holidays: Option<&HolidayTable>) -> MarketStatus {
    market_status_at(to_beijing(now), holidays)
}

/// Status at `now`, checking weekends only when the holiday table fails.
pub async fn current_status(holidays: &dyn HolidayFeed, now: DateTime<Utc>) -> MarketStatus {
    let table = match holidays.fetch_holidays().await {
        Ok(table) => Some(table),
        Err(e) => {
            warn!(error = %e, "holiday table unavailable, checking weekends only");
            None
        }
    };
    market_status(now, table.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn at(date: NaiveDate, h: u32, min: u32) -> NaiveDateTime {
        date.and_hms_opt(h, min, 0).unwrap()
    }

    fn table_with(date: NaiveDate, holiday: bool) -> HolidayTable {
        let mut table = HolidayTable::default();
        table.insert(
            date,
            HolidayEntry {
                holiday,
                name: Some("Dragon Boat".into()),
            },
        );
        table
    }

    #[test]
    fn weekday_without_table_is_trading_day() {
        // 2024-06-11 is a Tuesday
        assert!(is_trading_day(d(2024, 6, 11), None));
    }

    #[test]
    fn holiday_on_weekday_is_not_trading_day() {
        let table = table_with(d(2024, 6, 10), true);
        assert!(!is_trading_day(d(2024, 6, 10), Some(&table)));
        assert!(is_trading_day(d(2024, 6, 11), Some(&table)));
    }

    #[test]
    fn table_entry_marked_workday_does_not_block() {
        let table = table_with(d(2024, 6, 10), false);
        assert!(is_trading_day(d(2024, 6, 10), Some(&table)));
    }

    #[test]
    fn window_boundaries_are_half_open() {
        assert!(!is_trading_time(hm(9, 29)));
        assert!(is_trading_time(hm(9, 30)));
        assert!(is_trading_time(hm(11, 29)));
        assert!(!is_trading_time(hm(11, 30)));
        assert!(!is_trading_time(hm(12, 59)));
        assert!(is_trading_time(hm(13, 0)));
        assert!(!is_trading_time(hm(15, 0)));
    }

    #[test]
    fn status_states() {
        let tue = d(2024, 6, 11);
        assert_eq!(market_status_at(at(tue, 9, 30), None).state, MarketState::Open);
        assert_eq!(market_status_at(at(tue, 11, 30), None).state, MarketState::LunchBreak);
        assert_eq!(market_status_at(at(tue, 13, 0), None).state, MarketState::Open);
        assert_eq!(
            market_status_at(at(tue, 15, 0), None).state,
            MarketState::NonTradingTime
        );
        assert_eq!(
            market_status_at(at(tue, 8, 0), None).state,
            MarketState::NonTradingTime
        );
        let sat = d(2024, 6, 15);
        let status = market_status_at(at(sat, 10, 0), None);
        assert_eq!(status.state, MarketState::Closed);
        assert_eq!(status.color, StatusColor::Red);
        assert!(!status.is_trading_time);
    }

    #[test]
    fn utc_instant_is_shifted_to_beijing() {
        // 01:45 UTC on a Tuesday is 09:45 in Beijing.
        let now = Utc.with_ymd_and_hms(2024, 6, 11, 1, 45, 0).unwrap();
        let status = market_status(now, None);
        assert_eq!(status.state, MarketState::Open);
        assert_eq!(status.current_time, at(d(2024, 6, 11), 9, 45));
        assert!(!status.holidays_checked);
    }

    #[test]
    fn table_deserializes_from_year_map() {
        let json = r#"{"2024": {"06-10": {"holiday": true, "name": "端午节"}, "06-11": {"holiday": false}}}"#;
        let table: HolidayTable = serde_json::from_str(json).unwrap();
        assert!(table.is_holiday(d(2024, 6, 10)));
        assert!(!table.is_holiday(d(2024, 6, 11)));
        assert!(!table.is_holiday(d(2025, 6, 10)));
    }
}
