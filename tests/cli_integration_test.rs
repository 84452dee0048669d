//! CLI orchestration tests: settings files on disk, store opening and the
//! market status lookup.

mod common;

use common::*;
use fundwatch::cli::{self, Cli, Command};
use chrono::Utc;
use fundwatch::domain::calendar::{MarketState, current_status, to_beijing};
use fundwatch::domain::error::FundwatchError;
use std::io::Write;
use std::time::Duration;

use clap::Parser;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[store]
path = /tmp/fundwatch-test.db
pool_size = 2

[feeds]
estimate_url = http://127.0.0.1:8080/js/
timeout_secs = 3
device_id = 0d3f9c2a-1b2c-4d5e-8f90-abcdefabcdef

[refresh]
auto_refresh = off
interval_secs = 30

[watchlist]
seed_codes = 001618, 005827

[indices]
codes = sh000001,hkHSI

[web]
listen = 0.0.0.0:8088
"#;

#[test]
fn settings_load_from_ini_file() {
    let file = write_temp_ini(VALID_INI);
    let settings = cli::load_settings(Some(file.path())).unwrap();

    assert_eq!(settings.store.path, "/tmp/fundwatch-test.db");
    assert_eq!(settings.store.pool_size, 2);
    assert_eq!(settings.feeds.estimate_url, "http://127.0.0.1:8080/js");
    assert_eq!(settings.feeds.timeout, Duration::from_secs(3));
    assert_eq!(
        settings.feeds.device_id.as_deref(),
        Some("0d3f9c2a-1b2c-4d5e-8f90-abcdefabcdef")
    );
    assert!(!settings.refresh.auto_refresh);
    assert_eq!(settings.refresh.interval, Duration::from_secs(30));
    assert_eq!(settings.seed_codes, vec!["001618", "005827"]);
    assert_eq!(settings.index_codes, vec!["sh000001", "hkHSI"]);
    assert_eq!(settings.listen, "0.0.0.0:8088");
}

#[test]
fn no_config_file_means_defaults() {
    let settings = cli::load_settings(None).unwrap();
    assert_eq!(settings.store.path, "fundwatch.db");
    assert!(settings.refresh.auto_refresh);
    assert!(settings.seed_codes.is_empty());
}

#[test]
fn bad_seed_code_is_config_error() {
    let file = write_temp_ini("[watchlist]\nseed_codes = 001618, 12345\n");
    let err = cli::load_settings(Some(file.path())).unwrap_err();
    assert!(matches!(
        err,
        FundwatchError::ConfigInvalid { ref section, ref key, .. }
            if section == "watchlist" && key == "seed_codes"
    ));
}

#[test]
fn bad_index_code_is_config_error() {
    let file = write_temp_ini("[indices]\ncodes = sh000001,xx123\n");
    let err = cli::load_settings(Some(file.path())).unwrap_err();
    assert!(matches!(err, FundwatchError::ConfigInvalid { .. }));
}

#[test]
fn zero_interval_is_rejected() {
    let file = write_temp_ini("[refresh]\ninterval_secs = 0\n");
    assert!(cli::load_settings(Some(file.path())).is_err());
}

#[test]
fn global_config_flag_parses_after_subcommand() {
    let cli = Cli::try_parse_from(["fundwatch", "refresh", "--tag", "Tech", "-c", "my.ini"]).unwrap();
    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("my.ini")));
    assert!(matches!(cli.command, Command::Refresh { tag: Some(ref t) } if t == "Tech"));
}

#[cfg(feature = "sqlite")]
#[test]
fn open_store_persists_to_the_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("watch.db");
    let file = write_temp_ini(&format!(
        "[store]\npath = {}\n[watchlist]\nseed_codes = 001618\n",
        db.display()
    ));
    let settings = cli::load_settings(Some(file.path())).unwrap();

    {
        let store = cli::open_store(&settings.store).unwrap();
        let session =
            fundwatch::domain::session::WatchlistSession::open(store, &settings.seed_codes)
                .unwrap();
        assert_eq!(session.watchlist().codes(), vec!["001618"]);
    }
    assert!(db.exists());

    let store = cli::open_store(&settings.store).unwrap();
    assert!(store.get("watchlist").unwrap().is_some());
}

#[tokio::test]
async fn status_falls_back_to_weekends_when_holidays_fail() {
    let status = current_status(&MockHolidayFeed::failing(), Utc::now()).await;
    assert!(!status.holidays_checked);
    assert_eq!(status.color, status.state.color());
    if !status.is_trading_day {
        assert_eq!(status.state, MarketState::Closed);
    }
}

#[tokio::test]
async fn status_uses_holiday_table_when_available() {
    let now = Utc::now();
    let today = to_beijing(now).date();
    let feed = MockHolidayFeed::with_holidays(&[&today.format("%Y-%m-%d").to_string()]);
    let status = current_status(&feed, now).await;
    assert!(status.holidays_checked);
    assert!(!status.is_trading_day);
    assert_eq!(status.state, MarketState::Closed);
}
