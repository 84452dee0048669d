//! Market index quotes with a short-lived cache in the local store.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::error::FundwatchError;
use crate::ports::feed_port::IndexFeed;
use crate::ports::store_port::{INDEX_CACHE_KEY, KvStore};

pub const INDEX_CACHE_TTL_SECS: i64 = 5 * 60;
pub const DEFAULT_INDEX_CODES: [&str; 4] = ["sh000001", "sh000300", "sz399001", "sz399006"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexQuote {
    /// Display code such as `sh000001`; feeds fill in the `secid` instead.
    pub code: String,
    pub name: String,
    pub price: Option<Decimal>,
    pub change: Option<Decimal>,
    pub change_percent: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexCache {
    fetched_at: DateTime<Utc>,
    quotes: Vec<IndexQuote>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSnapshot {
    pub quotes: Vec<IndexQuote>,
    pub from_cache: bool,
}

/// Map a display code to its East Money `secid`.
pub fn to_secid(code: &str) -> Result<String, FundwatchError> {
    let invalid = || FundwatchError::ConfigInvalid {
        section: "indices".into(),
        key: "codes".into(),
        reason: format!("unsupported index code {code:?}"),
    };
    if code.len() <= 2 || !code.is_char_boundary(2) {
        return Err(invalid());
    }
    let (market, symbol) = code.split_at(2);
    let prefix = match market {
        "sh" => "1",
        "sz" => "0",
        "hk" | "us" => "100",
        _ => return Err(invalid()),
    };
    Ok(format!("{prefix}.{symbol}"))
}

pub fn parse_index_codes(input: &str) -> Result<Vec<String>, FundwatchError> {
    let codes: Vec<String> = input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    for code in &codes {
        to_secid(code)?;
    }
    Ok(codes)
}

fn read_cache(store: &dyn KvStore) -> Option<IndexCache> {
    let raw = match store.get(INDEX_CACHE_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(error = %e, "index cache unreadable");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(cache) => Some(cache),
        Err(e) => {
            warn!(error = %e, "index cache corrupt, discarding");
            if let Err(e) = store.remove(INDEX_CACHE_KEY) {
                warn!(error = %e, "failed to discard index cache");
            }
            None
        }
    }
}

fn pick(quotes: &[IndexQuote], codes: &[String]) -> Option<Vec<IndexQuote>> {
    codes
        .iter()
        .map(|c| quotes.iter().find(|q| &q.code == c).cloned())
        .collect()
}

/// Quotes for `codes` in the requested order.
///
/// A cache younger than five minutes that covers every code is served as is
/// unless `force` is set.
pub async fn load_indices(
    feed: &dyn IndexFeed,
    store: &dyn KvStore,
    codes: &[String],
    now: DateTime<Utc>,
    force: bool,
) -> Result<IndexSnapshot, FundwatchError> {
    let codes: Vec<String> = if codes.is_empty() {
        DEFAULT_INDEX_CODES.iter().map(|c| c.to_string()).collect()
    } else {
        codes.to_vec()
    };

    if !force {
        if let Some(cache) = read_cache(store) {
            let fresh = now - cache.fetched_at < Duration::seconds(INDEX_CACHE_TTL_SECS);
            if let (true, Some(quotes)) = (fresh, pick(&cache.quotes, &codes)) {
                debug!(count = quotes.len(), "serving index quotes from cache");
                return Ok(IndexSnapshot {
                    quotes,
                    from_cache: true,
                });
            }
        }
    }

    let secids = codes
        .iter()
        .map(|c| to_secid(c))
        .collect::<Result<Vec<_>, _>>()?;
    let fetched = feed.fetch_indices(&secids).await?;

    let quotes: Vec<IndexQuote> = codes
        .iter()
        .zip(&secids)
        .filter_map(|(code, secid)| {
            fetched.iter().find(|q| &q.code == secid).map(|q| IndexQuote {
                code: code.clone(),
                ..q.clone()
            })
        })
        .collect();

    let cache = IndexCache {
        fetched_at: now,
        quotes: quotes.clone(),
    };
    match serde_json::to_string(&cache) {
        Ok(json) => {
            if let Err(e) = store.set(INDEX_CACHE_KEY, &json) {
                warn!(error = %e, "failed to save index cache");
            }
        }
        Err(e) => warn!(error = %e, "failed to encode index cache"),
    }

    Ok(IndexSnapshot {
        quotes,
        from_cache: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secid_mapping() {
        assert_eq!(to_secid("sh000001").unwrap(), "1.000001");
        assert_eq!(to_secid("sz399006").unwrap(), "0.399006");
        assert_eq!(to_secid("hkHSI").unwrap(), "100.HSI");
        assert_eq!(to_secid("usSPX").unwrap(), "100.SPX");
        assert!(to_secid("xx123").is_err());
        assert!(to_secid("sh").is_err());
    }

    #[test]
    fn parse_index_codes_validates_each() {
        assert_eq!(
            parse_index_codes("sh000001, sz399001").unwrap(),
            vec!["sh000001", "sz399001"]
        );
        assert!(parse_index_codes("sh000001,jp225").is_err());
    }
}
