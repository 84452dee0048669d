//! Local key/value store port.

use crate::domain::error::FundwatchError;

pub const WATCHLIST_KEY: &str = "watchlist";
pub const TAGS_KEY: &str = "tags";
pub const INDEX_CACHE_KEY: &str = "index_cache";

/// String values under string keys, written through on every call.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, FundwatchError>;
    fn set(&self, key: &str, value: &str) -> Result<(), FundwatchError>;
    fn remove(&self, key: &str) -> Result<(), FundwatchError>;
}
