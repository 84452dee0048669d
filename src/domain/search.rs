//! Fund lookup by name or code fragment.

use crate::domain::error::FundwatchError;
use crate::ports::feed_port::FundSearch;
use serde::Serialize;

pub const MIN_SEARCH_KEY_CHARS: usize = 2;
pub const MAX_SEARCH_HITS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundSearchHit {
    pub code: String,
    pub name: String,
    pub category: Option<String>,
}

/// Search for funds; short keys return nothing without touching the network.
pub async fn search_funds(
    feed: &dyn FundSearch,
    key: &str,
) -> Result<Vec<FundSearchHit>, FundwatchError> {
    let key = key.trim();
    if key.chars().count() < MIN_SEARCH_KEY_CHARS {
        return Ok(Vec::new());
    }
    let mut hits = feed.search(key).await?;
    hits.truncate(MAX_SEARCH_HITS);
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSearch {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FundSearch for CountingSearch {
        async fn search(&self, key: &str) -> Result<Vec<FundSearchHit>, FundwatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((0..8)
                .map(|i| FundSearchHit {
                    code: format!("00000{i}"),
                    name: format!("{key} {i}"),
                    category: None,
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn short_key_skips_request() {
        let feed = CountingSearch {
            calls: AtomicUsize::new(0),
        };
        let hits = search_funds(&feed, " a ").await.unwrap();
        assert!(hits.is_empty());
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn hits_are_capped() {
        let feed = CountingSearch {
            calls: AtomicUsize::new(0),
        };
        let hits = search_funds(&feed, "白酒").await.unwrap();
        assert_eq!(hits.len(), MAX_SEARCH_HITS);
        assert_eq!(hits[0].name, "白酒 0");
    }
}
