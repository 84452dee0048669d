//! Watchlist session: the in-memory list and tag registry, persisted through
//! the key/value store after every change.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::domain::error::{FundwatchError, TagError};
use crate::domain::fund_code::validate_code;
use crate::domain::quote::{FundQuote, IncomingQuote};
use crate::domain::tags::TagRegistry;
use crate::domain::watchlist::Watchlist;
use crate::ports::store_port::{KvStore, TAGS_KEY, WATCHLIST_KEY};

pub struct WatchlistSession {
    store: Arc<dyn KvStore>,
    watchlist: Watchlist,
    tags: TagRegistry,
}

fn load_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, FundwatchError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, error = %e, "stored value is corrupt, starting empty");
            Ok(None)
        }
    }
}

fn save_json<T: Serialize>(store: &dyn KvStore, key: &str, value: &T) -> Result<(), FundwatchError> {
    let json = serde_json::to_string(value).map_err(|e| FundwatchError::Store {
        reason: format!("failed to encode {key}: {e}"),
    })?;
    store.set(key, &json)
}

impl WatchlistSession {
    /// Seed the session from the store. When nothing was ever stored, the
    /// `seed_codes` are added as placeholders.
    pub fn open(store: Arc<dyn KvStore>, seed_codes: &[String]) -> Result<Self, FundwatchError> {
        let stored: Option<Vec<FundQuote>> = load_json(store.as_ref(), WATCHLIST_KEY)?;
        let tags: Vec<String> = load_json(store.as_ref(), TAGS_KEY)?.unwrap_or_default();

        let mut session = Self {
            watchlist: Watchlist::default(),
            tags: TagRegistry::new(tags),
            store,
        };

        match stored {
            Some(funds) => session.watchlist = Watchlist::new(funds),
            None if !seed_codes.is_empty() => {
                info!(count = seed_codes.len(), "seeding empty watchlist");
                for code in seed_codes {
                    // Seeds come from validated config; repeats are ignored.
                    let _ = session.watchlist.add_placeholder(code, &[]);
                }
                session.save_watchlist()?;
            }
            None => {}
        }

        let carried: Vec<String> = session
            .watchlist
            .funds()
            .iter()
            .flat_map(|f| f.user_tags.iter().cloned())
            .collect();
        if !session.tags.ensure(&carried).is_empty() {
            session.save_tags()?;
        }

        debug!(
            funds = session.watchlist.len(),
            tags = session.tags.custom().len(),
            "session opened"
        );
        Ok(session)
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn watchlist(&self) -> &Watchlist {
        &self.watchlist
    }

    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    /// Records under `tag` in display order. Unknown tags are an error.
    pub fn view(&self, tag: &str) -> Result<Vec<&FundQuote>, FundwatchError> {
        if !self.tags.contains(tag) {
            return Err(TagError::Unknown(tag.to_string()).into());
        }
        Ok(self.watchlist.view(tag))
    }

    fn save_watchlist(&self) -> Result<(), FundwatchError> {
        save_json(self.store.as_ref(), WATCHLIST_KEY, &self.watchlist)
    }

    fn save_tags(&self) -> Result<(), FundwatchError> {
        save_json(self.store.as_ref(), TAGS_KEY, &self.tags)
    }

    /// Write both keys even when the first write fails.
    fn save_all(&self) -> Result<(), FundwatchError> {
        let watchlist = self.save_watchlist();
        let tags = self.save_tags();
        watchlist.and(tags)
    }

    pub fn add_fund(&mut self, code: &str, tags: &[String]) -> Result<(), FundwatchError> {
        let code = validate_code(code)?;
        self.watchlist.add_placeholder(&code, tags)?;
        if self.tags.ensure(tags).is_empty() {
            self.save_watchlist()?;
        } else {
            self.save_all()?;
        }
        info!(code = %code, "fund added");
        Ok(())
    }

    pub fn remove_fund(&mut self, code: &str) -> Result<FundQuote, FundwatchError> {
        let removed = self.watchlist.remove(code.trim())?;
        self.save_watchlist()?;
        info!(code = %removed.code, "fund removed");
        Ok(removed)
    }

    pub fn set_starred(&mut self, code: &str, starred: bool) -> Result<(), FundwatchError> {
        self.watchlist.set_starred(code.trim(), starred)?;
        self.save_watchlist()
    }

    /// Replace a fund's tags, registering any new names.
    pub fn set_tags(&mut self, code: &str, tags: &[String]) -> Result<(), FundwatchError> {
        self.watchlist.set_tags(code.trim(), tags)?;
        if self.tags.ensure(tags).is_empty() {
            self.save_watchlist()
        } else {
            self.save_all()
        }
    }

    pub fn add_tag(&mut self, name: &str) -> Result<String, FundwatchError> {
        let name = self.tags.add(name)?;
        self.save_tags()?;
        Ok(name)
    }

    pub fn rename_tag(&mut self, from: &str, to: &str) -> Result<(), FundwatchError> {
        self.tags.rename(from, to, &mut self.watchlist)?;
        self.save_all()
    }

    pub fn delete_tag(&mut self, name: &str) -> Result<(), FundwatchError> {
        self.tags.delete(name, &mut self.watchlist)?;
        self.save_all()
    }

    /// Merge refreshed quotes in the given order and persist once.
    pub fn apply_incoming(&mut self, quotes: Vec<IncomingQuote>) -> Result<usize, FundwatchError> {
        let count = quotes.len();
        if count == 0 {
            return Ok(0);
        }
        for quote in quotes {
            self.watchlist.merge(quote);
        }
        self.save_watchlist()?;
        Ok(count)
    }
}
