//! Tag registry.
//!
//! The registry always starts with `All` and `Starred`. Neither is stored;
//! only user-created names are persisted, in creation order.

use crate::domain::error::TagError;
use crate::domain::quote::ALL_TAG;
use crate::domain::watchlist::Watchlist;
use serde::{Deserialize, Serialize};

pub const STARRED_TAG: &str = "Starred";

pub fn is_reserved(name: &str) -> bool {
    name == ALL_TAG || name == STARRED_TAG
}

fn clean(name: &str) -> Result<String, TagError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TagError::Empty);
    }
    if is_reserved(name) {
        return Err(TagError::Reserved(name.to_string()));
    }
    Ok(name.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagRegistry {
    custom: Vec<String>,
}

impl TagRegistry {
    pub fn new(names: Vec<String>) -> Self {
        let mut registry = Self::default();
        for name in names {
            // Older data may carry the built-in names or duplicates.
            let _ = registry.add(&name);
        }
        registry
    }

    /// Every tag name in display order, built-ins first.
    pub fn names(&self) -> Vec<&str> {
        [ALL_TAG, STARRED_TAG]
            .into_iter()
            .chain(self.custom.iter().map(String::as_str))
            .collect()
    }

    pub fn custom(&self) -> &[String] {
        &self.custom
    }

    pub fn contains(&self, name: &str) -> bool {
        is_reserved(name) || self.custom.iter().any(|t| t == name)
    }

    pub fn add(&mut self, name: &str) -> Result<String, TagError> {
        let name = clean(name)?;
        if self.contains(&name) {
            return Err(TagError::Duplicate(name));
        }
        self.custom.push(name.clone());
        Ok(name)
    }

    /// Register any names not seen before; built-ins and blanks are skipped.
    pub fn ensure(&mut self, names: &[String]) -> Vec<String> {
        names
            .iter()
            .filter_map(|n| match clean(n) {
                Ok(n) if !self.contains(&n) => {
                    self.custom.push(n.clone());
                    Some(n)
                }
                _ => None,
            })
            .collect()
    }

    /// Rename a tag here and on every fund that carries it.
    pub fn rename(&mut self, from: &str, to: &str, funds: &mut Watchlist) -> Result<(), TagError> {
        if is_reserved(from.trim()) {
            return Err(TagError::Reserved(from.trim().to_string()));
        }
        let to = clean(to)?;
        let idx = self
            .custom
            .iter()
            .position(|t| t == from)
            .ok_or_else(|| TagError::Unknown(from.to_string()))?;
        if to == from {
            return Ok(());
        }
        if self.contains(&to) {
            return Err(TagError::Duplicate(to));
        }
        self.custom[idx] = to.clone();
        funds.rename_tag(from, &to);
        Ok(())
    }

    /// Delete a tag here and remove it from every fund.
    pub fn delete(&mut self, name: &str, funds: &mut Watchlist) -> Result<(), TagError> {
        if is_reserved(name) {
            return Err(TagError::Reserved(name.to_string()));
        }
        let idx = self
            .custom
            .iter()
            .position(|t| t == name)
            .ok_or_else(|| TagError::Unknown(name.to_string()))?;
        self.custom.remove(idx);
        funds.drop_tag(name);
        Ok(())
    }
}
