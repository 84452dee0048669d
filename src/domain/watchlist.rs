//! Watchlist records and merge-on-refresh.

use crate::domain::error::FundwatchError;
use crate::domain::quote::{ALL_TAG, FundQuote, IncomingQuote};
use crate::domain::tags::STARRED_TAG;
use serde::{Deserialize, Serialize};

/// Merge a fresh quote into the list by code.
///
/// Existing records keep their tags and starred flag; unknown codes are
/// appended with no user tags and unstarred. Applying the same quote twice
/// yields the same list.
pub fn merge_quote(existing: &[FundQuote], incoming: IncomingQuote) -> Vec<FundQuote> {
    let mut list = existing.to_vec();
    merge_into(&mut list, incoming);
    list
}

fn merge_into(list: &mut Vec<FundQuote>, incoming: IncomingQuote) {
    match list.iter_mut().find(|f| f.code == incoming.code) {
        Some(record) => record.apply(incoming),
        None => list.push(FundQuote::from_incoming(incoming)),
    }
}

/// Ordered list of tracked funds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watchlist {
    funds: Vec<FundQuote>,
}

impl Watchlist {
    pub fn new(funds: Vec<FundQuote>) -> Self {
        let mut list = Self { funds: Vec::new() };
        for mut fund in funds {
            if list.contains(&fund.code) {
                continue;
            }
            fund.normalize_tags();
            list.funds.push(fund);
        }
        list
    }

    pub fn funds(&self) -> &[FundQuote] {
        &self.funds
    }

    pub fn len(&self) -> usize {
        self.funds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funds.is_empty()
    }

    pub fn codes(&self) -> Vec<String> {
        self.funds.iter().map(|f| f.code.clone()).collect()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn get(&self, code: &str) -> Option<&FundQuote> {
        self.funds.iter().find(|f| f.code == code)
    }

    fn get_mut(&mut self, code: &str) -> Result<&mut FundQuote, FundwatchError> {
        self.funds
            .iter_mut()
            .find(|f| f.code == code)
            .ok_or_else(|| FundwatchError::UnknownFund {
                code: code.to_string(),
            })
    }

    pub fn merge(&mut self, incoming: IncomingQuote) {
        merge_into(&mut self.funds, incoming);
    }

    /// Insert a loading placeholder for a newly added code.
    pub fn add_placeholder(&mut self, code: &str, tags: &[String]) -> Result<(), FundwatchError> {
        if self.contains(code) {
            return Err(FundwatchError::DuplicateFund {
                code: code.to_string(),
            });
        }
        let mut fund = FundQuote::placeholder(code);
        fund.user_tags = tags.to_vec();
        fund.normalize_tags();
        self.funds.push(fund);
        Ok(())
    }

    pub fn remove(&mut self, code: &str) -> Result<FundQuote, FundwatchError> {
        let idx = self
            .funds
            .iter()
            .position(|f| f.code == code)
            .ok_or_else(|| FundwatchError::UnknownFund {
                code: code.to_string(),
            })?;
        Ok(self.funds.remove(idx))
    }

    pub fn set_starred(&mut self, code: &str, starred: bool) -> Result<(), FundwatchError> {
        self.get_mut(code)?.is_starred = starred;
        Ok(())
    }

    pub fn set_tags(&mut self, code: &str, tags: &[String]) -> Result<(), FundwatchError> {
        let fund = self.get_mut(code)?;
        fund.user_tags = tags.to_vec();
        fund.normalize_tags();
        Ok(())
    }

    pub(crate) fn rename_tag(&mut self, from: &str, to: &str) {
        for fund in &mut self.funds {
            for tag in fund.user_tags.iter_mut().filter(|t| t.as_str() == from) {
                *tag = to.to_string();
            }
            fund.normalize_tags();
        }
    }

    pub(crate) fn drop_tag(&mut self, name: &str) {
        for fund in &mut self.funds {
            fund.user_tags.retain(|t| t != name);
        }
    }

    /// Records shown under `tag`, starred first, otherwise in list order.
    pub fn view(&self, tag: &str) -> Vec<&FundQuote> {
        let mut shown: Vec<&FundQuote> = self
            .funds
            .iter()
            .filter(|f| match tag {
                ALL_TAG => true,
                STARRED_TAG => f.is_starred,
                other => f.has_tag(other),
            })
            .collect();
        shown.sort_by_key(|f| !f.is_starred);
        shown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::{Nav, ValuationStamp};
    use rust_decimal_macros::dec;

    fn incoming(code: &str, value: rust_decimal::Decimal) -> IncomingQuote {
        IncomingQuote {
            code: code.into(),
            display_name: format!("Fund {code}"),
            last_settled_value: Nav::Value(dec!(1.25)),
            current_estimated_value: Nav::Value(value),
            estimated_change_percent: Nav::Value(dec!(0.5)),
            valuation_stamp: ValuationStamp::Pending,
            is_settled_value_applied: false,
        }
    }

    fn annotated(code: &str, tags: &[&str], starred: bool) -> FundQuote {
        let mut fund = FundQuote::placeholder(code);
        fund.user_tags = tags.iter().map(|t| t.to_string()).collect();
        fund.is_starred = starred;
        fund
    }

    #[test]
    fn merge_preserves_annotations() {
        let existing = vec![annotated("001618", &["Tech"], true)];
        let merged = merge_quote(&existing, incoming("001618", dec!(1.30)));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].current_estimated_value, Nav::Value(dec!(1.30)));
        assert_eq!(merged[0].tags(), vec!["All", "Tech"]);
        assert!(merged[0].is_starred);
    }

    #[test]
    fn merge_into_empty_inserts_default_record() {
        let merged = merge_quote(&[], incoming("005827", dec!(2.45)));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].tags(), vec!["All"]);
        assert!(!merged[0].is_starred);
    }

    #[test]
    fn merge_is_idempotent() {
        let existing = vec![annotated("001618", &["Tech"], false)];
        let q = incoming("161725", dec!(1.11));
        let once = merge_quote(&existing, q.clone());
        let twice = merge_quote(&once, q);
        assert_eq!(once, twice);
    }

    #[test]
    fn add_placeholder_rejects_duplicates() {
        let mut list = Watchlist::default();
        list.add_placeholder("001618", &["Tech".into()]).unwrap();
        let err = list.add_placeholder("001618", &[]).unwrap_err();
        assert!(matches!(err, FundwatchError::DuplicateFund { code } if code == "001618"));
        assert!(list.get("001618").unwrap().current_estimated_value.is_loading());
    }

    #[test]
    fn remove_unknown_code_errors() {
        let mut list = Watchlist::default();
        assert!(matches!(
            list.remove("001618"),
            Err(FundwatchError::UnknownFund { .. })
        ));
    }

    #[test]
    fn view_filters_and_pins_starred() {
        let list = Watchlist::new(vec![
            annotated("001618", &["Tech"], false),
            annotated("005827", &["Consumer"], false),
            annotated("008887", &["Tech"], true),
        ]);
        let all: Vec<_> = list.view("All").iter().map(|f| f.code.as_str()).collect();
        assert_eq!(all, vec!["008887", "001618", "005827"]);
        let tech: Vec<_> = list.view("Tech").iter().map(|f| f.code.as_str()).collect();
        assert_eq!(tech, vec!["008887", "001618"]);
        let starred: Vec<_> = list.view("Starred").iter().map(|f| f.code.as_str()).collect();
        assert_eq!(starred, vec!["008887"]);
    }

    #[test]
    fn new_drops_duplicate_codes() {
        let list = Watchlist::new(vec![
            annotated("001618", &["Tech"], false),
            annotated("001618", &["Other"], true),
        ]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.get("001618").unwrap().user_tags, vec!["Tech"]);
    }
}
