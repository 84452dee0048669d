//! Core domain types and logic.

pub mod calendar;
pub mod config_validation;
pub mod detail;
pub mod error;
pub mod fund_code;
pub mod indices;
pub mod quote;
pub mod reconcile;
pub mod refresh;
pub mod search;
pub mod session;
pub mod tags;
pub mod watchlist;
