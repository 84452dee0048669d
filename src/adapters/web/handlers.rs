//! HTTP request handlers for the web adapter.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::calendar::{MarketStatus, current_status};
use crate::domain::indices::{IndexQuote, load_indices, parse_index_codes};
use crate::domain::quote::{ALL_TAG, FundQuote, Nav};

use super::{AppState, WebError};

/// A watchlist row as served, with `All` included in the tags.
#[derive(Debug, Serialize)]
pub struct FundRow {
    pub code: String,
    pub display_name: String,
    pub last_settled_value: Nav,
    pub current_estimated_value: Nav,
    pub estimated_change_percent: Nav,
    pub valuation_label: String,
    pub is_settled_value_applied: bool,
    pub is_up: bool,
    pub tags: Vec<String>,
    pub is_starred: bool,
}

impl From<&FundQuote> for FundRow {
    fn from(fund: &FundQuote) -> Self {
        Self {
            code: fund.code.clone(),
            display_name: fund.display_name.clone(),
            last_settled_value: fund.last_settled_value,
            current_estimated_value: fund.current_estimated_value,
            estimated_change_percent: fund.estimated_change_percent,
            valuation_label: fund.valuation_stamp.label(),
            is_settled_value_applied: fund.is_settled_value_applied,
            is_up: fund.is_up(),
            tags: fund.tags().into_iter().map(String::from).collect(),
            is_starred: fund.is_starred,
        }
    }
}

pub async fn market_status(State(state): State<Arc<AppState>>) -> Json<MarketStatus> {
    Json(current_status(state.holidays.as_ref(), Utc::now()).await)
}

#[derive(Debug, Deserialize)]
pub struct WatchlistQuery {
    pub tag: Option<String>,
}

pub async fn watchlist(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WatchlistQuery>,
) -> Result<Json<Vec<FundRow>>, WebError> {
    let tag = query.tag.as_deref().unwrap_or(ALL_TAG);
    let session = state.session.read().await;
    let rows = session.view(tag)?.into_iter().map(FundRow::from).collect();
    Ok(Json(rows))
}

pub async fn tags(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    let session = state.session.read().await;
    Json(session.tags().names().into_iter().map(String::from).collect())
}

#[derive(Debug, Deserialize)]
pub struct IndicesQuery {
    pub codes: Option<String>,
    #[serde(default)]
    pub force: bool,
}

pub async fn indices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IndicesQuery>,
) -> Result<Json<Vec<IndexQuote>>, WebError> {
    let codes = match query.codes.as_deref() {
        Some(raw) => parse_index_codes(raw)?,
        None => state.index_codes.clone(),
    };
    let store = state.session.read().await.store().clone();
    let snapshot = load_indices(
        state.indices.as_ref(),
        store.as_ref(),
        &codes,
        Utc::now(),
        query.force,
    )
    .await?;
    Ok(Json(snapshot.quotes))
}

pub async fn not_found() -> WebError {
    WebError::not_found("no such route")
}
