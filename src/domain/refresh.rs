//! Quote refresh cycles.
//!
//! Per fund the estimate is fetched first and the settlement after it,
//! whatever the estimate's outcome. Funds are fetched concurrently and the
//! results are applied in watchlist order once all of them are in.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::config_validation::RefreshPolicy;
use crate::domain::error::FundwatchError;
use crate::domain::quote::IncomingQuote;
use crate::domain::reconcile::reconcile;
use crate::domain::session::WatchlistSession;
use crate::ports::feed_port::{EstimateFeed, SettlementFeed};

#[derive(Clone)]
pub struct QuoteFeeds {
    pub estimate: Arc<dyn EstimateFeed>,
    pub settlement: Arc<dyn SettlementFeed>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFailure {
    pub code: String,
    pub feed: &'static str,
    pub reason: String,
}

/// Result of fetching one fund.
#[derive(Debug, Clone)]
pub struct FundFetch {
    pub code: String,
    pub incoming: Option<IncomingQuote>,
    pub failures: Vec<FeedFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub updated: usize,
    /// Codes whose record was kept as it was.
    pub stale: Vec<String>,
    pub failures: Vec<FeedFailure>,
}

fn absent_on_error<T>(
    code: &str,
    feed: &'static str,
    result: Result<Option<T>, FundwatchError>,
    failures: &mut Vec<FeedFailure>,
) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(code, feed, error = %e, "feed request failed");
            failures.push(FeedFailure {
                code: code.to_string(),
                feed,
                reason: e.to_string(),
            });
            None
        }
    }
}

pub async fn fetch_fund(feeds: &QuoteFeeds, code: &str) -> FundFetch {
    let mut failures = Vec::new();
    let estimate = absent_on_error(
        code,
        "estimate",
        feeds.estimate.fetch_estimate(code).await,
        &mut failures,
    );
    let settlement = absent_on_error(
        code,
        "settlement",
        feeds.settlement.fetch_settlement(code).await,
        &mut failures,
    );
    FundFetch {
        code: code.to_string(),
        incoming: reconcile(code, estimate.as_ref(), settlement.as_ref()),
        failures,
    }
}

/// Fetch every code concurrently; results come back in `codes` order.
pub async fn fetch_all(feeds: &QuoteFeeds, codes: &[String]) -> Vec<FundFetch> {
    join_all(codes.iter().map(|code| fetch_fund(feeds, code))).await
}

/// Apply fetched quotes to the session and summarize the cycle.
pub fn apply_fetched(
    session: &mut WatchlistSession,
    fetched: Vec<FundFetch>,
) -> Result<RefreshReport, FundwatchError> {
    let mut report = RefreshReport::default();
    let mut quotes = Vec::new();
    for fetch in fetched {
        report.failures.extend(fetch.failures);
        // A fund removed while its fetch was in flight stays removed.
        match fetch.incoming {
            Some(quote) if session.watchlist().contains(&fetch.code) => quotes.push(quote),
            Some(_) => debug!(code = %fetch.code, "dropping quote for removed fund"),
            None => report.stale.push(fetch.code),
        }
    }
    report.updated = session.apply_incoming(quotes)?;
    Ok(report)
}

/// One refresh cycle over the funds shown under `tag` (all funds if `None`).
pub async fn refresh_session(
    session: &mut WatchlistSession,
    feeds: &QuoteFeeds,
    tag: Option<&str>,
) -> Result<RefreshReport, FundwatchError> {
    let codes: Vec<String> = match tag {
        Some(tag) => session.view(tag)?.iter().map(|f| f.code.clone()).collect(),
        None => session.watchlist().codes(),
    };
    let fetched = fetch_all(feeds, &codes).await;
    let report = apply_fetched(session, fetched)?;
    info!(
        updated = report.updated,
        stale = report.stale.len(),
        failures = report.failures.len(),
        "refresh complete"
    );
    Ok(report)
}

/// Refresh on a fixed interval until `shutdown` resolves.
///
/// Fetches run without holding the session lock. A cycle still fetching when
/// `shutdown` fires is dropped and nothing from it is applied. With auto
/// refresh off a single cycle runs. Returns the number of completed cycles.
pub async fn run_auto_refresh<S, F>(
    session: &RwLock<WatchlistSession>,
    feeds: &QuoteFeeds,
    policy: RefreshPolicy,
    shutdown: S,
    mut on_cycle: F,
) -> Result<usize, FundwatchError>
where
    S: Future<Output = ()>,
    F: FnMut(&WatchlistSession, &RefreshReport),
{
    let mut ticker = tokio::time::interval(policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);
    let mut cycles = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        let codes = session.read().await.watchlist().codes();
        let fetched = tokio::select! {
            _ = &mut shutdown => {
                debug!("shutdown during refresh, discarding in-flight results");
                break;
            }
            fetched = fetch_all(feeds, &codes) => fetched,
        };

        let mut guard = session.write().await;
        let report = apply_fetched(&mut guard, fetched)?;
        debug!(
            updated = report.updated,
            stale = report.stale.len(),
            "auto refresh cycle"
        );
        on_cycle(&guard, &report);
        drop(guard);
        cycles += 1;

        if !policy.auto_refresh {
            break;
        }
    }

    info!(cycles, "auto refresh stopped");
    Ok(cycles)
}
