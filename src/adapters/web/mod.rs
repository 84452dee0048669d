//! JSON web adapter.
//!
//! Serves market status, the watchlist, tags and index quotes over axum,
//! while the auto-refresh loop keeps the shared session current.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use axum::{Router, routing::get};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::domain::config_validation::RefreshPolicy;
use crate::domain::error::FundwatchError;
use crate::domain::refresh::{QuoteFeeds, run_auto_refresh};
use crate::domain::session::WatchlistSession;
use crate::ports::feed_port::{HolidayFeed, IndexFeed};

pub struct AppState {
    pub session: Arc<RwLock<WatchlistSession>>,
    pub holidays: Arc<dyn HolidayFeed>,
    pub indices: Arc<dyn IndexFeed>,
    pub index_codes: Vec<String>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/market-status", get(handlers::market_status))
        .route("/api/watchlist", get(handlers::watchlist))
        .route("/api/tags", get(handlers::tags))
        .route("/api/indices", get(handlers::indices))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Serve `state` on `listen` and refresh in the background until `shutdown`.
pub async fn serve<S>(
    listen: &str,
    state: AppState,
    feeds: QuoteFeeds,
    policy: RefreshPolicy,
    shutdown: S,
) -> Result<(), FundwatchError>
where
    S: Future<Output = ()> + Send + 'static,
{
    let session = state.session.clone();
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);

    let refresher = tokio::spawn(async move {
        let mut stop_rx = stop_rx;
        let stopped = async move {
            let _ = stop_rx.wait_for(|stop| *stop).await;
        };
        if policy.auto_refresh {
            if let Err(e) = run_auto_refresh(&session, &feeds, policy, stopped, |_, _| {}).await {
                warn!(error = %e, "auto refresh ended with error");
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(addr = %listener.local_addr()?, "listening");
    let result = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await;

    let _ = stop_tx.send(true);
    let _ = refresher.await;
    result.map_err(FundwatchError::Io)
}
