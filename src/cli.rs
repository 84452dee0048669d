//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::adapters::csv_adapter::{export_watchlist, import_watchlist};
use crate::adapters::eastmoney_adapter::{
    EastmoneyDetailFeed, EastmoneyEstimateFeed, EastmoneyIndexFeed, EastmoneySearch,
    EastmoneySettlementFeed, build_client,
};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::holiday_adapter::HttpHolidayFeed;
use crate::domain::calendar::{MarketStatus, current_status};
use crate::domain::config_validation::{Settings, StoreSettings};
use crate::domain::detail::{NavRange, load_holdings, load_nav_history};
use crate::domain::error::FundwatchError;
use crate::domain::fund_code::validate_code;
use crate::domain::indices::{load_indices, parse_index_codes};
use crate::domain::quote::{ALL_TAG, EstimateQuote, FundQuote, Nav};
use crate::domain::refresh::{QuoteFeeds, RefreshReport, refresh_session, run_auto_refresh};
use crate::domain::search::search_funds;
use crate::domain::session::WatchlistSession;
use crate::ports::feed_port::EstimateFeed;
use crate::ports::store_port::KvStore;

#[derive(Parser, Debug)]
#[command(name = "fundwatch", about = "Mainland fund valuation watchlist")]
pub struct Cli {
    /// INI config file; defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show whether the A-share market is open
    Status,
    /// Print the watchlist
    List {
        #[arg(long, default_value = ALL_TAG)]
        tag: String,
    },
    /// Fetch quotes once and print the watchlist
    Refresh {
        #[arg(long)]
        tag: Option<String>,
    },
    /// Refresh on the configured interval until Ctrl-C
    Watch,
    /// Add a fund by its six digit code
    Add {
        code: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Remove a fund
    Remove { code: String },
    /// Star a fund, or unstar it with --off
    Star {
        code: String,
        #[arg(long)]
        off: bool,
    },
    /// Manage tags
    Tags {
        #[command(subcommand)]
        command: TagsCommand,
    },
    /// Search funds by name or code
    Search { key: String },
    /// Show a fund's estimate, NAV history and holdings
    Detail {
        code: String,
        /// History window: 1m, 3m, 6m, 1y, 3y or 5y
        #[arg(long, default_value = "1m")]
        range: NavRange,
        /// Also list the top ten stock holdings
        #[arg(long)]
        holdings: bool,
    },
    /// Show market index quotes
    Indices {
        /// Comma separated codes such as sh000001,hkHSI
        #[arg(long)]
        codes: Option<String>,
        /// Ignore the cached quotes
        #[arg(long)]
        force: bool,
    },
    /// Import funds from a CSV file
    Import { file: PathBuf },
    /// Export the watchlist to a CSV file
    Export { file: PathBuf },
    /// Start the JSON web server
    Serve,
}

#[derive(Subcommand, Debug)]
pub enum TagsCommand {
    List,
    Add {
        name: String,
    },
    Rename {
        from: String,
        to: String,
    },
    Delete {
        name: String,
    },
    /// Replace a fund's tags; no tags clears them
    Assign {
        code: String,
        tags: Vec<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn execute(cli: Cli) -> Result<(), FundwatchError> {
    let settings = load_settings(cli.config.as_deref())?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(dispatch(cli.command, settings))
}

pub fn load_settings(path: Option<&Path>) -> Result<Settings, FundwatchError> {
    match path {
        Some(path) => Settings::from_config(&FileConfigAdapter::from_file(path)?),
        None => Settings::from_config(&FileConfigAdapter::empty()),
    }
}

#[cfg(feature = "sqlite")]
pub fn open_store(settings: &StoreSettings) -> Result<Arc<dyn KvStore>, FundwatchError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    Ok(Arc::new(SqliteAdapter::open(settings)?))
}

#[cfg(not(feature = "sqlite"))]
pub fn open_store(settings: &StoreSettings) -> Result<Arc<dyn KvStore>, FundwatchError> {
    use crate::adapters::memory_store_adapter::MemoryStoreAdapter;
    warn!(path = %settings.path, "built without sqlite, changes will not be kept");
    Ok(Arc::new(MemoryStoreAdapter::new()))
}

fn quote_feeds(settings: &Settings, client: &reqwest::Client) -> QuoteFeeds {
    QuoteFeeds {
        estimate: Arc::new(EastmoneyEstimateFeed::new(
            client.clone(),
            &settings.feeds.estimate_url,
        )),
        settlement: Arc::new(EastmoneySettlementFeed::new(
            client.clone(),
            &settings.feeds.settlement_url,
            settings.feeds.device_id.clone(),
        )),
    }
}

async fn dispatch(command: Command, settings: Settings) -> Result<(), FundwatchError> {
    let client = build_client(settings.feeds.timeout)?;

    if let Command::Status = command {
        let holidays = HttpHolidayFeed::new(client, &settings.feeds.holiday_url);
        print_status(&current_status(&holidays, chrono::Utc::now()).await);
        return Ok(());
    }
    if let Command::Search { key } = &command {
        let search = EastmoneySearch::new(client, &settings.feeds.search_url);
        let hits = search_funds(&search, key).await?;
        if hits.is_empty() {
            eprintln!("No funds found (keys need at least two characters)");
        }
        for hit in &hits {
            println!(
                "{}  {}  {}",
                hit.code,
                hit.name,
                hit.category.as_deref().unwrap_or("")
            );
        }
        return Ok(());
    }

    if let Command::Detail {
        code,
        range,
        holdings,
    } = &command
    {
        return show_detail(&settings, &client, code, *range, *holdings).await;
    }

    let store = open_store(&settings.store)?;
    let mut session = WatchlistSession::open(store.clone(), &settings.seed_codes)?;

    match command {
        Command::Status | Command::Search { .. } | Command::Detail { .. } => Ok(()),
        Command::List { tag } => {
            print_funds(&session.view(&tag)?);
            Ok(())
        }
        Command::Refresh { tag } => {
            let feeds = quote_feeds(&settings, &client);
            let report = refresh_session(&mut session, &feeds, tag.as_deref()).await?;
            print_funds(&session.view(tag.as_deref().unwrap_or(ALL_TAG))?);
            print_report(&report);
            Ok(())
        }
        Command::Watch => {
            let feeds = quote_feeds(&settings, &client);
            let session = RwLock::new(session);
            let shutdown = shutdown_on(tokio::signal::ctrl_c());
            eprintln!(
                "Refreshing every {}s, Ctrl-C to stop",
                settings.refresh.interval.as_secs()
            );
            run_auto_refresh(&session, &feeds, settings.refresh, shutdown, |s, report| {
                print_funds(&s.watchlist().view(ALL_TAG));
                print_report(report);
            })
            .await?;
            Ok(())
        }
        Command::Add { code, tags } => {
            session.add_fund(&code, &tags)?;
            eprintln!("Added {}", code.trim());
            Ok(())
        }
        Command::Remove { code } => {
            let removed = session.remove_fund(&code)?;
            eprintln!("Removed {} {}", removed.code, removed.display_name);
            Ok(())
        }
        Command::Star { code, off } => {
            session.set_starred(&code, !off)?;
            eprintln!("{} {}", if off { "Unstarred" } else { "Starred" }, code.trim());
            Ok(())
        }
        Command::Tags { command } => run_tags(&mut session, command),
        Command::Indices { codes, force } => {
            let codes = match codes {
                Some(raw) => parse_index_codes(&raw)?,
                None => settings.index_codes.clone(),
            };
            let feed = EastmoneyIndexFeed::new(client, &settings.feeds.index_url);
            let snapshot =
                load_indices(&feed, store.as_ref(), &codes, chrono::Utc::now(), force).await?;
            for quote in &snapshot.quotes {
                println!(
                    "{}  {}  {}  {}  {}%",
                    quote.code,
                    quote.name,
                    display_opt(quote.price),
                    display_opt(quote.change),
                    display_opt(quote.change_percent)
                );
            }
            if snapshot.from_cache {
                eprintln!("(cached)");
            }
            Ok(())
        }
        Command::Import { file } => {
            let report = import_watchlist(&file, &mut session)?;
            eprintln!("Imported {} funds", report.added.len());
            for code in &report.skipped {
                eprintln!("  skipped {code}: already in the watchlist");
            }
            Ok(())
        }
        Command::Export { file } => {
            let count = export_watchlist(&file, session.watchlist())?;
            eprintln!("Exported {count} funds to {}", file.display());
            Ok(())
        }
        Command::Serve => serve(session, settings, client).await,
    }
}

async fn show_detail(
    settings: &Settings,
    client: &reqwest::Client,
    code: &str,
    range: NavRange,
    with_holdings: bool,
) -> Result<(), FundwatchError> {
    let code = validate_code(code)?;
    let estimate = EastmoneyEstimateFeed::new(client.clone(), &settings.feeds.estimate_url);
    match estimate.fetch_estimate(&code).await {
        Ok(Some(quote)) => println!("{}", format_estimate_line(&quote)),
        Ok(None) => eprintln!("No intraday estimate for {code}"),
        Err(e) => warn!(code = %code, error = %e, "estimate unavailable"),
    }

    let detail = EastmoneyDetailFeed::new(client.clone(), &settings.feeds.detail_url);
    let points = load_nav_history(&detail, &code, range).await?;
    println!("NAV history ({range}):");
    if points.is_empty() {
        eprintln!("  no NAV history");
    }
    for point in &points {
        println!(
            "  {}  {}  {}  {}%",
            point.date,
            point.nav,
            display_opt(point.accumulated),
            display_opt(point.change_percent)
        );
    }

    if with_holdings {
        let quotes = EastmoneyIndexFeed::new(client.clone(), &settings.feeds.index_url);
        let report = load_holdings(&detail, &quotes, &code).await?;
        println!(
            "Top holdings (as of {}):",
            report.as_of.as_deref().unwrap_or("--")
        );
        for holding in &report.holdings {
            println!(
                "  {}  {}  {}%  {}  {}%",
                holding.stock_code,
                holding.stock_name,
                display_opt(holding.weight),
                display_opt(holding.price),
                display_opt(holding.change_percent)
            );
        }
        if !report.quotes_live {
            eprintln!("(live stock quotes unavailable)");
        }
    }
    Ok(())
}

/// One line for the intraday estimate and the NAV it moves from.
pub fn format_estimate_line(quote: &EstimateQuote) -> String {
    let mut line = format!(
        "{} {}  estimate {} ({}%) at {}",
        quote.code,
        quote.name,
        quote.value,
        quote.change_percent,
        quote.as_of.format("%Y-%m-%d %H:%M")
    );
    if let Some(nav) = quote.last_settled {
        line.push_str(&format!(", last settled {nav}"));
        if let Some(date) = quote.last_settled_date {
            line.push_str(&format!(" on {date}"));
        }
    }
    line
}

fn run_tags(session: &mut WatchlistSession, command: TagsCommand) -> Result<(), FundwatchError> {
    match command {
        TagsCommand::List => {
            for name in session.tags().names() {
                println!("{name}");
            }
        }
        TagsCommand::Add { name } => {
            let name = session.add_tag(&name)?;
            eprintln!("Added tag {name}");
        }
        TagsCommand::Rename { from, to } => {
            session.rename_tag(&from, &to)?;
            eprintln!("Renamed tag {from} to {to}");
        }
        TagsCommand::Delete { name } => {
            session.delete_tag(&name)?;
            eprintln!("Deleted tag {name}");
        }
        TagsCommand::Assign { code, tags } => {
            session.set_tags(&code, &tags)?;
            eprintln!("Tagged {} with [{}]", code.trim(), tags.join(", "));
        }
    }
    Ok(())
}

#[cfg(feature = "web")]
async fn serve(
    session: WatchlistSession,
    settings: Settings,
    client: reqwest::Client,
) -> Result<(), FundwatchError> {
    use crate::adapters::web::{self, AppState};

    let feeds = quote_feeds(&settings, &client);
    let state = AppState {
        session: Arc::new(RwLock::new(session)),
        holidays: Arc::new(HttpHolidayFeed::new(
            client.clone(),
            &settings.feeds.holiday_url,
        )),
        indices: Arc::new(EastmoneyIndexFeed::new(client, &settings.feeds.index_url)),
        index_codes: settings.index_codes.clone(),
    };
    eprintln!("Starting web server on {}", settings.listen);
    let shutdown = shutdown_on(tokio::signal::ctrl_c());
    web::serve(&settings.listen, state, feeds, settings.refresh, shutdown).await
}

#[cfg(not(feature = "web"))]
async fn serve(
    _session: WatchlistSession,
    _settings: Settings,
    _client: reqwest::Client,
) -> Result<(), FundwatchError> {
    Err(FundwatchError::ConfigInvalid {
        section: "web".into(),
        key: "listen".into(),
        reason: "built without the web feature".into(),
    })
}

/// Resolves when `signal` fires. If the signal cannot be listened for it
/// never resolves, so the caller keeps running until killed.
pub async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn print_status(status: &MarketStatus) {
    println!(
        "{} ({:?}) at {} Beijing time",
        status.state.label(),
        status.color,
        status.current_time.format("%Y-%m-%d %H:%M")
    );
    if !status.holidays_checked {
        eprintln!("holiday table unavailable; only weekends were checked");
    }
}

fn display_opt(value: Option<rust_decimal::Decimal>) -> String {
    value.map_or_else(|| "--".to_string(), |v| v.to_string())
}

fn percent(nav: &Nav) -> String {
    match nav {
        Nav::Value(v) => format!("{v}%"),
        other => other.to_string(),
    }
}

pub fn format_fund_row(fund: &FundQuote) -> String {
    format!(
        "{}{} {}  {}  {}  {}  {}",
        if fund.is_starred { "*" } else { " " },
        fund.code,
        fund.display_name,
        fund.current_estimated_value,
        percent(&fund.estimated_change_percent),
        fund.valuation_stamp.label(),
        fund.user_tags.join("|")
    )
}

fn print_funds(funds: &[&FundQuote]) {
    if funds.is_empty() {
        eprintln!("No funds to show");
    }
    for fund in funds {
        println!("{}", format_fund_row(fund));
    }
}

fn print_report(report: &RefreshReport) {
    eprintln!(
        "{} updated, {} unchanged",
        report.updated,
        report.stale.len()
    );
    for failure in &report.failures {
        eprintln!(
            "  {} {} feed: {}",
            failure.code, failure.feed, failure.reason
        );
    }
}
