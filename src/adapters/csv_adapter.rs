//! Watchlist CSV import and export.
//!
//! Layout: `code,name,tags,starred` with tags joined by `|`. Only `code` is
//! required on import.

use crate::domain::error::FundwatchError;
use crate::domain::session::WatchlistSession;
use crate::domain::watchlist::Watchlist;
use std::path::Path;
use tracing::info;

pub const TAG_SEPARATOR: char = '|';
const HEADER: [&str; 4] = ["code", "name", "tags", "starred"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    pub line: usize,
    pub code: String,
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub starred: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: Vec<String>,
    /// Codes already in the watchlist, left untouched.
    pub skipped: Vec<String>,
}

pub fn export_watchlist(path: &Path, watchlist: &Watchlist) -> Result<usize, FundwatchError> {
    let mut writer = csv::Writer::from_path(path).map_err(std::io::Error::from)?;
    writer.write_record(HEADER).map_err(std::io::Error::from)?;
    for fund in watchlist.funds() {
        let tags = fund.user_tags.join(&TAG_SEPARATOR.to_string());
        let starred = if fund.is_starred { "true" } else { "false" };
        writer
            .write_record([
                fund.code.as_str(),
                fund.display_name.as_str(),
                tags.as_str(),
                starred,
            ])
            .map_err(std::io::Error::from)?;
    }
    writer.flush()?;
    Ok(watchlist.len())
}

fn parse_starred(line: usize, raw: &str) -> Result<bool, FundwatchError> {
    match raw.trim().to_lowercase().as_str() {
        "" | "false" | "no" | "0" => Ok(false),
        "true" | "yes" | "1" => Ok(true),
        other => Err(FundwatchError::Import {
            line,
            reason: format!("invalid starred value {other:?}"),
        }),
    }
}

pub fn read_rows(path: &Path) -> Result<Vec<CsvRow>, FundwatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(std::io::Error::from)?;

    let headers = reader
        .headers()
        .map_err(|e| FundwatchError::Import {
            line: 1,
            reason: e.to_string(),
        })?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let code_col = column("code").ok_or_else(|| FundwatchError::Import {
        line: 1,
        reason: "missing code column".into(),
    })?;
    let name_col = column("name");
    let tags_col = column("tags");
    let starred_col = column("starred");

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let line = idx + 2;
        let record = record.map_err(|e| FundwatchError::Import {
            line,
            reason: e.to_string(),
        })?;
        let field = |col: Option<usize>| col.and_then(|c| record.get(c)).unwrap_or("");

        let code = field(Some(code_col)).to_string();
        if code.is_empty() {
            continue;
        }
        rows.push(CsvRow {
            line,
            code,
            name: Some(field(name_col).to_string()).filter(|n| !n.is_empty()),
            tags: field(tags_col)
                .split(TAG_SEPARATOR)
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            starred: parse_starred(line, field(starred_col))?,
        });
    }
    Ok(rows)
}

/// Add each new code as a placeholder with its tags and starred flag.
pub fn import_watchlist(
    path: &Path,
    session: &mut WatchlistSession,
) -> Result<ImportReport, FundwatchError> {
    let rows = read_rows(path)?;
    let mut report = ImportReport::default();
    for row in rows {
        if session.watchlist().contains(row.code.trim()) {
            report.skipped.push(row.code);
            continue;
        }
        session
            .add_fund(&row.code, &row.tags)
            .map_err(|e| FundwatchError::Import {
                line: row.line,
                reason: e.to_string(),
            })?;
        if row.starred {
            session.set_starred(&row.code, true)?;
        }
        report.added.push(row.code);
    }
    info!(
        added = report.added.len(),
        skipped = report.skipped.len(),
        "watchlist imported"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store_adapter::MemoryStoreAdapter;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn session() -> WatchlistSession {
        WatchlistSession::open(Arc::new(MemoryStoreAdapter::new()), &[]).unwrap()
    }

    #[test]
    fn export_then_import_into_fresh_session() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watchlist.csv");

        let mut source = session();
        source.add_fund("001618", &["Tech".into(), "Growth".into()]).unwrap();
        source.add_fund("005827", &[]).unwrap();
        source.set_starred("005827", true).unwrap();
        assert_eq!(export_watchlist(&path, source.watchlist()).unwrap(), 2);

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("code,name,tags,starred\n"));
        assert!(written.contains("001618,loading,Tech|Growth,false"));

        let mut target = session();
        let report = import_watchlist(&path, &mut target).unwrap();
        assert_eq!(report.added, vec!["001618", "005827"]);
        assert!(target.watchlist().get("005827").unwrap().is_starred);
        assert_eq!(
            target.watchlist().get("001618").unwrap().tags(),
            vec!["All", "Tech", "Growth"]
        );
        assert!(target.tags().contains("Growth"));
    }

    #[test]
    fn import_skips_existing_codes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.csv");
        fs::write(&path, "code\n001618\n005827\n\n").unwrap();

        let mut target = session();
        target.add_fund("001618", &[]).unwrap();
        let report = import_watchlist(&path, &mut target).unwrap();
        assert_eq!(report.added, vec!["005827"]);
        assert_eq!(report.skipped, vec!["001618"]);
    }

    #[test]
    fn import_reports_line_of_bad_code() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.csv");
        fs::write(&path, "code,starred\n001618,yes\n12ab56,no\n").unwrap();

        let err = import_watchlist(&path, &mut session()).unwrap_err();
        assert!(matches!(err, FundwatchError::Import { line: 3, .. }));
    }

    #[test]
    fn missing_code_column_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.csv");
        fs::write(&path, "fund,name\n001618,x\n").unwrap();
        assert!(matches!(
            read_rows(&path),
            Err(FundwatchError::Import { line: 1, .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            read_rows(Path::new("/nonexistent/watchlist.csv")),
            Err(FundwatchError::Io(_))
        ));
    }
}
