//! Domain error types.

/// Invalid fund code input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),

    #[error("invalid fund code {0:?}: expected six digits")]
    Malformed(String),
}

/// Tag registry violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    #[error("tag name is empty")]
    Empty,

    #[error("tag {0:?} is built in and cannot be changed")]
    Reserved(String),

    #[error("tag {0:?} already exists")]
    Duplicate(String),

    #[error("unknown tag {0:?}")]
    Unknown(String),
}

/// Top-level error type for fundwatch.
#[derive(Debug, thiserror::Error)]
pub enum FundwatchError {
    #[error("request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("unexpected payload from {source_name}: {reason}")]
    Payload { source_name: String, reason: String },

    #[error("store error: {reason}")]
    Store { reason: String },

    #[error("store query error: {reason}")]
    StoreQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("fund {code} is not in the watchlist")]
    UnknownFund { code: String },

    #[error("fund {code} is already in the watchlist")]
    DuplicateFund { code: String },

    #[error("unknown NAV range {0:?}: expected 1m, 3m, 6m, 1y, 3y or 5y")]
    UnknownRange(String),

    #[error(transparent)]
    Code(#[from] CodeError),

    #[error(transparent)]
    Tag(#[from] TagError),

    #[error("import error at line {line}: {reason}")]
    Import { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FundwatchError {
    pub fn http(url: &str, err: impl std::fmt::Display) -> Self {
        FundwatchError::Http {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn payload(source_name: &str, reason: impl Into<String>) -> Self {
        FundwatchError::Payload {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&FundwatchError> for std::process::ExitCode {
    fn from(err: &FundwatchError) -> Self {
        let code: u8 = match err {
            FundwatchError::Io(_) => 1,
            FundwatchError::ConfigParse { .. }
            | FundwatchError::ConfigInvalid { .. } => 2,
            FundwatchError::Store { .. } | FundwatchError::StoreQuery { .. } => 3,
            FundwatchError::UnknownFund { .. }
            | FundwatchError::DuplicateFund { .. }
            | FundwatchError::UnknownRange(_)
            | FundwatchError::Code(_)
            | FundwatchError::Tag(_)
            | FundwatchError::Import { .. } => 4,
            FundwatchError::Http { .. } | FundwatchError::Payload { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
