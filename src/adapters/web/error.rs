//! HTTP error responses for the web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::error::FundwatchError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

pub fn status_from_error(err: &FundwatchError) -> StatusCode {
    match err {
        FundwatchError::Code(_)
        | FundwatchError::Tag(_)
        | FundwatchError::ConfigInvalid { .. }
        | FundwatchError::Import { .. } => StatusCode::BAD_REQUEST,
        FundwatchError::UnknownFund { .. } => StatusCode::NOT_FOUND,
        FundwatchError::DuplicateFund { .. } => StatusCode::CONFLICT,
        FundwatchError::Http { .. } | FundwatchError::Payload { .. } => StatusCode::BAD_GATEWAY,
        FundwatchError::Store { .. }
        | FundwatchError::StoreQuery { .. }
        | FundwatchError::ConfigParse { .. }
        | FundwatchError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<FundwatchError> for WebError {
    fn from(err: FundwatchError) -> Self {
        Self::new(status_from_error(&err), err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
