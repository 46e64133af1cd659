use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;

use crate::proxy::ProxyError;
use crate::report::ReportError;
use crate::scanner::{ScanError, ScanType};
use crate::summary::SummaryError;
use crate::validator::VALID_FORMATS;
use strum::VariantNames;

const GEMINI_HELP: &str = "Get your API key from: https://makersuite.google.com/app/apikey";
const GENERIC_DETAILS: &str = "Something went wrong";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Request body too large")]
    PayloadTooLarge,
    #[error("Rate limit exceeded")]
    RateLimited {
        max_requests: u32,
        window_minutes: u64,
        retry_after: u64,
    },
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Summary(#[from] SummaryError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Proxy(#[from] ProxyError),
    #[error("Route not found")]
    NotFound,
}

/// An [`ApiError`] ready to be sent, with or without internal details.
#[derive(Debug)]
pub struct ApiFailure {
    pub error: ApiError,
    pub verbose: bool,
}

impl ApiFailure {
    pub fn new(error: impl Into<ApiError>, verbose: bool) -> Self {
        Self {
            error: error.into(),
            verbose,
        }
    }
}

impl From<ApiError> for ApiFailure {
    fn from(error: ApiError) -> Self {
        Self::new(error, false)
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Scan(e) => match e {
                ScanError::InvalidTarget | ScanError::InvalidScanType => StatusCode::BAD_REQUEST,
                ScanError::PrivateNetworkBlocked => StatusCode::FORBIDDEN,
                ScanError::Spawn(_) | ScanError::Timeout(_) | ScanError::Failed(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Summary(e) => match e {
                SummaryError::InvalidInput | SummaryError::OutputTooShort => StatusCode::BAD_REQUEST,
                SummaryError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
                SummaryError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                SummaryError::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
                SummaryError::MissingCredential
                | SummaryError::InvalidCredential(_)
                | SummaryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Report(e) => match e {
                ReportError::MissingFields | ReportError::InvalidTypes => StatusCode::BAD_REQUEST,
                ReportError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Proxy(e) => match e {
                ProxyError::InvalidFilename => StatusCode::BAD_REQUEST,
                ProxyError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn body(&self, verbose: bool) -> Value {
        let error = self.to_string();
        match self {
            ApiError::RateLimited {
                max_requests,
                window_minutes,
                retry_after,
            } => json!({
                "error": error,
                "message": format!(
                    "Too many requests. Limit: {max_requests} requests per {window_minutes} minutes"
                ),
                "retryAfter": retry_after,
            }),
            ApiError::Scan(ScanError::InvalidTarget) => json!({
                "error": error,
                "validFormats": VALID_FORMATS,
            }),
            ApiError::Scan(ScanError::InvalidScanType) => json!({
                "error": error,
                "validTypes": ScanType::VARIANTS,
            }),
            // nmap's own stderr and the timeout notice carry no internals
            ApiError::Scan(e @ (ScanError::Timeout(_) | ScanError::Failed(_))) => json!({
                "error": "Scan failed",
                "details": e.to_string(),
            }),
            ApiError::Scan(e @ ScanError::Spawn(_)) => json!({
                "error": "Scan failed",
                "details": if verbose { e.to_string() } else { GENERIC_DETAILS.to_string() },
            }),
            ApiError::Summary(SummaryError::MissingCredential) => json!({
                "error": error,
                "details": "Create a .env file with: GEMINI_API_KEY=your_actual_api_key",
                "help": GEMINI_HELP,
            }),
            ApiError::Summary(SummaryError::InvalidCredential(msg)) => json!({
                "error": error,
                "details": if verbose { msg.as_str() } else { "Please check your GEMINI_API_KEY environment variable" },
                "help": GEMINI_HELP,
            }),
            ApiError::Summary(SummaryError::QuotaExceeded(_)) => json!({
                "error": error,
                "details": "Please try again later or check your API usage limits",
            }),
            ApiError::Summary(SummaryError::PermissionDenied(_)) => json!({
                "error": error,
                "details": "Your API key does not have permission to access Gemini API",
            }),
            ApiError::Summary(SummaryError::Network(_)) => json!({
                "error": error,
                "details": "Unable to connect to the AI provider.",
                "help": "Try again in a few moments",
            }),
            ApiError::Summary(SummaryError::Internal(msg)) => json!({
                "error": error,
                "details": if verbose { msg.as_str() } else { "Internal server error" },
                "timestamp": timestamp(),
            }),
            ApiError::Report(ReportError::MissingFields) => json!({
                "error": error,
                "required": ["scanOutput", "aiSummary"],
            }),
            ApiError::Report(ReportError::Render(msg)) => json!({
                "error": error,
                "details": if verbose { msg.as_str() } else { GENERIC_DETAILS },
                "timestamp": timestamp(),
            }),
            ApiError::Proxy(ProxyError::Transport(msg)) => json!({
                "success": false,
                "error": if verbose { msg.as_str() } else { "ML service unavailable" },
            }),
            _ => json!({ "error": error }),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = self.error.status();
        let mut response = (status, Json(self.error.body(self.verbose))).into_response();
        if let ApiError::RateLimited { retry_after, .. } = self.error {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        ApiFailure::from(self).into_response()
    }
}
