mod analysis;
mod gate;
mod health;
mod metrics;
mod report;
mod scan;
mod summary;

pub use analysis::{download_file, list_files, predict, score_pcap, start_tcpdump, stop_tcpdump};
pub use gate::rate_limit_gate;
pub use health::{health_handler, not_found};
pub use metrics::metrics_handler;
pub use report::report_handler;
pub use scan::scan_handler;
pub use summary::summary_handler;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

use crate::error::ApiError;

// Malformed bodies are a client error, never axum's default 422
fn bad_body(rejection: JsonRejection) -> ApiError {
    // over the body limit
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge;
    }
    ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
}
