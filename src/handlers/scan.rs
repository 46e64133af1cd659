use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use super::bad_body;
use crate::error::ApiFailure;
use crate::models::{ScanRequest, ScanResponse, as_str};
use crate::state::AppState;

pub async fn scan_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanResponse>, ApiFailure> {
    let Json(request) = payload.map_err(|r| state.fail(bad_body(r)))?;

    let target = as_str(&request.target).unwrap_or_default();
    let scan_type = as_str(&request.scan_type).unwrap_or_default();

    let result = state
        .scanner
        .run_named(target, scan_type)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(ScanResponse {
        scan_output: result.output,
        target: target.trim().to_string(),
        scan_type: scan_type.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}
