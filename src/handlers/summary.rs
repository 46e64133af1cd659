use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use super::bad_body;
use crate::error::ApiFailure;
use crate::models::{SummaryRequest, SummaryResponse, as_str};
use crate::state::AppState;
use crate::summary::get_summary;

pub async fn summary_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<Json<SummaryResponse>, ApiFailure> {
    let Json(request) = payload.map_err(|r| state.fail(bad_body(r)))?;

    let summary = get_summary(
        state.summarizer.as_deref(),
        as_str(&request.scan_output),
        as_str(&request.target),
    )
    .await
    .map_err(|e| state.fail(e))?;

    Ok(Json(SummaryResponse {
        success: true,
        summary: summary.summary,
        target: summary.target,
        timestamp: chrono::Utc::now().to_rfc3339(),
        analysis_length: summary.raw_length,
    }))
}
