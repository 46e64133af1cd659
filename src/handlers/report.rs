use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::error;

use super::bad_body;
use crate::error::ApiFailure;
use crate::metrics::REPORTS_TOTAL;
use crate::models::{ReportRequest, as_str};
use crate::report::html::build_report_html;
use crate::report::{A4, ReportError, render_pdf, report_filename};
use crate::state::AppState;

fn is_missing(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

fn report_inputs(request: &ReportRequest) -> Result<(&str, &str), ReportError> {
    if is_missing(&request.scan_output) || is_missing(&request.ai_summary) {
        return Err(ReportError::MissingFields);
    }
    match (as_str(&request.scan_output), as_str(&request.ai_summary)) {
        (Some(scan_output), Some(ai_summary)) => Ok((scan_output, ai_summary)),
        _ => Err(ReportError::InvalidTypes),
    }
}

pub async fn report_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Response, ApiFailure> {
    let Json(request) = payload.map_err(|r| state.fail(bad_body(r)))?;
    let (scan_output, ai_summary) = report_inputs(&request).map_err(|e| state.fail(e))?;
    let target = as_str(&request.target);

    let now = chrono::Utc::now();
    let html = build_report_html(
        target.unwrap_or("Unknown"),
        scan_output,
        ai_summary,
        &now.to_rfc3339(),
    );

    let renderer = state.renderer.clone();
    let pdf = tokio::task::spawn_blocking(move || render_pdf(renderer.as_ref(), &html, &A4))
        .await
        .map_err(|e| ReportError::Render(e.to_string()))
        .and_then(|rendered| rendered)
        .map_err(|e| {
            error!("PDF rendering failed: {:?}", e);
            state.fail(e)
        })?;

    REPORTS_TOTAL.inc();
    let filename = report_filename(target, now.timestamp_millis());
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
            (header::CONTENT_LENGTH, pdf.len().to_string()),
        ],
        pdf,
    )
        .into_response())
}
