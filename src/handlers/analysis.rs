// Pass-through endpoints for the ML analysis service

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use reqwest::Method;
use serde_json::{Value, json};

use super::bad_body;
use crate::error::ApiFailure;
use crate::models::TcpdumpRequest;
use crate::proxy::{Download, Relayed};
use crate::state::AppState;

fn relay(relayed: Relayed) -> Response {
    (relayed.status, Json(relayed.body)).into_response()
}

async fn forward(state: &AppState, method: Method, endpoint: &str, body: Option<Value>) -> Result<Response, ApiFailure> {
    state
        .ml_proxy
        .forward(method, endpoint, body)
        .await
        .map(relay)
        .map_err(|e| state.fail(e))
}

pub async fn start_tcpdump(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TcpdumpRequest>, JsonRejection>,
) -> Result<Response, ApiFailure> {
    let request = match payload {
        Ok(Json(request)) => request,
        // no body at all means defaults
        Err(JsonRejection::MissingJsonContentType(_)) => TcpdumpRequest::default(),
        Err(rejection) => return Err(state.fail(bad_body(rejection))),
    };
    let body = json!({ "duration": request.duration, "interface": request.interface });
    forward(&state, Method::POST, "/api/analysis/start-tcpdump", Some(body)).await
}

pub async fn stop_tcpdump(State(state): State<Arc<AppState>>) -> Result<Response, ApiFailure> {
    forward(&state, Method::POST, "/api/analysis/stop-tcpdump", None).await
}

pub async fn score_pcap(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiFailure> {
    let Json(body) = payload.map_err(|r| state.fail(bad_body(r)))?;
    forward(&state, Method::POST, "/api/analysis/score", Some(body)).await
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiFailure> {
    let Json(body) = payload.map_err(|r| state.fail(bad_body(r)))?;
    forward(&state, Method::POST, "/api/analysis/predict", Some(body)).await
}

pub async fn list_files(State(state): State<Arc<AppState>>) -> Result<Response, ApiFailure> {
    forward(&state, Method::GET, "/api/analysis/list-files", None).await
}

pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiFailure> {
    match state.ml_proxy.download(&filename).await.map_err(|e| state.fail(e))? {
        Download::File { filename, bytes } => Ok((
            [
                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
            ],
            bytes,
        )
            .into_response()),
        Download::Missing(status) => Ok((status, Json(json!({ "error": "File not found" }))).into_response()),
    }
}
