use axum::Json;
use axum::response::IntoResponse;

use crate::error::ApiError;

// health handler
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
