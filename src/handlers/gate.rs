use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::error::ApiError;
use crate::metrics::{RATE_LIMITED, REQUEST_TOTAL};
use crate::rate_limit::UNKNOWN_CLIENT;
use crate::state::AppState;

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

// Fixed window gate in front of every mutating endpoint
pub async fn rate_limit_gate(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    REQUEST_TOTAL.inc();
    let client = client_key(&request);
    let limiter = &state.rate_limiter;

    match limiter.check(&client, Instant::now()) {
        Ok(()) => next.run(request).await,
        Err(limited) => {
            RATE_LIMITED.inc();
            debug!(client = %client, retry_after = limited.retry_after_secs, "Rate limit exceeded");
            ApiError::RateLimited {
                max_requests: limiter.max_requests(),
                window_minutes: limiter.window().as_secs() / 60,
                retry_after: limited.retry_after_secs,
            }
            .into_response()
        }
    }
}
