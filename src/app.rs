use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Args;
use crate::handlers;
use crate::state::AppState;

const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Any origin in development, only the frontend (with credentials) in production.
pub fn cors_layer(args: &Args) -> anyhow::Result<CorsLayer> {
    if !args.is_production() {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let origin = HeaderValue::from_str(&args.frontend_url).context("Invalid FRONTEND_URL")?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]))
}

pub fn build_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    // everything that spawns work or calls out goes through the rate limiter
    let limited = Router::new()
        .route("/api/scan", post(handlers::scan_handler))
        .route("/api/ai-summary", post(handlers::summary_handler))
        .route("/api/report", post(handlers::report_handler))
        .route("/api/analysis/start-tcpdump", post(handlers::start_tcpdump))
        .route("/api/analysis/stop-tcpdump", post(handlers::stop_tcpdump))
        .route("/api/analysis/score", post(handlers::score_pcap))
        .route("/api/analysis/predict", post(handlers::predict))
        .route_layer(middleware::from_fn_with_state(state.clone(), handlers::rate_limit_gate));

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/api/analysis/files", get(handlers::list_files))
        .route("/api/analysis/download/{filename}", get(handlers::download_file))
        .merge(limited)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::atomic::Ordering;

    use clap::Parser;
    use serde_json::{Value, json};

    use crate::report::PdfRenderer;
    use crate::report::tests::FakeRenderer;
    use crate::summary::SummaryProvider;
    use crate::summary::tests::StubProvider;

    fn state_with(
        flags: &[&str],
        summarizer: Option<Arc<dyn SummaryProvider>>,
        renderer: Arc<dyn PdfRenderer>,
    ) -> Arc<AppState> {
        let args = Args::parse_from(std::iter::once("nmap-ai-gateway").chain(flags.iter().copied()));
        Arc::new(AppState::from_args(&args, reqwest::Client::new(), summarizer, renderer))
    }

    fn default_state() -> Arc<AppState> {
        state_with(
            &["--nmap-bin", "/nonexistent/nmap", "--ml-api-url", "http://127.0.0.1:9"],
            None,
            Arc::new(FakeRenderer::default()),
        )
    }

    // Serves the router on an ephemeral port, returns its base url
    async fn spawn_app(state: Arc<AppState>) -> String {
        let app = build_router(state, CorsLayer::new());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .unwrap();
        });
        format!("http://{addr}")
    }

    async fn post_json(url: &str, body: Value) -> reqwest::Response {
        reqwest::Client::new().post(url).json(&body).send().await.unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let base = spawn_app(default_state()).await;
        let res = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(res.status(), 200);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["status"], "OK");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let base = spawn_app(default_state()).await;
        let res = reqwest::get(format!("{base}/nope")).await.unwrap();
        assert_eq!(res.status(), 404);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "Route not found");
    }

    #[tokio::test]
    async fn metrics_are_exposed() {
        let base = spawn_app(default_state()).await;
        post_json(&format!("{base}/api/scan"), json!({"target": "x"})).await;
        let text = reqwest::get(format!("{base}/metrics")).await.unwrap().text().await.unwrap();
        assert!(text.contains("nmap_ai_requests_total"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn scan_returns_tool_output() {
        let tool = crate::scanner::tests::stub_tool("e2e-nmap", "printf 'PORT STATE\\n80/tcp open\\n'");
        let bin = tool.to_string_lossy().into_owned();
        let state = state_with(
            &["--nmap-bin", bin.as_str()],
            None,
            Arc::new(FakeRenderer::default()),
        );
        let base = spawn_app(state).await;

        let res = post_json(
            &format!("{base}/api/scan"),
            json!({"target": "scanme.nmap.org", "scanType": "basic"}),
        )
        .await;
        assert_eq!(res.status(), 200);
        let body: Value = res.json().await.unwrap();
        assert!(body["scanOutput"].as_str().unwrap().contains("PORT STATE\n80/tcp open"));
        assert_eq!(body["target"], "scanme.nmap.org");
        assert_eq!(body["scanType"], "basic");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn scan_rejects_bad_input() {
        let base = spawn_app(default_state()).await;
        let url = format!("{base}/api/scan");

        let res = post_json(&url, json!({"target": "not a host!", "scanType": "basic"})).await;
        assert_eq!(res.status(), 400);
        let body: Value = res.json().await.unwrap();
        assert!(body["validFormats"].is_array());

        let res = post_json(&url, json!({"target": "scanme.nmap.org", "scanType": "stealth"})).await;
        assert_eq!(res.status(), 400);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["validTypes"], json!(["basic", "aggressive", "passive"]));

        let res = post_json(&url, json!({"target": 42, "scanType": "basic"})).await;
        assert_eq!(res.status(), 400);

        let res = reqwest::Client::new()
            .post(&url)
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 400);
    }

    #[tokio::test]
    async fn private_targets_forbidden_in_production() {
        let state = state_with(
            &["--environment", "production", "--nmap-bin", "/nonexistent/nmap"],
            None,
            Arc::new(FakeRenderer::default()),
        );
        let base = spawn_app(state).await;
        for target in ["10.0.0.1", "127.0.0.0x1", "0x7f000001", "10.0.0.0x1"] {
            let res = post_json(
                &format!("{base}/api/scan"),
                json!({"target": target, "scanType": "basic"}),
            )
            .await;
            assert_eq!(res.status(), 403, "{target}");
        }
    }

    #[tokio::test]
    async fn eleventh_request_gets_429() {
        let base = spawn_app(default_state()).await;
        let url = format!("{base}/api/scan");

        for _ in 0..10 {
            let res = post_json(&url, json!({"target": "scanme.nmap.org", "scanType": "bogus"})).await;
            assert_eq!(res.status(), 400);
        }

        let res = post_json(&url, json!({"target": "scanme.nmap.org", "scanType": "basic"})).await;
        assert_eq!(res.status(), 429);
        let retry = res.headers()["retry-after"].to_str().unwrap().parse::<u64>().unwrap();
        assert!(retry > 0 && retry <= 900);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "Rate limit exceeded");
        assert_eq!(body["retryAfter"], retry);

        // unprotected routes stay reachable
        let res = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(res.status(), 200);
    }

    #[tokio::test]
    async fn summary_flow() {
        let stub = Arc::new(StubProvider::replying(&"Port 80 exposes an HTTP service. ".repeat(3)));
        let state = state_with(&[], Some(stub.clone()), Arc::new(FakeRenderer::default()));
        let base = spawn_app(state).await;
        let url = format!("{base}/api/ai-summary");

        let res = post_json(&url, json!({"scanOutput": " tiny ", "target": "t"})).await;
        assert_eq!(res.status(), 400);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);

        let res = post_json(&url, json!({"scanOutput": 12345678901u64})).await;
        assert_eq!(res.status(), 400);

        let res = post_json(&url, json!({"scanOutput": "PORT STATE\n80/tcp open http", "target": "scanme.nmap.org"})).await;
        assert_eq!(res.status(), 200);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["target"], "scanme.nmap.org");
        assert!(body["summary"].as_str().unwrap().starts_with("Port 80"));
        assert!(body["analysisLength"].as_u64().unwrap() >= 50);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn summary_without_key_is_500() {
        let base = spawn_app(default_state()).await;
        let res = post_json(
            &format!("{base}/api/ai-summary"),
            json!({"scanOutput": "PORT STATE\n80/tcp open http"}),
        )
        .await;
        assert_eq!(res.status(), 500);
    }

    #[tokio::test]
    async fn provider_quota_is_429() {
        let stub = Arc::new(StubProvider::failing("RESOURCE_EXHAUSTED: quota exceeded"));
        let base = spawn_app(state_with(&[], Some(stub), Arc::new(FakeRenderer::default()))).await;
        let res = post_json(
            &format!("{base}/api/ai-summary"),
            json!({"scanOutput": "PORT STATE\n80/tcp open http"}),
        )
        .await;
        assert_eq!(res.status(), 429);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "API quota exceeded");
    }

    #[tokio::test]
    async fn report_is_a_pdf_attachment() {
        let renderer = Arc::new(FakeRenderer::default());
        let base = spawn_app(state_with(&[], None, renderer.clone())).await;

        let res = post_json(
            &format!("{base}/api/report"),
            json!({"target": "192.168.1.0/24", "scanOutput": "80/tcp open", "aiSummary": "All fine"}),
        )
        .await;
        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["content-type"], "application/pdf");
        let disposition = res.headers()["content-disposition"].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment; filename=\"Nmap-Report-192.168.1.0_24-"));
        assert!(disposition.ends_with(".pdf\""));

        let bytes = res.bytes().await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn report_render_failure_still_releases_renderer() {
        let renderer = Arc::new(FakeRenderer {
            fail_on_print: true,
            ..Default::default()
        });
        let base = spawn_app(state_with(&[], None, renderer.clone())).await;

        let res = post_json(
            &format!("{base}/api/report"),
            json!({"target": "t", "scanOutput": "80/tcp open", "aiSummary": "All fine"}),
        )
        .await;
        assert_eq!(res.status(), 500);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "Failed to generate PDF report");
        assert_eq!(body["details"], "printer on fire");
        assert_eq!(renderer.launched.load(Ordering::SeqCst), 1);
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn report_requires_fields() {
        let renderer = Arc::new(FakeRenderer::default());
        let base = spawn_app(state_with(&[], None, renderer.clone())).await;

        let res = post_json(&format!("{base}/api/report"), json!({"target": "t"})).await;
        assert_eq!(res.status(), 400);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["required"], json!(["scanOutput", "aiSummary"]));
        assert_eq!(renderer.launched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn analysis_proxy_failures() {
        let base = spawn_app(default_state()).await;

        let res = post_json(&format!("{base}/api/analysis/predict"), json!({"features": []})).await;
        assert_eq!(res.status(), 500);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["success"], false);

        for name in ["..%2Fsecret", "a%3Fx", "a%23x", "a%2541"] {
            let res = reqwest::get(format!("{base}/api/analysis/download/{name}")).await.unwrap();
            assert_eq!(res.status(), 400, "{name}");
        }
    }
}
