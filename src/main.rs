mod app;
mod config;
mod error;
mod handlers;
mod metrics;
mod models;
mod proxy;
mod rate_limit;
mod report;
mod scanner;
mod state;
mod summary;
mod validator;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Args;
use crate::rate_limit::spawn_sweeper;
use crate::report::ChromeRenderer;
use crate::state::AppState;
use crate::summary::{GeminiProvider, SummaryProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "nmap_ai_gateway=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // parse cli arguments
    let args = Args::parse();
    let client = reqwest::Client::new();

    let summarizer: Option<Arc<dyn SummaryProvider>> = match args.api_key() {
        Some(key) => Some(Arc::new(GeminiProvider::new(
            client.clone(),
            &args.gemini_url,
            &args.gemini_model,
            key,
        ))),
        None => {
            warn!("GEMINI_API_KEY is not configured, AI summaries will fail");
            None
        }
    };
    let renderer = Arc::new(ChromeRenderer::new(args.chrome_path.clone()));
    let state = Arc::new(AppState::from_args(&args, client, summarizer, renderer));

    // stale rate limit entries are swept even when nobody calls
    let sweeper = spawn_sweeper(state.rate_limiter.clone(), args.sweep_interval());

    let app = app::build_router(state, app::cors_layer(&args)?);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server running on http://localhost:{}", args.port);
    info!("Environment: {}", args.environment.as_str());
    info!("Health check: http://localhost:{}/health", args.port);
    info!(
        "Rate limit: {} requests per {} seconds",
        args.rate_limit, args.rate_window
    );
    if args.block_private_networks() {
        info!("Private network targets are blocked");
    }

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Server closed");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, shutting down gracefully"),
        _ = terminate => info!("SIGTERM received, shutting down gracefully"),
    }
}
