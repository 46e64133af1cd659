use std::sync::Arc;

use crate::config::Args;
use crate::error::{ApiError, ApiFailure};
use crate::proxy::MlProxy;
use crate::rate_limit::RateLimiter;
use crate::report::PdfRenderer;
use crate::scanner::ScanInvoker;
use crate::summary::SummaryProvider;

// app's shared state
pub struct AppState {
    pub rate_limiter: Arc<RateLimiter>,
    pub scanner: ScanInvoker,
    pub summarizer: Option<Arc<dyn SummaryProvider>>, // None when no API key is configured
    pub renderer: Arc<dyn PdfRenderer>,
    pub ml_proxy: MlProxy,
    pub verbose_errors: bool, // development mode shows internal error details
}

impl AppState {
    pub fn from_args(
        args: &Args,
        client: reqwest::Client,
        summarizer: Option<Arc<dyn SummaryProvider>>,
        renderer: Arc<dyn PdfRenderer>,
    ) -> Self {
        Self {
            rate_limiter: Arc::new(RateLimiter::new(args.rate_limit, args.rate_window())),
            scanner: ScanInvoker::new(
                args.nmap_bin.clone(),
                args.scan_timeout(),
                args.block_private_networks(),
            ),
            summarizer,
            renderer,
            ml_proxy: MlProxy::new(client, &args.ml_api_url),
            verbose_errors: !args.is_production(),
        }
    }

    pub fn fail(&self, error: impl Into<ApiError>) -> ApiFailure {
        ApiFailure::new(error, self.verbose_errors)
    }
}
