use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::debug;

use super::{PageSetup, PdfRenderer, RenderSession, ReportError};

const MM_PER_INCH: f64 = 25.4;

const CHROME_ARGS: [&str; 5] = [
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
];

/// Headless Chromium, one browser process per report.
pub struct ChromeRenderer {
    chrome_path: Option<PathBuf>,
}

impl ChromeRenderer {
    pub fn new(chrome_path: Option<PathBuf>) -> Self {
        Self { chrome_path }
    }
}

struct ChromeSession {
    // kept alive until close, dropping it kills the browser process
    browser: Browser,
    tab: Arc<Tab>,
}

fn render_err(e: impl std::fmt::Display) -> ReportError {
    ReportError::Render(e.to_string())
}

fn inches(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

impl PdfRenderer for ChromeRenderer {
    fn launch(&self, page: &PageSetup) -> Result<Box<dyn RenderSession>, ReportError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .path(self.chrome_path.clone())
            .window_size(Some(page.viewport))
            .args(CHROME_ARGS.iter().map(|arg| OsStr::new(*arg)).collect())
            .build()
            .map_err(render_err)?;

        let browser = Browser::new(options).map_err(render_err)?;
        let tab = browser.new_tab().map_err(render_err)?;
        debug!("Headless browser launched");
        Ok(Box::new(ChromeSession { browser, tab }))
    }
}

impl RenderSession for ChromeSession {
    fn set_content(&mut self, html: &str) -> Result<(), ReportError> {
        let url = format!("data:text/html;charset=utf-8;base64,{}", STANDARD.encode(html));
        self.tab
            .navigate_to(&url)
            .map_err(render_err)?
            .wait_until_navigated()
            .map_err(render_err)?;
        Ok(())
    }

    fn print_pdf(&mut self, page: &PageSetup) -> Result<Vec<u8>, ReportError> {
        let margin = inches(page.margin_mm);
        let options = PrintToPdfOptions {
            print_background: Some(page.print_background),
            paper_width: Some(inches(page.width_mm)),
            paper_height: Some(inches(page.height_mm)),
            margin_top: Some(margin),
            margin_bottom: Some(margin),
            margin_left: Some(margin),
            margin_right: Some(margin),
            ..Default::default()
        };
        self.tab.print_to_pdf(Some(options)).map_err(render_err)
    }

    fn close(self: Box<Self>) -> Result<(), ReportError> {
        let ChromeSession { browser, tab } = *self;
        let closed = tab.close(true).map(|_| ()).map_err(render_err);
        drop(browser);
        debug!("Headless browser closed");
        closed
    }
}
