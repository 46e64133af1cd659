//! PDF reports from a scan and its summary.

pub mod chrome;
pub mod html;

pub use chrome::ChromeRenderer;

use thiserror::Error;
use tracing::{info, warn};

const UNKNOWN_TARGET: &str = "unknown";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Missing required fields.")]
    MissingFields,
    #[error("Invalid data types. scanOutput and aiSummary must be strings.")]
    InvalidTypes,
    #[error("Failed to generate PDF report")]
    Render(String),
}

/// Millimetres, A4 portrait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    pub width_mm: f64,
    pub height_mm: f64,
    pub margin_mm: f64,
    pub print_background: bool,
    pub viewport: (u32, u32),
}

pub const A4: PageSetup = PageSetup {
    width_mm: 210.0,
    height_mm: 297.0,
    margin_mm: 20.0,
    print_background: true,
    viewport: (1200, 800),
};

/// Launches rendering sessions. Blocking; call from a blocking thread.
pub trait PdfRenderer: Send + Sync {
    fn launch(&self, page: &PageSetup) -> Result<Box<dyn RenderSession>, ReportError>;
}

/// One acquired renderer instance. Must be closed whatever happens.
pub trait RenderSession {
    fn set_content(&mut self, html: &str) -> Result<(), ReportError>;
    fn print_pdf(&mut self, page: &PageSetup) -> Result<Vec<u8>, ReportError>;
    fn close(self: Box<Self>) -> Result<(), ReportError>;
}

/// `[A-Za-z0-9.-]` survive, everything else becomes `_`.
pub fn sanitize_filename_target(target: Option<&str>) -> String {
    match target {
        Some(t) if !t.is_empty() => t
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect(),
        _ => UNKNOWN_TARGET.to_string(),
    }
}

pub fn report_filename(target: Option<&str>, timestamp_millis: i64) -> String {
    format!("Nmap-Report-{}-{}.pdf", sanitize_filename_target(target), timestamp_millis)
}

/// Renders `html`, releasing the session on every path.
pub fn render_pdf(renderer: &dyn PdfRenderer, html: &str, page: &PageSetup) -> Result<Vec<u8>, ReportError> {
    info!("Launching renderer for PDF generation...");
    let mut session = renderer.launch(page)?;

    let result = session
        .set_content(html)
        .and_then(|_| session.print_pdf(page));

    if let Err(e) = session.close() {
        warn!("Error closing renderer: {}", e);
    }

    if result.is_ok() {
        info!("PDF generated successfully");
    }
    result
}
