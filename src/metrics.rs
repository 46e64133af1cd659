use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("nmap_ai_requests_total", "Total number of rate limited endpoint requests").unwrap();
    pub static ref RATE_LIMITED: Counter =
        register_counter!("nmap_ai_rate_limited_total", "Requests rejected by the rate limiter").unwrap();
    pub static ref RATE_LIMIT_CLIENTS: Gauge =
        register_gauge!("nmap_ai_rate_limit_clients", "Current number of clients in the rate limit table").unwrap();
    pub static ref SCANS_FAILED: Counter =
        register_counter!("nmap_ai_scans_failed_total", "Scans that failed or timed out").unwrap();
    pub static ref SCAN_DURATION: Histogram = register_histogram!(
        "nmap_ai_scan_duration_seconds",
        "Scan wall clock time in seconds",
        vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]
    )
    .unwrap();
    pub static ref SUMMARY_LATENCY: Histogram = register_histogram!(
        "nmap_ai_summary_latency_seconds",
        "AI provider latency in seconds"
    )
    .unwrap();
    pub static ref REPORTS_TOTAL: Counter =
        register_counter!("nmap_ai_reports_total", "PDF reports generated").unwrap();
}
