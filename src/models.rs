use serde::{Deserialize, Serialize};
use serde_json::Value;

// Request fields stay untyped so a wrong JSON type gets the endpoint's own
// validation message instead of a generic body rejection.

/// String view of an optional JSON field.
pub fn as_str(value: &Option<Value>) -> Option<&str> {
    value.as_ref().and_then(Value::as_str)
}

// POST /api/scan
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub target: Option<Value>,
    pub scan_type: Option<Value>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub scan_output: String,
    pub target: String,
    pub scan_type: String,
    pub timestamp: String,
}

// POST /api/ai-summary
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub scan_output: Option<Value>,
    pub target: Option<Value>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub success: bool,
    pub summary: String,
    pub target: String,
    pub timestamp: String,
    pub analysis_length: usize,
}

// POST /api/report
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub target: Option<Value>,
    pub scan_output: Option<Value>,
    pub ai_summary: Option<Value>,
}

// POST /api/analysis/start-tcpdump
#[derive(Deserialize, Debug, Clone)]
pub struct TcpdumpRequest {
    #[serde(default = "default_duration")]
    pub duration: u64,
    #[serde(default = "default_interface")]
    pub interface: String,
}

fn default_duration() -> u64 {
    30
}

fn default_interface() -> String {
    "eth0".to_string()
}

impl Default for TcpdumpRequest {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            interface: default_interface(),
        }
    }
}
