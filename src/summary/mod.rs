//! AI security summaries of scan output.

pub mod gemini;

pub use gemini::GeminiProvider;

use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info};

use crate::metrics::SUMMARY_LATENCY;
use crate::validator::sanitize_input;

/// Scan output shorter than this (trimmed) is not a real scan result.
pub const MIN_SCAN_OUTPUT_LEN: usize = 10;
/// Provider text shorter than this (trimmed) is treated as a failure.
pub const MIN_SUMMARY_LEN: usize = 50;

const UNKNOWN_TARGET: &str = "Unknown";

const SYSTEM_PROMPT: &str = r#"You are a professional cybersecurity analyst with expertise in network security and vulnerability assessment.

Your task is to analyze Nmap scan results and provide a comprehensive security report with the following structure:

## SECURITY ANALYSIS REPORT

### EXECUTIVE SUMMARY
- Brief overview of the scan results
- Overall security posture assessment
- Key findings summary

### DETAILED FINDINGS
For each open port/service found:
- **Port/Service**: [Port number and service name]
- **Risk Level**: HIGH/MEDIUM/LOW
- **Vulnerability**: [Specific security concerns]
- **Impact**: [Potential business impact]
- **Evidence**: [Relevant scan data]

### CRITICAL ISSUES
List any high-risk findings that require immediate attention

### RECOMMENDATIONS
Prioritized remediation steps:
1. **Immediate Actions** (Critical)
2. **Short-term Actions** (High Priority)
3. **Long-term Actions** (Medium Priority)

### RISK ASSESSMENT
- Overall risk score (1-10)
- Compliance considerations
- Business impact assessment

### TECHNICAL DETAILS
- Service versions and potential vulnerabilities
- Network topology insights
- Security best practices recommendations

Format the response in clear, professional language suitable for both technical and executive audiences."#;

/// The two halves of a summary request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn for_scan(target: &str, scan_output: &str) -> Self {
        let user = format!(
            "Analyze the following Nmap scan results and provide a comprehensive security analysis:\n\n\
             **Target**: {target}\n\
             **Scan Output**:\n```\n{scan_output}\n```\n\n\
             Please provide a detailed security analysis following the structure outlined above."
        );
        Self {
            system: SYSTEM_PROMPT.to_string(),
            user,
        }
    }
}

/// Failure raised by a provider. The message is inspected to classify it.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError(format!("Request timeout: {err}"))
        } else if err.is_connect() {
            ProviderError(format!("network error: {err}"))
        } else {
            ProviderError(err.to_string())
        }
    }
}

#[async_trait]
pub trait SummaryProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Sends the prompt and returns the generated text.
    async fn complete(&self, prompt: &Prompt) -> Result<String, ProviderError>;
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Invalid scan output. Must be a non-empty string.")]
    InvalidInput,
    #[error("Scan output too short. Please provide a valid Nmap scan result.")]
    OutputTooShort,
    #[error("Missing or invalid Gemini API key. Please configure GEMINI_API_KEY in environment variables.")]
    MissingCredential,
    #[error("Invalid or missing API key")]
    InvalidCredential(String),
    #[error("API quota exceeded")]
    QuotaExceeded(String),
    #[error("Permission denied")]
    PermissionDenied(String),
    #[error("Network error")]
    Network(String),
    #[error("Failed to generate AI summary")]
    Internal(String),
}

/// Maps a provider failure message onto a reported category.
pub fn classify(err: ProviderError) -> SummaryError {
    let msg = err.0;
    if msg.contains("API key") || msg.contains("API_KEY") {
        SummaryError::InvalidCredential(msg)
    } else if msg.contains("quota") || msg.contains("QUOTA_EXCEEDED") || msg.contains("RESOURCE_EXHAUSTED") {
        SummaryError::QuotaExceeded(msg)
    } else if msg.contains("PERMISSION_DENIED") {
        SummaryError::PermissionDenied(msg)
    } else if msg.contains("network") || msg.contains("timeout") {
        SummaryError::Network(msg)
    } else {
        SummaryError::Internal(msg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub summary: String,
    pub target: String,
    /// Length of the provider text before trimming
    pub raw_length: usize,
}

pub async fn get_summary(
    provider: Option<&dyn SummaryProvider>,
    scan_output: Option<&str>,
    target: Option<&str>,
) -> Result<Summary, SummaryError> {
    let scan_output = match scan_output {
        Some(s) if !s.is_empty() => s,
        _ => return Err(SummaryError::InvalidInput),
    };
    if scan_output.trim().chars().count() < MIN_SCAN_OUTPUT_LEN {
        return Err(SummaryError::OutputTooShort);
    }
    let provider = provider.ok_or(SummaryError::MissingCredential)?;

    // free text from the client, it is echoed back and embedded in the prompt
    let target = target
        .map(sanitize_input)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNKNOWN_TARGET.to_string());
    info!("Generating AI analysis for target: {}", target);

    let prompt = Prompt::for_scan(&target, scan_output);
    let start = Instant::now();
    info!("Sending request to {}...", provider.name());
    let text = provider.complete(&prompt).await.map_err(|e| {
        error!("Error generating AI summary: {}", e);
        classify(e)
    })?;
    SUMMARY_LATENCY.observe(start.elapsed().as_secs_f64());

    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_SUMMARY_LEN {
        error!("Empty or insufficient response from AI model: {:?}", text);
        return Err(SummaryError::Internal(
            "Empty or insufficient response from AI model".to_string(),
        ));
    }

    info!("AI analysis generated successfully");
    Ok(Summary {
        summary: trimmed.to_string(),
        target,
        raw_length: text.len(),
    })
}
