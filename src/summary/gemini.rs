//! Google Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Prompt, ProviderError, SummaryProvider};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(client: Client, base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn request_body(prompt: &Prompt) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part { text: &prompt.user }],
        }],
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: &prompt.system,
            }],
        },
    }
}

// Concatenates the text parts of the first candidate
fn extract_text(response: GenerateContentResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default()
}

// Keeps the API status code name so the caller can classify it
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(code) => format!("[{status} {code}] {}", envelope.error.message),
            None => format!("[{status}] {}", envelope.error.message),
        },
        Err(_) => format!("[{status}] {body}"),
    }
}

#[async_trait]
impl SummaryProvider for GeminiProvider {
    fn name(&self) -> &str {
        "Gemini API"
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError(error_message(status, &body)));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError(format!("Invalid response from Gemini API: {e}")))?;
        debug!("Received response from Gemini API");
        Ok(extract_text(body))
    }
}
