//! Pass-through client for the Python ML analysis service.

use axum::http::StatusCode;
use reqwest::{Client, Method};
use serde_json::Value;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Invalid filename")]
    InvalidFilename,
    #[error("{0}")]
    Transport(String),
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::Transport(err.to_string())
    }
}

/// Relayed upstream answer.
#[derive(Debug)]
pub struct Relayed {
    pub status: StatusCode,
    pub body: Value,
}

#[derive(Debug)]
pub enum Download {
    File { filename: String, bytes: Vec<u8> },
    Missing(StatusCode),
}

#[derive(Clone)]
pub struct MlProxy {
    client: Client,
    base_url: String,
}

fn relay_status(status: reqwest::StatusCode) -> StatusCode {
    StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)
}

// Plain file names only, nothing that walks the upstream path
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains(['/', '\\', '?', '#', '%'])
        && !name.chars().any(char::is_control)
}

impl MlProxy {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn forward(&self, method: Method, endpoint: &str, body: Option<Value>) -> Result<Relayed, ProxyError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            error!("ML API Proxy Error: {}", e);
            ProxyError::from(e)
        })?;
        let status = relay_status(response.status());
        let body = response.json::<Value>().await?;
        Ok(Relayed { status, body })
    }

    pub async fn download(&self, filename: &str) -> Result<Download, ProxyError> {
        if !is_safe_filename(filename) {
            return Err(ProxyError::InvalidFilename);
        }

        let url = format!("{}/api/analysis/download/{}", self.base_url, filename);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Ok(Download::Missing(relay_status(response.status())));
        }

        let bytes = response.bytes().await?.to_vec();
        Ok(Download::File {
            filename: filename.to_string(),
            bytes,
        })
    }
}
