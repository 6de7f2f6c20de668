//! Generative Service Client

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::AdvisorError;

/// Advisor configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Answer from the deterministic fallback without calling out (default: true)
    pub mock: bool,
    /// API key for the generative service
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// Service base URL
    pub base_url: String,
    /// Deadline for one generate call, including reading the body (ms)
    pub timeout_ms: u64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            mock: true,
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_ms: 8000,
        }
    }
}

impl std::fmt::Debug for AdvisorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvisorConfig")
            .field("mock", &self.mock)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a new client.
    ///
    /// A missing API key is not an error here; it surfaces on each call so the
    /// caller can fall back per request.
    pub fn new(config: &AdvisorConfig) -> Result<Self, AdvisorError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AdvisorError::ClientSetup(e.to_string()))?;

        info!("Creating generative client for model {} at {}", config.model, config.base_url);
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    /// Whether an API key is configured
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate text for a prompt.
    ///
    /// The whole exchange runs under one deadline. On expiry the request
    /// future is dropped, which closes the connection.
    pub async fn generate(&self, prompt: &str) -> Result<String, AdvisorError> {
        let api_key = self.api_key.as_deref().ok_or(AdvisorError::MissingCredential)?;
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = serde_json::json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ]
        });

        let start = Instant::now();
        let exchange = async {
            let response = self
                .http
                .post(&url)
                .header("x-goog-api-key", api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| AdvisorError::Network(e.to_string()))?;

            if !response.status().is_success() {
                return Err(AdvisorError::Status(response.status().as_u16()));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| AdvisorError::InvalidResponse(format!("Failed to parse response: {}", e)))
        };

        let payload = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| AdvisorError::Timeout(self.timeout.as_millis() as u64))??;
        debug!("Generative call completed in {}ms", start.elapsed().as_millis());

        payload
            .get("candidates")
            .and_then(|candidates| candidates.get(0))
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(|parts| parts.get(0))
            .and_then(|part| part.get("text"))
            .and_then(|text| text.as_str())
            .map(|text| text.trim().to_string())
            .ok_or_else(|| AdvisorError::InvalidResponse("No text in response".to_string()))
    }
}
