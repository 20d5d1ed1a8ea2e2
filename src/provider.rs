//! HTTP client for the LLM provider.
//!
//! Talks to an OpenAI-compatible API: `POST /v1/embeddings` for batched
//! embedding generation and `POST /v1/responses` for text generation.
//!
//! Every failure is classified at this boundary into the closed
//! [`ProviderError`] set, so the rest of the pipeline never inspects
//! `reqwest` errors or HTTP status codes:
//!
//! - HTTP 429 → [`ProviderError::RateLimited`] (transient)
//! - network/timeout → [`ProviderError::Connection`] (transient)
//! - HTTP 401/403 → [`ProviderError::Auth`] (fatal)
//! - everything else → [`ProviderError::Api`] (fatal)
//!
//! The client performs exactly one request per method call; retry lives in
//! [`crate::retry`], composed by the caller.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::ProviderConfig;
use crate::error::PipelineError;

/// Classified outcome of a provider call gone wrong.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider throttled the request (HTTP 429). Retryable.
    #[error("provider rate limited the request: {0}")]
    RateLimited(String),

    /// The request never completed (connect failure, timeout). Retryable.
    #[error("connection to provider failed: {0}")]
    Connection(String),

    /// The provider rejected the credential (HTTP 401/403). Never retried.
    #[error("provider rejected credentials: {0}")]
    Auth(String),

    /// Any other provider failure, including unexpected response shapes.
    #[error("provider request failed (status {status}): {body}")]
    Api { status: u16, body: String },
}

impl ProviderError {
    /// Whether the retry policy may attempt this call again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited(_) | ProviderError::Connection(_)
        )
    }
}

/// Client for one OpenAI-compatible provider.
///
/// Construction validates that the configured credential is present, so a
/// missing API key surfaces as [`PipelineError::Configuration`] before any
/// network call is made.
#[derive(Debug)]
pub struct ProviderClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    embedding_model: String,
    embedding_dims: usize,
}

impl ProviderClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, PipelineError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            PipelineError::Configuration(format!(
                "environment variable {} is not set",
                config.api_key_env
            ))
        })?;
        if api_key.trim().is_empty() {
            return Err(PipelineError::Configuration(format!(
                "environment variable {} is empty",
                config.api_key_env
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key,
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_dims: config.embedding_dims,
        })
    }

    /// Embed a batch of texts in one provider call.
    ///
    /// Returns one vector per input text, in input order. A response with a
    /// different count than the request, or with vectors of a different
    /// dimensionality than configured, is an [`ProviderError::Api`] failure.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let request = EmbeddingsRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), body));
        }

        let mut parsed: EmbeddingsResponse = response.json().await.map_err(|e| {
            ProviderError::Api {
                status: status.as_u16(),
                body: format!("unparseable embeddings response: {e}"),
            }
        })?;

        // Provider order is not contractual; the index field is.
        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() != texts.len() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: format!(
                    "provider returned {} embeddings for {} inputs",
                    parsed.data.len(),
                    texts.len()
                ),
            });
        }

        // Mixed-dimensionality rows would corrupt the vector table; reject
        // the whole batch before anything is persisted.
        if let Some(entry) = parsed
            .data
            .iter()
            .find(|entry| entry.embedding.len() != self.embedding_dims)
        {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: format!(
                    "provider returned a {}-dimensional embedding, expected {}",
                    entry.embedding.len(),
                    self.embedding_dims
                ),
            });
        }

        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }

    /// Generate text from a system instruction block plus a user message.
    ///
    /// Returns the raw concatenated output text; callers treat it as
    /// untrusted until validated.
    pub async fn generate(&self, instructions: &str, input: &str) -> Result<String, ProviderError> {
        let url = format!("{}/v1/responses", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            input: vec![
                GenerateMessage {
                    role: "system",
                    content: instructions,
                },
                GenerateMessage {
                    role: "user",
                    content: input,
                },
            ],
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), body));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| ProviderError::Api {
            status: status.as_u16(),
            body: format!("unparseable generation response: {e}"),
        })?;

        Ok(extract_output_text(&body))
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingsEntry>,
}

#[derive(Deserialize)]
struct EmbeddingsEntry {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    input: Vec<GenerateMessage<'a>>,
}

#[derive(Serialize)]
struct GenerateMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Concatenate every `output_text` fragment in a responses-API payload.
/// The API may spread text across multiple message items.
fn extract_output_text(body: &serde_json::Value) -> String {
    let mut text = String::new();
    if let Some(items) = body.get("output").and_then(|o| o.as_array()) {
        for item in items {
            if item.get("type").and_then(|t| t.as_str()) != Some("message") {
                continue;
            }
            if let Some(parts) = item.get("content").and_then(|c| c.as_array()) {
                for part in parts {
                    if part.get("type").and_then(|t| t.as_str()) == Some("output_text") {
                        if let Some(fragment) = part.get("text").and_then(|t| t.as_str()) {
                            text.push_str(fragment);
                        }
                    }
                }
            }
        }
    }
    text
}

fn classify_status(status: u16, body: String) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Auth(body),
        429 => ProviderError::RateLimited(body),
        _ => ProviderError::Api { status, body },
    }
}

fn classify_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        ProviderError::Connection(err.to_string())
    } else {
        ProviderError::Api {
            status: 0,
            body: err.to_string(),
        }
    }
}
