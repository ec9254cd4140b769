//! OpenAI-compatible embedding client.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::EmbeddingClient;
use crate::record::EmbeddingVector;

/// Embeddings client that talks to OpenAI-compatible `/embeddings` endpoints.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: Option<usize>,
}

impl OpenAiEmbedder {
    /// Builds a new OpenAI embeddings client.
    ///
    /// `dimensions` is forwarded to the API and also pins the length every
    /// returned vector must have.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: String,
        dimensions: Option<usize>,
        timeout: Duration,
    ) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing OpenAI API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing OpenAI model name");
        if let Some(dims) = dimensions {
            anyhow::ensure!(dims > 0, "embedding dimensions must be positive");
        }
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).context("invalid OpenAI API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build OpenAI HTTP client")?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model,
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let inputs = [text];
        let request = EmbeddingRequest {
            model: &self.model,
            input: &inputs,
            dimensions: self.dimensions,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .context("failed to call OpenAI embeddings")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("OpenAI embeddings request failed ({}): {}", status, body);
        }
        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .context("failed to parse OpenAI embedding response")?;
        let values = parsed.into_single()?;
        if let Some(expected) = self.dimensions {
            anyhow::ensure!(
                values.len() == expected,
                "OpenAI returned a {}-dimension embedding, expected {}",
                values.len(),
                expected
            );
        }
        EmbeddingVector::new(values)
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    #[serde(borrow)]
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

impl EmbeddingResponse {
    fn into_single(mut self) -> Result<Vec<f32>> {
        anyhow::ensure!(
            self.data.len() == 1,
            "OpenAI returned {} embeddings for 1 input",
            self.data.len()
        );
        self.data.sort_by_key(|entry| entry.index);
        Ok(self.data.remove(0).embedding)
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_credentials() {
        let err = OpenAiEmbedder::new(
            "  ",
            "https://api.openai.com/v1",
            "text-embedding-3-small".into(),
            None,
            Duration::from_secs(5),
        )
        .err()
        .expect("blank key rejected");
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let embedder = OpenAiEmbedder::new(
            "sk-test",
            "http://localhost:9000/v1/",
            "text-embedding-3-small".into(),
            Some(1536),
            Duration::from_secs(5),
        )
        .expect("client builds");
        assert_eq!(embedder.endpoint, "http://localhost:9000/v1/embeddings");
        assert_eq!(EmbeddingClient::dimensions(&embedder), Some(1536));
    }

    #[test]
    fn parses_single_embedding_payload() {
        let payload = r#"{"data":[{"embedding":[0.1,0.2,0.3],"index":0}],"model":"m"}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(payload).expect("parse");
        assert_eq!(parsed.into_single().expect("one row"), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn request_omits_unset_dimensions() {
        let inputs = ["hello"];
        let request = EmbeddingRequest {
            model: "text-embedding-3-small",
            input: &inputs,
            dimensions: None,
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"model": "text-embedding-3-small", "input": ["hello"]})
        );
    }
}
