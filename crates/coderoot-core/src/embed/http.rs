//! HTTP embedding provider for OpenAI-compatible services (vLLM, OpenAI, etc.)

use super::{Embedding, EmbeddingProvider};
use crate::error::{CoderootError, Result};
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_DIMENSION: usize = 1536;

/// Embedding provider backed by an OpenAI-compatible `/embeddings` endpoint
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    provider: String,
    dimension: usize,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingsItem>,
}

#[derive(Deserialize)]
struct EmbeddingsItem {
    embedding: Vec<f32>,
}

impl HttpEmbeddingProvider {
    pub fn new(base_url: &str, model: &str, dimension: usize, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            provider: "openai-compatible".to_string(),
            dimension,
        }
    }

    /// Create from environment variables:
    /// `CODEROOT_EMBEDDING_URL`, `CODEROOT_EMBEDDING_MODEL`,
    /// `CODEROOT_EMBEDDING_DIM`, `CODEROOT_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("CODEROOT_EMBEDDING_URL").map_err(|_| {
            CoderootError::Embedding("CODEROOT_EMBEDDING_URL is not set".to_string())
        })?;
        let model = std::env::var("CODEROOT_EMBEDDING_MODEL")
            .unwrap_or_else(|_| "text-embedding-3-small".to_string());
        let dimension = std::env::var("CODEROOT_EMBEDDING_DIM")
            .ok()
            .and_then(|d| d.parse().ok())
            .unwrap_or(DEFAULT_DIMENSION);
        let api_key = std::env::var("CODEROOT_API_KEY").ok();
        Ok(Self::new(&base_url, &model, dimension, api_key))
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Embedding>> {
        let url = format!("{}/embeddings", self.base_url);
        let mut req = self.client.post(&url).json(&serde_json::json!({
            "model": self.model,
            "input": inputs,
        }));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            return Err(CoderootError::Embedding(format!(
                "embedding service returned {}",
                response.status()
            )));
        }
        let body: EmbeddingsResponse = response.json().await?;
        if body.data.len() != inputs.len() {
            return Err(CoderootError::Embedding(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                body.data.len()
            )));
        }

        let mut out = Vec::with_capacity(body.data.len());
        for item in body.data {
            if item.embedding.len() != self.dimension {
                return Err(CoderootError::Embedding(format!(
                    "embedding has {} dimensions, expected {}",
                    item.embedding.len(),
                    self.dimension
                )));
            }
            out.push(Embedding::new(item.embedding));
        }
        Ok(out)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut result = self.request(&[text.to_string()]).await?;
        result
            .pop()
            .ok_or_else(|| CoderootError::Embedding("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }

    fn provider(&self) -> &str {
        &self.provider
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
