//! Embedding provider interface
//!
//! The engine consumes embeddings through this trait; model internals are
//! someone else's problem. An OpenAI-compatible HTTP implementation lives
//! in [`http`].

pub mod http;

pub use http::HttpEmbeddingProvider;

use crate::error::Result;
use async_trait::async_trait;

/// An embedding with its dimension
#[derive(Debug, Clone)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub dimension: usize,
}

impl Embedding {
    pub fn new(vector: Vec<f32>) -> Self {
        let dimension = vector.len();
        Self { vector, dimension }
    }
}

/// External embedding collaborator
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed a batch of texts; order is preserved
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Provider identifier (e.g. "openai", "vllm")
    fn provider(&self) -> &str;

    /// Embedding dimension produced by this provider
    fn dimension(&self) -> usize;
}
