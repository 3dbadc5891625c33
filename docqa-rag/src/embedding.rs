//! Embedding client trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A client that turns text into a fixed-length embedding vector.
///
/// Implementations wrap specific embedding backends (OpenAI, local models,
/// etc.) behind a unified async interface. The default
/// [`embed_batch`](EmbeddingClient::embed_batch) implementation calls
/// [`embed`](EmbeddingClient::embed) sequentially; backends that support
/// native batching should override it.
///
/// Failures are reported as
/// [`RagError::EmbeddingUnavailable`](crate::RagError::EmbeddingUnavailable).
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::EmbeddingClient;
///
/// let client = MyEmbeddingClient::new();
/// let embedding = client.embed("hello world").await?;
/// ```
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// A short name identifying the backend, used in logs and errors.
    fn name(&self) -> &str;

    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// The returned vectors are in the same order as `texts`.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}
