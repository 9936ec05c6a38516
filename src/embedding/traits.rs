//! Embedding provider traits

use async_trait::async_trait;

/// Anything that turns text into fixed-size vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Embed stored documents
    async fn embed_documents(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>>;

    /// Embed search queries (may use a different prompt prefix)
    async fn embed_queries(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>>;
}
