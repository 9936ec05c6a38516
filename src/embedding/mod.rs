//! Embedding module - compute embeddings from text

mod models;
mod ollama;
mod openai;
mod simulated;
mod traits;
mod truncate;

#[cfg(feature = "local-embeddings")]
mod candle;

pub use models::{profile_for, ModelProfile};
pub use simulated::SimulatedEmbedding;
pub use traits::Embedder;

pub(crate) use ollama::{resolve_host, RunnerOptions};

use async_trait::async_trait;
use tracing::info;

/// Dimensions of the simulated embedder when no model profile applies
pub const SIMULATED_DIMENSIONS: usize = 384;

/// Embedding mode configuration
#[derive(Debug, Clone)]
pub enum EmbeddingMode {
    OpenAI {
        api_key: Option<String>,
        base_url: Option<String>,
    },
    Ollama {
        host: Option<String>,
    },
    Simulated,
    #[cfg(feature = "local-embeddings")]
    Local {
        model_path: Option<String>,
    },
}

impl EmbeddingMode {
    /// Names accepted on the command line and in config files
    pub fn names() -> &'static [&'static str] {
        #[cfg(feature = "local-embeddings")]
        return &["ollama", "openai", "simulated", "local"];
        #[cfg(not(feature = "local-embeddings"))]
        return &["ollama", "openai", "simulated"];
    }
}

/// Unified embedding provider
pub struct EmbeddingProvider {
    model_name: String,
    profile: ModelProfile,
    inner: EmbeddingProviderInner,
}

enum EmbeddingProviderInner {
    OpenAI(openai::OpenAIEmbedding),
    Ollama(ollama::OllamaEmbedding),
    Simulated(SimulatedEmbedding),
    #[cfg(feature = "local-embeddings")]
    Local(candle::CandleEmbedding),
}

impl EmbeddingProvider {
    /// Create a new embedding provider
    pub async fn new(model_name: String, mode: EmbeddingMode, use_gpu: bool) -> anyhow::Result<Self> {
        let mut profile = profile_for(&model_name);

        let inner = match mode {
            EmbeddingMode::OpenAI { api_key, base_url } => {
                let provider = openai::OpenAIEmbedding::new(
                    model_name.clone(),
                    api_key,
                    base_url,
                    profile.dimensions,
                )
                .await?;
                profile.dimensions = provider.dimensions();
                EmbeddingProviderInner::OpenAI(provider)
            }
            EmbeddingMode::Ollama { host } => EmbeddingProviderInner::Ollama(
                ollama::OllamaEmbedding::new(model_name.clone(), host, use_gpu)?,
            ),
            EmbeddingMode::Simulated => {
                if profile.dimensions == 0 {
                    profile.dimensions = SIMULATED_DIMENSIONS;
                }
                EmbeddingProviderInner::Simulated(SimulatedEmbedding::new(profile.dimensions))
            }
            #[cfg(feature = "local-embeddings")]
            EmbeddingMode::Local { model_path } => {
                let provider = candle::CandleEmbedding::new(
                    model_name.clone(),
                    model_path,
                    use_gpu,
                    profile.token_limit,
                )?;
                profile.dimensions = provider.dimensions();
                EmbeddingProviderInner::Local(provider)
            }
        };

        info!(
            "Initialized embedding provider: {} ({} dims)",
            model_name,
            if profile.dimensions == 0 {
                "auto".to_string()
            } else {
                profile.dimensions.to_string()
            }
        );

        Ok(Self {
            model_name,
            profile,
            inner,
        })
    }

    /// Get model name
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed_prefixed(&self, texts: &[&str], prefix: &str) -> anyhow::Result<Vec<Vec<f32>>> {
        let prefixed: Vec<String> = texts.iter().map(|t| format!("{}{}", prefix, t)).collect();

        match &self.inner {
            EmbeddingProviderInner::OpenAI(p) => {
                let refs: Vec<&str> = prefixed.iter().map(String::as_str).collect();
                p.embed(&truncate::truncate_to_token_limit(&refs, self.profile.token_limit))
                    .await
            }
            // Ollama truncates server-side
            EmbeddingProviderInner::Ollama(p) => p.embed(&prefixed).await,
            EmbeddingProviderInner::Simulated(p) => {
                Ok(prefixed.iter().map(|t| p.embed_one(t)).collect())
            }
            #[cfg(feature = "local-embeddings")]
            EmbeddingProviderInner::Local(p) => p.embed(&prefixed),
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.profile.dimensions
    }

    async fn embed_documents(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.embed_prefixed(texts, self.profile.document_prefix).await
    }

    async fn embed_queries(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.embed_prefixed(texts, self.profile.query_prefix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_provider_uses_profile_dimensions() {
        let provider = EmbeddingProvider::new(
            "sentence-transformers/all-MiniLM-L6-v2".into(),
            EmbeddingMode::Simulated,
            false,
        )
        .await
        .unwrap();
        assert_eq!(provider.dimensions(), 384);

        let vectors = provider.embed_documents(&["a review", "another"]).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == 384));
    }

    #[tokio::test]
    async fn test_simulated_provider_unknown_model() {
        let provider = EmbeddingProvider::new("mystery".into(), EmbeddingMode::Simulated, true)
            .await
            .unwrap();
        assert_eq!(provider.dimensions(), SIMULATED_DIMENSIONS);
    }
}
