//! OpenAI (and OpenAI-compatible) embedding provider

use std::env;

use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client,
};
use tracing::info;

const MAX_INPUTS_PER_REQUEST: usize = 100;

/// OpenAI embedding provider
pub struct OpenAIEmbedding {
    client: Client<OpenAIConfig>,
    model_name: String,
    dimensions: usize,
}

impl OpenAIEmbedding {
    /// Create a provider, calling the API once when the model's
    /// dimensions are unknown
    pub async fn new(
        model_name: String,
        api_key: Option<String>,
        base_url: Option<String>,
        known_dimensions: usize,
    ) -> anyhow::Result<Self> {
        let api_key = api_key
            .or_else(|| env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let mut config = OpenAIConfig::new().with_api_key(api_key);

        if let Some(base_url) = base_url.or_else(|| env::var("OPENAI_BASE_URL").ok()) {
            config = config.with_api_base(base_url);
        }

        let mut provider = Self {
            client: Client::with_config(config),
            model_name,
            dimensions: known_dimensions,
        };

        if provider.dimensions == 0 {
            let sample = provider.embed(&["dimension check".to_string()]).await?;
            provider.dimensions = sample.first().map(Vec::len).unwrap_or(0);
            info!("Auto-detected embedding dimensions: {}", provider.dimensions);
        }

        info!("OpenAI embedding provider: {} ({} dims)", provider.model_name, provider.dimensions);
        Ok(provider)
    }

    /// Get dimensions
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Compute embeddings
    pub async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_INPUTS_PER_REQUEST) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model_name)
                .input(EmbeddingInput::StringArray(batch.to_vec()))
                .build()?;

            let mut data = self.client.embeddings().create(request).await?.data;
            if data.len() != batch.len() {
                anyhow::bail!(
                    "OpenAI returned {} embeddings for {} inputs",
                    data.len(),
                    batch.len()
                );
            }
            // Rows are matched back to documents by position
            data.sort_by_key(|d| d.index);
            embeddings.extend(data.into_iter().map(|d| d.embedding));
        }

        Ok(embeddings)
    }
}
