//! Ollama embedding provider

use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::http::{check_response, create_client};

/// Ollama embedding provider
pub struct OllamaEmbedding {
    client: Client,
    host: String,
    model_name: String,
    use_gpu: bool,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    truncate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<RunnerOptions>,
}

/// Runner options; `num_gpu = 0` keeps every layer on the CPU
#[derive(Serialize)]
pub(crate) struct RunnerOptions {
    pub num_gpu: u32,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Resolve the Ollama host from an explicit value or the environment
pub(crate) fn resolve_host(host: Option<String>) -> String {
    host.or_else(|| env::var("REVIEW_QA_OLLAMA_HOST").ok())
        .or_else(|| env::var("OLLAMA_HOST").ok())
        .unwrap_or_else(|| "http://localhost:11434".to_string())
}

impl OllamaEmbedding {
    /// Create a new Ollama embedding provider
    pub fn new(model_name: String, host: Option<String>, use_gpu: bool) -> anyhow::Result<Self> {
        let host = resolve_host(host);
        let client = create_client()?;

        info!(
            "Ollama embedding provider: {} @ {}{}",
            model_name,
            host,
            if use_gpu { "" } else { " (CPU only)" }
        );

        Ok(Self {
            client,
            host,
            model_name,
            use_gpu,
        })
    }

    /// Compute embeddings
    pub async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Process in batches of 32 (Ollama recommendation)
        let batch_size = 32;
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(batch_size) {
            let request = EmbedRequest {
                model: &self.model_name,
                input: batch,
                truncate: true,
                options: (!self.use_gpu).then_some(RunnerOptions { num_gpu: 0 }),
            };

            let response = self
                .client
                .post(format!("{}/api/embed", self.host))
                .json(&request)
                .send()
                .await?;

            let response = check_response(response, "Ollama").await?;
            let embed_response: EmbedResponse = response.json().await?;
            all_embeddings.extend(embed_response.embeddings);
        }

        Ok(all_embeddings)
    }
}
