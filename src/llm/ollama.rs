//! Ollama LLM provider

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::embedding::{resolve_host, RunnerOptions};
use crate::http::{check_response, create_client};

/// Ollama LLM provider
pub struct OllamaLlm {
    client: Client,
    host: String,
    model_name: String,
    use_gpu: bool,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    #[serde(flatten)]
    runner: Option<RunnerOptions>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaLlm {
    /// Create a new Ollama LLM provider
    pub fn new(model_name: String, host: Option<String>, use_gpu: bool) -> anyhow::Result<Self> {
        let host = resolve_host(host);
        let client = create_client()?;

        info!("Ollama LLM provider: {} @ {}", model_name, host);

        Ok(Self {
            client,
            host,
            model_name,
            use_gpu,
        })
    }

    /// Generate a response
    pub async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let request = GenerateRequest {
            model: &self.model_name,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: 0.0,
                runner: (!self.use_gpu).then_some(RunnerOptions { num_gpu: 0 }),
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.host))
            .json(&request)
            .send()
            .await?;

        let response = check_response(response, "Ollama").await?;
        let body: GenerateResponse = response.json().await?;

        Ok(body.response)
    }
}
