//! HTTP utilities for API providers

use std::time::Duration;

use reqwest::{Client, Response};

/// Shared client settings for model servers.
///
/// Reader calls on long reviews can take a while on CPU-only hosts, hence
/// the generous request timeout.
pub fn create_client() -> anyhow::Result<Client> {
    Ok(Client::builder()
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(Duration::from_secs(300))
        .connect_timeout(Duration::from_secs(30))
        .build()?)
}

/// Turn a non-success response into an error carrying the server's message
pub async fn check_response(response: Response, service_name: &str) -> anyhow::Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    anyhow::bail!("{} API error {}: {}", service_name, status, error_detail(&body))
}

/// Pull the human-readable message out of a JSON error body
fn error_detail(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };

    json.get("error")
        .and_then(|e| e.as_str().or_else(|| e.get("message").and_then(|m| m.as_str())))
        .or_else(|| json.get("message").and_then(|m| m.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}
