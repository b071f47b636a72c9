use super::PromptExpansionService;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GENERATE_PATH: &str = "/api/generate";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Prompt expansion through a local Ollama server.
pub struct OllamaExpandClient {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaExpandClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self::new_with_client(base_url, model, Client::new())
    }

    pub fn new_with_client(base_url: String, model: String, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout: Duration::from_secs(60),
        }
    }
}

#[async_trait]
impl PromptExpansionService for OllamaExpandClient {
    async fn expand_prompt(&self, prompt: &str) -> Result<String> {
        tracing::debug!("Expanding prompt with Ollama model {}", self.model);

        let url = format!("{}{}", self.base_url, GENERATE_PATH);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Ollama: {}", e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("Ollama API error (status {}): {}", status, error_text);
            return Err(Error::Service(format!(
                "Ollama API error (status {}): {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Ollama response: {}\nBody: {}", e, body);
            Error::Service(format!("Failed to parse Ollama response: {}", e))
        })?;

        Ok(parsed.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_expand_prompt_parses_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "gnokit/improve-prompt",
                "prompt": "a lonely lighthouse",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "gnokit/improve-prompt",
                "response": "  a tall lighthouse on a rocky cliff at dusk\n",
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaExpandClient::new(server.uri(), "gnokit/improve-prompt".to_string());
        let expanded = client.expand_prompt("a lonely lighthouse").await.unwrap();
        assert_eq!(expanded, "a tall lighthouse on a rocky cliff at dusk");
    }

    #[tokio::test]
    async fn test_expand_prompt_strips_trailing_slash_from_base_url() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "response": "ok" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaExpandClient::new(format!("{}/", server.uri()), "m".to_string());
        assert_eq!(client.expand_prompt("x").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_expand_prompt_api_error_returns_service_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let client = OllamaExpandClient::new(server.uri(), "missing".to_string());
        let err = client.expand_prompt("x").await.unwrap_err();
        assert!(matches!(err, Error::Service(msg) if msg.contains("model not found")));
    }

    #[tokio::test]
    async fn test_expand_prompt_rejects_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = OllamaExpandClient::new(server.uri(), "m".to_string());
        let err = client.expand_prompt("x").await.unwrap_err();
        assert!(matches!(err, Error::Service(_)));
    }
}
