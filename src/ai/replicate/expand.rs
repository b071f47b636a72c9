use super::client::ReplicateHttpClient;
use super::types::{output_text, LlamaInput};
use crate::ai::PromptExpansionService;
use crate::{prompts, Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Prompt expansion through an instruct model hosted on Replicate.
pub struct ReplicateExpandClient {
    http: ReplicateHttpClient,
    model: String,
    temperature: Option<f32>,
}

impl ReplicateExpandClient {
    pub fn new(api_token: Option<String>, model: String) -> Self {
        Self::new_with_client(api_token, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_token: Option<String>, model: String, client: reqwest::Client) -> Self {
        Self {
            http: ReplicateHttpClient::new_with_client(api_token, Duration::from_secs(90), client),
            model,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl PromptExpansionService for ReplicateExpandClient {
    async fn expand_prompt(&self, prompt: &str) -> Result<String> {
        let input = LlamaInput {
            prompt: prompts::render(prompts::EXPAND_INSTRUCTION, &[("prompt", prompt)])
                .trim()
                .to_string(),
            temperature: self.temperature,
        };

        let output = self.http.run(&self.model, &input).await?;

        output_text(&output)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| Error::Service("Unexpected output from Replicate expansion model".to_string()))
    }
}
