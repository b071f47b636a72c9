use super::client::ReplicateHttpClient;
use super::types::{first_output_url, StableDiffusionInput};
use crate::ai::ImageGenerationService;
use crate::models::ImageOptions;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

pub struct ReplicateImageClient {
    http: ReplicateHttpClient,
    model: String,
    options: ImageOptions,
}

impl ReplicateImageClient {
    pub fn new(api_token: Option<String>, model: String, options: ImageOptions) -> Self {
        Self::new_with_client(api_token, model, options, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_token: Option<String>,
        model: String,
        options: ImageOptions,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: ReplicateHttpClient::new_with_client(api_token, Duration::from_secs(120), client),
            model,
            options,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl ImageGenerationService for ReplicateImageClient {
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>> {
        let input = StableDiffusionInput {
            prompt,
            num_outputs: 1,
            options: &self.options,
        };

        let output = self.http.run(&self.model, &input).await?;

        let image_url = first_output_url(&output)
            .ok_or_else(|| Error::Service("No image URL returned from Replicate".to_string()))?;

        tracing::debug!("Downloading generated image from {}", image_url);
        let bytes = self.http.download(&image_url).await?;
        if bytes.is_empty() {
            return Err(Error::Service(format!(
                "Downloaded image from {} is empty",
                image_url
            )));
        }

        Ok(bytes)
    }
}
