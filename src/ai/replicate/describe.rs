use super::client::ReplicateHttpClient;
use super::types::{output_text, LlavaInput};
use crate::ai::ImageDescriptionService;
use crate::models::GeneratedImage;
use crate::{prompts, Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Image captioning through a vision model hosted on Replicate.
pub struct ReplicateDescribeClient {
    http: ReplicateHttpClient,
    model: String,
}

impl ReplicateDescribeClient {
    pub fn new(api_token: Option<String>, model: String) -> Self {
        Self::new_with_client(api_token, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_token: Option<String>, model: String, client: reqwest::Client) -> Self {
        Self {
            http: ReplicateHttpClient::new_with_client(api_token, Duration::from_secs(90), client),
            model,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl ImageDescriptionService for ReplicateDescribeClient {
    async fn describe_image(&self, image: &GeneratedImage) -> Result<String> {
        tracing::debug!(
            "Describing {}x{} image ({} bytes)",
            image.width,
            image.height,
            image.bytes.len()
        );

        let input = LlavaInput {
            image: image.to_data_url(),
            prompt: prompts::DESCRIBE_INSTRUCTION.trim(),
        };

        let output = self.http.run(&self.model, &input).await?;

        output_text(&output)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| Error::Service("Unexpected output from Replicate vision model".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::replicate::test_support;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_image() -> GeneratedImage {
        GeneratedImage {
            bytes: vec![0x89, 0x50, 0x4E, 0x47],
            mime_type: "image/png".to_string(),
            width: 1,
            height: 1,
        }
    }

    #[tokio::test]
    async fn test_describe_image_sends_data_url() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/predictions"))
            .and(body_string_contains("data:image/png;base64,iVBORw=="))
            .and(body_string_contains("Describe this image"))
            .respond_with(ResponseTemplate::new(201).set_body_json(test_support::prediction(
                "succeeded",
                serde_json::json!(["A lighthouse ", "on cliffs under an orange sky"]),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let client = ReplicateDescribeClient::new(Some("r8_test".to_string()), "yorickvp/llava:v1".to_string())
            .with_base_url(server.uri());

        let description = client.describe_image(&test_image()).await.unwrap();
        assert_eq!(description, "A lighthouse on cliffs under an orange sky");
    }

    #[tokio::test]
    async fn test_describe_image_failed_prediction() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/predictions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "p9",
                "status": "canceled",
                "urls": null
            })))
            .mount(&server)
            .await;

        let client = ReplicateDescribeClient::new(Some("r8_test".to_string()), "yorickvp/llava:v1".to_string())
            .with_base_url(server.uri());

        let err = client.describe_image(&test_image()).await.unwrap_err();
        assert!(matches!(err, Error::Service(msg) if msg.contains("Canceled")));
    }
}
