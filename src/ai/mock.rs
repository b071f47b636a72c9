use super::{ImageDescriptionService, ImageGenerationService, PromptExpansionService};
use crate::models::GeneratedImage;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Shared bookkeeping for the mock collaborators: canned responses served in
/// rotation, a scripted failing call, and the inputs seen so far.
#[derive(Clone)]
struct MockState<T: Clone> {
    responses: Arc<Mutex<Vec<T>>>,
    inputs: Arc<Mutex<Vec<String>>>,
    fail_on_call: Arc<Mutex<Option<usize>>>,
}

impl<T: Clone> MockState<T> {
    fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            inputs: Arc::new(Mutex::new(Vec::new())),
            fail_on_call: Arc::new(Mutex::new(None)),
        }
    }

    /// Record the call and return its 1-based number plus the canned response.
    fn next(&self, input: String, name: &str) -> Result<(usize, Option<T>)> {
        let mut inputs = self.inputs.lock().unwrap();
        inputs.push(input);
        let call = inputs.len();

        if *self.fail_on_call.lock().unwrap() == Some(call) {
            return Err(Error::Service(format!("{} mock failure on call {}", name, call)));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok((call, None))
        } else {
            Ok((call, Some(responses[(call - 1) % responses.len()].clone())))
        }
    }
}

#[derive(Clone)]
pub struct MockExpandClient {
    state: MockState<String>,
}

impl MockExpandClient {
    pub fn new() -> Self {
        Self {
            state: MockState::new(),
        }
    }

    pub fn with_response(self, response: String) -> Self {
        self.state.responses.lock().unwrap().push(response);
        self
    }

    /// Fail the given 1-based call with a service error.
    pub fn with_failure_on_call(self, call: usize) -> Self {
        *self.state.fail_on_call.lock().unwrap() = Some(call);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.state.inputs.lock().unwrap().len()
    }

    pub fn get_inputs(&self) -> Vec<String> {
        self.state.inputs.lock().unwrap().clone()
    }
}

impl Default for MockExpandClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PromptExpansionService for MockExpandClient {
    async fn expand_prompt(&self, prompt: &str) -> Result<String> {
        let (_, response) = self.state.next(prompt.to_string(), "expand")?;
        Ok(response.unwrap_or_else(|| format!("expanded: {}", prompt)))
    }
}

#[derive(Clone)]
pub struct MockImageGenerationClient {
    state: MockState<Vec<u8>>,
}

impl MockImageGenerationClient {
    pub fn new() -> Self {
        Self {
            state: MockState::new(),
        }
    }

    pub fn with_image_response(self, response: Vec<u8>) -> Self {
        self.state.responses.lock().unwrap().push(response);
        self
    }

    pub fn with_failure_on_call(self, call: usize) -> Self {
        *self.state.fail_on_call.lock().unwrap() = Some(call);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.state.inputs.lock().unwrap().len()
    }

    pub fn get_inputs(&self) -> Vec<String> {
        self.state.inputs.lock().unwrap().clone()
    }
}

impl Default for MockImageGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for MockImageGenerationClient {
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>> {
        let (call, response) = self.state.next(prompt.to_string(), "image generation")?;
        // Distinct bytes per call so records can be told apart.
        Ok(response.unwrap_or_else(|| vec![0x89, 0x50, 0x4E, 0x47, call as u8]))
    }
}

#[derive(Clone)]
pub struct MockDescribeClient {
    state: MockState<String>,
}

impl MockDescribeClient {
    pub fn new() -> Self {
        Self {
            state: MockState::new(),
        }
    }

    pub fn with_description_response(self, response: String) -> Self {
        self.state.responses.lock().unwrap().push(response);
        self
    }

    pub fn with_failure_on_call(self, call: usize) -> Self {
        *self.state.fail_on_call.lock().unwrap() = Some(call);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.state.inputs.lock().unwrap().len()
    }
}

impl Default for MockDescribeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageDescriptionService for MockDescribeClient {
    async fn describe_image(&self, image: &GeneratedImage) -> Result<String> {
        let (call, response) = self
            .state
            .next(format!("{} bytes", image.bytes.len()), "image description")?;
        Ok(response.unwrap_or_else(|| format!("description {}", call)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_expand_default_echoes_prompt() {
        let client = MockExpandClient::new();
        let expanded = client.expand_prompt("a cat playing piano").await.unwrap();
        assert_eq!(expanded, "expanded: a cat playing piano");
        assert_eq!(client.get_inputs(), vec!["a cat playing piano".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_expand_custom_responses_cycle() {
        let client = MockExpandClient::new()
            .with_response("first".to_string())
            .with_response("second".to_string());

        assert_eq!(client.expand_prompt("x").await.unwrap(), "first");
        assert_eq!(client.expand_prompt("x").await.unwrap(), "second");
        assert_eq!(client.expand_prompt("x").await.unwrap(), "first");
        assert_eq!(client.get_call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_failure_on_scripted_call_only() {
        let client = MockImageGenerationClient::new().with_failure_on_call(2);

        assert!(client.generate_image("a").await.is_ok());
        assert!(matches!(
            client.generate_image("b").await,
            Err(Error::Service(_))
        ));
        assert!(client.generate_image("c").await.is_ok());
        assert_eq!(client.get_call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_clone_shares_call_count() {
        let client = MockDescribeClient::new();
        let shared = client.clone();
        let image = GeneratedImage {
            bytes: vec![1],
            mime_type: "image/png".to_string(),
            width: 1,
            height: 1,
        };

        assert_eq!(client.describe_image(&image).await.unwrap(), "description 1");
        assert_eq!(shared.get_call_count(), 1);
    }
}
