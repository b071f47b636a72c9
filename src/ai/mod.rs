//! Collaborator clients for the hosted models driven by the feedback loop
//!
//! Each stage of the loop sits behind its own trait so the driver can be
//! exercised against mocks and the providers can be swapped independently.

pub mod fallback;
pub mod mock;
pub mod ollama;
pub mod replicate;

pub use fallback::FallbackExpandClient;
pub use mock::{MockDescribeClient, MockExpandClient, MockImageGenerationClient};
pub use ollama::OllamaExpandClient;
pub use replicate::{ReplicateDescribeClient, ReplicateExpandClient, ReplicateImageClient};

use crate::models::GeneratedImage;
use crate::Result;
use async_trait::async_trait;

/// Turns a short prompt into a detailed scene description.
#[async_trait]
pub trait PromptExpansionService: Send + Sync {
    async fn expand_prompt(&self, prompt: &str) -> Result<String>;
}

/// Renders a prompt into raw image bytes.
#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>>;
}

/// Describes an image as a prompt for the next generation.
#[async_trait]
pub trait ImageDescriptionService: Send + Sync {
    async fn describe_image(&self, image: &GeneratedImage) -> Result<String>;
}
