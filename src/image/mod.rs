//! Image normalization
//!
//! Decodes whatever format the image model delivered and re-encodes it as
//! PNG, so the description model and the UI always receive the same format.

pub mod mock;
pub mod processor;

pub use mock::MockImageProcessor;
pub use processor::ImageProcessor;

use crate::models::GeneratedImage;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ImageService: Send + Sync {
    async fn normalize(&self, image_data: &[u8]) -> Result<GeneratedImage>;
}
