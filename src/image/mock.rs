use super::ImageService;
use crate::models::GeneratedImage;
use crate::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Passes bytes through untouched, reporting fixed dimensions.
#[derive(Clone)]
pub struct MockImageProcessor {
    process_count: Arc<Mutex<usize>>,
    dimensions: (u32, u32),
    should_fail: Arc<Mutex<bool>>,
}

impl MockImageProcessor {
    pub fn new() -> Self {
        Self {
            process_count: Arc::new(Mutex::new(0)),
            dimensions: (768, 768),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = (width, height);
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_process_count(&self) -> usize {
        *self.process_count.lock().unwrap()
    }
}

impl Default for MockImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageService for MockImageProcessor {
    async fn normalize(&self, image_data: &[u8]) -> Result<GeneratedImage> {
        if *self.should_fail.lock().unwrap() {
            return Err(crate::Error::Image(image::ImageError::IoError(
                std::io::Error::other("Mock failure"),
            )));
        }

        *self.process_count.lock().unwrap() += 1;

        Ok(GeneratedImage {
            bytes: image_data.to_vec(),
            mime_type: "image/png".to_string(),
            width: self.dimensions.0,
            height: self.dimensions.1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_image_processor_passes_bytes_through() {
        let processor = MockImageProcessor::new().with_dimensions(64, 32);

        let result = processor.normalize(b"fake image data").await.unwrap();

        assert_eq!(result.bytes, b"fake image data".to_vec());
        assert_eq!((result.width, result.height), (64, 32));
        assert_eq!(processor.get_process_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_with_failure() {
        let processor = MockImageProcessor::new().with_failure(true);

        assert!(processor.normalize(b"data").await.is_err());
        assert_eq!(processor.get_process_count(), 0);
    }
}
