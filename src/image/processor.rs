use super::ImageService;
use crate::models::GeneratedImage;
use crate::{Error, Result};
use async_trait::async_trait;
use image::ImageFormat;
use std::io::Cursor;

#[derive(Debug, Default)]
pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    fn normalize_sync(image_data: Vec<u8>) -> Result<GeneratedImage> {
        let format = image::guess_format(&image_data)?;
        let img = image::load_from_memory_with_format(&image_data, format)?;

        let bytes = if format == ImageFormat::Png {
            image_data
        } else {
            tracing::debug!("Re-encoding {:?} image as PNG", format);
            let mut encoded = Vec::new();
            img.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)?;
            encoded
        };

        Ok(GeneratedImage {
            bytes,
            mime_type: "image/png".to_string(),
            width: img.width(),
            height: img.height(),
        })
    }
}

#[async_trait]
impl ImageService for ImageProcessor {
    async fn normalize(&self, image_data: &[u8]) -> Result<GeneratedImage> {
        let image_data = image_data.to_vec();
        tokio::task::spawn_blocking(move || Self::normalize_sync(image_data))
            .await
            .map_err(|e| Error::Invariant(format!("Image processing task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_test_image(format: ImageFormat) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(12, 8, image::Rgb([255, 120, 0]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_png_passes_through_unchanged() {
        let png = encode_test_image(ImageFormat::Png);

        let result = ImageProcessor::new().normalize(&png).await.unwrap();

        assert_eq!(result.bytes, png);
        assert_eq!(result.mime_type, "image/png");
        assert_eq!((result.width, result.height), (12, 8));
    }

    #[tokio::test]
    async fn test_jpeg_is_reencoded_as_png() {
        let jpeg = encode_test_image(ImageFormat::Jpeg);

        let result = ImageProcessor::new().normalize(&jpeg).await.unwrap();

        assert_eq!(
            image::guess_format(&result.bytes).unwrap(),
            ImageFormat::Png
        );
        assert_eq!((result.width, result.height), (12, 8));
    }

    #[tokio::test]
    async fn test_garbage_bytes_are_rejected() {
        let err = ImageProcessor::new()
            .normalize(b"<html>not an image</html>")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Image(_)));
    }
}
