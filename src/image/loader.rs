use crate::utils::error::PredictError;
use crate::Result;
use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageFormat};

pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

pub struct ImageLoader;

impl ImageLoader {
    /// Decode a base64 payload, with or without a `data:image/...;base64,` prefix
    pub fn decode_base64(base64_data: &str) -> Result<Vec<u8>> {
        let base64_clean = match base64_data.strip_prefix("data:") {
            Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
            None => base64_data,
        };

        let image_bytes = base64::engine::general_purpose::STANDARD.decode(base64_clean.trim())?;
        if image_bytes.len() > MAX_IMAGE_BYTES {
            return Err(PredictError::FileTooLarge(image_bytes.len(), MAX_IMAGE_BYTES));
        }
        Ok(image_bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(PredictError::FileTooLarge(bytes.len(), MAX_IMAGE_BYTES));
        }
        if bytes.is_empty() {
            return Err(PredictError::InvalidImage("empty image data".to_string()));
        }

        let image = image::load_from_memory(bytes)
            .map_err(|e| PredictError::InvalidImage(e.to_string()))?;

        Self::validate_dimensions(&image)?;
        Ok(image)
    }

    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    pub fn validate_dimensions(image: &DynamicImage) -> Result<()> {
        let (width, height) = image.dimensions();

        if width < 16 || height < 16 {
            return Err(PredictError::InvalidImage(format!(
                "Image too small: {}x{}, minimum 16x16",
                width, height
            )));
        }

        if width > 8192 || height > 8192 {
            return Err(PredictError::InvalidImage(format!(
                "Image too large: {}x{}, maximum 8192x8192",
                width, height
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Vec::new();
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn decodes_png() {
        let image = ImageLoader::from_bytes(&png_bytes(64, 48)).unwrap();
        assert_eq!(image.dimensions(), (64, 48));
    }

    #[test]
    fn garbage_is_an_invalid_image() {
        let err = ImageLoader::from_bytes(b"definitely not a jpeg").unwrap_err();
        assert!(matches!(err, PredictError::InvalidImage(_)));
    }

    #[test]
    fn empty_payload_is_an_invalid_image() {
        assert!(matches!(
            ImageLoader::from_bytes(&[]).unwrap_err(),
            PredictError::InvalidImage(_)
        ));
    }

    #[test]
    fn tiny_images_are_rejected() {
        let err = ImageLoader::from_bytes(&png_bytes(4, 4)).unwrap_err();
        assert!(matches!(err, PredictError::InvalidImage(_)));
    }

    #[test]
    fn base64_with_data_url_prefix() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes(32, 32));
        let payload = format!("data:image/png;base64,{}", encoded);
        let bytes = ImageLoader::decode_base64(&payload).unwrap();
        assert_eq!(ImageLoader::detect_format(&bytes), Some(ImageFormat::Png));

        let image = ImageLoader::from_bytes(&bytes).unwrap();
        assert_eq!(image.dimensions(), (32, 32));
    }

    #[test]
    fn bad_base64_is_reported() {
        let err = ImageLoader::decode_base64("!!!not base64!!!").unwrap_err();
        assert!(matches!(err, PredictError::Base64(_)));
    }
}
