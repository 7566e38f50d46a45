//! Image validator
//!
//! Rejects unacceptable uploads before any I/O or CPU-heavy work begins.
//! Checks run in a fixed order: byte size, content type, decodable
//! dimensions. Pure function of the file's bytes and declared metadata.

use std::io::Cursor;

use avatara_core::{ClassifiedError, ErrorKind, PipelineConfig, PipelineResult, SourceMeta};
use image::ImageReader;

/// Validates avatar uploads against the configured limits.
pub struct AvatarValidator {
    max_file_size_bytes: usize,
    allowed_content_types: Vec<String>,
    max_pixel_dimension: u32,
}

impl AvatarValidator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            max_file_size_bytes: config.max_file_size_bytes,
            allowed_content_types: config.allowed_content_types.clone(),
            max_pixel_dimension: config.max_pixel_dimension,
        }
    }

    /// Validate the upload and extract its source metadata.
    pub fn validate(&self, data: &[u8], content_type: &str) -> PipelineResult<SourceMeta> {
        if data.len() > self.max_file_size_bytes {
            return Err(ClassifiedError::new(
                ErrorKind::FileTooLarge,
                format!(
                    "File is {} bytes, maximum is {} bytes",
                    data.len(),
                    self.max_file_size_bytes
                ),
            ));
        }

        let normalized = content_type.to_lowercase();
        if !self.allowed_content_types.iter().any(|ct| ct == &normalized) {
            return Err(ClassifiedError::new(
                ErrorKind::UnsupportedFormat,
                format!(
                    "Content type {} is not supported (allowed: {})",
                    content_type,
                    self.allowed_content_types.join(", ")
                ),
            ));
        }

        let (width, height) = self.decode_dimensions(data)?;

        if width == 0 || height == 0 {
            return Err(ClassifiedError::new(
                ErrorKind::CorruptImage,
                "Image has zero width or height",
            ));
        }

        if width > self.max_pixel_dimension || height > self.max_pixel_dimension {
            return Err(ClassifiedError::new(
                ErrorKind::CorruptImage,
                format!(
                    "Image dimensions {}x{} exceed sanity ceiling of {} px",
                    width, height, self.max_pixel_dimension
                ),
            ));
        }

        Ok(SourceMeta {
            byte_size: data.len(),
            content_type: normalized,
            width,
            height,
        })
    }

    /// Read dimensions from the image header without a full decode.
    fn decode_dimensions(&self, data: &[u8]) -> PipelineResult<(u32, u32)> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| {
                ClassifiedError::new(ErrorKind::CorruptImage, format!("Unreadable image data: {}", e))
            })?;

        reader.into_dimensions().map_err(|e| {
            ClassifiedError::new(
                ErrorKind::CorruptImage,
                format!("Image could not be decoded: {}", e),
            )
        })
    }
}
