//! Variant generator
//!
//! Derives the three resized, re-encoded copies of a source image. The
//! source is decoded exactly once; every variant is produced from that one
//! decode. CPU-bound work runs inside `spawn_blocking`, with a cancellation
//! check between variants so an abandoned session stops promptly.

use std::io::Cursor;

use avatara_core::{
    ClassifiedError, ErrorKind, OutputFormat, PipelineResult, VariantKind, VariantSpec,
};
use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageReader};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

/// One generated variant: encoded bytes plus content checksum.
#[derive(Debug, Clone)]
pub struct VariantBlob {
    pub kind: VariantKind,
    pub data: Bytes,
    pub content_type: &'static str,
    pub extension: &'static str,
    pub checksum: String,
}

/// Generates the tiered variant set from one decoded source.
pub struct VariantGenerator;

impl VariantGenerator {
    /// Generate all variants off the caller's async thread. Aborts without
    /// partial output on the first failed spec.
    pub async fn generate(
        source: Bytes,
        specs: [VariantSpec; 3],
        cancel: CancellationToken,
    ) -> PipelineResult<Vec<VariantBlob>> {
        tokio::task::spawn_blocking(move || Self::generate_blocking(&source, &specs, &cancel))
            .await
            .map_err(|e| {
                ClassifiedError::new(
                    ErrorKind::EncodingFailure,
                    format!("Variant generation task failed: {}", e),
                )
            })?
    }

    fn generate_blocking(
        source: &[u8],
        specs: &[VariantSpec; 3],
        cancel: &CancellationToken,
    ) -> PipelineResult<Vec<VariantBlob>> {
        let reader = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| {
                ClassifiedError::new(
                    ErrorKind::EncodingFailure,
                    format!("Unreadable source image: {}", e),
                )
            })?;
        let img = reader.decode().map_err(|e| {
            ClassifiedError::new(
                ErrorKind::EncodingFailure,
                format!("Source image could not be decoded: {}", e),
            )
        })?;

        let mut blobs = Vec::with_capacity(specs.len());
        for spec in specs {
            if cancel.is_cancelled() {
                return Err(ClassifiedError::new(
                    ErrorKind::PartialUploadFailure,
                    "Session cancelled during variant generation",
                ));
            }
            blobs.push(Self::render_variant(&img, spec)?);
        }
        Ok(blobs)
    }

    fn render_variant(img: &DynamicImage, spec: &VariantSpec) -> PipelineResult<VariantBlob> {
        let (orig_width, orig_height) = img.dimensions();
        let (target_width, target_height) =
            Self::clamp_longest_edge(orig_width, orig_height, spec.max_dimension);

        let resized = if (target_width, target_height) == (orig_width, orig_height) {
            img.clone()
        } else {
            let filter = Self::select_filter(orig_width, orig_height, target_width, target_height);
            img.resize_exact(target_width, target_height, filter)
        };

        let data = Self::encode(&resized, spec.format).map_err(|e| {
            ClassifiedError::new(
                ErrorKind::EncodingFailure,
                format!("Failed to encode {} variant: {}", spec.kind, e),
            )
        })?;

        let checksum = hex::encode(Sha256::digest(&data));

        tracing::debug!(
            kind = %spec.kind,
            width = target_width,
            height = target_height,
            size_bytes = data.len(),
            "Variant rendered"
        );

        Ok(VariantBlob {
            kind: spec.kind,
            data: Bytes::from(data),
            content_type: spec.format.content_type(),
            extension: spec.format.extension(),
            checksum,
        })
    }

    /// Clamp the longest edge to `max_dimension`, preserving aspect ratio.
    /// Never upscales.
    fn clamp_longest_edge(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
        let longest = width.max(height);
        if longest <= max_dimension {
            return (width, height);
        }
        let scale = max_dimension as f32 / longest as f32;
        let w = ((width as f32 * scale).round() as u32).max(1);
        let h = ((height as f32 * scale).round() as u32).max(1);
        (w, h)
    }

    /// Select filter by downscale ratio: cheap filters for heavy reductions,
    /// Lanczos near 1:1.
    fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> image::imageops::FilterType {
        let width_ratio = orig_width as f32 / new_width as f32;
        let height_ratio = orig_height as f32 / new_height as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            image::imageops::FilterType::Triangle
        } else if max_ratio > 1.5 {
            image::imageops::FilterType::CatmullRom
        } else {
            image::imageops::FilterType::Lanczos3
        }
    }

    fn encode(img: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, anyhow::Error> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        match format {
            // JPEG has no alpha channel; flatten first.
            OutputFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
                .write_to(&mut cursor, image::ImageFormat::Jpeg)?,
            OutputFormat::Png => img.write_to(&mut cursor, image::ImageFormat::Png)?,
            OutputFormat::Webp => img.write_to(&mut cursor, image::ImageFormat::WebP)?,
        }
        Ok(buffer)
    }
}
