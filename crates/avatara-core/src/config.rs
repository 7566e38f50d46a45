//! Configuration module
//!
//! Pipeline settings with constant defaults, overridable through `AVATARA_*`
//! environment variables.

use std::env;

use serde::{Deserialize, Serialize};

use crate::models::VariantKind;

const DEFAULT_MAX_FILE_SIZE_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_MAX_PIXEL_DIMENSION: u32 = 10_000;
const DEFAULT_PUT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_THUMBNAIL_MAX_DIM: u32 = 128;
const DEFAULT_MEDIUM_MAX_DIM: u32 = 512;
const DEFAULT_FULL_MAX_DIM: u32 = 2048;

/// Output encoding for a generated variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }
}

/// One (kind, max dimension, format) tuple of the fixed variant ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSpec {
    pub kind: VariantKind,
    pub max_dimension: u32,
    pub format: OutputFormat,
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum accepted source file size in bytes.
    pub max_file_size_bytes: usize,
    /// Raster content types accepted by the validator.
    pub allowed_content_types: Vec<String>,
    /// Sanity ceiling for either decoded dimension.
    pub max_pixel_dimension: u32,
    /// Fixed, ordered variant ladder: thumbnail, medium, full.
    pub variant_specs: [VariantSpec; 3],
    /// Per-storage-call deadline in seconds.
    pub put_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            allowed_content_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
                "image/gif".to_string(),
            ],
            max_pixel_dimension: DEFAULT_MAX_PIXEL_DIMENSION,
            variant_specs: [
                VariantSpec {
                    kind: VariantKind::Thumbnail,
                    max_dimension: DEFAULT_THUMBNAIL_MAX_DIM,
                    format: OutputFormat::Jpeg,
                },
                VariantSpec {
                    kind: VariantKind::Medium,
                    max_dimension: DEFAULT_MEDIUM_MAX_DIM,
                    format: OutputFormat::Jpeg,
                },
                VariantSpec {
                    kind: VariantKind::Full,
                    max_dimension: DEFAULT_FULL_MAX_DIM,
                    format: OutputFormat::Jpeg,
                },
            ],
            put_timeout_secs: DEFAULT_PUT_TIMEOUT_SECS,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        config.max_file_size_bytes =
            env_parse("AVATARA_MAX_FILE_SIZE_BYTES", config.max_file_size_bytes);
        config.max_pixel_dimension =
            env_parse("AVATARA_MAX_PIXEL_DIMENSION", config.max_pixel_dimension);
        config.put_timeout_secs = env_parse("AVATARA_PUT_TIMEOUT_SECS", config.put_timeout_secs);

        if let Ok(types) = env::var("AVATARA_ALLOWED_CONTENT_TYPES") {
            config.allowed_content_types = types
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        config.variant_specs[0].max_dimension = env_parse(
            "AVATARA_THUMBNAIL_MAX_DIM",
            config.variant_specs[0].max_dimension,
        );
        config.variant_specs[1].max_dimension = env_parse(
            "AVATARA_MEDIUM_MAX_DIM",
            config.variant_specs[1].max_dimension,
        );
        config.variant_specs[2].max_dimension =
            env_parse("AVATARA_FULL_MAX_DIM", config.variant_specs[2].max_dimension);

        config
    }

    pub fn spec_for(&self, kind: VariantKind) -> &VariantSpec {
        self.variant_specs
            .iter()
            .find(|s| s.kind == kind)
            .unwrap_or(&self.variant_specs[0])
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
