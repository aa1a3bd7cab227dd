use thiserror::Error;

use crate::extent::ExtentError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("precip_threshold must be a non-negative number of mm/day, got {0}")]
    PrecipThreshold(f64),

    #[error("compression_level should be between 0 and 9, got {0}")]
    CompressionLevel(u8),

    #[error("chunks.time should be a positive multiple of 12, got {0}")]
    ChunkSize(usize),

    #[error("region_margin cannot be negative, got {0}")]
    RegionMargin(f64),

    #[error("invalid region: {0}")]
    Region(#[from] ExtentError),

    #[error("at least one input directory is required")]
    NoInputDirectories,

    #[error("job for '{0}' has no input files")]
    EmptyJob(String),
}
