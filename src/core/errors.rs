// Custom error types for better error handling and debugging
//
// Using thiserror for ergonomic error definitions with:
// - Type-safe error matching
// - Automatic Display/Error trait implementations
// - Source error chaining
//
// Display strings double as the client-facing envelope messages, so the
// exact wording here is load-bearing.

use thiserror::Error;

/// Upload and query intake rejections
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("No file selected")]
    EmptyFilename,

    #[error("Invalid file type")]
    InvalidFileType,

    #[error("File too large (max 16 MB)")]
    PayloadTooLarge,

    #[error("No query provided")]
    EmptyQuery,
}

/// Detection service errors
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("ONNX inference failed: {0}")]
    InferenceFailed(#[from] ort::Error),

    #[error("Image preprocessing failed: {0}")]
    PreprocessingFailed(String),

    #[error("Unexpected model output shape: {0}")]
    UnexpectedOutputShape(String),
}

/// Metadata extraction errors (always degraded to a partial record, never
/// surfaced to the client as a request failure)
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("{0}")]
    DecodeFailed(#[from] image::ImageError),

    #[error("image reports invalid dimensions ({width}x{height})")]
    InvalidDimensions { width: u32, height: u32 },
}

/// AI gateway errors; the gateway converts each of these into a response
/// string rather than failing the request
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connection/DNS failure or timeout. The caller substitutes the
    /// profile's offline notice for this one.
    #[error("AI service unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("Network error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("API Error: {message}")]
    Remote { message: String },
}

/// Pipeline orchestration errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid image file: {0}")]
    ImageDecodeFailed(#[from] image::ImageError),

    #[error("Detection failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

/// Configuration errors
#[derive(Debug, Error)]
#[allow(dead_code)]
pub enum ConfigError {
    #[error("Confidence threshold must be in [0.0, 1.0], got {0}")]
    InvalidConfidenceThreshold(f32),

    #[error("IoU threshold must be in [0.0, 1.0], got {0}")]
    InvalidIoUThreshold(f32),

    #[error("Target size must be in [320, 2048], got {0}")]
    InvalidTargetSize(u32),

    #[error("ONNX pool size must be > 0, got {0}")]
    InvalidPoolSize(usize),

    #[error("Unknown deployment profile: {0} (expected 'general' or 'medical')")]
    UnknownProfile(String),

    #[error("Invalid gateway config: {0}")]
    InvalidGatewayConfig(String),
}

// Convenience type aliases for Results
pub type DetectionResult<T> = Result<T, DetectionError>;
pub type MetadataResult<T> = Result<T, MetadataError>;
pub type GatewayResult<T> = Result<T, GatewayError>;
pub type PipelineResult<T> = Result<T, PipelineError>;
#[allow(dead_code)]
pub type ConfigResult<T> = Result<T, ConfigError>;
