pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items for convenience
pub use config::{Config, ProfileKind};
pub use errors::{
    ConfigError, DetectionError, GatewayError, MetadataError, PipelineError, ValidationError,
};
pub use types::{AnalysisEnvelope, Detection, ExifSummary, ImageMetadata, RawDetection};
