// Library exports for the image analysis backend

// Core modules
pub mod core;
pub mod orchestration;
pub mod services;
pub mod utils;

// Re-export commonly used types and functions
pub use core::{
    config::{Config, ProfileKind},
    errors::{
        ConfigError, DetectionError, GatewayError, MetadataError, PipelineError, ValidationError,
    },
    types::{AnalysisEnvelope, Detection, ExifSummary, ImageMetadata, RawDetection},
};

pub use orchestration::AnalysisPipeline;

pub use services::{
    AiGateway, AnalysisProfile, NullDetector, ObjectDetector, OnnxDetector, ResponseTemplate,
};

pub use utils::Metrics;
