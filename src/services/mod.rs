pub mod detection;
pub mod gateway;
pub mod metadata;
pub mod prompt;

// Re-export commonly used services
pub use detection::{NullDetector, ObjectDetector, OnnxDetector};
pub use gateway::AiGateway;
pub use metadata::extract_metadata;
pub use prompt::{AnalysisProfile, ResponseTemplate};
