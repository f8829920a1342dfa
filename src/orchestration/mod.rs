// Request orchestration: intake checks and the analysis workflow

pub mod intake;
pub mod pipeline;

pub use pipeline::AnalysisPipeline;
