// The analysis workflow behind the upload and query operations.
//
// `process_upload` is total: every failure, from intake rejection to a
// detector fault, collapses into a `success: false` envelope carrying the
// failure's display string. The gateway layer is total on its own, so AI
// trouble never fails an upload.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

use crate::core::config::Config;
use crate::core::errors::{PipelineError, PipelineResult, ValidationError};
use crate::core::types::AnalysisEnvelope;
use crate::orchestration::intake;
use crate::services::detection::{label_detections, ObjectDetector};
use crate::services::gateway::AiGateway;
use crate::services::metadata;
use crate::services::prompt::{AnalysisProfile, ResponseTemplate};
use crate::utils::metrics::Metrics;

/// End-to-end analysis workflow shared by the HTTP handlers
pub struct AnalysisPipeline {
    detector: Arc<dyn ObjectDetector>,
    gateway: AiGateway,
    template: ResponseTemplate,
    profile: AnalysisProfile,
    metrics: Arc<Metrics>,
}

impl AnalysisPipeline {
    pub fn new(
        config: Arc<Config>,
        detector: Arc<dyn ObjectDetector>,
        metrics: Arc<Metrics>,
    ) -> anyhow::Result<Self> {
        let profile = AnalysisProfile::new(config.profile());
        let template = ResponseTemplate::load(config.template_path());
        let gateway = AiGateway::new(config, profile, Arc::clone(&metrics))?;

        Ok(Self {
            detector,
            gateway,
            template,
            profile,
            metrics,
        })
    }

    pub fn profile(&self) -> &AnalysisProfile {
        &self.profile
    }

    /// Whether a real model is behind the detector capability
    pub fn detector_live(&self) -> bool {
        self.detector.is_live()
    }

    /// Run the full analysis for one upload
    #[instrument(skip(self, bytes), fields(filename = %filename, size = bytes.len()))]
    pub async fn process_upload(&self, filename: &str, bytes: Vec<u8>) -> AnalysisEnvelope {
        let start = Instant::now();
        match self.run_upload(filename, bytes).await {
            Ok(envelope) => {
                self.metrics.record_upload(true, start.elapsed());
                envelope
            }
            Err(e) => {
                warn!("Upload failed: {}", e);
                self.metrics.record_upload(false, start.elapsed());
                AnalysisEnvelope::failure(e.to_string())
            }
        }
    }

    async fn run_upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> PipelineResult<AnalysisEnvelope> {
        intake::validate_upload(filename, bytes.len(), self.profile.allowed_extensions())?;

        // Decode gate: nothing downstream runs on an undecodable buffer
        let bytes = Arc::new(bytes);
        let decode_input = Arc::clone(&bytes);
        let img = tokio::task::spawn_blocking(move || image::load_from_memory(&decode_input))
            .await
            .map_err(|e| PipelineError::TaskJoinFailed(e.to_string()))??;

        // Detection and metadata are independent; run them concurrently.
        // Metadata is total and cannot fail the upload, a detector fault can.
        let metadata_input = Arc::clone(&bytes);
        let (raw_boxes, metadata) = tokio::join!(
            self.detector.detect(&img),
            tokio::task::spawn_blocking(move || metadata::extract_metadata(&metadata_input))
        );
        let raw_boxes = raw_boxes?;
        let metadata = metadata.map_err(|e| PipelineError::TaskJoinFailed(e.to_string()))?;

        let detections = label_detections(&raw_boxes, self.detector.labels());
        debug!(
            "✓ {} detections above floor, has_exif={}",
            detections.len(),
            metadata.has_exif
        );

        let prompt = self.profile.analysis_prompt(&self.template);
        let image_base64 = STANDARD.encode(bytes.as_slice());
        let ai_analysis = self.gateway.send(&prompt, Some(&image_base64)).await;

        Ok(AnalysisEnvelope::completed(
            image_base64,
            detections,
            metadata,
            ai_analysis,
        ))
    }

    /// Answer a free-form query, optionally grounded in a base64 image
    #[instrument(skip(self, query, image_base64), fields(has_image = image_base64.is_some()))]
    pub async fn answer_query(
        &self,
        query: &str,
        image_base64: Option<&str>,
    ) -> PipelineResult<String> {
        if query.is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }

        let framed = self.profile.frame_query(query, image_base64.is_some());
        let response = self.gateway.send(&framed, image_base64).await;
        self.metrics.record_query();
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{
        Config, DetectionConfig, GatewayConfig, ProfileKind, ServerConfig,
    };
    use crate::core::errors::{DetectionError, DetectionResult};
    use crate::core::types::RawDetection;
    use crate::services::detection::NullDetector;
    use async_trait::async_trait;
    use image::DynamicImage;
    use std::io::Cursor;
    use tracing::Level;

    struct StubDetector {
        boxes: Vec<RawDetection>,
    }

    #[async_trait]
    impl ObjectDetector for StubDetector {
        async fn detect(&self, _img: &DynamicImage) -> DetectionResult<Vec<RawDetection>> {
            Ok(self.boxes.clone())
        }
    }

    struct FailingDetector;

    #[async_trait]
    impl ObjectDetector for FailingDetector {
        async fn detect(&self, _img: &DynamicImage) -> DetectionResult<Vec<RawDetection>> {
            Err(DetectionError::PreprocessingFailed("boom".to_string()))
        }
    }

    fn test_config(kind: ProfileKind) -> Arc<Config> {
        Arc::new(Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                log_level: Level::INFO,
            },
            detection: DetectionConfig {
                model_path: "models/yolov8n.onnx".to_string(),
                candidate_threshold: 0.25,
                iou_threshold: 0.7,
                target_size: 640,
                inference_backend: None,
                onnx_pool_size: 2,
            },
            gateway: GatewayConfig {
                api_key: String::new(),
                // Nothing listens here, so every gateway call deterministically
                // falls back to the offline notice
                base_url: "http://127.0.0.1:1".to_string(),
                vision_model: "google/gemini-2.5-flash".to_string(),
                text_model: "openai/gpt-3.5-turbo".to_string(),
            },
            profile: kind,
            template_path: "templates/response_template.txt".to_string(),
        })
    }

    fn test_pipeline(kind: ProfileKind, detector: Arc<dyn ObjectDetector>) -> AnalysisPipeline {
        AnalysisPipeline::new(test_config(kind), detector, Arc::new(Metrics::new())).unwrap()
    }

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::new_rgb8(8, 8);
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    #[tokio::test]
    async fn rejects_invalid_extension_with_failure_envelope() {
        let pipeline = test_pipeline(ProfileKind::General, Arc::new(NullDetector));
        let envelope = pipeline.process_upload("notes.txt", vec![1, 2, 3]).await;

        assert!(!envelope.success);
        assert_eq!(envelope.error.as_deref(), Some("Invalid file type"));
        assert!(envelope.image_data.is_none());
        assert!(envelope.detections.is_none());
        assert!(envelope.metadata.is_none());
    }

    #[tokio::test]
    async fn rejects_undecodable_bytes() {
        let pipeline = test_pipeline(ProfileKind::General, Arc::new(NullDetector));
        let envelope = pipeline
            .process_upload("photo.png", b"definitely not a png".to_vec())
            .await;

        assert!(!envelope.success);
        assert!(envelope.error.unwrap().starts_with("Invalid image file:"));
    }

    #[tokio::test]
    async fn rejects_oversized_upload() {
        let pipeline = test_pipeline(ProfileKind::General, Arc::new(NullDetector));
        let envelope = pipeline
            .process_upload("big.png", vec![0u8; intake::MAX_UPLOAD_BYTES + 1])
            .await;

        assert!(!envelope.success);
        assert_eq!(envelope.error.as_deref(), Some("File too large (max 16 MB)"));
    }

    #[tokio::test]
    async fn successful_upload_fills_every_envelope_field() {
        let pipeline = test_pipeline(ProfileKind::General, Arc::new(NullDetector));
        let bytes = png_bytes();
        let expected_b64 = STANDARD.encode(&bytes);

        let envelope = pipeline.process_upload("photo.png", bytes).await;

        assert!(envelope.success);
        assert!(envelope.error.is_none());
        // Raw base64 of the exact uploaded bytes, no data-URL prefix
        assert_eq!(envelope.image_data.as_deref(), Some(expected_b64.as_str()));
        assert_eq!(envelope.detections.as_deref(), Some(&[][..]));

        let metadata = envelope.metadata.unwrap();
        assert_eq!(metadata.format, "PNG");
        assert_eq!(metadata.width, Some(8));
        assert!(!metadata.has_exif);

        // Gateway is unreachable in tests, so the analysis text is the
        // profile's offline notice, and the upload still succeeds
        assert!(envelope
            .ai_analysis
            .unwrap()
            .starts_with("Hello! I'm VisionBot."));
    }

    #[tokio::test]
    async fn detections_are_floored_and_labeled() {
        let detector = StubDetector {
            boxes: vec![
                RawDetection {
                    class_id: 0,
                    confidence: 0.92,
                    bbox: [1.0, 2.0, 3.0, 4.0],
                },
                RawDetection {
                    class_id: 16,
                    confidence: 0.5,
                    bbox: [5.0, 6.0, 7.0, 8.0],
                },
            ],
        };
        let pipeline = test_pipeline(ProfileKind::General, Arc::new(detector));
        let envelope = pipeline.process_upload("photo.png", png_bytes()).await;

        let detections = envelope.detections.unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_label, "person");
    }

    #[tokio::test]
    async fn detector_fault_fails_the_upload() {
        let pipeline = test_pipeline(ProfileKind::General, Arc::new(FailingDetector));
        let envelope = pipeline.process_upload("photo.png", png_bytes()).await;

        assert!(!envelope.success);
        assert!(envelope.error.unwrap().starts_with("Detection failed:"));
    }

    #[tokio::test]
    async fn empty_query_is_rejected_without_network() {
        let pipeline = test_pipeline(ProfileKind::General, Arc::new(NullDetector));
        let err = pipeline.answer_query("", None).await.unwrap_err();
        assert_eq!(err.to_string(), "No query provided");
    }

    #[tokio::test]
    async fn query_falls_back_when_gateway_unreachable() {
        let pipeline = test_pipeline(ProfileKind::General, Arc::new(NullDetector));
        let response = pipeline.answer_query("what is this?", None).await.unwrap();
        assert!(response.starts_with("Hello! I'm VisionBot."));
    }

    #[tokio::test]
    async fn medical_upload_skips_detection_but_keeps_metadata() {
        let pipeline = test_pipeline(ProfileKind::Medical, Arc::new(NullDetector));
        let envelope = pipeline.process_upload("scan.webp", png_bytes()).await;

        assert!(envelope.success);
        assert_eq!(envelope.detections.as_deref(), Some(&[][..]));
        assert_eq!(envelope.metadata.unwrap().format, "PNG");
        assert!(envelope
            .ai_analysis
            .unwrap()
            .starts_with("Hello! I'm MediBot AI."));
    }
}
