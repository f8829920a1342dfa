// Main entry point for the image analysis backend

use visionbot::{
    core::{Config, PipelineError, ValidationError},
    orchestration::AnalysisPipeline,
    services::{AnalysisProfile, NullDetector, ObjectDetector, OnnxDetector},
    utils::metrics::{Metrics, MetricsSnapshot},
    AnalysisEnvelope,
};

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    pipeline: Arc<AnalysisPipeline>,
    metrics: Arc<Metrics>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Arc::new(Config::new().expect("Failed to load configuration"));

    // Initialize logging
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new(format!(
        "visionbot={},ort=off",
        match config.log_level() {
            tracing::Level::TRACE => "trace",
            tracing::Level::DEBUG => "debug",
            tracing::Level::INFO => "info",
            tracing::Level::WARN => "warn",
            tracing::Level::ERROR => "error",
        }
    ));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let profile = AnalysisProfile::new(config.profile());
    info!("=== {} IMAGE ANALYSIS BACKEND ===", profile.name().to_uppercase());

    // Detector selection: the general profile gets a live model when one is
    // on disk, everything else runs with the stand-in and zero detections
    let detector: Arc<dyn ObjectDetector> = if !profile.wants_detector() {
        info!("Profile '{}' runs without a detector", profile.name());
        Arc::new(NullDetector)
    } else if !Path::new(config.model_path()).exists() {
        warn!(
            "Model file not found at {}, continuing with detection disabled",
            config.model_path()
        );
        Arc::new(NullDetector)
    } else {
        match OnnxDetector::load(config.clone()).await {
            Ok(detector) => Arc::new(detector),
            Err(e) => {
                warn!("Detector initialization failed ({}), continuing with detection disabled", e);
                Arc::new(NullDetector)
            }
        }
    };

    // Initialize metrics and the analysis pipeline
    let metrics = Arc::new(Metrics::new());
    let pipeline = Arc::new(AnalysisPipeline::new(
        config.clone(),
        detector,
        Arc::clone(&metrics),
    )?);
    let state = AppState {
        pipeline,
        metrics,
    };

    info!(
        "Profile: {} | Detector: {} | Gateway: {}",
        profile.name(),
        if state.pipeline.detector_live() { "live" } else { "disabled" },
        config.gateway_base_url()
    );

    // Setup CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Create router with monitoring endpoints
    let app = Router::new()
        .route("/", get(root))
        .route("/test", get(test_endpoint))
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/stats", get(stats_endpoint))
        .route("/upload", post(upload))
        .route("/query", post(query))
        .with_state(state)
        // Above the 16 MiB intake cap, so oversize uploads reach the JSON
        // rejection instead of a bare 413
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
        .layer(cors);

    let addr = format!("{}:{}", config.server_host(), config.server_port());
    info!("{}", "=".repeat(70));
    info!("Server starting on http://{}", addr);
    info!("{}", "-".repeat(70));
    info!("Endpoints:");
    info!("  GET  /        - Root endpoint");
    info!("  GET  /test    - Readiness probe");
    info!("  GET  /health  - Health check");
    info!("  GET  /metrics - Prometheus metrics");
    info!("  GET  /stats   - Detailed statistics");
    info!("  POST /upload  - Analyze an image (multipart/form-data)");
    info!("  POST /query   - Free-form AI query (JSON)");
    info!("{}", "=".repeat(70));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root() -> &'static str {
    "Image Analysis Backend - Detection, Metadata, and AI Narrative"
}

/// Readiness probe; `detector_loaded` is false when the stand-in is active
async fn test_endpoint(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "Backend is working!",
        "detector_loaded": state.pipeline.detector_live(),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Prometheus metrics endpoint
async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        state.metrics.to_prometheus(),
    )
}

/// Detailed statistics endpoint (JSON)
async fn stats_endpoint(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Image analysis endpoint
///
/// # Request Format:
/// - multipart/form-data
/// - Field "file": The image to analyze
///
/// # Response:
/// - AnalysisEnvelope JSON; rejections come back as `success: false` with
///   HTTP 200, only a malformed multipart stream produces a 400
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisEnvelope>, (StatusCode, String)> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, format!("Read error: {}", e)))?;
            upload = Some((filename, data.to_vec()));
            break;
        }
    }

    let Some((filename, bytes)) = upload else {
        return Ok(Json(AnalysisEnvelope::failure(
            ValidationError::MissingFile.to_string(),
        )));
    };

    Ok(Json(state.pipeline.process_upload(&filename, bytes).await))
}

/// Free-form query endpoint
///
/// # Request Format:
/// - JSON body with "query" (text) and optional "image_data" (base64);
///   an empty image string counts as no image
async fn query(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    let text = payload["query"].as_str().unwrap_or("");
    let image = payload["image_data"].as_str().filter(|s| !s.is_empty());

    match state.pipeline.answer_query(text, image).await {
        Ok(response) => (StatusCode::OK, Json(serde_json::json!({"response": response}))),
        Err(PipelineError::Validation(e)) => (
            StatusCode::OK,
            Json(serde_json::json!({"error": e.to_string()})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": format!("Server error: {}", e)})),
        ),
    }
}
