use crate::core::errors::ConfigError;
use std::env;
use tracing::Level;

/// Which deployment flavor this process runs as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    /// Live detector, template-driven analysis prompt
    General,
    /// No detector, radiologist analysis prompt and persona
    Medical,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub log_level: Level,
}

/// Detection configuration
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Model-level score cut applied while decoding raw boxes. The fixed
    /// client-facing confidence floor lives in the detection service.
    pub candidate_threshold: f32,
    pub iou_threshold: f32,
    pub target_size: u32,
    pub inference_backend: Option<String>,
    pub model_path: String,
    /// Number of ONNX sessions in the pool (controls inference parallelism)
    pub onnx_pool_size: usize,
}

/// AI gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_key: String,
    pub base_url: String,
    pub vision_model: String,
    pub text_model: String,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub detection: DetectionConfig,
    pub gateway: GatewayConfig,
    pub profile: ProfileKind,
    pub template_path: String,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Self::load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_env() -> Result<Self, ConfigError> {
        // Parse log level
        let log_level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "trace" => Some(Level::TRACE),
                "debug" => Some(Level::DEBUG),
                "info" => Some(Level::INFO),
                "warn" | "warning" => Some(Level::WARN),
                "error" => Some(Level::ERROR),
                _ => None,
            })
            .unwrap_or(Level::INFO);

        // Parse deployment profile; an unknown value is a hard error rather
        // than a silent fallback because the profiles answer differently.
        let profile = match env::var("DEPLOYMENT_PROFILE") {
            Ok(s) => match s.trim().to_lowercase().as_str() {
                "" | "general" => ProfileKind::General,
                "medical" => ProfileKind::Medical,
                other => return Err(ConfigError::UnknownProfile(other.to_string())),
            },
            Err(_) => ProfileKind::General,
        };

        Ok(Self {
            server: ServerConfig {
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8080),
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                log_level,
            },
            detection: DetectionConfig {
                candidate_threshold: env::var("CANDIDATE_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0.25),
                iou_threshold: env::var("IOU_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0.7),
                target_size: env::var("TARGET_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(640),
                inference_backend: env::var("INFERENCE_BACKEND")
                    .ok()
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty()),
                model_path: env::var("DETECTOR_MODEL_PATH")
                    .unwrap_or_else(|_| "models/yolov8n.onnx".to_string()),
                onnx_pool_size: env::var("ONNX_POOL_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        // Half the cores, with at least two sessions so
                        // concurrent uploads can overlap inference
                        let cores = num_cpus::get();
                        std::cmp::max(cores / 2, 2)
                    }),
            },
            gateway: GatewayConfig {
                api_key: env::var("OPENROUTER_API_KEY").unwrap_or_default(),
                base_url: env::var("OPENROUTER_BASE_URL")
                    .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                vision_model: env::var("VISION_MODEL")
                    .unwrap_or_else(|_| "google/gemini-2.5-flash".to_string()),
                text_model: env::var("TEXT_MODEL")
                    .unwrap_or_else(|_| "openai/gpt-3.5-turbo".to_string()),
            },
            profile,
            template_path: env::var("TEMPLATE_PATH")
                .unwrap_or_else(|_| "templates/response_template.txt".to_string()),
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // Note: a missing OPENROUTER_API_KEY is allowed; the gateway then
        // reports auth failures per request and the offline fallback still
        // works without it.

        if !(0.0..=1.0).contains(&self.detection.candidate_threshold) {
            return Err(ConfigError::InvalidConfidenceThreshold(
                self.detection.candidate_threshold,
            ));
        }

        if !(0.0..=1.0).contains(&self.detection.iou_threshold) {
            return Err(ConfigError::InvalidIoUThreshold(
                self.detection.iou_threshold,
            ));
        }

        if !(320..=2048).contains(&self.detection.target_size) {
            return Err(ConfigError::InvalidTargetSize(self.detection.target_size));
        }

        if self.detection.onnx_pool_size == 0 {
            return Err(ConfigError::InvalidPoolSize(self.detection.onnx_pool_size));
        }

        if self.gateway.base_url.is_empty() {
            return Err(ConfigError::InvalidGatewayConfig(
                "base_url must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    // Convenience accessors used throughout the services
    pub fn server_port(&self) -> u16 {
        self.server.port
    }

    pub fn server_host(&self) -> &str {
        &self.server.host
    }

    pub fn log_level(&self) -> Level {
        self.server.log_level
    }

    pub fn candidate_threshold(&self) -> f32 {
        self.detection.candidate_threshold
    }

    pub fn iou_threshold(&self) -> f32 {
        self.detection.iou_threshold
    }

    pub fn target_size(&self) -> u32 {
        self.detection.target_size
    }

    pub fn onnx_pool_size(&self) -> usize {
        self.detection.onnx_pool_size
    }

    pub fn model_path(&self) -> &str {
        &self.detection.model_path
    }

    pub fn api_key(&self) -> &str {
        &self.gateway.api_key
    }

    pub fn gateway_base_url(&self) -> &str {
        &self.gateway.base_url
    }

    pub fn vision_model(&self) -> &str {
        &self.gateway.vision_model
    }

    pub fn text_model(&self) -> &str {
        &self.gateway.text_model
    }

    pub fn profile(&self) -> ProfileKind {
        self.profile
    }

    pub fn template_path(&self) -> &str {
        &self.template_path
    }
}

// Note: No Default implementation because Config::new() can fail
// Users should explicitly call Config::new()? and handle errors
