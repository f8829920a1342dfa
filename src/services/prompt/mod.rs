use crate::core::config::ProfileKind;
use tracing::{debug, warn};

/// Built-in analysis template, used when the template file is missing
pub const DEFAULT_RESPONSE_TEMPLATE: &str = "What I see:\n\
• {main_subject}\n\
• {key_elements}\n\
• {background}\n\
\n\
Objects:\n\
• {object_1}\n\
• {object_2}\n\
• {object_3}\n\
\n\
Colors:\n\
• {color_1}\n\
• {color_2}\n\
• {color_3}\n\
\n\
Setting:\n\
• {location}\n\
• {time_lighting}\n\
\n\
Details:\n\
• {detail_1}\n\
• {detail_2}";

const MEDICAL_PERSONA: &str = "You are MediBot AI, a professional medical imaging assistant. \
You specialize in analyzing medical images and providing clinical insights. \
Always maintain professional medical terminology, focus on anatomical findings, \
and include appropriate medical disclaimers. Respond concisely and structure \
your analysis clearly.";

const MEDICAL_ANALYSIS_PROMPT: &str = "Analyze this medical image as a radiologist would. \
Provide a professional medical assessment.\n\
\n\
Format your response as:\n\
\n\
IMAGING MODALITY:\n\
• Identify the type of medical imaging\n\
\n\
ANATOMICAL STRUCTURES:\n\
• List visible anatomical structures\n\
• Note bone, soft tissue, or organ visibility\n\
\n\
RADIOLOGICAL FINDINGS:\n\
• Describe any notable findings\n\
• Comment on symmetry, alignment, density\n\
• Identify any abnormalities or pathology\n\
\n\
CLINICAL IMPRESSION:\n\
• Provide clinical assessment\n\
• Suggest differential diagnoses if applicable\n\
• Recommend further imaging if needed\n\
\n\
MEDICAL DISCLAIMER:\n\
• This is an AI-assisted analysis for educational purposes\n\
• Clinical correlation and professional medical evaluation required\n\
• Not intended for diagnostic or treatment decisions\n\
\n\
Use medical terminology appropriately. Focus on anatomical and pathological \
observations only. Use bullet points (•) exclusively.";

const GENERAL_OFFLINE_NOTICE: &str = "Hello! I'm VisionBot. I'm currently having trouble \
connecting to my AI services, but I'm still here to help! Please check your internet \
connection or try again in a moment. You can also upload an image for local YOLO \
analysis which works offline.";

const MEDICAL_OFFLINE_NOTICE: &str = "Hello! I'm MediBot AI. I'm currently having trouble \
connecting to my medical AI services. Please check your internet connection or try again. \
Note: I can still perform basic image analysis offline.";

const BASE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];
const EXTENDED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp"];

/// The deployment personality: prompt wording, gateway identity, intake
/// rules, and the offline fallback text all hang off this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisProfile {
    kind: ProfileKind,
}

impl AnalysisProfile {
    pub fn new(kind: ProfileKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ProfileKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            ProfileKind::General => "VisionBot",
            ProfileKind::Medical => "MediBot AI",
        }
    }

    /// Whether this deployment loads a live detector at startup
    pub fn wants_detector(&self) -> bool {
        self.kind == ProfileKind::General
    }

    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self.kind {
            ProfileKind::General => BASE_EXTENSIONS,
            ProfileKind::Medical => EXTENDED_EXTENSIONS,
        }
    }

    /// Persona prepended as a system message to every gateway call
    pub fn system_prompt(&self) -> Option<&'static str> {
        match self.kind {
            ProfileKind::General => None,
            ProfileKind::Medical => Some(MEDICAL_PERSONA),
        }
    }

    /// The fixed response used whenever the gateway is unreachable
    pub fn offline_notice(&self) -> &'static str {
        match self.kind {
            ProfileKind::General => GENERAL_OFFLINE_NOTICE,
            ProfileKind::Medical => MEDICAL_OFFLINE_NOTICE,
        }
    }

    pub fn max_tokens(&self) -> u32 {
        match self.kind {
            ProfileKind::General => 1000,
            ProfileKind::Medical => 800,
        }
    }

    pub fn referer(&self) -> &'static str {
        match self.kind {
            ProfileKind::General => "http://localhost:5001",
            ProfileKind::Medical => "https://medibot-ai.local",
        }
    }

    pub fn title(&self) -> &'static str {
        self.name()
    }

    /// The prompt sent alongside an uploaded image
    pub fn analysis_prompt(&self, template: &ResponseTemplate) -> String {
        match self.kind {
            ProfileKind::General => format!(
                "Analyze this image and fill in this exact template:\n\n{}\n\n\
                Replace each {{placeholder}} with actual content. Keep each bullet point \
                short and specific. Use the exact format shown.",
                template.text()
            ),
            // The radiologist prompt is self-contained; the template file
            // only drives the general profile
            ProfileKind::Medical => MEDICAL_ANALYSIS_PROMPT.to_string(),
        }
    }

    /// Frame free-form query text before it goes to the gateway
    pub fn frame_query(&self, query: &str, has_image: bool) -> String {
        match (self.kind, has_image) {
            (ProfileKind::General, _) => query.to_string(),
            (ProfileKind::Medical, true) => format!(
                "Based on the medical image provided, please answer this question: {query}\n\n\
                Provide a professional medical response using:\n\
                • Clear medical explanations\n\
                • Relevant anatomical context\n\
                • Clinical significance if applicable\n\
                • Appropriate medical disclaimers\n\n\
                Use bullet points (•) for structure. Maintain professional medical tone."
            ),
            (ProfileKind::Medical, false) => format!(
                "As MediBot AI, please answer this medical question: {query}\n\n\
                Provide:\n\
                • Professional medical information\n\
                • Educational context\n\
                • Appropriate medical disclaimers\n\
                • Recommendation to consult healthcare professionals\n\n\
                Use bullet points (•) for clear structure."
            ),
        }
    }
}

/// The analysis template for the general profile, loaded from disk with a
/// built-in fallback.
#[derive(Debug, Clone)]
pub struct ResponseTemplate {
    text: String,
}

impl ResponseTemplate {
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                debug!("Loaded response template from {}", path);
                Self { text }
            }
            Err(e) => {
                warn!("Could not read template at {} ({}), using built-in default", path, e);
                Self::default()
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Default for ResponseTemplate {
    fn default() -> Self {
        Self {
            text: DEFAULT_RESPONSE_TEMPLATE.to_string(),
        }
    }
}
