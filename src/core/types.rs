// Shared data types for the analysis workflow

use serde::{Deserialize, Serialize};

/// Raw detector output before filtering and label resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub class_id: usize,
    pub confidence: f32,
    /// [x1, y1, x2, y2] in original-image pixel coordinates
    pub bbox: [f32; 4],
}

/// A client-facing detection. The label serializes as `class` because the
/// front end keys on that name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub class_label: String,
    pub confidence: f32,
    pub bbox: [f32; 4],
}

/// Curated EXIF fields. Every field is optional: a tag that is missing or
/// unparseable simply stays absent, and absent fields are skipped during
/// serialization so clients only ever see keys that carry data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExifSummary {
    // Camera and lens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lens_make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lens_model: Option<String>,

    // Timestamps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_taken: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_original: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_digitized: Option<String>,

    // Exposure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aperture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutter_speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal_length_35mm: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure_program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metering_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white_balance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digital_zoom_ratio: Option<f64>,

    // Image characteristics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_space: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_resolution: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_resolution: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_capture_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrast: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharpness: Option<String>,

    // GPS. gps_available is present whenever the image carries an EXIF
    // block, true only when both coordinates resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_altitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_datestamp: Option<String>,
}

impl ExifSummary {
    /// True when no field was populated (no EXIF block, or nothing parsed)
    pub fn is_empty(&self) -> bool {
        *self == ExifSummary::default()
    }
}

/// Image metadata: structural properties plus the EXIF summary.
///
/// A successful parse fills the structural fields; a failed parse produces
/// the degraded record (error message, "Unknown" format/size, empty EXIF)
/// so the upload pipeline never fails on metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pixels: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub megapixels: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_mb: Option<f64>,
    pub exif: ExifSummary,
    pub has_exif: bool,
}

impl ImageMetadata {
    /// The fixed partial record returned when the byte buffer cannot be
    /// decoded or read.
    pub fn degraded(cause: impl std::fmt::Display) -> Self {
        Self {
            error: Some(format!("Could not extract metadata: {cause}")),
            format: "Unknown".to_string(),
            mode: None,
            size: "Unknown".to_string(),
            width: None,
            height: None,
            total_pixels: None,
            megapixels: None,
            aspect_ratio: None,
            file_size_bytes: None,
            file_size_mb: None,
            exif: ExifSummary::default(),
            has_exif: false,
        }
    }
}

/// The upload result contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detections: Option<Vec<Detection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisEnvelope {
    pub fn completed(
        image_data: String,
        detections: Vec<Detection>,
        metadata: ImageMetadata,
        ai_analysis: String,
    ) -> Self {
        Self {
            success: true,
            image_data: Some(image_data),
            detections: Some(detections),
            metadata: Some(metadata),
            ai_analysis: Some(ai_analysis),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            image_data: None,
            detections: None,
            metadata: None,
            ai_analysis: None,
            error: Some(error.into()),
        }
    }
}
