use crate::core::errors::DetectionResult;
use crate::core::types::{Detection, RawDetection};
use async_trait::async_trait;
use image::DynamicImage;

pub mod onnx;

pub use onnx::OnnxDetector;

/// Client-facing confidence floor. Strictly greater-than: a box scoring
/// exactly 0.5 is dropped.
pub const CONFIDENCE_FLOOR: f32 = 0.5;

/// COCO class names, indexed by model class id
pub const COCO_LABELS: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// The detection capability: pixels in, raw labeled boxes out.
///
/// Implementations own their candidate thresholding and NMS; callers apply
/// only the fixed client-facing floor via [`label_detections`].
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    async fn detect(&self, img: &DynamicImage) -> DetectionResult<Vec<RawDetection>>;

    /// Class-id to name table for this model
    fn labels(&self) -> &'static [&'static str] {
        &COCO_LABELS
    }

    /// False for the stand-in detector (readiness endpoint reports this)
    fn is_live(&self) -> bool {
        true
    }
}

/// Stand-in used when no model file is available or the deployment profile
/// runs without a detector. Always reports zero detections.
pub struct NullDetector;

#[async_trait]
impl ObjectDetector for NullDetector {
    async fn detect(&self, _img: &DynamicImage) -> DetectionResult<Vec<RawDetection>> {
        Ok(Vec::new())
    }

    fn is_live(&self) -> bool {
        false
    }
}

/// Apply the client-facing floor and resolve class ids to names.
///
/// Raw boxes with an id outside the label table are discarded, so every
/// returned detection carries a non-empty label and confidence above 0.5.
pub fn label_detections(raw: &[RawDetection], labels: &[&str]) -> Vec<Detection> {
    raw.iter()
        .filter(|d| d.confidence > CONFIDENCE_FLOOR)
        .filter_map(|d| {
            labels.get(d.class_id).map(|name| Detection {
                class_label: (*name).to_string(),
                confidence: d.confidence,
                bbox: d.bbox,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(class_id: usize, confidence: f32) -> RawDetection {
        RawDetection {
            class_id,
            confidence,
            bbox: [10.0, 20.0, 110.0, 220.0],
        }
    }

    #[test]
    fn floor_is_strict() {
        let raw_boxes = vec![raw(0, 0.49), raw(0, 0.5), raw(0, 0.51)];
        let labeled = label_detections(&raw_boxes, &COCO_LABELS);
        assert_eq!(labeled.len(), 1);
        assert_eq!(labeled[0].confidence, 0.51);
    }

    #[test]
    fn resolves_class_names() {
        let labeled = label_detections(&[raw(0, 0.9), raw(16, 0.8)], &COCO_LABELS);
        assert_eq!(labeled[0].class_label, "person");
        assert_eq!(labeled[1].class_label, "dog");
        assert_eq!(labeled[0].bbox, [10.0, 20.0, 110.0, 220.0]);
    }

    #[test]
    fn unknown_class_id_is_discarded() {
        let labeled = label_detections(&[raw(80, 0.9), raw(500, 0.9)], &COCO_LABELS);
        assert!(labeled.is_empty());
    }

    #[test]
    fn serializes_label_under_class_key() {
        let labeled = label_detections(&[raw(0, 0.87)], &COCO_LABELS);
        let json = serde_json::to_value(&labeled[0]).unwrap();
        assert_eq!(json["class"], "person");
        assert!((json["confidence"].as_f64().unwrap() - 0.87).abs() < 1e-6);
        assert_eq!(json["bbox"][2], 110.0);
    }

    #[tokio::test]
    async fn null_detector_reports_nothing() {
        let detector = NullDetector;
        let img = image::DynamicImage::new_rgb8(32, 32);
        let raw_boxes = detector.detect(&img).await.unwrap();
        assert!(raw_boxes.is_empty());
        assert!(!detector.is_live());
    }
}
