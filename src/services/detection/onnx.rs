use crate::core::config::Config;
use crate::core::errors::{DetectionError, DetectionResult};
use crate::core::types::RawDetection;
use crate::services::detection::ObjectDetector;
use anyhow::Result;
use async_trait::async_trait;
use image::DynamicImage;
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;

#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;

#[cfg(feature = "tensorrt")]
use ort::execution_providers::TensorRTExecutionProvider;

#[cfg(feature = "openvino")]
use ort::execution_providers::OpenVINOExecutionProvider;

#[cfg(all(target_os = "windows", feature = "directml"))]
use ort::execution_providers::DirectMLExecutionProvider;

#[cfg(all(target_os = "macos", feature = "coreml"))]
use ort::execution_providers::CoreMLExecutionProvider;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tracing::{debug, info, trace};

/// How the original image was mapped into the square model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

/// ort's `run` takes `&mut Session`, so concurrent requests each borrow an
/// owned session from this pool and hand it back after the pass.
pub struct SessionPool {
    sender: Sender<Session>,
    receiver: Arc<tokio::sync::Mutex<Receiver<Session>>>,
}

impl SessionPool {
    async fn acquire(&self) -> Session {
        let mut receiver = self.receiver.lock().await;
        receiver.recv().await.expect("all detector sessions dropped")
    }

    async fn release(&self, session: Session) {
        self.sender
            .send(session)
            .await
            .expect("detector pool receiver dropped");
    }
}

/// YOLO-family detector backed by ONNX Runtime
pub struct OnnxDetector {
    session_pool: Arc<SessionPool>,
    config: Arc<Config>,
    device_type: String,
}

impl OnnxDetector {
    pub async fn load(config: Arc<Config>) -> Result<Self> {
        let pool_size = config.onnx_pool_size();
        debug!("Preparing {} detector sessions", pool_size);

        // The first session settles which backend the whole pool runs on
        let (device_type, first_session) = Self::build_session(&config)?;

        let (sender, receiver) = channel(pool_size);

        sender
            .send(first_session)
            .await
            .map_err(|_| anyhow::anyhow!("detector pool closed during startup"))?;

        // The rest of the pool builds on blocking threads in parallel
        if pool_size > 1 {
            let mut tasks = Vec::new();

            for i in 1..pool_size {
                let config_clone = Arc::clone(&config);
                let task = tokio::task::spawn_blocking(move || {
                    debug!("Building detector session {}/{}", i + 1, pool_size);
                    Self::build_session(&config_clone)
                });
                tasks.push(task);
            }

            for task in tasks {
                let (_, session) = task
                    .await
                    .map_err(|e| anyhow::anyhow!("session build task failed: {}", e))??;
                sender
                    .send(session)
                    .await
                    .map_err(|_| anyhow::anyhow!("detector pool closed while filling"))?;
            }
        }

        let session_pool = Arc::new(SessionPool {
            sender,
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
        });

        info!("Object detection ready on {} ({} sessions)", device_type, pool_size);

        Ok(Self {
            session_pool,
            config,
            device_type,
        })
    }

    #[allow(dead_code)]
    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    fn build_pinned_session(backend: &str, model_path: &str) -> Result<(String, Session)> {
        match backend {
            #[cfg(feature = "tensorrt")]
            "TENSORRT" => {
                let session = Session::builder()?
                    .with_execution_providers([TensorRTExecutionProvider::default().build()])?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .with_intra_threads(num_cpus::get())?
                    .commit_from_file(model_path)?;
                info!("TensorRT session ready");
                Ok(("TensorRT (pinned)".to_string(), session))
            }
            #[cfg(not(feature = "tensorrt"))]
            "TENSORRT" => {
                anyhow::bail!(
                    "TensorRT support is not compiled in (build with --features tensorrt)"
                )
            }

            #[cfg(feature = "cuda")]
            "CUDA" => {
                let session = Session::builder()?
                    .with_execution_providers([CUDAExecutionProvider::default().build()])?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .with_intra_threads(num_cpus::get())?
                    .commit_from_file(model_path)?;
                info!("CUDA session ready");
                Ok(("CUDA (pinned)".to_string(), session))
            }
            #[cfg(not(feature = "cuda"))]
            "CUDA" => {
                anyhow::bail!("CUDA support is not compiled in (build with --features cuda)")
            }

            #[cfg(feature = "openvino")]
            "OPENVINO" => {
                let session = Session::builder()?
                    .with_execution_providers([OpenVINOExecutionProvider::default()
                        .with_device_type("CPU")
                        .build()])?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .with_intra_threads(num_cpus::get())?
                    .commit_from_file(model_path)?;
                info!("OpenVINO session ready");
                Ok(("OpenVINO-CPU (pinned)".to_string(), session))
            }
            #[cfg(not(feature = "openvino"))]
            "OPENVINO" => {
                anyhow::bail!(
                    "OpenVINO support is not compiled in (build with --features openvino)"
                )
            }

            #[cfg(all(target_os = "windows", feature = "directml"))]
            "DIRECTML" => {
                let session = Session::builder()?
                    .with_execution_providers([DirectMLExecutionProvider::default().build()])?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .with_intra_threads(num_cpus::get())?
                    .commit_from_file(model_path)?;
                info!("DirectML session ready");
                Ok(("DirectML (pinned)".to_string(), session))
            }
            #[cfg(not(all(target_os = "windows", feature = "directml")))]
            "DIRECTML" => {
                anyhow::bail!(
                    "DirectML support is not compiled in (build with --features directml, Windows only)"
                )
            }

            #[cfg(all(target_os = "macos", feature = "coreml"))]
            "COREML" => {
                let session = Session::builder()?
                    .with_execution_providers([CoreMLExecutionProvider::default().build()])?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .with_intra_threads(num_cpus::get())?
                    .commit_from_file(model_path)?;
                info!("CoreML session ready");
                Ok(("CoreML (pinned)".to_string(), session))
            }
            #[cfg(not(all(target_os = "macos", feature = "coreml")))]
            "COREML" => {
                anyhow::bail!(
                    "CoreML support is not compiled in (build with --features coreml, macOS only)"
                )
            }

            "CPU" => {
                let session = Session::builder()?
                    .with_execution_providers([CPUExecutionProvider::default().build()])?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .with_intra_threads(num_cpus::get())?
                    .commit_from_file(model_path)?;
                info!("CPU session ready");
                Ok(("CPU (pinned)".to_string(), session))
            }
            _ => {
                anyhow::bail!(
                    "INFERENCE_BACKEND '{}' is not recognized \
                    (expected TENSORRT, CUDA, OPENVINO, DIRECTML, COREML, CPU or AUTO)",
                    backend
                )
            }
        }
    }

    fn build_session(config: &Config) -> Result<(String, Session)> {
        let model_path = config.model_path();
        info!("Loading ONNX model from {}...", model_path);

        // An explicitly configured backend wins over probing
        if let Some(ref backend) = config.detection.inference_backend {
            match backend.as_str() {
                "AUTO" => {
                    info!("INFERENCE_BACKEND=AUTO, probing accelerators");
                }
                pinned => {
                    info!("INFERENCE_BACKEND={}, skipping the probe", pinned);
                    return Self::build_pinned_session(pinned, model_path);
                }
            }
        }

        // Probe whichever accelerators were compiled in, fastest first

        #[cfg(feature = "tensorrt")]
        {
            if let Ok(session) = Session::builder()
                .and_then(|b| {
                    b.with_execution_providers([TensorRTExecutionProvider::default().build()])
                })
                .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
                .and_then(|b| b.with_intra_threads(num_cpus::get()))
                .and_then(|b| b.commit_from_file(model_path))
            {
                info!("Detector accelerated with TensorRT");
                return Ok(("TensorRT".to_string(), session));
            }
        }

        #[cfg(feature = "cuda")]
        {
            if let Ok(session) = Session::builder()
                .and_then(|b| b.with_execution_providers([CUDAExecutionProvider::default().build()]))
                .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
                .and_then(|b| b.with_intra_threads(num_cpus::get()))
                .and_then(|b| b.commit_from_file(model_path))
            {
                info!("Detector accelerated with CUDA");
                return Ok(("CUDA".to_string(), session));
            }
        }

        #[cfg(all(target_os = "macos", feature = "coreml"))]
        {
            if let Ok(session) = Session::builder()
                .and_then(|b| {
                    b.with_execution_providers([CoreMLExecutionProvider::default().build()])
                })
                .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
                .and_then(|b| b.with_intra_threads(num_cpus::get()))
                .and_then(|b| b.commit_from_file(model_path))
            {
                info!("Detector accelerated with CoreML");
                return Ok(("CoreML".to_string(), session));
            }
        }

        #[cfg(all(target_os = "windows", feature = "directml"))]
        {
            if let Ok(session) = Session::builder()
                .and_then(|b| {
                    b.with_execution_providers([DirectMLExecutionProvider::default().build()])
                })
                .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
                .and_then(|b| b.with_intra_threads(num_cpus::get()))
                .and_then(|b| b.commit_from_file(model_path))
            {
                info!("Detector accelerated with DirectML");
                return Ok(("DirectML".to_string(), session));
            }
        }

        #[cfg(feature = "openvino")]
        {
            if let Ok(session) = Session::builder()
                .and_then(|b| {
                    b.with_execution_providers([OpenVINOExecutionProvider::default()
                        .with_device_type("CPU")
                        .build()])
                })
                .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
                .and_then(|b| b.with_intra_threads(num_cpus::get()))
                .and_then(|b| b.commit_from_file(model_path))
            {
                info!("Detector accelerated with OpenVINO");
                return Ok(("OpenVINO-CPU".to_string(), session));
            }
        }

        // A plain CPU session always builds
        let session = Session::builder()?
            .with_execution_providers([CPUExecutionProvider::default().build()])?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(num_cpus::get())?
            .commit_from_file(model_path)?;

        info!("Detector running on CPU, no accelerator in use");
        Ok(("CPU".to_string(), session))
    }
}

#[async_trait]
impl ObjectDetector for OnnxDetector {
    async fn detect(&self, img: &DynamicImage) -> DetectionResult<Vec<RawDetection>> {
        debug!("Detection pass starting");
        let detection_start = std::time::Instant::now();

        let (preprocessed, letterbox) = preprocess_image(img, self.config.target_size())?;
        let images_value = Value::from_array(preprocessed)?;

        debug!("Forward pass on {}", self.device_type);
        let inference_start = std::time::Instant::now();

        let (shape, data) = {
            let mut session = self.session_pool.acquire().await;
            let outputs = session.run(ort::inputs!["images" => images_value])?;

            // outputs borrows the session; copy the tensor out before release
            let (output_shape, output_data) = outputs["output0"].try_extract_tensor::<f32>()?;
            let shape_owned = output_shape.to_vec();
            let data_owned = output_data.to_vec();

            drop(outputs);
            self.session_pool.release(session).await;

            (shape_owned, data_owned)
        };

        let inference_time = inference_start.elapsed();
        debug!("Forward pass took {:.2}ms", inference_time.as_secs_f64() * 1000.0);

        let candidates = decode_predictions(
            &shape,
            &data,
            self.config.candidate_threshold(),
            img.width(),
            img.height(),
            letterbox,
        )?;
        let kept = nms(candidates, self.config.iou_threshold());

        let total_time = detection_start.elapsed();
        debug!(
            "Detection pass kept {} boxes in {:.2}ms",
            kept.len(),
            total_time.as_secs_f64() * 1000.0
        );

        Ok(kept)
    }
}

/// Letterbox the image into a square model input.
///
/// The long side is scaled to `target_size`, the short side is centered on
/// gray (114) padding as in YOLO training, and pixels land in NCHW order
/// normalized to [0, 1].
pub fn preprocess_image(
    img: &DynamicImage,
    target_size: u32,
) -> DetectionResult<(Array4<f32>, Letterbox)> {
    let (orig_width, orig_height) = (img.width(), img.height());
    if orig_width == 0 || orig_height == 0 {
        return Err(DetectionError::PreprocessingFailed(format!(
            "zero-sized image ({orig_width}x{orig_height})"
        )));
    }

    trace!(
        "Preprocessing image: {}x{} → {}x{}",
        orig_width,
        orig_height,
        target_size,
        target_size
    );

    let rgb_img = img.to_rgb8();
    let max_dim = orig_width.max(orig_height);
    let scale = target_size as f32 / max_dim as f32;
    let new_width = ((orig_width as f32 * scale) as u32).clamp(1, target_size);
    let new_height = ((orig_height as f32 * scale) as u32).clamp(1, target_size);

    let resized = image::imageops::resize(
        &rgb_img,
        new_width,
        new_height,
        image::imageops::FilterType::Triangle,
    );

    // Center the resized image on the padded square
    let x_offset = (target_size - new_width) / 2;
    let y_offset = (target_size - new_height) / 2;

    let target = target_size as usize;
    let mut array = Array4::<f32>::from_elem((1, 3, target, target), 114.0 / 255.0);

    for y in 0..new_height {
        for x in 0..new_width {
            let pixel = resized.get_pixel(x, y);
            let (tx, ty) = ((x + x_offset) as usize, (y + y_offset) as usize);
            array[[0, 0, ty, tx]] = pixel[0] as f32 / 255.0;
            array[[0, 1, ty, tx]] = pixel[1] as f32 / 255.0;
            array[[0, 2, ty, tx]] = pixel[2] as f32 / 255.0;
        }
    }

    debug!("Input tensor ready: [1, 3, {}, {}]", target, target);
    Ok((
        array,
        Letterbox {
            scale,
            pad_x: x_offset as f32,
            pad_y: y_offset as f32,
        },
    ))
}

/// Decode the raw `[1, 4 + num_classes, num_boxes]` tensor into candidate
/// detections in original-image coordinates.
///
/// Each column carries cx/cy/w/h followed by per-class scores; the best
/// class wins, columns under `candidate_threshold` are skipped, and corner
/// coordinates are mapped back through the letterbox.
pub fn decode_predictions(
    shape: &[i64],
    data: &[f32],
    candidate_threshold: f32,
    orig_width: u32,
    orig_height: u32,
    letterbox: Letterbox,
) -> DetectionResult<Vec<RawDetection>> {
    if shape.len() != 3 || shape[1] < 5 {
        return Err(DetectionError::UnexpectedOutputShape(format!("{shape:?}")));
    }

    let num_attrs = shape[1] as usize;
    let num_classes = num_attrs - 4;
    let num_boxes = shape[2] as usize;

    if data.len() < num_attrs * num_boxes {
        return Err(DetectionError::UnexpectedOutputShape(format!(
            "{} values for shape {shape:?}",
            data.len()
        )));
    }

    // Attribute-major layout: value for attribute a of box b
    let attr = |a: usize, b: usize| data[a * num_boxes + b];

    let mut candidates = Vec::new();

    for b in 0..num_boxes {
        // Find the class with highest confidence
        let mut best_class_id = 0usize;
        let mut best_score = 0.0f32;
        for c in 0..num_classes {
            let score = attr(4 + c, b);
            if score > best_score {
                best_score = score;
                best_class_id = c;
            }
        }

        if best_score < candidate_threshold {
            continue;
        }

        let cx = attr(0, b);
        let cy = attr(1, b);
        let w = attr(2, b);
        let h = attr(3, b);

        // Convert center format to corners, then undo the letterbox
        let x1 = ((cx - w / 2.0 - letterbox.pad_x) / letterbox.scale).clamp(0.0, orig_width as f32);
        let y1 = ((cy - h / 2.0 - letterbox.pad_y) / letterbox.scale).clamp(0.0, orig_height as f32);
        let x2 = ((cx + w / 2.0 - letterbox.pad_x) / letterbox.scale).clamp(0.0, orig_width as f32);
        let y2 = ((cy + h / 2.0 - letterbox.pad_y) / letterbox.scale).clamp(0.0, orig_height as f32);

        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        candidates.push(RawDetection {
            class_id: best_class_id,
            confidence: best_score,
            bbox: [x1, y1, x2, y2],
        });
    }

    trace!(
        "Decoded {} candidates above threshold {:.2}",
        candidates.len(),
        candidate_threshold
    );
    Ok(candidates)
}

fn calculate_iou(box1: &[f32; 4], box2: &[f32; 4]) -> f32 {
    let x1 = box1[0].max(box2[0]);
    let y1 = box1[1].max(box2[1]);
    let x2 = box1[2].min(box2[2]);
    let y2 = box1[3].min(box2[3]);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let intersection = (x2 - x1) * (y2 - y1);
    let area1 = (box1[2] - box1[0]) * (box1[3] - box1[1]);
    let area2 = (box2[2] - box2[0]) * (box2[3] - box2[1]);
    let union = area1 + area2 - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Per-class non-maximum suppression. Boxes of different classes never
/// suppress each other; the kept list comes back highest confidence first.
pub fn nms(detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    if detections.is_empty() {
        debug!("NMS skipped, no candidates");
        return vec![];
    }

    let total = detections.len();
    trace!("Running NMS on {} candidates at IoU {}", total, iou_threshold);

    let mut class_groups: HashMap<usize, Vec<RawDetection>> = HashMap::new();
    for detection in detections {
        class_groups.entry(detection.class_id).or_default().push(detection);
    }

    let mut keep = Vec::new();

    for (_, mut group) in class_groups {
        group.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut suppressed = vec![false; group.len()];

        for i in 0..group.len() {
            if suppressed[i] {
                continue;
            }

            keep.push(group[i]);

            for j in (i + 1)..group.len() {
                if !suppressed[j] && calculate_iou(&group[i].bbox, &group[j].bbox) > iou_threshold {
                    suppressed[j] = true;
                }
            }
        }
    }

    keep.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    debug!("NMS kept {}/{} candidates", keep.len(), total);
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [20.0, 20.0, 30.0, 30.0];
        assert_eq!(calculate_iou(&a, &b), 0.0);
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = [5.0, 5.0, 15.0, 25.0];
        assert!((calculate_iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_half_overlap() {
        // 10x10 boxes sharing a 5x10 strip: intersection 50, union 150
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [5.0, 0.0, 15.0, 10.0];
        assert!((calculate_iou(&a, &b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn preprocess_letterboxes_landscape_input() {
        let img = image::DynamicImage::new_rgb8(100, 50);
        let (array, lb) = preprocess_image(&img, 64).unwrap();

        assert_eq!(array.shape(), &[1, 3, 64, 64]);
        assert!((lb.scale - 0.64).abs() < 1e-6);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 16.0);

        // Rows above and below the content are gray padding
        let gray = 114.0 / 255.0;
        assert!((array[[0, 0, 0, 0]] - gray).abs() < 1e-6);
        assert!((array[[0, 2, 63, 63]] - gray).abs() < 1e-6);
        // Content rows hold the (black) source pixels
        assert!(array[[0, 0, 32, 32]].abs() < 1e-6);
    }

    #[test]
    fn preprocess_rejects_zero_sized_image() {
        let img = image::DynamicImage::new_rgb8(0, 0);
        assert!(preprocess_image(&img, 64).is_err());
    }

    // Build an attribute-major [1, attrs, boxes] buffer from per-attribute rows
    fn tensor(rows: &[&[f32]]) -> (Vec<i64>, Vec<f32>) {
        let shape = vec![1, rows.len() as i64, rows[0].len() as i64];
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        (shape, data)
    }

    #[test]
    fn decode_maps_through_letterbox_and_drops_weak_candidates() {
        // Two classes, three boxes. Box 1 scores under the candidate
        // threshold; box 2 duplicates box 0 and dies in NMS.
        let (shape, data) = tensor(&[
            &[320.0, 100.0, 322.0], // cx
            &[320.0, 100.0, 320.0], // cy
            &[100.0, 50.0, 100.0],  // w
            &[200.0, 50.0, 200.0],  // h
            &[0.9, 0.2, 0.8],       // class 0 scores
            &[0.1, 0.1, 0.05],      // class 1 scores
        ]);

        // 1280x1280 source into a 640 square: scale 0.5, no padding
        let lb = Letterbox { scale: 0.5, pad_x: 0.0, pad_y: 0.0 };
        let candidates = decode_predictions(&shape, &data, 0.25, 1280, 1280, lb).unwrap();
        assert_eq!(candidates.len(), 2);

        let kept = nms(candidates, 0.7);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].class_id, 0);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);

        let [x1, y1, x2, y2] = kept[0].bbox;
        assert!((x1 - 540.0).abs() < 1e-3);
        assert!((y1 - 440.0).abs() < 1e-3);
        assert!((x2 - 740.0).abs() < 1e-3);
        assert!((y2 - 840.0).abs() < 1e-3);
    }

    #[test]
    fn decode_accounts_for_padding_offset() {
        // Single class, single box centered on a letterboxed 100x50 image
        // (scale 0.64, pad_y 16 at target 64)
        let (shape, data) = tensor(&[
            &[32.0], // cx
            &[32.0], // cy
            &[32.0], // w
            &[16.0], // h
            &[0.9],  // class 0 score
        ]);

        let lb = Letterbox { scale: 0.64, pad_x: 0.0, pad_y: 16.0 };
        let candidates = decode_predictions(&shape, &data, 0.25, 100, 50, lb).unwrap();
        assert_eq!(candidates.len(), 1);

        let [x1, y1, x2, y2] = candidates[0].bbox;
        assert!((x1 - 25.0).abs() < 1e-3);
        assert!((y1 - 12.5).abs() < 1e-3);
        assert!((x2 - 75.0).abs() < 1e-3);
        assert!((y2 - 37.5).abs() < 1e-3);
    }

    #[test]
    fn decode_rejects_malformed_shapes() {
        assert!(decode_predictions(
            &[1, 2],
            &[0.0; 4],
            0.25,
            64,
            64,
            Letterbox { scale: 1.0, pad_x: 0.0, pad_y: 0.0 }
        )
        .is_err());

        assert!(decode_predictions(
            &[1, 4, 10],
            &[0.0; 40],
            0.25,
            64,
            64,
            Letterbox { scale: 1.0, pad_x: 0.0, pad_y: 0.0 }
        )
        .is_err());
    }

    #[test]
    fn nms_keeps_overlapping_boxes_of_different_classes() {
        let a = RawDetection {
            class_id: 0,
            confidence: 0.9,
            bbox: [0.0, 0.0, 10.0, 10.0],
        };
        let b = RawDetection {
            class_id: 1,
            confidence: 0.8,
            bbox: [1.0, 1.0, 11.0, 11.0],
        };
        let kept = nms(vec![a, b], 0.5);
        assert_eq!(kept.len(), 2);
        // Highest confidence first
        assert_eq!(kept[0].class_id, 0);
    }
}
