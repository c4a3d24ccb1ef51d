//! BlazeFace short-range face detector running on ONNX Runtime via `ort`.
//!
//! Produces one [`Detection`] per face with a pixel-space bounding box,
//! a single "face" category and the six BlazeFace landmarks (eyes, nose
//! tip, mouth, ear tragions) normalized to the frame.
use std::path::Path;

use crate::detection::domain::face_detector::{Delegate, FaceDetector};
use crate::detection::infrastructure::execution_provider::execution_providers_for;
use crate::shared::detection::{BoundingBox, Category, Detection, Keypoint};
use crate::shared::frame::Frame;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const NMS_IOU_THRESH: f64 = 0.3;

const NUM_ANCHORS: usize = 896;

const NUM_KEYPOINTS: usize = 6;

/// Values per anchor in the regressor output: 4 box + 6 (x, y) keypoints.
const REGRESSOR_STRIDE: usize = 4 + NUM_KEYPOINTS * 2;

pub struct OnnxBlazefaceDetector {
    session: ort::session::Session,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
    last_timestamp_ms: Option<f64>,
}

impl OnnxBlazefaceDetector {
    /// Load a BlazeFace ONNX model with the given hardware delegate.
    pub fn new(
        model_path: &Path,
        delegate: Delegate,
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(execution_providers_for(delegate))?
            .commit_from_file(model_path)?;
        log::info!(
            "Loaded face detector {} ({delegate} delegate)",
            model_path.display()
        );
        Ok(Self {
            session,
            confidence,
            anchors: generate_anchors(),
            last_timestamp_ms: None,
        })
    }
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn detect_for_video(
        &mut self,
        frame: &Frame,
        timestamp_ms: f64,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        check_monotonic(self.last_timestamp_ms, timestamp_ms)?;
        self.last_timestamp_ms = Some(timestamp_ms);

        let input_tensor = preprocess(frame, INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }

        let first = outputs[0].try_extract_array::<f32>()?;
        let second = outputs[1].try_extract_array::<f32>()?;
        let (reg_data, score_data) = split_outputs(
            first.as_slice().ok_or("Cannot get output 0 slice")?,
            second.as_slice().ok_or("Cannot get output 1 slice")?,
        )?;

        let mut raw = decode(reg_data, score_data, &self.anchors, self.confidence as f32);
        let kept = nms(&mut raw, NMS_IOU_THRESH);

        Ok(kept
            .into_iter()
            .map(|d| d.into_detection(frame.width(), frame.height()))
            .collect())
    }
}

/// Tells regressors `[1, 896, 16]` from classificators `[1, 896, 1]` by
/// size. Conversions of the MediaPipe model do not agree on output order.
fn split_outputs<'a>(a: &'a [f32], b: &'a [f32]) -> Result<(&'a [f32], &'a [f32]), String> {
    let regressors = NUM_ANCHORS * REGRESSOR_STRIDE;
    match (a.len(), b.len()) {
        (r, s) if r == regressors && s == NUM_ANCHORS => Ok((a, b)),
        (s, r) if r == regressors && s == NUM_ANCHORS => Ok((b, a)),
        (x, y) => Err(format!(
            "Unexpected BlazeFace output sizes {x} and {y}, want {regressors} and {NUM_ANCHORS}"
        )),
    }
}

fn check_monotonic(last: Option<f64>, timestamp_ms: f64) -> Result<(), String> {
    match last {
        Some(prev) if timestamp_ms < prev => Err(format!(
            "video timestamps must be monotonically increasing: {timestamp_ms} < {prev}"
        )),
        _ => Ok(()),
    }
}

/// Resize frame to `size × size` and normalize to [0,1] NCHW float32.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

/// Short-range anchors: a 16×16 grid with 2 anchors per cell and an
/// 8×8 grid with 6 per cell.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

/// Candidate face in normalized [0,1] frame coordinates.
#[derive(Clone, Debug)]
struct RawDet {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f64,
    keypoints: Vec<(f64, f64)>,
}

impl RawDet {
    fn into_detection(self, frame_w: u32, frame_h: u32) -> Detection {
        let fw = frame_w as f64;
        let fh = frame_h as f64;
        Detection {
            bounding_box: Some(BoundingBox {
                origin_x: self.x1 * fw,
                origin_y: self.y1 * fh,
                width: (self.x2 - self.x1) * fw,
                height: (self.y2 - self.y1) * fh,
            }),
            categories: vec![Category {
                score: self.score,
                index: 0,
            }],
            keypoints: self
                .keypoints
                .into_iter()
                .map(|(x, y)| Keypoint { x, y })
                .collect(),
        }
    }
}

fn decode(reg_data: &[f32], score_data: &[f32], anchors: &[[f32; 2]], threshold: f32) -> Vec<RawDet> {
    let size = INPUT_SIZE as f32;
    let mut dets = Vec::new();

    for (i, &raw_score) in score_data.iter().enumerate().take(anchors.len()) {
        let score = sigmoid(raw_score);
        if score < threshold {
            continue;
        }

        let off = i * REGRESSOR_STRIDE;
        if off + REGRESSOR_STRIDE > reg_data.len() {
            break;
        }
        let anchor = anchors[i];
        let reg = &reg_data[off..off + REGRESSOR_STRIDE];

        let cx = anchor[0] + reg[0] / size;
        let cy = anchor[1] + reg[1] / size;
        let w = reg[2] / size;
        let h = reg[3] / size;

        let keypoints = (0..NUM_KEYPOINTS)
            .map(|k| {
                let kx = anchor[0] + reg[4 + k * 2] / size;
                let ky = anchor[1] + reg[5 + k * 2] / size;
                (kx.clamp(0.0, 1.0) as f64, ky.clamp(0.0, 1.0) as f64)
            })
            .collect();

        dets.push(RawDet {
            x1: (cx - w / 2.0).max(0.0) as f64,
            y1: (cy - h / 2.0).max(0.0) as f64,
            x2: (cx + w / 2.0).min(1.0) as f64,
            y2: (cy + h / 2.0).min(1.0) as f64,
            score: score as f64,
            keypoints,
        });
    }

    dets
}

fn nms(dets: &mut [RawDet], iou_thresh: f64) -> Vec<RawDet> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && bbox_iou(&dets[i], &dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &RawDet, b: &RawDet) -> f64 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn raw(x1: f64, y1: f64, x2: f64, y2: f64, score: f64) -> RawDet {
        RawDet {
            x1,
            y1,
            x2,
            y2,
            score,
            keypoints: vec![],
        }
    }

    #[test]
    fn test_preprocess_shape() {
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0.0);
        let tensor = preprocess(&frame, 128);
        assert_eq!(tensor.shape(), &[1, 3, 128, 128]);
    }

    #[test]
    fn test_preprocess_normalized() {
        let frame = Frame::new(vec![255u8; 50 * 50 * 3], 50, 50, 3, 0.0);
        let tensor = preprocess(&frame, 128);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_generate_anchors_count() {
        // 16×16 × 2 + 8×8 × 6 = 512 + 384
        assert_eq!(generate_anchors().len(), NUM_ANCHORS);
    }

    #[test]
    fn test_decode_skips_low_scores() {
        let anchors = vec![[0.5, 0.5]; 2];
        let reg = vec![0.0f32; 2 * REGRESSOR_STRIDE];
        let scores = [-10.0f32, -10.0];
        assert!(decode(&reg, &scores, &anchors, 0.5).is_empty());
    }

    #[test]
    fn test_decode_box_and_keypoints() {
        let anchors = vec![[0.5, 0.5]];
        let mut reg = vec![0.0f32; REGRESSOR_STRIDE];
        reg[2] = 64.0; // w = 0.5
        reg[3] = 32.0; // h = 0.25
        reg[4] = -12.8; // first keypoint x = 0.4
        reg[5] = 12.8; // first keypoint y = 0.6
        let dets = decode(&reg, &[10.0], &anchors, 0.5);

        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert_relative_eq!(d.x1, 0.25, epsilon = 1e-6);
        assert_relative_eq!(d.x2, 0.75, epsilon = 1e-6);
        assert_relative_eq!(d.y1, 0.375, epsilon = 1e-6);
        assert_eq!(d.keypoints.len(), NUM_KEYPOINTS);
        assert_relative_eq!(d.keypoints[0].0, 0.4, epsilon = 1e-6);
        assert_relative_eq!(d.keypoints[0].1, 0.6, epsilon = 1e-6);
        // Remaining keypoints sit on the anchor.
        assert_relative_eq!(d.keypoints[5].0, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_into_detection_scales_to_pixels() {
        let mut d = raw(0.25, 0.5, 0.75, 1.0, 0.9);
        d.keypoints = vec![(0.1, 0.2)];
        let det = d.into_detection(200, 100);
        let b = det.bounding_box.unwrap();
        assert_relative_eq!(b.origin_x, 50.0);
        assert_relative_eq!(b.origin_y, 50.0);
        assert_relative_eq!(b.width, 100.0);
        assert_relative_eq!(b.height, 50.0);
        assert_relative_eq!(det.score(), 0.9);
        assert_eq!(det.keypoints, vec![Keypoint { x: 0.1, y: 0.2 }]);
    }

    #[test]
    fn test_sigmoid_zero() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlap() {
        let mut dets = vec![raw(0.0, 0.0, 0.5, 0.5, 0.7), raw(0.02, 0.02, 0.52, 0.52, 0.9)];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_nms_keeps_separate() {
        let mut dets = vec![raw(0.0, 0.0, 0.2, 0.2, 0.9), raw(0.6, 0.6, 0.8, 0.8, 0.8)];
        assert_eq!(nms(&mut dets, 0.3).len(), 2);
    }

    #[test]
    fn test_check_monotonic_rejects_backwards_time() {
        assert!(check_monotonic(None, 5.0).is_ok());
        assert!(check_monotonic(Some(5.0), 5.0).is_ok());
        assert!(check_monotonic(Some(5.0), 4.0).is_err());
    }

    #[test]
    fn test_split_outputs_accepts_either_order() {
        let reg = vec![0.0f32; NUM_ANCHORS * REGRESSOR_STRIDE];
        let scores = vec![1.0f32; NUM_ANCHORS];

        let (r, s) = split_outputs(&reg, &scores).unwrap();
        assert_eq!((r.len(), s.len()), (reg.len(), scores.len()));

        let (r, s) = split_outputs(&scores, &reg).unwrap();
        assert_eq!((r.len(), s.len()), (reg.len(), scores.len()));
    }

    #[test]
    fn test_split_outputs_rejects_other_models() {
        let boxes = vec![0.0f32; 8400 * 5];
        let scores = vec![0.0f32; NUM_ANCHORS];
        assert!(split_outputs(&boxes, &scores).is_err());
    }
}
