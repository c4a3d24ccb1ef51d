use crate::shared::constants::{BOX_WIDTH_INSET, KEYPOINT_RADIUS, LABEL_OFFSET_Y};
use crate::shared::detection::Detection;

/// On-screen size of the video the overlay is laid over.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A single marker drawn over the live video. Positions are in display
/// pixels, already mirrored for a front-facing camera.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayElement {
    Highlighter {
        left: f64,
        top: f64,
        width: f64,
        height: f64,
        /// Set while a snapshot of this face is being uploaded.
        busy: bool,
    },
    ConfidenceLabel {
        text: String,
        left: f64,
        top: f64,
        width: f64,
    },
    KeyPoint {
        left: f64,
        top: f64,
    },
}

/// The complete set of markers for one rendered frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayBatch {
    display: DisplaySize,
    elements: Vec<OverlayElement>,
}

impl OverlayBatch {
    /// Size of the view the element positions refer to.
    pub fn display(&self) -> DisplaySize {
        self.display
    }

    pub fn elements(&self) -> &[OverlayElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            OverlayElement::ConfidenceLabel { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Builds overlay batches from detections.
///
/// Owns exactly one batch. Every [`render`](Self::render) discards the
/// previous batch wholesale; nothing carries over between frames.
pub struct OverlayRenderer {
    display: DisplaySize,
    batch: OverlayBatch,
}

impl OverlayRenderer {
    pub fn new(display: DisplaySize) -> Self {
        Self {
            display,
            batch: OverlayBatch {
                display,
                elements: Vec::new(),
            },
        }
    }

    pub fn display(&self) -> DisplaySize {
        self.display
    }

    pub fn current(&self) -> &OverlayBatch {
        &self.batch
    }

    /// Replaces the live batch with markers for `detections`.
    ///
    /// Detections without a bounding box are skipped entirely.
    pub fn render(&mut self, detections: &[Detection], sending: bool) -> &OverlayBatch {
        let mut elements = Vec::with_capacity(
            detections.len() * 2 + detections.iter().map(|d| d.keypoints.len()).sum::<usize>(),
        );

        for detection in detections {
            let Some(bbox) = detection.bounding_box else {
                continue;
            };
            let left = self.display.width - bbox.width - bbox.origin_x;
            let width = bbox.width - BOX_WIDTH_INSET;

            elements.push(OverlayElement::Highlighter {
                left,
                top: bbox.origin_y,
                width,
                height: bbox.height,
                busy: sending,
            });
            elements.push(OverlayElement::ConfidenceLabel {
                text: confidence_text(detection.score()),
                left,
                top: bbox.origin_y - LABEL_OFFSET_Y,
                width,
            });

            for kp in &detection.keypoints {
                elements.push(OverlayElement::KeyPoint {
                    left: self.display.width - kp.x * self.display.width - KEYPOINT_RADIUS,
                    top: kp.y * self.display.height - KEYPOINT_RADIUS,
                });
            }
        }

        self.batch = OverlayBatch {
            display: self.display,
            elements,
        };
        &self.batch
    }
}

pub fn confidence_text(score: f64) -> String {
    format!("Confidence: {}% .", (score * 100.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::detection::{BoundingBox, Category, Keypoint};
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn detection(x: f64, y: f64, w: f64, h: f64, score: f64, keypoints: usize) -> Detection {
        Detection {
            bounding_box: Some(BoundingBox {
                origin_x: x,
                origin_y: y,
                width: w,
                height: h,
            }),
            categories: vec![Category { score, index: 0 }],
            keypoints: (0..keypoints)
                .map(|i| Keypoint {
                    x: 0.1 * i as f64,
                    y: 0.5,
                })
                .collect(),
        }
    }

    fn renderer() -> OverlayRenderer {
        OverlayRenderer::new(DisplaySize::new(640.0, 480.0))
    }

    #[rstest]
    #[case::rounds_down(0.924, "Confidence: 92% .")]
    #[case::rounds_up(0.915, "Confidence: 92% .")]
    #[case::full(1.0, "Confidence: 100% .")]
    #[case::zero(0.0, "Confidence: 0% .")]
    fn test_confidence_text(#[case] score: f64, #[case] expected: &str) {
        assert_eq!(confidence_text(score), expected);
    }

    #[test]
    fn test_render_single_detection_geometry() {
        let mut r = renderer();
        let batch = r.render(&[detection(10.0, 10.0, 100.0, 100.0, 0.92, 0)], false);

        assert_eq!(batch.len(), 2);
        assert_eq!(
            batch.elements()[0],
            OverlayElement::Highlighter {
                left: 530.0,
                top: 10.0,
                width: 90.0,
                height: 100.0,
                busy: false,
            }
        );
        assert_eq!(
            batch.elements()[1],
            OverlayElement::ConfidenceLabel {
                text: "Confidence: 92% .".into(),
                left: 530.0,
                top: -20.0,
                width: 90.0,
            }
        );
    }

    #[test]
    fn test_keypoints_are_mirrored_and_scaled() {
        let mut r = renderer();
        let mut d = detection(0.0, 0.0, 50.0, 50.0, 0.5, 0);
        d.keypoints = vec![Keypoint { x: 0.25, y: 0.5 }];
        let batch = r.render(&[d], false);

        match &batch.elements()[2] {
            OverlayElement::KeyPoint { left, top } => {
                assert_relative_eq!(*left, 640.0 - 160.0 - 3.0);
                assert_relative_eq!(*top, 240.0 - 3.0);
            }
            other => panic!("expected key point, got {other:?}"),
        }
    }

    #[rstest]
    #[case::none(vec![], 0)]
    #[case::one_without_keypoints(vec![0], 2)]
    #[case::one_with_six(vec![6], 8)]
    #[case::three_mixed(vec![6, 0, 2], 14)]
    fn test_batch_size_is_two_per_face_plus_keypoints(
        #[case] keypoints_per_face: Vec<usize>,
        #[case] expected: usize,
    ) {
        let mut r = renderer();
        let detections: Vec<_> = keypoints_per_face
            .iter()
            .enumerate()
            .map(|(i, &k)| detection(i as f64 * 120.0, 0.0, 100.0, 100.0, 0.8, k))
            .collect();
        assert_eq!(r.render(&detections, false).len(), expected);
    }

    #[test]
    fn test_render_replaces_previous_batch() {
        let mut r = renderer();
        r.render(
            &[
                detection(0.0, 0.0, 100.0, 100.0, 0.9, 6),
                detection(200.0, 0.0, 100.0, 100.0, 0.9, 6),
            ],
            false,
        );
        assert_eq!(r.current().len(), 16);

        let batch = r.render(&[detection(10.0, 10.0, 100.0, 100.0, 0.5, 0)], false);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.labels().collect::<Vec<_>>(), vec!["Confidence: 50% ."]);

        assert!(r.render(&[], false).is_empty());
        assert!(r.current().is_empty());
    }

    #[test]
    fn test_highlighter_busy_while_sending() {
        let mut r = renderer();
        let batch = r.render(&[detection(0.0, 0.0, 100.0, 100.0, 0.9, 0)], true);
        assert!(matches!(
            batch.elements()[0],
            OverlayElement::Highlighter { busy: true, .. }
        ));
    }

    #[test]
    fn test_detection_without_box_is_skipped() {
        let mut r = renderer();
        let mut d = detection(0.0, 0.0, 100.0, 100.0, 0.9, 3);
        d.bounding_box = None;
        assert!(r.render(&[d], false).is_empty());
    }
}
