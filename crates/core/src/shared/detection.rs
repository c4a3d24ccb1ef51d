/// Axis-aligned face box in native frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
}

/// A scored class label attached to a detection.
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub score: f64,
    pub index: usize,
}

/// A facial landmark, normalized to [0, 1] across the frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
}

/// One face found in one frame. Transient: dropped after rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bounding_box: Option<BoundingBox>,
    pub categories: Vec<Category>,
    pub keypoints: Vec<Keypoint>,
}

impl Detection {
    /// Score of the top category, or 0.0 when the detector gave none.
    pub fn score(&self) -> f64 {
        self.categories.first().map_or(0.0, |c| c.score)
    }
}
