/// MediaPipe BlazeFace short-range (`blaze_face_short_range.tflite`)
/// converted to ONNX: input `[1, 3, 128, 128]` in `[0, 1]`, outputs
/// regressors `[1, 896, 16]` and classificators `[1, 896, 1]` in either
/// order. Any mirror of a conversion with that signature works; the URL
/// is overridable through `model_url` in the settings file.
pub const BLAZEFACE_MODEL_NAME: &str = "blaze_face_short_range.onnx";
pub const BLAZEFACE_MODEL_URL: &str =
    "https://github.com/zineos/blazeface-onnx/releases/download/v1.0.0/blaze_face_short_range.onnx";

pub const DEFAULT_UPLOAD_URL: &str = "https://facial-attendance.requestcatcher.com/";

/// Multipart field and filename the attendance endpoint expects.
pub const UPLOAD_FIELD_NAME: &str = "image";
pub const UPLOAD_FILE_NAME: &str = "user.png";
pub const UPLOAD_MIME_TYPE: &str = "image/png";

/// Delay after an upload settles before the next one may start.
pub const UPLOAD_COOLDOWN_MS: u64 = 1000;

pub const DEFAULT_TARGET_FPS: u32 = 30;

/// How long to wait for the camera to decode its first frame.
pub const FIRST_FRAME_TIMEOUT_MS: u64 = 10_000;

/// Confidence label sits this many pixels above the box.
pub const LABEL_OFFSET_Y: f64 = 30.0;
/// Highlighter and label are drawn this much narrower than the box.
pub const BOX_WIDTH_INSET: f64 = 10.0;
/// Half the size of a key-point marker, so it centers on the landmark.
pub const KEYPOINT_RADIUS: f64 = 3.0;

#[cfg(target_os = "linux")]
pub const DEFAULT_INPUT_FORMAT: &str = "v4l2";
#[cfg(target_os = "linux")]
pub const DEFAULT_DEVICE: &str = "/dev/video0";

#[cfg(target_os = "macos")]
pub const DEFAULT_INPUT_FORMAT: &str = "avfoundation";
#[cfg(target_os = "macos")]
pub const DEFAULT_DEVICE: &str = "0";

#[cfg(target_os = "windows")]
pub const DEFAULT_INPUT_FORMAT: &str = "dshow";
#[cfg(target_os = "windows")]
pub const DEFAULT_DEVICE: &str = "video=Integrated Camera";

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub const DEFAULT_INPUT_FORMAT: &str = "";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub const DEFAULT_DEVICE: &str = "";
