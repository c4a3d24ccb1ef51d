use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use attendance_core::detection::domain::face_detector::Delegate;
use attendance_core::detection::infrastructure::onnx_blazeface_detector::DEFAULT_CONFIDENCE;
use attendance_core::rendering::preview_file_surface::DEFAULT_PREVIEW_INTERVAL_MS;
use attendance_core::shared::constants::{
    BLAZEFACE_MODEL_NAME, BLAZEFACE_MODEL_URL, DEFAULT_DEVICE, DEFAULT_INPUT_FORMAT,
    DEFAULT_TARGET_FPS, DEFAULT_UPLOAD_URL, FIRST_FRAME_TIMEOUT_MS, UPLOAD_COOLDOWN_MS,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Persistent configuration. Missing keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device: String,
    pub input_format: String,
    pub upload_url: String,
    pub cooldown_ms: u64,
    pub confidence: f64,
    pub target_fps: u32,
    pub display_width: Option<u32>,
    pub display_height: Option<u32>,
    pub delegate: Delegate,
    pub model_name: String,
    pub model_url: String,
    pub first_frame_timeout_ms: u64,
    /// Annotated live view is written here when set.
    pub preview_path: Option<PathBuf>,
    pub preview_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            input_format: DEFAULT_INPUT_FORMAT.to_string(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            cooldown_ms: UPLOAD_COOLDOWN_MS,
            confidence: DEFAULT_CONFIDENCE,
            target_fps: DEFAULT_TARGET_FPS,
            display_width: None,
            display_height: None,
            delegate: Delegate::Gpu,
            model_name: BLAZEFACE_MODEL_NAME.to_string(),
            model_url: BLAZEFACE_MODEL_URL.to_string(),
            first_frame_timeout_ms: FIRST_FRAME_TIMEOUT_MS,
            preview_path: None,
            preview_interval_ms: DEFAULT_PREVIEW_INTERVAL_MS,
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("AttendanceCam").join("settings.json"))
    }

    /// Loads settings from `path`, or from the default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => return Err(SettingsError::Read { path, source }),
        };

        serde_json::from_str(&json).map_err(|source| SettingsError::Parse { path, source })
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            SettingsError::Invalid(format!("cannot serialize settings: {e}"))
        })?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |msg: String| Err(SettingsError::Invalid(msg));

        if !(0.0..=1.0).contains(&self.confidence) {
            return invalid(format!(
                "Confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            ));
        }
        if self.target_fps == 0 || self.target_fps > 240 {
            return invalid(format!(
                "Target FPS must be between 1 and 240, got {}",
                self.target_fps
            ));
        }
        if self.display_width.is_some() != self.display_height.is_some() {
            return invalid("Display width and height must be given together".into());
        }
        if self.display_width == Some(0) || self.display_height == Some(0) {
            return invalid("Display size must be non-zero".into());
        }
        if !(self.upload_url.starts_with("http://") || self.upload_url.starts_with("https://")) {
            return invalid(format!(
                "Upload URL must be http(s), got '{}'",
                self.upload_url
            ));
        }
        if self.preview_path.as_deref() == Some(Path::new("")) {
            return invalid("Preview path must not be empty".into());
        }
        if self.device.is_empty() {
            return invalid("Capture device must not be empty".into());
        }
        Ok(())
    }
}
