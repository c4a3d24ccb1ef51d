use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::rendering::annotated_frame::annotate;
use crate::rendering::overlay::OverlayBatch;
use crate::rendering::overlay_surface::OverlaySurface;
use crate::shared::frame::Frame;

pub const DEFAULT_PREVIEW_INTERVAL_MS: u64 = 200;

/// Live view written to disk: the mirrored frame with its overlays,
/// replaced in place as a PNG so an image viewer can follow it.
///
/// Writes at most once per `min_interval`. Each write goes to a `.part`
/// file first and is renamed over the target, so readers never see a
/// half-written image.
pub struct PreviewFileSurface {
    path: PathBuf,
    min_interval: Duration,
    last_written: Option<Instant>,
    written: usize,
    failing: bool,
}

impl PreviewFileSurface {
    pub fn new(path: impl Into<PathBuf>, min_interval: Duration) -> Self {
        Self {
            path: path.into(),
            min_interval,
            last_written: None,
            written: 0,
            failing: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of previews written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    fn write(
        &self,
        frame: &Frame,
        batch: &OverlayBatch,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let img = annotate(frame, batch)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = self.path.with_extension("part");
        img.save_with_format(&temp_path, image::ImageFormat::Png)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl OverlaySurface for PreviewFileSurface {
    fn present(&mut self, frame: &Frame, batch: &OverlayBatch) {
        let due = self
            .last_written
            .map_or(true, |at| at.elapsed() >= self.min_interval);
        if !due {
            return;
        }
        self.last_written = Some(Instant::now());

        match self.write(frame, batch) {
            Ok(()) => {
                self.written += 1;
                if self.failing {
                    log::info!("Preview writes resumed: {}", self.path.display());
                    self.failing = false;
                }
            }
            // Logged once per failure streak; the loop keeps running.
            Err(e) if !self.failing => {
                log::warn!("Failed to write preview {}: {e}", self.path.display());
                self.failing = true;
            }
            Err(_) => {}
        }
    }
}
