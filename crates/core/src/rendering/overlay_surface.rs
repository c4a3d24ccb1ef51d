use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::rendering::overlay::{OverlayBatch, OverlayElement};
use crate::shared::frame::Frame;

/// Where rendered overlays end up (a window, a file, a log).
///
/// Receives the frame the batch was detected on. Each call replaces
/// whatever the surface showed before.
pub trait OverlaySurface: Send {
    fn present(&mut self, frame: &Frame, batch: &OverlayBatch);
}

/// Headless surface that reports overlay changes through `log`.
///
/// Emits a debug line whenever the number of markers changes and the
/// full element list at trace level.
#[derive(Default)]
pub struct LoggingOverlaySurface {
    last_len: Option<usize>,
}

impl LoggingOverlaySurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OverlaySurface for LoggingOverlaySurface {
    fn present(&mut self, _frame: &Frame, batch: &OverlayBatch) {
        if self.last_len != Some(batch.len()) {
            let faces = batch
                .elements()
                .iter()
                .filter(|e| matches!(e, OverlayElement::Highlighter { .. }))
                .count();
            log::debug!("Overlay: {faces} face(s), {} marker(s)", batch.len());
            self.last_len = Some(batch.len());
        }
        for label in batch.labels() {
            log::trace!("{label}");
        }
    }
}

pub const DEFAULT_HISTORY: usize = 32;

/// Keeps the most recent presented batches in memory.
///
/// Clones share the same history, so a handle kept by the caller sees
/// what the loop presented after the surface was boxed away. Older
/// batches are dropped once `capacity` is reached.
#[derive(Clone)]
pub struct InMemoryOverlaySurface {
    presented: Arc<Mutex<VecDeque<OverlayBatch>>>,
    capacity: usize,
}

impl InMemoryOverlaySurface {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            presented: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    /// Retained batches, oldest first.
    pub fn presented(&self) -> Vec<OverlayBatch> {
        self.presented
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn latest(&self) -> Option<OverlayBatch> {
        self.presented
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .cloned()
    }
}

impl Default for InMemoryOverlaySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlaySurface for InMemoryOverlaySurface {
    fn present(&mut self, _frame: &Frame, batch: &OverlayBatch) {
        let mut presented = self
            .presented
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if presented.len() == self.capacity {
            presented.pop_front();
        }
        presented.push_back(batch.clone());
    }
}
