use std::collections::BTreeMap;
use std::time::Instant;

/// Cross-cutting logger for frame-loop events.
///
/// Keeps the loop free of any particular reporting mechanism.
pub trait LoopLogger: Send {
    /// How long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A per-frame sample, such as the number of faces found.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Called once when the loop stops.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullLoopLogger;

impl LoopLogger for NullLoopLogger {
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running count / sum / max of a sample stream.
///
/// A live session has no natural end, so samples are folded in rather
/// than stored.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Series {
    pub count: usize,
    pub sum: f64,
    pub max: f64,
}

impl Series {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.max = if self.count == 1 {
            value
        } else {
            self.max.max(value)
        };
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Folds timings and metrics into [`Series`] and logs a table when the
/// loop stops.
pub struct SummaryLoopLogger {
    timings: BTreeMap<String, Series>,
    metrics: BTreeMap<String, Series>,
    started: Instant,
}

impl SummaryLoopLogger {
    pub fn new() -> Self {
        Self {
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            started: Instant::now(),
        }
    }

    pub fn timings_for(&self, stage: &str) -> Option<Series> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<Series> {
        self.metrics.get(name).copied()
    }

    /// `None` until something has been recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let secs = self.started.elapsed().as_secs_f64();
        let mut out = format!("Live session summary ({secs:.1}s):");
        for (stage, s) in &self.timings {
            out.push_str(&format!(
                "\n  {stage:12}: avg {:6.1}ms  max {:6.1}ms  ({} frames)",
                s.mean(),
                s.max,
                s.count
            ));
        }
        for (name, s) in &self.metrics {
            out.push_str(&format!(
                "\n  {name}: avg {:.1}  max {:.0}",
                s.mean(),
                s.max
            ));
        }
        Some(out)
    }
}

impl Default for SummaryLoopLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopLogger for SummaryLoopLogger {
    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_owned())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_owned()).or_default().record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        match self.summary_string() {
            Some(text) => log::info!("\n\n{text}"),
            None => log::info!("Live session ended before any frame was processed"),
        }
    }
}
