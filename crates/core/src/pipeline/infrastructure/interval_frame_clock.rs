use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::pipeline::frame_clock::FrameClock;

/// Ticks at a fixed rate until its cancellation flag is raised.
pub struct IntervalFrameClock {
    origin: Instant,
    interval: Duration,
    next_deadline: Instant,
    cancelled: Arc<AtomicBool>,
}

impl IntervalFrameClock {
    pub fn new(fps: u32, cancelled: Arc<AtomicBool>) -> Self {
        let interval = Duration::from_nanos(1_000_000_000 / fps.max(1) as u64);
        let origin = Instant::now();
        Self {
            origin,
            interval,
            next_deadline: origin + interval,
            cancelled,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl FrameClock for IntervalFrameClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn next_frame(&mut self) -> bool {
        if self.cancelled.load(Ordering::Relaxed) {
            return false;
        }

        let now = Instant::now();
        if now < self.next_deadline {
            std::thread::sleep(self.next_deadline - now);
            self.next_deadline += self.interval;
        } else {
            // Fell behind: skip missed ticks instead of bursting to catch up.
            self.next_deadline = now + self.interval;
        }

        !self.cancelled.load(Ordering::Relaxed)
    }
}
