/// Drives the per-frame loop, standing in for a display refresh callback.
pub trait FrameClock {
    /// Monotonic milliseconds since the clock started.
    fn now_ms(&self) -> f64;

    /// Blocks until the next frame is due. Returns `false` once the loop
    /// should stop.
    fn next_frame(&mut self) -> bool;
}
