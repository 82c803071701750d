use std::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct TimeBase {
    start: Instant,
}

impl TimeBase {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Monotonic milliseconds since start.
    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::new()
    }
}
