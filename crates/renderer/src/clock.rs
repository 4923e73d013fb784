use std::time::Instant;

/// Milliseconds elapsed since the renderer started, used to stamp frames.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameClock {
    origin: Instant,
}

impl FrameClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}
