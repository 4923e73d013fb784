use std::fmt;
use std::time::Duration;

use shadersync::{SourceLocation, DEFAULT_FETCH_TIMEOUT, DEFAULT_POLL_INTERVAL};

/// GPU adapter power preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    /// Prefer integrated/low-power GPUs.
    #[default]
    Low,
    /// Prefer discrete/high-performance GPUs.
    High,
}

impl fmt::Display for GpuPowerPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuPowerPreference::Low => f.write_str("low"),
            GpuPowerPreference::High => f.write_str("high"),
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors the resolved CLI flags and config file: where the
/// live fragment shader comes from, how often to poll it, and how the preview
/// window should look.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Window title.
    pub title: String,
    /// Location of the live fragment shader.
    pub source: SourceLocation,
    /// How often the source is re-fetched.
    pub poll_interval: Duration,
    /// Upper bound on a single fetch.
    pub fetch_timeout: Duration,
    /// Present with vsync (`Fifo`) when true; prefer `Immediate`/`Mailbox` otherwise.
    pub vsync: bool,
    /// Adapter selection preference.
    pub gpu_power: GpuPowerPreference,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "livefrag".to_string(),
            source: SourceLocation::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            vsync: true,
            gpu_power: GpuPowerPreference::default(),
        }
    }
}
