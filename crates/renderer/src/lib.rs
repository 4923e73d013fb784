//! Renderer crate for livefrag.
//!
//! Opens a window, covers it with a fullscreen quad, and keeps the quad's
//! fragment shader in sync with a source that is polled in the background:
//!
//! ```text
//!   livefrag CLI
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ window::run ──▶ winit event loop ──▶ Session::render()
//!          ▲                   ▲
//!          │                   └── Poller thread (FetchedSource user events)
//!          └── Session::apply_source() ──▶ ShaderSync ──▶ GpuProgram::link()
//! ```
//!
//! Fetched fragment sources are written against WebGL conventions
//! (`gl_FragColor`, `uniform float u_time`). They are wrapped into GLSL 450
//! with an injected uniform block before `wgpu` compiles them.

mod clock;
mod compile;
mod gpu;
mod types;
mod window;

use anyhow::Result;

pub use types::{GpuPowerPreference, RendererConfig};

/// Entry point that owns the configuration and drives the preview window.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Runs until the window is closed or Escape is pressed.
    pub fn run(&mut self) -> Result<()> {
        tracing::debug!(config = ?self.config, "starting renderer");
        window::run(&self.config)
    }
}
