//! `wgpu` side of the renderer.
//!
//! - `context` owns instance, device, and surface wiring and reconfigures the
//!   swapchain on resize.
//! - `program` implements `shadersync::ShaderProgram`: shaders are compiled to
//!   modules and linking builds the render pipeline.
//! - `uniforms` mirrors the injected `u_time` / `u_resolution` block.
//! - `vertex` uploads the fullscreen quad.
//! - `session` glues everything together for `window`.

mod context;
mod program;
mod session;
mod uniforms;
mod vertex;

pub(crate) use session::Session;
