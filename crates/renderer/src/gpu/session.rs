use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use shadersync::{
    vert, FetchedSource, ResyncOutcome, ShaderKind, ShaderProgram, ShaderSync, SourceFetcher,
};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;

use crate::clock::FrameClock;
use crate::compile::VERTEX_SHADER_GLSL;
use crate::types::RendererConfig;

use super::context::GpuContext;
use super::program::GpuProgram;
use super::uniforms::{FrameUniforms, UniformBinding};
use super::vertex::{setup_vertex, VertexSetup};

/// Everything one window needs to draw the live shader.
///
/// Owns the GPU context, the program the hot-reload state machine edits, and
/// the per-frame uniform and vertex resources.
pub(crate) struct Session {
    context: GpuContext,
    program: GpuProgram,
    sync: ShaderSync,
    uniforms: UniformBinding,
    vertex: VertexSetup,
    clock: FrameClock,
}

impl Session {
    /// Builds the GPU state, attaches the fixed vertex shader, and performs the
    /// first fetch. A failed first fetch is logged and the session starts black.
    pub(crate) fn new<T>(
        target: &T,
        size: PhysicalSize<u32>,
        config: &RendererConfig,
        fetcher: &dyn SourceFetcher,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, size, config.gpu_power, config.vsync)?;
        let uniforms = UniformBinding::new(&context.device);
        let layout = context
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("livefrag pipeline layout"),
                bind_group_layouts: &[&uniforms.layout],
                push_constant_ranges: &[],
            });
        let mut program = GpuProgram::new(context.device.clone(), layout, context.surface_format);

        let vertex_shader = vert(&mut program, VERTEX_SHADER_GLSL);
        if !vertex_shader.compiled {
            error!(kind = %vertex_shader.kind, "built-in vertex shader failed to compile");
        }

        let mut sync = ShaderSync::new();
        match sync.resync(fetcher, &mut program) {
            Ok(outcome) => debug!(?outcome, "initial shader sync"),
            Err(err) => warn!(
                source = %config.source,
                error = %err,
                "initial shader fetch failed; rendering black until the source responds"
            ),
        }
        if sync.fingerprint().is_none() {
            if let Err(err) = program.link() {
                info!(error = %err, "program not linked yet");
            }
        }

        let vertex = setup_vertex(&context.device, program.position_location());
        if let Some(location) = vertex.location {
            debug!(location, count = vertex.count, "quad vertices uploaded");
        }

        Ok(Self {
            context,
            program,
            sync,
            uniforms,
            vertex,
            clock: FrameClock::start(),
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    /// Recovers a lost or outdated swapchain at the current size.
    pub(crate) fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    /// Feeds a polled source through the hot-reload state machine.
    pub(crate) fn apply_source(&mut self, fetched: &FetchedSource) -> ResyncOutcome {
        self.sync.apply(fetched, &mut self.program)
    }

    /// Draws one frame: clears to black and, when the program is linked,
    /// covers the surface with the quad.
    pub(crate) fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let uniforms = FrameUniforms::at(self.clock.elapsed_ms(), self.context.size);
        self.uniforms.write(&self.context.queue, &uniforms);

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("livefrag frame"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("livefrag pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let (Some(pipeline), Some(buffer)) =
                (self.program.pipeline(), self.vertex.buffer.as_ref())
            {
                if self.vertex.count > 0 {
                    pass.set_pipeline(pipeline);
                    pass.set_bind_group(0, &self.uniforms.bind_group, &[]);
                    pass.set_vertex_buffer(0, buffer.slice(..));
                    pass.draw(0..self.vertex.count, 0..1);
                }
            }
        }

        self.context.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Detaches both shaders and forgets the applied fingerprint.
    pub(crate) fn dispose(&mut self) {
        self.sync.dispose(&mut self.program);
        self.program.detach_shader(ShaderKind::Vertex);
        debug!(linked = self.program.is_linked(), "session disposed");
    }
}
