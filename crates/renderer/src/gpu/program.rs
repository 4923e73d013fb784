use shadersync::{ActiveShaders, ProgramError, ShaderKind, ShaderProgram};
use tracing::{debug, info, warn};

use crate::compile::{self, POSITION_ATTRIBUTE};

/// Identifies one `create_shader` call; `compiled` is false when naga rejected the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ShaderHandle {
    pub id: u64,
    pub kind: ShaderKind,
    pub compiled: bool,
}

struct AttachedShader {
    handle: ShaderHandle,
    module: Option<wgpu::ShaderModule>,
    position_location: Option<u32>,
}

/// A vertex/fragment pair linked into a `wgpu` render pipeline.
///
/// Linking is the only step that can fail loudly: a shader that did not
/// compile is still attached, and `link` reports it as [`ProgramError::Uncompiled`].
/// After any failed link the program has no pipeline and frames render black.
pub(crate) struct GpuProgram {
    device: wgpu::Device,
    layout: wgpu::PipelineLayout,
    surface_format: wgpu::TextureFormat,
    shaders: ActiveShaders<AttachedShader>,
    pipeline: Option<wgpu::RenderPipeline>,
    next_id: u64,
}

impl GpuProgram {
    pub fn new(
        device: wgpu::Device,
        layout: wgpu::PipelineLayout,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            device,
            layout,
            surface_format,
            shaders: ActiveShaders::new(),
            pipeline: None,
            next_id: 0,
        }
    }

    pub fn pipeline(&self) -> Option<&wgpu::RenderPipeline> {
        self.pipeline.as_ref()
    }

    pub fn is_linked(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Location of the vertex shader's position input, if one is attached and compiled.
    pub fn position_location(&self) -> Option<u32> {
        self.shaders
            .get(ShaderKind::Vertex)
            .and_then(|shader| shader.position_location)
    }

    fn compiled_module(&self, kind: ShaderKind) -> Result<&wgpu::ShaderModule, ProgramError> {
        let attached = self
            .shaders
            .get(kind)
            .ok_or(ProgramError::MissingStage(kind))?;
        attached
            .module
            .as_ref()
            .ok_or(ProgramError::Uncompiled(kind))
    }
}

impl ShaderProgram for GpuProgram {
    type Handle = ShaderHandle;

    fn create_shader(&mut self, kind: ShaderKind, source: &str) -> ShaderHandle {
        self.next_id += 1;
        let (module, position_location) = match compile::prepare_shader(kind, source) {
            Ok(prepared) => {
                let location = match kind {
                    ShaderKind::Vertex => {
                        compile::attribute_location(&prepared.module, POSITION_ATTRIBUTE)
                    }
                    ShaderKind::Fragment => None,
                };
                info!("Shader({kind}): loaded.");
                (Some(compile::create_module(&self.device, &prepared)), location)
            }
            Err(err) => {
                warn!("Shader({kind}): compile failed:\n{err}");
                (None, None)
            }
        };

        let handle = ShaderHandle {
            id: self.next_id,
            kind,
            compiled: module.is_some(),
        };
        let replaced = self.shaders.insert(
            kind,
            AttachedShader {
                handle,
                module,
                position_location,
            },
        );
        if let Some(previous) = replaced {
            debug!(%kind, id = previous.handle.id, "replaced attached shader");
        }
        handle
    }

    fn detach_shader(&mut self, kind: ShaderKind) -> Option<ShaderHandle> {
        let detached = self.shaders.remove(kind)?;
        self.pipeline = None;
        Some(detached.handle)
    }

    fn link(&mut self) -> Result<(), ProgramError> {
        self.pipeline = None;

        let vertex = self.compiled_module(ShaderKind::Vertex)?;
        let fragment = self.compiled_module(ShaderKind::Fragment)?;
        let location = self.position_location().ok_or_else(|| {
            ProgramError::Link(format!("vertex shader has no `{POSITION_ATTRIBUTE}` input"))
        })?;

        let attributes = [wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 0,
            shader_location: location,
        }];
        let buffers = [wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        }];

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("livefrag pipeline"),
                layout: Some(&self.layout),
                vertex: wgpu::VertexState {
                    module: vertex,
                    entry_point: Some("main"),
                    buffers: &buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: fragment,
                    entry_point: Some("main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.surface_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview: None,
                cache: None,
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ProgramError::Link(error.to_string()));
        }

        self.pipeline = Some(pipeline);
        debug!("program linked");
        Ok(())
    }
}
