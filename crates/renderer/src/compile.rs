use std::borrow::Cow;

use anyhow::{anyhow, Result};
use shadersync::ShaderKind;
use wgpu::naga::{self, ShaderStage};

/// Name of the per-vertex position input the fixed vertex shader declares.
pub(crate) const POSITION_ATTRIBUTE: &str = "a_Position";

/// Shader source after wrapping, parsed and validated by naga.
pub(crate) struct PreparedShader {
    pub kind: ShaderKind,
    pub source: String,
    pub module: naga::Module,
}

pub(crate) fn stage_for(kind: ShaderKind) -> ShaderStage {
    match kind {
        ShaderKind::Vertex => ShaderStage::Vertex,
        ShaderKind::Fragment => ShaderStage::Fragment,
    }
}

/// Wraps `source` for its stage and validates it with naga.
///
/// Errors carry naga's rendered diagnostic against the wrapped source.
pub(crate) fn prepare_shader(kind: ShaderKind, source: &str) -> Result<PreparedShader> {
    let source = match kind {
        ShaderKind::Vertex => source.to_string(),
        ShaderKind::Fragment => wrap_fragment(source),
    };
    tracing::trace!(%kind, wrapped = %source, "prepared shader source");

    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(stage_for(kind));
    let module = frontend
        .parse(&options, &source)
        .map_err(|errors| anyhow!(errors.emit_to_string(&source)))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|err| anyhow!(err.emit_to_string(&source)))?;

    Ok(PreparedShader {
        kind,
        source,
        module,
    })
}

pub(crate) fn create_module(device: &wgpu::Device, prepared: &PreparedShader) -> wgpu::ShaderModule {
    let label = match prepared.kind {
        ShaderKind::Vertex => "livefrag vertex",
        ShaderKind::Fragment => "livefrag fragment",
    };
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(prepared.source.clone()),
            stage: stage_for(prepared.kind),
            defines: &[],
        },
    })
}

/// Looks up the location bound to the vertex input called `name`.
pub(crate) fn attribute_location(module: &naga::Module, name: &str) -> Option<u32> {
    module
        .entry_points
        .iter()
        .filter(|entry| entry.stage == ShaderStage::Vertex)
        .flat_map(|entry| entry.function.arguments.iter())
        .find(|argument| argument.name.as_deref() == Some(name))
        .and_then(|argument| match argument.binding {
            Some(naga::Binding::Location { location, .. }) => Some(location),
            _ => None,
        })
}

/// Rewrites a GLSL ES 1.00 style fragment shader into GLSL 450.
///
/// Steps performed:
///
/// 1. Blank out `#version` and `precision` statements and the `u_time` /
///    `u_resolution` uniform declarations; [`FRAGMENT_HEADER`] provides them.
///    Blanking keeps line numbers aligned with the user's file.
/// 2. Turn any other non-sampler `uniform` into a plain global. Nothing ever
///    sets those, so they read as zero, the same as an unset WebGL uniform.
/// 3. Rename `gl_FragColor`, `gl_FragCoord`, and the user's `main` so the
///    wrapper can own the real entry point.
/// 4. Append [`FRAGMENT_FOOTER`], which flips `gl_FragCoord` to a bottom-left
///    origin and calls the renamed `main`.
pub(crate) fn wrap_fragment(source: &str) -> String {
    let mut body = String::with_capacity(source.len());
    for line in source.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#version") || trimmed.starts_with("precision ") {
            body.push('\n');
            continue;
        }
        let line = match trimmed.strip_prefix("uniform ") {
            Some(_) if declares_frame_uniform(trimmed) => {
                body.push('\n');
                continue;
            }
            Some(declaration) if !declares_sampler(declaration) => {
                let indent = &line[..line.len() - trimmed.len()];
                format!("{indent}{}", declaration.trim_start())
            }
            _ => line.to_string(),
        };

        let line = rename_identifier(&line, "gl_FragColor", "livefrag_FragColor");
        let line = rename_identifier(&line, "gl_FragCoord", "livefrag_FragCoord");
        let line = rename_identifier(&line, "main", "livefrag_main");
        body.push_str(&line);
        body.push('\n');
    }

    format!("{FRAGMENT_HEADER}\n#line 1\n{body}{FRAGMENT_FOOTER}")
}

fn declares_frame_uniform(declaration: &str) -> bool {
    find_identifier(declaration, "u_time").is_some()
        || find_identifier(declaration, "u_resolution").is_some()
}

fn declares_sampler(declaration: &str) -> bool {
    declaration
        .split(|ch: char| !is_identifier_char(ch))
        .any(|word| word.starts_with("sampler"))
}

fn rename_identifier(line: &str, from: &str, to: &str) -> String {
    let mut renamed = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(index) = find_identifier(rest, from) {
        renamed.push_str(&rest[..index]);
        renamed.push_str(to);
        rest = &rest[index + from.len()..];
    }
    renamed.push_str(rest);
    renamed
}

/// Byte offset of the first whole-word occurrence of `ident` in `haystack`.
fn find_identifier(haystack: &str, ident: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(found) = haystack[offset..].find(ident) {
        let start = offset + found;
        let end = start + ident.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        if !before.is_some_and(is_identifier_char) && !after.is_some_and(is_identifier_char) {
            return Some(start);
        }
        offset = end;
    }
    None
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// GLSL prologue injected ahead of every fragment shader.
///
/// The anonymous uniform block must match `FrameUniforms` in `gpu/uniforms.rs`
/// (std140: `u_time` at offset 0, `u_resolution` at offset 8).
const FRAGMENT_HEADER: &str = r"#version 450
layout(location = 0) out vec4 livefrag_FragColor;

layout(std140, set = 0, binding = 0) uniform LivefragFrame {
    float u_time;
    vec2 u_resolution;
};

vec4 livefrag_FragCoord;
";

const FRAGMENT_FOOTER: &str = r"
void main() {
    livefrag_FragCoord = vec4(gl_FragCoord.x, u_resolution.y - gl_FragCoord.y, gl_FragCoord.zw);
    livefrag_main();
}
";

/// Fixed vertex shader: passes the quad corners through as clip-space positions.
pub(crate) const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_Position;

void main() {
    gl_Position = vec4(a_Position, 0.0, 1.0);
}
";
