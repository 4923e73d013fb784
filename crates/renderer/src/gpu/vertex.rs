use wgpu::util::DeviceExt;

/// Two triangles covering clip space, two floats per vertex.
pub(crate) const QUAD_VERTICES: [[f32; 2]; 6] = [
    [1.0, 1.0],
    [-1.0, 1.0],
    [-1.0, -1.0],
    [-1.0, -1.0],
    [1.0, -1.0],
    [1.0, 1.0],
];

/// Position buffer bound to the vertex shader's `a_Position` input.
///
/// When the attribute could not be located, nothing is uploaded and `count`
/// stays 0, so every frame clears to black without drawing.
pub(crate) struct VertexSetup {
    pub buffer: Option<wgpu::Buffer>,
    pub location: Option<u32>,
    pub count: u32,
}

/// Number of vertices to draw for a reflected `a_Position` location.
pub(crate) fn vertex_count(location: Option<u32>) -> u32 {
    match location {
        Some(_) => QUAD_VERTICES.len() as u32,
        None => 0,
    }
}

pub(crate) fn setup_vertex(device: &wgpu::Device, location: Option<u32>) -> VertexSetup {
    let count = vertex_count(location);
    let Some(location) = location else {
        tracing::warn!("vertex position attribute not found; quad will not be drawn");
        return VertexSetup {
            buffer: None,
            location: None,
            count,
        };
    };

    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("quad vertices"),
        contents: bytemuck::cast_slice(&QUAD_VERTICES),
        usage: wgpu::BufferUsages::VERTEX,
    });
    VertexSetup {
        buffer: Some(buffer),
        location: Some(location),
        count,
    }
}
