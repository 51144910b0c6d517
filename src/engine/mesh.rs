// Mesh types for the fish body and the instance buffer layouts that carry the
// simulation output to the GPU.
//
//   lathe profile -> PolyMesh -> triangulate_smooth() -> RenderMesh -> GPU

use glam::Vec3;

// ============================================================================
// GPU LAYOUTS
// ============================================================================

/// Per-vertex data of the fish mesh.
///   @location(0) position: vec3<f32>
///   @location(1) normal:   vec3<f32>
///   @location(2) body:     f32   (0 at the nose, 1 at the tail tip)
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub body: f32,
}

impl GpuVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Instance buffer holding one tightly packed `vec3<f32>` per agent.
/// Positions go to location 3, headings to location 4.
pub fn instance_vec3_desc(shader_location: u32) -> wgpu::VertexBufferLayout<'static> {
    const POSITION: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![3 => Float32x3];
    const HEADING: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![4 => Float32x3];

    let attributes: &'static [wgpu::VertexAttribute] = match shader_location {
        3 => &POSITION,
        4 => &HEADING,
        other => panic!("no instance attribute at location {other}"),
    };
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes,
    }
}

// ============================================================================
// POLY MESH
// ============================================================================

/// Polygon mesh produced by the lathe, before triangulation.
/// Faces are CCW when viewed from outside and may have any vertex count >= 3.
pub struct PolyMesh {
    pub positions: Vec<Vec3>,
    pub faces: Vec<Vec<u32>>,
}

impl PolyMesh {
    pub fn new() -> Self {
        Self { positions: Vec::new(), faces: Vec::new() }
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, pos: Vec3) -> u32 {
        self.positions.push(pos);
        (self.positions.len() - 1) as u32
    }

    pub fn add_face(&mut self, indices: Vec<u32>) {
        debug_assert!(indices.len() >= 3, "face needs at least 3 vertices");
        self.faces.push(indices);
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Min and max Z over all vertices; the fish swims along +Z.
    pub fn z_extent(&self) -> (f32, f32) {
        self.positions
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| (lo.min(p.z), hi.max(p.z)))
    }
}

impl Default for PolyMesh {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// RENDER MESH
// ============================================================================

/// Indexed triangle mesh ready for upload.
pub struct RenderMesh {
    pub vertices: Vec<GpuVertex>,
    pub indices: Vec<u32>,
}

impl RenderMesh {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

/// Fan-triangulate every face and give each shared vertex an area-weighted
/// smooth normal.
///
/// `body` runs from 0 at the front (max Z) to 1 at the back (min Z), which is
/// what the swim animation scales its wave amplitude by.
pub fn triangulate_smooth(poly: &PolyMesh) -> RenderMesh {
    let mut indices = Vec::new();
    let mut normals = vec![Vec3::ZERO; poly.vertex_count()];

    for face in &poly.faces {
        let anchor = face[0];
        for pair in face[1..].windows(2) {
            let tri = [anchor, pair[0], pair[1]];
            let [a, b, c] = tri.map(|i| poly.positions[i as usize]);
            // Unnormalized: the length is twice the triangle area.
            let n = (b - a).cross(c - a);
            for i in tri {
                normals[i as usize] += n;
            }
            indices.extend_from_slice(&tri);
        }
    }

    let (z_min, z_max) = poly.z_extent();
    let length = (z_max - z_min).max(f32::EPSILON);
    let vertices = poly
        .positions
        .iter()
        .zip(&normals)
        .map(|(p, n)| GpuVertex {
            position: p.to_array(),
            normal: n.normalize_or_zero().to_array(),
            body: ((z_max - p.z) / length).clamp(0.0, 1.0),
        })
        .collect();

    RenderMesh { vertices, indices }
}
