use cubemesh_core::constants::{MAX_PRIMITIVES_PER_VOXEL, MAX_VERTICES_PER_VOXEL, VERTICES_PER_FACE};
use glam::{Vec2, Vec3, Vec4};

const MAX_VERTICES: usize = MAX_VERTICES_PER_VOXEL as usize;
const MAX_PRIMITIVES: usize = MAX_PRIMITIVES_PER_VOXEL as usize;

/// One generated vertex, handed from geometry generation to shading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexOut {
    /// Rasterized clip position (current clip plus jitter).
    pub position: Vec4,
    /// Unjittered clip position under the current view-projection.
    pub current_clip: Vec4,
    /// Clip position under last frame's view-projection, if there was one.
    pub previous_clip: Option<Vec4>,
    pub world_position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    /// Flat per-face attribute.
    pub texture_index: u32,
}

/// Fixed-capacity output of one geometry-generation group.
///
/// Counts must be declared with `set_output_counts` before any write, and no
/// write may land past the declared counts. Capacity is 24 vertices and 12
/// triangles; nothing here grows.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshOutput {
    vertices: [VertexOut; MAX_VERTICES],
    primitives: [[u32; 3]; MAX_PRIMITIVES],
    vertex_count: u32,
    primitive_count: u32,
    declared: bool,
}

impl Default for MeshOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshOutput {
    pub fn new() -> Self {
        Self {
            vertices: [VertexOut::default(); MAX_VERTICES],
            primitives: [[0; 3]; MAX_PRIMITIVES],
            vertex_count: 0,
            primitive_count: 0,
            declared: false,
        }
    }

    /// Declare the output size. Counts above capacity are clamped to it.
    pub fn set_output_counts(&mut self, vertex_count: u32, primitive_count: u32) {
        debug_assert!(!self.declared, "output counts declared twice");
        debug_assert!(vertex_count <= MAX_VERTICES_PER_VOXEL);
        debug_assert!(primitive_count <= MAX_PRIMITIVES_PER_VOXEL);
        self.vertex_count = vertex_count.min(MAX_VERTICES_PER_VOXEL);
        self.primitive_count = primitive_count.min(MAX_PRIMITIVES_PER_VOXEL);
        self.declared = true;
    }

    pub fn write_vertex(&mut self, index: u32, vertex: VertexOut) {
        debug_assert!(self.declared, "vertex written before output counts");
        debug_assert!(index < self.vertex_count);
        self.vertices[index as usize] = vertex;
    }

    pub fn write_primitive(&mut self, index: u32, triangle: [u32; 3]) {
        debug_assert!(self.declared, "primitive written before output counts");
        debug_assert!(index < self.primitive_count);
        debug_assert!(triangle.iter().all(|&v| v < self.vertex_count));
        self.primitives[index as usize] = triangle;
    }

    /// Clear for reuse by another group.
    pub fn reset(&mut self) {
        self.vertex_count = 0;
        self.primitive_count = 0;
        self.declared = false;
    }

    pub fn is_declared(&self) -> bool {
        self.declared
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn primitive_count(&self) -> u32 {
        self.primitive_count
    }

    /// Surviving faces (4 vertices each).
    pub fn face_count(&self) -> u32 {
        self.vertex_count / VERTICES_PER_FACE
    }

    pub fn vertices(&self) -> &[VertexOut] {
        &self.vertices[..self.vertex_count as usize]
    }

    /// Triangles as indices into `vertices()`.
    pub fn primitives(&self) -> &[[u32; 3]] {
        &self.primitives[..self.primitive_count as usize]
    }
}
