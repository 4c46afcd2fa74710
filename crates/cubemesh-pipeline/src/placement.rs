use cubemesh_core::constants::BLOCK_SIZE;
use cubemesh_core::types::Block;
use glam::{Mat3, Mat4, Vec3};

/// Block-local to world-space mapping carried in the task payload.
///
/// One encoding is chosen per pipeline run and used on both sides of the
/// amplify/generate boundary.
pub trait BlockPlacement: Copy + Send + Sync + 'static {
    /// Placement of a block at its grid position.
    fn for_block(block: &Block) -> Self;

    /// World-space position of a block-local point.
    fn place(&self, local: Vec3) -> Vec3;

    /// World-space direction of a block-local face normal (unit length).
    fn place_normal(&self, normal: Vec3) -> Vec3;
}

/// Placement by translation only. Normals pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockTranslation(pub Vec3);

impl BlockPlacement for BlockTranslation {
    fn for_block(block: &Block) -> Self {
        Self(block.position.as_vec3() * BLOCK_SIZE)
    }

    fn place(&self, local: Vec3) -> Vec3 {
        local + self.0
    }

    fn place_normal(&self, normal: Vec3) -> Vec3 {
        normal
    }
}

/// Placement by a full model matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockTransform {
    pub model: Mat4,
    normal_matrix: Mat3,
}

impl BlockTransform {
    pub fn new(model: Mat4) -> Self {
        Self {
            model,
            normal_matrix: Mat3::from_mat4(model).inverse().transpose(),
        }
    }
}

impl BlockPlacement for BlockTransform {
    fn for_block(block: &Block) -> Self {
        Self::new(Mat4::from_translation(block.position.as_vec3() * BLOCK_SIZE))
    }

    fn place(&self, local: Vec3) -> Vec3 {
        self.model.transform_point3(local)
    }

    fn place_normal(&self, normal: Vec3) -> Vec3 {
        (self.normal_matrix * normal).normalize_or_zero()
    }
}
