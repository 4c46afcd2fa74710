use std::ops::Range;

use glam::{IVec3, Vec3, Vec4};

use crate::direction::{Direction, FaceMask};

/// Block grid coordinate (each unit = BLOCK_SIZE world units).
pub type BlockCoord = IVec3;

/// Chunk grid coordinate (each unit = CHUNK_DIM blocks).
pub type ChunkCoord = IVec3;

/// One spatial cell of the world, referencing a contiguous run of voxels.
///
/// Produced once by the world builder, read-only for every frame afterwards.
/// Invariant: `voxel_offset + voxel_len <= voxel buffer length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Block {
    /// Grid position in block units.
    pub position: BlockCoord,
    /// First voxel owned by this block.
    pub voxel_offset: u32,
    /// Number of voxels owned by this block. 0 = empty.
    pub voxel_len: u32,
    /// Which of the 6 neighbors occlude.
    pub connected: FaceMask,
}

impl Block {
    pub const EMPTY: Block = Block {
        position: IVec3::ZERO,
        voxel_offset: 0,
        voxel_len: 0,
        connected: FaceMask::NONE,
    };

    pub fn is_empty(&self) -> bool {
        self.voxel_len == 0
    }

    /// Voxel buffer range owned by this block.
    pub fn voxel_range(&self) -> Range<usize> {
        let start = self.voxel_offset as usize;
        start..start + self.voxel_len as usize
    }
}

/// Compacted work-list entry: one non-empty block inside one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRef {
    pub chunk_index: u32,
    pub block_index: u32,
}

/// Per-direction face descriptor of a voxel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelFace {
    /// UV rectangle `(u0, v0, u1, v1)` mapped onto the face corners.
    pub uv: Vec4,
    /// Layer of the texture array sampled by this face.
    pub texture_index: u32,
    /// Hide this face whenever the neighbor in its direction exists.
    pub cullface: bool,
}

impl VoxelFace {
    /// Full-texture rectangle `(0, 0, 1, 1)`.
    pub const FULL_UV: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);

    pub fn new(texture_index: u32, cullface: bool) -> Self {
        Self {
            uv: Self::FULL_UV,
            texture_index,
            cullface,
        }
    }
}

/// Axis-aligned box in block-local space with one face descriptor per direction.
///
/// Invariant: `from <= to` componentwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voxel {
    pub from: Vec3,
    pub to: Vec3,
    /// Indexed by `Direction::index()`.
    pub faces: [VoxelFace; 6],
}

impl Voxel {
    /// Unit-cube voxel where every face uses `texture_index` and `cullface`.
    pub fn cube(texture_index: u32, cullface: bool) -> Self {
        Self {
            from: Vec3::ZERO,
            to: Vec3::ONE,
            faces: [VoxelFace::new(texture_index, cullface); 6],
        }
    }

    pub fn face(&self, dir: Direction) -> &VoxelFace {
        &self.faces[dir.index()]
    }

    pub fn extent(&self) -> Vec3 {
        self.to - self.from
    }

    pub fn volume(&self) -> f32 {
        let e = self.extent();
        e.x * e.y * e.z
    }

    /// Whether `from <= to` on every axis.
    pub fn has_valid_bounds(&self) -> bool {
        self.from.cmple(self.to).all()
    }
}
