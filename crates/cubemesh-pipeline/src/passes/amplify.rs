use cubemesh_core::direction::FaceMask;
use cubemesh_core::math::split_work_id;
use cubemesh_core::types::{Block, BlockRef};

use crate::placement::BlockPlacement;

/// Level-of-detail hook: how many generation groups a block spawns for its voxels.
pub trait LodPolicy: Send + Sync {
    fn emit_count(&self, voxel_len: u32) -> u32;
}

/// Every voxel gets its own group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullDensity;

impl LodPolicy for FullDensity {
    fn emit_count(&self, voxel_len: u32) -> u32 {
        voxel_len
    }
}

impl<F> LodPolicy for F
where
    F: Fn(u32) -> u32 + Send + Sync,
{
    fn emit_count(&self, voxel_len: u32) -> u32 {
        self(voxel_len)
    }
}

/// One amplification work unit, before it is resolved to a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkUnit {
    /// Linear grid invocation id over every slot of every chunk.
    Grid(u32),
    /// Entry of the compacted non-empty block list.
    Indexed(BlockRef),
}

impl WorkUnit {
    pub fn locate(self) -> BlockRef {
        match self {
            WorkUnit::Grid(work_id) => {
                let (chunk_index, block_index) = split_work_id(work_id);
                BlockRef {
                    chunk_index,
                    block_index,
                }
            }
            WorkUnit::Indexed(block_ref) => block_ref,
        }
    }
}

/// Written once by amplification, read by every group it spawns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskPayload<P> {
    pub voxel_offset: u32,
    pub connected: FaceMask,
    pub placement: P,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amplification<P> {
    pub payload: TaskPayload<P>,
    /// Generation groups to spawn; group `g` handles voxel `voxel_offset + g`.
    pub group_count: u32,
    /// Count requested by the LOD policy before the ceiling was applied.
    pub requested: u32,
}

impl<P> Amplification<P> {
    /// Whether the device ceiling cut the requested count.
    pub fn clamped(&self) -> bool {
        self.group_count < self.requested
    }
}

/// Stage 1 for one block. Empty blocks (and a zero LOD count) spawn nothing.
///
/// The LOD count is capped at `voxel_len` so no group reads past the block's
/// voxel run, then clamped to `emit_ceiling`.
pub fn amplify<P, L>(block: &Block, lod: &L, emit_ceiling: u32) -> Option<Amplification<P>>
where
    P: BlockPlacement,
    L: LodPolicy + ?Sized,
{
    if block.is_empty() {
        return None;
    }
    let requested = lod.emit_count(block.voxel_len).min(block.voxel_len);
    let group_count = requested.min(emit_ceiling);
    if group_count == 0 {
        return None;
    }
    Some(Amplification {
        payload: TaskPayload {
            voxel_offset: block.voxel_offset,
            connected: block.connected,
            placement: P::for_block(block),
        },
        group_count,
        requested,
    })
}
