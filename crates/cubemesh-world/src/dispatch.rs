use cubemesh_core::constants::BLOCKS_PER_CHUNK;
use cubemesh_core::error::CubemeshError;
use cubemesh_core::math::{block_buffer_index, chunk_local_to_block, block_local_coords};
use cubemesh_core::types::{Block, BlockRef, ChunkCoord, Voxel};

use crate::connectivity::block_connectivity;
use crate::World;

/// Read-only per-frame input of the mesh pipeline.
///
/// `blocks` is chunk-major: block `b` of chunk `c` lives at
/// `c * BLOCKS_PER_CHUNK + b`, with chunk indices following `chunk_coords`.
/// Blocks of the same model share one voxel run in `voxels`.
#[derive(Debug, Clone, Default)]
pub struct WorldBuffers {
    pub chunk_coords: Vec<ChunkCoord>,
    pub blocks: Vec<Block>,
    pub voxels: Vec<Voxel>,
    /// Non-empty blocks only, in buffer order.
    pub block_refs: Vec<BlockRef>,
}

impl WorldBuffers {
    pub fn chunk_count(&self) -> u32 {
        self.chunk_coords.len() as u32
    }

    /// Work items of a full grid dispatch (every slot of every chunk).
    pub fn grid_work_count(&self) -> u32 {
        self.chunk_count() * BLOCKS_PER_CHUNK
    }

    pub fn block(&self, chunk_index: u32, block_index: u32) -> &Block {
        &self.blocks[block_buffer_index(chunk_index, block_index)]
    }

    /// Check that every block's voxel range lies inside the voxel buffer.
    pub fn validate(&self) -> Result<(), CubemeshError> {
        let voxel_count = self.voxels.len();
        for block in &self.blocks {
            if block.voxel_range().end > voxel_count {
                return Err(CubemeshError::VoxelRangeOutOfBounds {
                    offset: block.voxel_offset,
                    len: block.voxel_len,
                    voxel_count,
                });
            }
        }
        Ok(())
    }
}

/// Flatten the world into block, voxel and compacted work-list buffers.
pub fn build_world_buffers(world: &World) -> Result<WorldBuffers, CubemeshError> {
    let mut voxels = Vec::new();
    let mut model_runs = Vec::with_capacity(world.models().len());
    for model in world.models() {
        model_runs.push((voxels.len() as u32, model.voxels.len() as u32));
        voxels.extend_from_slice(&model.voxels);
    }

    let chunk_coords = world.sorted_chunk_coords();
    let mut blocks = Vec::with_capacity(chunk_coords.len() * BLOCKS_PER_CHUNK as usize);
    let mut block_refs = Vec::new();

    for (chunk_index, coord) in chunk_coords.iter().enumerate() {
        let chunk = match world.chunk(*coord) {
            Some(c) => c,
            None => continue,
        };
        for block_index in 0..BLOCKS_PER_CHUNK {
            let position = chunk_local_to_block(*coord, block_local_coords(block_index));
            let (voxel_offset, voxel_len) = chunk
                .get_index(block_index)
                .and_then(|id| model_runs.get(id as usize).copied())
                .unwrap_or((0, 0));
            if voxel_len > 0 {
                block_refs.push(BlockRef {
                    chunk_index: chunk_index as u32,
                    block_index,
                });
            }
            blocks.push(Block {
                position,
                voxel_offset,
                voxel_len,
                connected: block_connectivity(world, position),
            });
        }
    }

    let buffers = WorldBuffers {
        chunk_coords,
        blocks,
        voxels,
        block_refs,
    };
    buffers.validate()?;

    log::debug!(
        "world buffers: {} chunks, {} blocks ({} non-empty), {} voxels",
        buffers.chunk_count(),
        buffers.blocks.len(),
        buffers.block_refs.len(),
        buffers.voxels.len()
    );
    Ok(buffers)
}
