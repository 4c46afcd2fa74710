use cubemesh_core::constants::BLOCKS_PER_CHUNK;
use cubemesh_core::math::{block_local_coords, block_local_index};
use cubemesh_core::types::ChunkCoord;
use glam::UVec3;

/// Index into the world's model table.
pub type ModelId = u32;

/// A fixed CHUNK_DIM^3 grid of block slots, each optionally holding a model.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk coordinate in chunk-space.
    pub coord: ChunkCoord,
    blocks: [Option<ModelId>; BLOCKS_PER_CHUNK as usize],
}

impl Chunk {
    /// Create a chunk with every slot unset.
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            blocks: [None; BLOCKS_PER_CHUNK as usize],
        }
    }

    pub fn get(&self, local: UVec3) -> Option<ModelId> {
        self.blocks[block_local_index(local) as usize]
    }

    pub fn set(&mut self, local: UVec3, model: Option<ModelId>) {
        self.blocks[block_local_index(local) as usize] = model;
    }

    /// Model of the slot at a linear block index.
    pub fn get_index(&self, block_index: u32) -> Option<ModelId> {
        self.blocks[block_index as usize]
    }

    /// Number of slots holding a model.
    pub fn occupied_count(&self) -> u32 {
        self.blocks.iter().filter(|b| b.is_some()).count() as u32
    }

    /// Iterate (local coordinate, model) for occupied slots in block-index order.
    pub fn iter_occupied(&self) -> impl Iterator<Item = (UVec3, ModelId)> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.map(|model| (block_local_coords(i as u32), model)))
    }
}
