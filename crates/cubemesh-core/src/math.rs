use glam::{IVec3, UVec3, Vec2, Vec4};

use crate::constants::{BLOCKS_PER_CHUNK, CHUNK_DIM, JITTER_BASE_PHASE_COUNT};
use crate::types::{BlockCoord, ChunkCoord};

/// Smallest |w| accepted by the perspective divide.
pub const MIN_CLIP_W: f32 = 1e-6;

/// Decompose a block index inside a chunk into local (x, y, z). X varies fastest.
pub fn block_local_coords(block_index: u32) -> UVec3 {
    let d = CHUNK_DIM;
    UVec3::new(block_index % d, (block_index / d) % d, block_index / (d * d))
}

/// Inverse of `block_local_coords`.
pub fn block_local_index(local: UVec3) -> u32 {
    let d = CHUNK_DIM;
    local.x + local.y * d + local.z * d * d
}

/// Split a linear grid-dispatch id into (chunk_index, block_index).
pub fn split_work_id(work_id: u32) -> (u32, u32) {
    (work_id / BLOCKS_PER_CHUNK, work_id % BLOCKS_PER_CHUNK)
}

/// Position of a block inside the flat block buffer.
pub fn block_buffer_index(chunk_index: u32, block_index: u32) -> usize {
    chunk_index as usize * BLOCKS_PER_CHUNK as usize + block_index as usize
}

/// Chunk containing a block grid coordinate.
pub fn block_to_chunk(block: BlockCoord) -> ChunkCoord {
    let d = CHUNK_DIM as i32;
    IVec3::new(
        block.x.div_euclid(d),
        block.y.div_euclid(d),
        block.z.div_euclid(d),
    )
}

/// Local coordinate of a block inside its chunk.
pub fn block_to_local(block: BlockCoord) -> UVec3 {
    let d = CHUNK_DIM as i32;
    IVec3::new(
        block.x.rem_euclid(d),
        block.y.rem_euclid(d),
        block.z.rem_euclid(d),
    )
    .as_uvec3()
}

/// Grid coordinate of a block given its chunk and local offset.
pub fn chunk_local_to_block(chunk: ChunkCoord, local: UVec3) -> BlockCoord {
    chunk * CHUNK_DIM as i32 + local.as_ivec3()
}

/// Clip-space to NDC xy. None when w is too close to zero to divide by.
pub fn perspective_divide(clip: Vec4) -> Option<Vec2> {
    if clip.w.abs() < MIN_CLIP_W || !clip.w.is_finite() {
        return None;
    }
    Some(Vec2::new(clip.x, clip.y) / clip.w)
}

/// Radical inverse of `index` in `base` (one Halton sequence term, in [0, 1)).
pub fn halton(mut index: u32, base: u32) -> f32 {
    let mut f = 1.0f32;
    let mut result = 0.0f32;
    while index > 0 {
        f /= base as f32;
        result += f * (index % base) as f32;
        index /= base;
    }
    result
}

/// Jitter phases needed for a render/display width pair: ceil(8 * scale^2).
pub fn jitter_phase_count(render_width: u32, display_width: u32) -> u32 {
    let scale = display_width as f32 / render_width.max(1) as f32;
    ((JITTER_BASE_PHASE_COUNT as f32 * scale * scale).ceil() as u32).max(1)
}
