//! Single source of truth for build-time pipeline constants.
//! These values are shared by the CPU stages and the WGSL shaders; the
//! renderer injects them into every shader preamble.

/// Blocks per chunk along each axis.
pub const CHUNK_DIM: u32 = 4;

/// Total blocks per chunk (4^3).
pub const BLOCKS_PER_CHUNK: u32 = CHUNK_DIM * CHUNK_DIM * CHUNK_DIM;

/// World-space edge length of one block. Voxel bounds are block-local in [0, BLOCK_SIZE].
pub const BLOCK_SIZE: f32 = 1.0;

/// Cube faces per voxel.
pub const FACES_PER_VOXEL: u32 = 6;

/// Vertices synthesized per surviving face.
pub const VERTICES_PER_FACE: u32 = 4;

/// Triangles emitted per surviving face.
pub const PRIMITIVES_PER_FACE: u32 = 2;

/// Hard output ceiling of one geometry-generation group (6 faces * 4 vertices).
pub const MAX_VERTICES_PER_VOXEL: u32 = FACES_PER_VOXEL * VERTICES_PER_FACE;

/// Hard primitive ceiling of one geometry-generation group (6 faces * 2 triangles).
pub const MAX_PRIMITIVES_PER_VOXEL: u32 = FACES_PER_VOXEL * PRIMITIVES_PER_FACE;

/// Indices per generation slot on the GPU path (12 triangles * 3).
pub const INDICES_PER_VOXEL: u32 = MAX_PRIMITIVES_PER_VOXEL * 3;

/// Device ceiling on child groups one amplification group may spawn.
/// Matches the minimum guaranteed per-dimension task dispatch count.
pub const MAX_EMIT_PER_BLOCK: u32 = 65_535;

/// Local invocation count of the amplification compute pass.
pub const AMPLIFY_WORKGROUP_SIZE: u32 = 64;

/// Local invocation count of the geometry-generation compute pass.
pub const GENERATE_WORKGROUP_SIZE: u32 = 64;

/// Number of bits used in the neighbor-connectivity mask.
pub const CONNECTIVITY_BITS: u32 = 6;

/// Mask of all valid connectivity bits.
pub const CONNECTIVITY_MASK: u32 = (1 << CONNECTIVITY_BITS) - 1;

/// Base phase count of the temporal jitter sequence at 1:1 render/display scale.
pub const JITTER_BASE_PHASE_COUNT: u32 = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_ceilings() {
        assert_eq!(MAX_VERTICES_PER_VOXEL, 24);
        assert_eq!(MAX_PRIMITIVES_PER_VOXEL, 12);
        assert_eq!(INDICES_PER_VOXEL, 36);
    }

    #[test]
    fn test_chunk_block_count() {
        assert_eq!(BLOCKS_PER_CHUNK, 64);
    }

    #[test]
    fn test_connectivity_mask() {
        assert_eq!(CONNECTIVITY_MASK, 0b11_1111);
    }
}
