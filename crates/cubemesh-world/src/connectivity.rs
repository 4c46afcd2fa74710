use cubemesh_core::direction::{FaceMask, ALL_DIRECTIONS};
use cubemesh_core::types::BlockCoord;

use crate::World;

/// Neighbor mask for one block: bit i is set iff an occluding block exists one
/// step in direction i. Empty and transparent models leave the bit clear.
/// Lookups cross chunk borders; unloaded chunks read as empty.
pub fn block_connectivity(world: &World, pos: BlockCoord) -> FaceMask {
    ALL_DIRECTIONS
        .iter()
        .filter(|dir| world.occludes(pos + dir.offset()))
        .fold(FaceMask::NONE, |mask, dir| mask.with(*dir))
}
