pub mod chunk;
pub mod connectivity;
pub mod dispatch;

use std::collections::HashMap;

use chunk::{Chunk, ModelId};
use cubemesh_core::error::CubemeshError;
use cubemesh_core::math::{block_to_chunk, block_to_local};
use cubemesh_core::model::Model;
use cubemesh_core::types::{BlockCoord, ChunkCoord};
use dispatch::WorldBuffers;

/// Primary public struct for the cubemesh-world crate.
/// Owns the model table and the sparse set of loaded chunks, and builds the
/// read-only block/voxel buffers the mesh pipeline consumes.
pub struct World {
    models: Vec<Model>,
    model_names: HashMap<String, ModelId>,
    chunks: HashMap<ChunkCoord, Chunk>,
}

impl World {
    /// Create an empty world over a fixed model table. Model ids are table indices.
    pub fn new(models: Vec<Model>) -> Self {
        let model_names = models
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.clone(), i as ModelId))
            .collect();
        Self {
            models,
            model_names,
            chunks: HashMap::new(),
        }
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn model(&self, id: ModelId) -> Option<&Model> {
        self.models.get(id as usize)
    }

    /// Look up a model id by name.
    pub fn model_id(&self, name: &str) -> Result<ModelId, CubemeshError> {
        self.model_names
            .get(name)
            .copied()
            .ok_or_else(|| CubemeshError::UnknownModel(name.to_string()))
    }

    /// Place a model at a block coordinate, loading its chunk on demand.
    pub fn set_block(&mut self, pos: BlockCoord, model: ModelId) -> Result<(), CubemeshError> {
        if self.model(model).is_none() {
            return Err(CubemeshError::UnknownModel(format!("id {model}")));
        }
        let coord = block_to_chunk(pos);
        self.chunks
            .entry(coord)
            .or_insert_with(|| Chunk::new(coord))
            .set(block_to_local(pos), Some(model));
        Ok(())
    }

    pub fn set_block_by_name(&mut self, pos: BlockCoord, name: &str) -> Result<(), CubemeshError> {
        let id = self.model_id(name)?;
        self.set_block(pos, id)
    }

    /// Clear a block slot. The chunk stays loaded.
    pub fn clear_block(&mut self, pos: BlockCoord) {
        if let Some(chunk) = self.chunks.get_mut(&block_to_chunk(pos)) {
            chunk.set(block_to_local(pos), None);
        }
    }

    /// Fill every block in the inclusive box `min..=max` with one model.
    pub fn fill(
        &mut self,
        min: BlockCoord,
        max: BlockCoord,
        model: ModelId,
    ) -> Result<(), CubemeshError> {
        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    self.set_block(BlockCoord::new(x, y, z), model)?;
                }
            }
        }
        Ok(())
    }

    pub fn model_at(&self, pos: BlockCoord) -> Option<ModelId> {
        self.chunks
            .get(&block_to_chunk(pos))
            .and_then(|c| c.get(block_to_local(pos)))
    }

    /// Whether a block with at least one voxel sits at `pos`.
    /// Slots in unloaded chunks count as absent.
    pub fn is_solid(&self, pos: BlockCoord) -> bool {
        self.model_at(pos)
            .and_then(|id| self.model(id))
            .is_some_and(|m| !m.is_empty())
    }

    /// Whether the block at `pos` hides the faces of its neighbors.
    /// Empty and transparent models never do.
    pub fn occludes(&self, pos: BlockCoord) -> bool {
        self.model_at(pos)
            .and_then(|id| self.model(id))
            .is_some_and(|m| m.occludes())
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// Number of loaded chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Loaded chunk coordinates in (z, y, x) order. This order defines chunk indices.
    pub fn sorted_chunk_coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<ChunkCoord> = self.chunks.keys().copied().collect();
        coords.sort_by_key(|c| (c.z, c.y, c.x));
        coords
    }

    /// Build the read-only buffers for the mesh pipeline.
    pub fn build_buffers(&self) -> Result<WorldBuffers, CubemeshError> {
        dispatch::build_world_buffers(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubemesh_core::types::Voxel;
    use glam::IVec3;

    fn test_models() -> Vec<Model> {
        vec![
            Model::from_voxels("stone", [Voxel::cube(1, true)]),
            Model::from_voxels("air", []),
        ]
    }

    #[test]
    fn test_set_and_query_block() {
        let mut world = World::new(test_models());
        world
            .set_block_by_name(IVec3::new(-1, 2, 5), "stone")
            .unwrap();
        assert_eq!(world.model_at(IVec3::new(-1, 2, 5)), Some(0));
        assert!(world.is_solid(IVec3::new(-1, 2, 5)));
        assert!(!world.is_solid(IVec3::new(0, 2, 5)));
        assert_eq!(world.chunk_count(), 1);
    }

    #[test]
    fn test_empty_model_is_not_solid() {
        let mut world = World::new(test_models());
        world.set_block_by_name(IVec3::ZERO, "air").unwrap();
        assert_eq!(world.model_at(IVec3::ZERO), Some(1));
        assert!(!world.is_solid(IVec3::ZERO));
    }

    #[test]
    fn test_unknown_model() {
        let mut world = World::new(test_models());
        assert!(matches!(
            world.set_block_by_name(IVec3::ZERO, "glass"),
            Err(CubemeshError::UnknownModel(_))
        ));
        assert!(world.set_block(IVec3::ZERO, 9).is_err());
    }

    #[test]
    fn test_clear_block() {
        let mut world = World::new(test_models());
        world.set_block(IVec3::ONE, 0).unwrap();
        world.clear_block(IVec3::ONE);
        assert_eq!(world.model_at(IVec3::ONE), None);
        assert_eq!(world.chunk_count(), 1);
    }

    #[test]
    fn test_sorted_chunk_coords() {
        let mut world = World::new(test_models());
        world.set_block(IVec3::new(0, 0, 4), 0).unwrap();
        world.set_block(IVec3::new(4, 0, 0), 0).unwrap();
        world.set_block(IVec3::new(0, -1, 0), 0).unwrap();
        assert_eq!(
            world.sorted_chunk_coords(),
            vec![
                IVec3::new(0, -1, 0),
                IVec3::new(1, 0, 0),
                IVec3::new(0, 0, 1)
            ]
        );
    }
}
