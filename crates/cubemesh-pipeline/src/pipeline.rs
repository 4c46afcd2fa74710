use cubemesh_core::config::{PipelineConfig, PlacementKind};
use cubemesh_core::constants::{BLOCKS_PER_CHUNK, FACES_PER_VOXEL, MAX_EMIT_PER_BLOCK};
use cubemesh_core::math::block_buffer_index;
use cubemesh_core::types::{Block, BlockRef, Voxel};
use cubemesh_world::dispatch::WorldBuffers;
use rayon::prelude::*;

use crate::frame::FrameTransforms;
use crate::output::{MeshOutput, VertexOut};
use crate::passes::amplify::{amplify, FullDensity, LodPolicy, TaskPayload, WorkUnit};
use crate::passes::generate::generate_into;
use crate::placement::{BlockPlacement, BlockTransform, BlockTranslation};

/// Where amplification work units come from.
#[derive(Debug, Clone, Copy)]
pub enum WorkSource<'a> {
    /// One unit per block slot of `chunk_count` chunks, empty slots included.
    Grid { chunk_count: u32 },
    /// One unit per entry of a compacted (chunk, block) list.
    Indexed(&'a [BlockRef]),
}

impl WorkSource<'_> {
    pub fn len(&self) -> usize {
        match self {
            WorkSource::Grid { chunk_count } => (*chunk_count * BLOCKS_PER_CHUNK) as usize,
            WorkSource::Indexed(refs) => refs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn unit(&self, i: usize) -> WorkUnit {
        match self {
            WorkSource::Grid { .. } => WorkUnit::Grid(i as u32),
            WorkSource::Indexed(refs) => WorkUnit::Indexed(refs[i]),
        }
    }
}

/// Output slot of one generation group.
#[derive(Debug, Clone)]
pub struct GroupOutput {
    pub block: BlockRef,
    /// Global voxel index this group meshed.
    pub voxel_index: u32,
    pub mesh: MeshOutput,
}

/// Per-frame counters reported by `MeshPipeline::run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub blocks_visited: u32,
    /// Work units that resolved to empty blocks.
    pub blocks_skipped: u32,
    pub groups_emitted: u32,
    /// Blocks whose emission count hit the ceiling.
    pub clamped_blocks: u32,
    pub faces_emitted: u32,
    pub faces_culled: u32,
}

/// All geometry generated for one frame, in work-unit then group order.
#[derive(Debug, Clone, Default)]
pub struct FrameMesh {
    pub groups: Vec<GroupOutput>,
    pub stats: PipelineStats,
}

impl FrameMesh {
    pub fn total_vertices(&self) -> u32 {
        self.groups.iter().map(|g| g.mesh.vertex_count()).sum()
    }

    pub fn total_primitives(&self) -> u32 {
        self.groups.iter().map(|g| g.mesh.primitive_count()).sum()
    }

    /// Concatenate all groups into one vertex array and one triangle index list.
    pub fn flatten(&self) -> (Vec<VertexOut>, Vec<u32>) {
        let mut vertices = Vec::with_capacity(self.total_vertices() as usize);
        let mut indices = Vec::with_capacity(self.total_primitives() as usize * 3);
        for group in &self.groups {
            let base = vertices.len() as u32;
            vertices.extend_from_slice(group.mesh.vertices());
            for tri in group.mesh.primitives() {
                indices.extend(tri.iter().map(|i| base + i));
            }
        }
        (vertices, indices)
    }
}

struct Task<P> {
    block: BlockRef,
    payload: TaskPayload<P>,
    group_id: u32,
}

/// CPU executor of the amplify, generate pipeline over read-only block and voxel buffers.
pub struct MeshPipeline<L: LodPolicy = FullDensity> {
    lod: L,
    emit_ceiling: u32,
}

impl Default for MeshPipeline {
    fn default() -> Self {
        Self::new(MAX_EMIT_PER_BLOCK)
    }
}

impl MeshPipeline {
    /// Full-density pipeline. `emit_ceiling` is clamped to `1..=MAX_EMIT_PER_BLOCK`.
    pub fn new(emit_ceiling: u32) -> Self {
        Self::with_lod(FullDensity, emit_ceiling)
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.emit_ceiling)
    }
}

impl<L: LodPolicy> MeshPipeline<L> {
    pub fn with_lod(lod: L, emit_ceiling: u32) -> Self {
        Self {
            lod,
            emit_ceiling: emit_ceiling.clamp(1, MAX_EMIT_PER_BLOCK),
        }
    }

    pub fn emit_ceiling(&self) -> u32 {
        self.emit_ceiling
    }

    /// Run stages 1 and 2 for every work unit of `source`.
    ///
    /// Stage 1 runs in parallel over work units; its emitted groups are laid
    /// out in work-unit order, and stage 2 then fills each group's slot in parallel.
    pub fn run<P: BlockPlacement>(
        &self,
        source: WorkSource<'_>,
        blocks: &[Block],
        voxels: &[Voxel],
        frame: &FrameTransforms,
    ) -> FrameMesh {
        let unit_count = source.len();
        let amplified: Vec<_> = (0..unit_count)
            .into_par_iter()
            .map(|i| {
                let block_ref = source.unit(i).locate();
                let block = &blocks[block_buffer_index(block_ref.chunk_index, block_ref.block_index)];
                (block_ref, amplify::<P, L>(block, &self.lod, self.emit_ceiling))
            })
            .collect();

        let mut stats = PipelineStats {
            blocks_visited: unit_count as u32,
            ..PipelineStats::default()
        };
        let mut tasks = Vec::new();
        for (block_ref, amp) in &amplified {
            let Some(amp) = amp else {
                stats.blocks_skipped += 1;
                continue;
            };
            if amp.clamped() {
                stats.clamped_blocks += 1;
            }
            tasks.extend((0..amp.group_count).map(|group_id| Task {
                block: *block_ref,
                payload: amp.payload,
                group_id,
            }));
        }

        let mut groups: Vec<GroupOutput> = tasks
            .iter()
            .map(|t| GroupOutput {
                block: t.block,
                voxel_index: t.payload.voxel_offset + t.group_id,
                mesh: MeshOutput::new(),
            })
            .collect();
        groups
            .par_iter_mut()
            .zip(tasks.par_iter())
            .for_each(|(slot, task)| {
                generate_into(&task.payload, task.group_id, voxels, frame, &mut slot.mesh)
            });

        stats.groups_emitted = groups.len() as u32;
        stats.faces_emitted = groups.iter().map(|g| g.mesh.face_count()).sum();
        stats.faces_culled = stats.groups_emitted * FACES_PER_VOXEL - stats.faces_emitted;

        log::debug!(
            "mesh frame: {} units, {} skipped, {} groups, {} faces ({} culled)",
            stats.blocks_visited,
            stats.blocks_skipped,
            stats.groups_emitted,
            stats.faces_emitted,
            stats.faces_culled
        );
        if stats.clamped_blocks > 0 {
            log::warn!(
                "{} blocks exceeded the emission ceiling of {} and were clamped",
                stats.clamped_blocks,
                self.emit_ceiling
            );
        }

        FrameMesh { groups, stats }
    }

    /// Run with the placement encoding chosen at runtime.
    pub fn run_with_placement(
        &self,
        placement: PlacementKind,
        source: WorkSource<'_>,
        blocks: &[Block],
        voxels: &[Voxel],
        frame: &FrameTransforms,
    ) -> FrameMesh {
        match placement {
            PlacementKind::Translation => self.run::<BlockTranslation>(source, blocks, voxels, frame),
            PlacementKind::Matrix => self.run::<BlockTransform>(source, blocks, voxels, frame),
        }
    }

    /// Run over world buffers, through the compacted list or the full grid.
    pub fn run_world(
        &self,
        placement: PlacementKind,
        buffers: &WorldBuffers,
        compacted: bool,
        frame: &FrameTransforms,
    ) -> FrameMesh {
        let source = if compacted {
            WorkSource::Indexed(&buffers.block_refs)
        } else {
            WorkSource::Grid {
                chunk_count: buffers.chunk_count(),
            }
        };
        self.run_with_placement(placement, source, &buffers.blocks, &buffers.voxels, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubemesh_core::direction::FaceMask;
    use glam::{IVec3, Mat4, Vec3};

    fn frame() -> FrameTransforms {
        FrameTransforms::stationary(Mat4::IDENTITY, Vec3::ZERO)
    }

    /// One chunk: slot 0 owns voxels 0..3, slot 5 owns voxel 3, the rest are empty.
    fn chunk() -> (Vec<Block>, Vec<Voxel>) {
        let mut blocks = vec![Block::EMPTY; BLOCKS_PER_CHUNK as usize];
        blocks[0] = Block {
            position: IVec3::ZERO,
            voxel_offset: 0,
            voxel_len: 3,
            connected: FaceMask::NONE,
        };
        blocks[5] = Block {
            position: IVec3::new(1, 1, 0),
            voxel_offset: 3,
            voxel_len: 1,
            connected: FaceMask::ALL,
        };
        let voxels = vec![
            Voxel::cube(0, false),
            Voxel::cube(1, false),
            Voxel::cube(2, false),
            Voxel::cube(3, true),
        ];
        (blocks, voxels)
    }

    #[test]
    fn test_grid_and_indexed_sources_agree() {
        let (blocks, voxels) = chunk();
        let pipeline = MeshPipeline::new(MAX_EMIT_PER_BLOCK);
        let grid = pipeline.run::<BlockTranslation>(
            WorkSource::Grid { chunk_count: 1 },
            &blocks,
            &voxels,
            &frame(),
        );
        let refs = [
            BlockRef { chunk_index: 0, block_index: 0 },
            BlockRef { chunk_index: 0, block_index: 5 },
        ];
        let indexed =
            pipeline.run::<BlockTranslation>(WorkSource::Indexed(&refs), &blocks, &voxels, &frame());

        assert_eq!(grid.flatten(), indexed.flatten());
        assert_eq!(grid.stats.blocks_visited, BLOCKS_PER_CHUNK);
        assert_eq!(grid.stats.blocks_skipped, BLOCKS_PER_CHUNK - 2);
        assert_eq!(indexed.stats.blocks_visited, 2);
        assert_eq!(indexed.stats.blocks_skipped, 0);
    }

    #[test]
    fn test_stats_count_faces() {
        let (blocks, voxels) = chunk();
        let mesh = MeshPipeline::new(MAX_EMIT_PER_BLOCK).run::<BlockTranslation>(
            WorkSource::Grid { chunk_count: 1 },
            &blocks,
            &voxels,
            &frame(),
        );
        assert_eq!(mesh.stats.groups_emitted, 4);
        // Three free cubes render fully; the enclosed culling cube renders nothing.
        assert_eq!(mesh.stats.faces_emitted, 18);
        assert_eq!(mesh.stats.faces_culled, 6);
        assert_eq!(mesh.total_vertices(), 72);
        assert_eq!(mesh.total_primitives(), 36);
        let voxel_indices: Vec<u32> = mesh.groups.iter().map(|g| g.voxel_index).collect();
        assert_eq!(voxel_indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_ceiling_clamps_groups() {
        let (blocks, voxels) = chunk();
        let mesh = MeshPipeline::new(2).run::<BlockTranslation>(
            WorkSource::Grid { chunk_count: 1 },
            &blocks,
            &voxels,
            &frame(),
        );
        assert_eq!(mesh.stats.clamped_blocks, 1);
        assert_eq!(mesh.stats.groups_emitted, 3);
    }

    #[test]
    fn test_flatten_rebases_indices() {
        let (blocks, voxels) = chunk();
        let mesh = MeshPipeline::new(MAX_EMIT_PER_BLOCK).run::<BlockTranslation>(
            WorkSource::Grid { chunk_count: 1 },
            &blocks,
            &voxels,
            &frame(),
        );
        let (vertices, indices) = mesh.flatten();
        assert_eq!(vertices.len(), 72);
        assert_eq!(indices.len(), 108);
        assert_eq!(indices[36], 24);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn test_placements_produce_same_positions() {
        let (blocks, voxels) = chunk();
        let pipeline = MeshPipeline::new(MAX_EMIT_PER_BLOCK);
        let source = WorkSource::Grid { chunk_count: 1 };
        let t = pipeline.run_with_placement(PlacementKind::Translation, source, &blocks, &voxels, &frame());
        let m = pipeline.run_with_placement(PlacementKind::Matrix, source, &blocks, &voxels, &frame());
        let (tv, ti) = t.flatten();
        let (mv, mi) = m.flatten();
        assert_eq!(ti, mi);
        for (a, b) in tv.iter().zip(&mv) {
            assert!((a.world_position - b.world_position).length() < 1e-5);
        }
    }

    #[test]
    fn test_empty_source() {
        let mesh = MeshPipeline::new(MAX_EMIT_PER_BLOCK).run::<BlockTranslation>(
            WorkSource::Indexed(&[]),
            &[],
            &[],
            &frame(),
        );
        assert!(mesh.groups.is_empty());
        assert_eq!(mesh.stats, PipelineStats::default());
    }
}
