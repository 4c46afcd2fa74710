//! `Pod` mirrors of the WGSL structs in `shaders/common/types.wgsl`.
//! Field order and padding must match the WGSL layout exactly.

use cubemesh_core::config::ShadingMode;
use cubemesh_core::constants::{
    FACES_PER_VOXEL, GENERATE_WORKGROUP_SIZE, MAX_VERTICES_PER_VOXEL, VERTICES_PER_FACE,
};
use cubemesh_core::types::{Block, BlockRef, Voxel, VoxelFace};
use cubemesh_pipeline::passes::generate::FACE_TRIANGLES;
use cubemesh_pipeline::{FrameTransforms, ShadingParams};
use cubemesh_world::dispatch::WorldBuffers;

/// Block record (24 bytes, matches WGSL Block).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuBlock {
    pub position_x: i32,
    pub position_y: i32,
    pub position_z: i32,
    pub voxel_offset: u32,
    pub voxel_len: u32,
    pub connected_bits: u32,
}

impl From<&Block> for GpuBlock {
    fn from(block: &Block) -> Self {
        Self {
            position_x: block.position.x,
            position_y: block.position.y,
            position_z: block.position.z,
            voxel_offset: block.voxel_offset,
            voxel_len: block.voxel_len,
            connected_bits: block.connected.bits(),
        }
    }
}

/// Face descriptor (32 bytes, matches WGSL VoxelFace).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVoxelFace {
    pub uv: [f32; 4],
    pub texture_index: u32,
    /// 0 or 1.
    pub cullface: u32,
    pub _pad: [u32; 2],
}

impl From<&VoxelFace> for GpuVoxelFace {
    fn from(face: &VoxelFace) -> Self {
        Self {
            uv: face.uv.to_array(),
            texture_index: face.texture_index,
            cullface: face.cullface as u32,
            _pad: [0; 2],
        }
    }
}

/// Voxel record (224 bytes, matches WGSL Voxel). `w` of both bounds is unused.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVoxel {
    pub from: [f32; 4],
    pub to: [f32; 4],
    pub faces: [GpuVoxelFace; 6],
}

impl From<&Voxel> for GpuVoxel {
    fn from(voxel: &Voxel) -> Self {
        Self {
            from: voxel.from.extend(0.0).to_array(),
            to: voxel.to.extend(0.0).to_array(),
            faces: voxel.faces.each_ref().map(GpuVoxelFace::from),
        }
    }
}

/// Compacted work-list entry (8 bytes, matches WGSL BlockRef).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuBlockRef {
    pub chunk_index: u32,
    pub block_index: u32,
}

impl From<&BlockRef> for GpuBlockRef {
    fn from(r: &BlockRef) -> Self {
        Self {
            chunk_index: r.chunk_index,
            block_index: r.block_index,
        }
    }
}

/// Amplification payload for one generation group (32 bytes, matches WGSL Task).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuTask {
    pub translation: [f32; 3],
    pub voxel_index: u32,
    pub connected_bits: u32,
    pub _pad: [u32; 3],
}

/// Generated vertex (96 bytes, matches WGSL MeshVertex).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 4],
    pub current_clip: [f32; 4],
    pub previous_clip: [f32; 4],
    pub world_position: [f32; 3],
    pub texture_index: u32,
    pub normal: [f32; 3],
    pub has_previous: u32,
    pub uv: [f32; 2],
    pub _pad: [f32; 2],
}

/// Per-frame transform block (160 bytes, matches WGSL FrameUniforms).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuFrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// Equals `view_proj` when there is no previous frame.
    pub prev_view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub jitter: [f32; 2],
    pub has_previous: u32,
    pub _pad: u32,
}

impl From<&FrameTransforms> for GpuFrameUniforms {
    fn from(frame: &FrameTransforms) -> Self {
        Self {
            view_proj: frame.view_proj.to_cols_array_2d(),
            prev_view_proj: frame
                .prev_view_proj
                .unwrap_or(frame.view_proj)
                .to_cols_array_2d(),
            camera_position: frame.camera_position.extend(1.0).to_array(),
            jitter: frame.jitter.to_array(),
            has_previous: frame.prev_view_proj.is_some() as u32,
            _pad: 0,
        }
    }
}

/// WGSL value of `ShadingUniforms::mode`.
pub fn shading_mode_id(mode: ShadingMode) -> u32 {
    match mode {
        ShadingMode::NormalDebug => 0,
        ShadingMode::Lit => 1,
    }
}

/// Shading parameters (64 bytes, matches WGSL ShadingUniforms).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuShadingUniforms {
    pub light_direction: [f32; 4],
    pub light_color: [f32; 4],
    pub ambient: [f32; 4],
    pub specular_strength: f32,
    pub shininess: f32,
    pub mode: u32,
    pub _pad: u32,
}

impl From<&ShadingParams> for GpuShadingUniforms {
    fn from(params: &ShadingParams) -> Self {
        Self {
            light_direction: params.light_direction.extend(0.0).to_array(),
            light_color: params.light_color.extend(1.0).to_array(),
            ambient: params.ambient.extend(1.0).to_array(),
            specular_strength: params.specular_strength,
            shininess: params.shininess,
            mode: shading_mode_id(params.mode),
            _pad: 0,
        }
    }
}

/// Dispatch sizing (16 bytes, matches WGSL MeshParams).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuMeshParams {
    pub work_count: u32,
    pub task_capacity: u32,
    pub emit_ceiling: u32,
    pub _pad: u32,
}

/// Atomic counters written by amplification (16 bytes, matches WGSL Counters).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuCounters {
    pub task_count: u32,
    pub clamped_blocks: u32,
    pub skipped_blocks: u32,
    pub _pad: u32,
}

/// Counters read back after a GPU frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpuFrameStats {
    /// Groups amplification asked for, including any past capacity.
    pub requested_groups: u32,
    /// Groups that fit the task buffer and were generated.
    pub generated_groups: u32,
    pub clamped_blocks: u32,
    pub skipped_blocks: u32,
}

impl GpuFrameStats {
    pub fn from_counters(counters: &GpuCounters, task_capacity: u32) -> Self {
        Self {
            requested_groups: counters.task_count,
            generated_groups: counters.task_count.min(task_capacity),
            clamped_blocks: counters.clamped_blocks,
            skipped_blocks: counters.skipped_blocks,
        }
    }
}

/// Static index pattern for `slot_count` generation slots of 24 vertices each.
/// Slot s, face f uses vertices `s * 24 + f * 4 + {0,1,3}` and `{1,2,3}`.
pub fn build_index_pattern(slot_count: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity(slot_count as usize * 36);
    for slot in 0..slot_count {
        for face in 0..FACES_PER_VOXEL {
            let base = slot * MAX_VERTICES_PER_VOXEL + face * VERTICES_PER_FACE;
            for tri in FACE_TRIANGLES {
                indices.extend(tri.map(|i| base + i));
            }
        }
    }
    indices
}

/// Exact number of generation groups the compacted work list spawns at full density.
pub fn count_tasks(buffers: &WorldBuffers, emit_ceiling: u32) -> u32 {
    buffers
        .block_refs
        .iter()
        .map(|r| {
            buffers
                .block(r.chunk_index, r.block_index)
                .voxel_len
                .min(emit_ceiling)
        })
        .sum()
}

/// Largest number of generation slots the device can hold. The per-slot vertex
/// region is the biggest allocation, so it bounds both the buffer size and the
/// storage binding; the indirect generate dispatch bounds the rest.
pub fn max_generation_slots(
    max_buffer_size: u64,
    max_storage_binding: u32,
    max_workgroups_per_dim: u32,
) -> u32 {
    let slot_bytes = MAX_VERTICES_PER_VOXEL as u64 * std::mem::size_of::<GpuVertex>() as u64;
    let by_memory = max_buffer_size.min(max_storage_binding as u64) / slot_bytes;
    let by_dispatch = max_workgroups_per_dim as u64 * GENERATE_WORKGROUP_SIZE as u64;
    by_memory.min(by_dispatch).min(u32::MAX as u64) as u32
}
