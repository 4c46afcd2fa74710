use cubemesh_core::constants::{PRIMITIVES_PER_FACE, VERTICES_PER_FACE};
use cubemesh_core::direction::{Direction, FaceMask, ALL_DIRECTIONS};
use cubemesh_core::types::{Voxel, VoxelFace};
use glam::{Vec2, Vec3, Vec4};

use crate::frame::FrameTransforms;
use crate::output::{MeshOutput, VertexOut};
use crate::passes::amplify::TaskPayload;
use crate::placement::BlockPlacement;

/// Unit-cube corners of each face, indexed by `Direction::index()`.
/// Corner k pairs with `FACE_UVS[k]`; (c1 - c0) x (c3 - c0) is the outward normal.
pub const FACE_CORNERS: [[Vec3; 4]; 6] = [
    // Down
    [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, 1.0),
    ],
    // Up
    [
        Vec3::new(0.0, 1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ],
    // North
    [
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
    ],
    // South
    [
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(0.0, 1.0, 1.0),
    ],
    // East
    [
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 1.0),
    ],
    // West
    [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 1.0, 1.0),
        Vec3::new(0.0, 1.0, 0.0),
    ],
];

/// Canonical texture coordinates of the 4 face corners.
pub const FACE_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 1.0),
];

/// Two counter-clockwise triangles per face, relative to the face's first vertex.
pub const FACE_TRIANGLES: [[u32; 3]; 2] = [[0, 1, 3], [1, 2, 3]];

/// A face is dropped only when its neighbor exists and it opts into culling.
pub fn face_visible(face: &VoxelFace, dir: Direction, connected: FaceMask) -> bool {
    !(connected.contains(dir) && face.cullface)
}

/// Map a canonical corner UV into the face's UV rectangle.
fn face_uv(face: &VoxelFace, corner: usize) -> Vec2 {
    let min = Vec2::new(face.uv.x, face.uv.y);
    let max = Vec2::new(face.uv.z, face.uv.w);
    min + (max - min) * FACE_UVS[corner]
}

/// Stage 2 for one group: mesh voxel `payload.voxel_offset + group_id` into `out`.
///
/// `out` must be fresh or reset. The voxel index is assumed valid; amplification
/// never spawns more groups than the block owns voxels.
pub fn generate_into<P: BlockPlacement>(
    payload: &TaskPayload<P>,
    group_id: u32,
    voxels: &[Voxel],
    frame: &FrameTransforms,
    out: &mut MeshOutput,
) {
    let voxel = &voxels[(payload.voxel_offset + group_id) as usize];

    let mut faces = [Direction::Down; 6];
    let mut face_count = 0u32;
    for dir in ALL_DIRECTIONS {
        if face_visible(voxel.face(dir), dir, payload.connected) {
            faces[face_count as usize] = dir;
            face_count += 1;
        }
    }

    out.set_output_counts(face_count * VERTICES_PER_FACE, face_count * PRIMITIVES_PER_FACE);

    let extent = voxel.extent();
    let jitter = Vec4::new(frame.jitter.x, frame.jitter.y, 0.0, 0.0);
    for (slot, dir) in faces[..face_count as usize].iter().enumerate() {
        let face = voxel.face(*dir);
        let normal = payload.placement.place_normal(dir.normal());
        let base = slot as u32 * VERTICES_PER_FACE;

        for (corner, unit) in FACE_CORNERS[dir.index()].iter().enumerate() {
            let world = payload.placement.place(voxel.from + *unit * extent).extend(1.0);
            let current_clip = frame.view_proj * world;
            out.write_vertex(
                base + corner as u32,
                VertexOut {
                    position: current_clip + jitter * current_clip.w,
                    current_clip,
                    previous_clip: frame.prev_view_proj.map(|prev| prev * world),
                    world_position: world.truncate(),
                    normal,
                    uv: face_uv(face, corner),
                    texture_index: face.texture_index,
                },
            );
        }

        for (t, tri) in FACE_TRIANGLES.iter().enumerate() {
            out.write_primitive(
                slot as u32 * PRIMITIVES_PER_FACE + t as u32,
                tri.map(|i| base + i),
            );
        }
    }
}

/// Stage 2 into a fresh output.
pub fn generate<P: BlockPlacement>(
    payload: &TaskPayload<P>,
    group_id: u32,
    voxels: &[Voxel],
    frame: &FrameTransforms,
) -> MeshOutput {
    let mut out = MeshOutput::new();
    generate_into(payload, group_id, voxels, frame, &mut out);
    out
}
