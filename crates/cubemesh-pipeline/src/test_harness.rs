/// Shared fixtures and end-to-end property tests over the full CPU pipeline.
///
/// Per-stage unit tests live next to each pass; the tests here drive world
/// construction, amplification, generation and shading together.

#[cfg(test)]
mod tests {
    use cubemesh_core::config::{PipelineConfig, PlacementKind, ShadingMode};
    use cubemesh_core::constants::{MAX_EMIT_PER_BLOCK, MAX_PRIMITIVES_PER_VOXEL, MAX_VERTICES_PER_VOXEL};
    use cubemesh_core::direction::{FaceMask, ALL_DIRECTIONS};
    use cubemesh_core::model::Model;
    use cubemesh_core::types::{Block, BlockRef, Voxel, VoxelFace};
    use cubemesh_world::World;
    use glam::{IVec3, Mat4, Vec2, Vec3};

    use crate::frame::FrameTransforms;
    use crate::passes::amplify::{amplify, FullDensity, TaskPayload};
    use crate::passes::generate::generate;
    use crate::passes::shade::{shade, Fragment, Rgba8TextureArray, ShadingParams};
    use crate::pipeline::{MeshPipeline, WorkSource};
    use crate::placement::BlockTranslation;

    fn unit_payload(connected: u32) -> TaskPayload<BlockTranslation> {
        TaskPayload {
            voxel_offset: 0,
            connected: FaceMask::from_bits(connected),
            placement: BlockTranslation(Vec3::ZERO),
        }
    }

    fn identity_frame() -> FrameTransforms {
        FrameTransforms::stationary(Mat4::IDENTITY, Vec3::ZERO)
    }

    fn camera_frame() -> FrameTransforms {
        let view = Mat4::look_at_rh(Vec3::new(6.0, 5.0, 8.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);
        FrameTransforms::stationary(proj * view, Vec3::new(6.0, 5.0, 8.0))
    }

    /// Voxel whose cullface flags follow the bits of `cull_bits`.
    fn mixed_voxel(cull_bits: u32) -> Voxel {
        let mut voxel = Voxel::cube(0, false);
        for dir in ALL_DIRECTIONS {
            voxel.faces[dir.index()] = VoxelFace::new(dir.index() as u32, cull_bits & dir.bit() != 0);
        }
        voxel
    }

    fn stone_world() -> World {
        World::new(vec![
            Model::from_voxels("stone", [Voxel::cube(0, true)]),
            Model::from_voxels("glass", [Voxel::cube(1, false)]).with_transparency(true),
            Model::from_voxels("air", []),
        ])
    }

    #[test]
    fn test_unconnected_voxel_renders_all_faces() {
        for cull_bits in 0..64 {
            let out = generate(&unit_payload(0), 0, &[mixed_voxel(cull_bits)], &identity_frame());
            assert_eq!(out.face_count(), 6, "cull bits {cull_bits:#08b}");
        }
    }

    #[test]
    fn test_culled_faces_contribute_nothing() {
        for connected in 0..64u32 {
            for cull_bits in [0u32, 0b11_1111, 0b01_0101, 0b10_0110] {
                let out = generate(
                    &unit_payload(connected),
                    0,
                    &[mixed_voxel(cull_bits)],
                    &identity_frame(),
                );
                let hidden = (connected & cull_bits).count_ones();
                assert_eq!(out.face_count(), 6 - hidden);
                // No emitted face may be one that should be hidden.
                for quad in out.vertices().chunks(4) {
                    let dir = ALL_DIRECTIONS
                        .into_iter()
                        .find(|d| d.normal() == quad[0].normal)
                        .unwrap();
                    assert!(connected & cull_bits & dir.bit() == 0);
                }
            }
        }
    }

    #[test]
    fn test_counts_follow_face_count() {
        for connected in 0..64u32 {
            let out = generate(&unit_payload(connected), 0, &[mixed_voxel(0b11_0011)], &identity_frame());
            let faces = out.face_count();
            assert!(faces <= 6);
            assert_eq!(out.vertex_count(), 4 * faces);
            assert_eq!(out.primitive_count(), 2 * faces);
            assert!(out.vertex_count() <= MAX_VERTICES_PER_VOXEL);
            assert!(out.primitive_count() <= MAX_PRIMITIVES_PER_VOXEL);
            for tri in out.primitives() {
                assert!(tri.iter().all(|&i| i < out.vertex_count()));
            }
        }
    }

    #[test]
    fn test_generation_is_idempotent() {
        let voxel = Voxel {
            from: Vec3::new(0.1, 0.2, 0.3),
            to: Vec3::new(0.9, 0.7, 0.6),
            ..mixed_voxel(0b00_1111)
        };
        let payload = TaskPayload {
            placement: BlockTranslation(Vec3::new(-3.0, 4.0, 12.0)),
            ..unit_payload(0b00_0101)
        };
        let frame = camera_frame();
        let a = generate(&payload, 0, &[voxel], &frame);
        let b = generate(&payload, 0, &[voxel], &frame);
        let bits = |out: &crate::output::MeshOutput| -> Vec<u32> {
            out.vertices()
                .iter()
                .flat_map(|v| v.position.to_array())
                .map(f32::to_bits)
                .collect()
        };
        assert_eq!(bits(&a), bits(&b));
        assert_eq!(a.primitives(), b.primitives());
    }

    #[test]
    fn test_static_scene_has_zero_motion() {
        let frame = camera_frame();
        let out = generate(&unit_payload(0), 0, &[Voxel::cube(0, false)], &frame);
        let params = ShadingParams::from_config(&PipelineConfig::default(), frame.camera_position);
        let textures = Rgba8TextureArray::new(1, 1, 1);
        for v in out.vertices() {
            let shaded = shade(&Fragment::from(v), &params, &textures);
            assert_eq!(shaded.motion, Vec2::ZERO);
        }
    }

    #[test]
    fn test_moving_camera_produces_motion() {
        let first = camera_frame();
        let moved = Mat4::from_translation(Vec3::new(0.1, 0.0, 0.0)) * first.view_proj;
        let frame = first.advance(moved, first.camera_position);
        let out = generate(&unit_payload(0), 0, &[Voxel::cube(0, false)], &frame);
        let params = ShadingParams::from_config(&PipelineConfig::default(), frame.camera_position);
        let textures = Rgba8TextureArray::new(1, 1, 1);
        for v in out.vertices() {
            let motion = shade(&Fragment::from(v), &params, &textures).motion;
            // Clip x shifted by +0.1*w this frame, so the previous position is 0.1 to the left.
            assert!((motion.x + 0.1).abs() < 1e-4, "{motion:?}");
            assert!(motion.y.abs() < 1e-4);
        }
    }

    #[test]
    fn test_unit_cube_example() {
        let out = generate(&unit_payload(0), 0, &[Voxel::cube(0, false)], &identity_frame());
        assert_eq!(out.face_count(), 6);
        assert_eq!(out.vertex_count(), 24);
        assert_eq!(out.primitive_count(), 12);
        let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for v in out.vertices() {
            assert!(v.current_clip.truncate().cmpge(Vec3::ZERO).all());
            assert!(v.current_clip.truncate().cmple(Vec3::ONE).all());
            assert!(axes.contains(&v.normal));
        }
    }

    #[test]
    fn test_enclosed_culling_voxel_example() {
        let out = generate(&unit_payload(0b11_1111), 0, &[Voxel::cube(0, true)], &identity_frame());
        assert_eq!(out.face_count(), 0);
        assert_eq!(out.vertex_count(), 0);
        assert_eq!(out.primitive_count(), 0);
        assert!(out.is_declared());
    }

    #[test]
    fn test_empty_block_example() {
        for bits in 0..64 {
            let block = Block {
                position: IVec3::new(2, 0, 1),
                voxel_offset: 17,
                voxel_len: 0,
                connected: FaceMask::from_bits(bits),
            };
            assert!(amplify::<BlockTranslation, _>(&block, &FullDensity, MAX_EMIT_PER_BLOCK).is_none());
        }
    }

    #[test]
    fn test_world_floor_culls_interior_faces() {
        let mut world = stone_world();
        // 3x1x3 floor: only the center block has four horizontal neighbors.
        let stone = world.model_id("stone").unwrap();
        world.fill(IVec3::new(-1, 0, -1), IVec3::new(1, 0, 1), stone).unwrap();
        let buffers = world.build_buffers().unwrap();
        let mesh = MeshPipeline::new(MAX_EMIT_PER_BLOCK).run_world(
            PlacementKind::Translation,
            &buffers,
            true,
            &identity_frame(),
        );
        // Top + bottom of 9 blocks, plus 12 outer side faces.
        assert_eq!(mesh.stats.faces_emitted, 9 * 2 + 12);
        assert_eq!(mesh.stats.groups_emitted, 9);
        assert_eq!(mesh.stats.faces_culled, 9 * 6 - 30);
    }

    #[test]
    fn test_glass_keeps_faces_against_neighbors() {
        let mut world = stone_world();
        world.set_block_by_name(IVec3::ZERO, "stone").unwrap();
        world.set_block_by_name(IVec3::X, "glass").unwrap();
        let buffers = world.build_buffers().unwrap();
        let mesh = MeshPipeline::new(MAX_EMIT_PER_BLOCK).run_world(
            PlacementKind::Translation,
            &buffers,
            true,
            &identity_frame(),
        );
        // Glass never occludes, so stone keeps its east face too.
        assert_eq!(mesh.stats.faces_emitted, 6 + 6);
    }

    #[test]
    fn test_grid_and_compacted_world_runs_match() {
        let mut world = stone_world();
        world.set_block_by_name(IVec3::new(0, 0, 0), "stone").unwrap();
        world.set_block_by_name(IVec3::new(5, 1, -2), "glass").unwrap();
        world.set_block_by_name(IVec3::new(1, 0, 0), "air").unwrap();
        let buffers = world.build_buffers().unwrap();
        let pipeline = MeshPipeline::new(MAX_EMIT_PER_BLOCK);
        let grid = pipeline.run_world(PlacementKind::Matrix, &buffers, false, &camera_frame());
        let compact = pipeline.run_world(PlacementKind::Matrix, &buffers, true, &camera_frame());
        assert_eq!(grid.flatten(), compact.flatten());
        assert!(grid.stats.blocks_visited > compact.stats.blocks_visited);
        assert_eq!(compact.stats.blocks_skipped, 0);
    }

    #[test]
    fn test_indexed_source_with_explicit_refs() {
        let mut world = stone_world();
        world.set_block_by_name(IVec3::new(1, 1, 1), "stone").unwrap();
        let buffers = world.build_buffers().unwrap();
        let refs = [BlockRef {
            chunk_index: 0,
            block_index: 21,
        }];
        let mesh = MeshPipeline::new(MAX_EMIT_PER_BLOCK).run::<BlockTranslation>(
            WorkSource::Indexed(&refs),
            &buffers.blocks,
            &buffers.voxels,
            &identity_frame(),
        );
        assert_eq!(mesh.stats.faces_emitted, 6);
        let (vertices, _) = mesh.flatten();
        assert!(vertices
            .iter()
            .all(|v| v.world_position.cmpge(Vec3::ONE).all() && v.world_position.cmple(Vec3::splat(2.0)).all()));
    }

    #[test]
    fn test_lit_shading_over_generated_triangle() {
        let config = PipelineConfig {
            shading: ShadingMode::Lit,
            ..PipelineConfig::default()
        };
        let frame = camera_frame();
        let out = generate(&unit_payload(0), 0, &[Voxel::cube(0, false)], &frame);
        let params = ShadingParams::from_config(&config, frame.camera_position);
        let textures = Rgba8TextureArray::new(4, 4, 1);
        let up_quad = &out.vertices()[4..8];
        let fragment = Fragment::interpolate(
            [&up_quad[0], &up_quad[1], &up_quad[3]],
            Vec3::splat(1.0 / 3.0),
        );
        let color = shade(&fragment, &params, &textures).color;
        assert!(color.x > params.ambient.x);
        assert_eq!(color.w, 1.0);
    }
}
