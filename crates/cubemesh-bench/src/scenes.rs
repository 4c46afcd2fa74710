use cubemesh_core::config::{load_pipeline_config_from_str, PipelineConfig};
use cubemesh_core::error::CubemeshError;
use cubemesh_core::model::{load_models_from_str, Model};
use cubemesh_world::World;
use glam::IVec3;

const MODELS_RON: &str = include_str!("../../../data/models/basic.ron");
const PIPELINE_RON: &str = include_str!("../../../data/pipeline.ron");

/// Block layout of a benchmark scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneKind {
    /// Solid `extent^3` cube of stone. Only the shell survives culling.
    SolidCube,
    /// 3D checkerboard. No block has a neighbor, so every face is emitted.
    Checkerboard,
    /// Stone heightfield capped with grass.
    Terrain,
    /// Terrain plus glass, slabs and multi-voxel lamp posts on the surface.
    Mixed,
}

/// Configuration for a single benchmark scene.
pub struct SceneConfig {
    pub name: &'static str,
    pub kind: SceneKind,
    /// Edge length of the scene footprint in blocks.
    pub extent: i32,
    pub camera_position: [f32; 3],
    pub camera_target: [f32; 3],
}

/// Return the standard suite of benchmark scenes.
pub fn standard_scenes() -> Vec<SceneConfig> {
    let scene = |name, kind, extent: i32| {
        let c = extent as f32 / 2.0;
        let d = extent as f32 * 1.2;
        SceneConfig {
            name,
            kind,
            extent,
            camera_position: [c + d, c + d * 0.6, c + d],
            camera_target: [c, 0.0, c],
        }
    };

    vec![
        scene("solid-32", SceneKind::SolidCube, 32),
        scene("checker-32", SceneKind::Checkerboard, 32),
        scene("terrain-128", SceneKind::Terrain, 128),
        scene("mixed-128", SceneKind::Mixed, 128),
        scene("terrain-256", SceneKind::Terrain, 256),
    ]
}

/// Block models shipped with the bench.
pub fn load_models() -> Result<Vec<Model>, CubemeshError> {
    load_models_from_str(MODELS_RON)
}

/// Pipeline configuration shipped with the bench.
pub fn load_pipeline_config() -> Result<PipelineConfig, CubemeshError> {
    load_pipeline_config_from_str(PIPELINE_RON)
}

/// Populate a world for one scene.
pub fn build_scene(config: &SceneConfig, models: Vec<Model>) -> Result<World, CubemeshError> {
    let mut world = World::new(models);
    let stone = world.model_id("stone")?;
    let e = config.extent.max(1);

    match config.kind {
        SceneKind::SolidCube => {
            world.fill(IVec3::ZERO, IVec3::splat(e - 1), stone)?;
        }
        SceneKind::Checkerboard => {
            for z in 0..e {
                for y in 0..e {
                    for x in 0..e {
                        if (x + y + z) % 2 == 0 {
                            world.set_block(IVec3::new(x, y, z), stone)?;
                        }
                    }
                }
            }
        }
        SceneKind::Terrain => build_terrain(&mut world, e)?,
        SceneKind::Mixed => {
            build_terrain(&mut world, e)?;
            let props = [
                world.model_id("glass")?,
                world.model_id("slab")?,
                world.model_id("lamp_post")?,
            ];
            for z in 0..e {
                for x in 0..e {
                    let h = scene_hash(x, z);
                    // Roughly one surface cell in eight carries a prop.
                    if h % 8 == 0 {
                        let prop = props[(h / 8) as usize % props.len()];
                        world.set_block(IVec3::new(x, terrain_height(x, z) + 1, z), prop)?;
                    }
                }
            }
        }
    }

    Ok(world)
}

fn build_terrain(world: &mut World, extent: i32) -> Result<(), CubemeshError> {
    let stone = world.model_id("stone")?;
    let grass = world.model_id("grass")?;
    for z in 0..extent {
        for x in 0..extent {
            let top = terrain_height(x, z);
            if top > 0 {
                world.fill(IVec3::new(x, 0, z), IVec3::new(x, top - 1, z), stone)?;
            }
            world.set_block(IVec3::new(x, top, z), grass)?;
        }
    }
    Ok(())
}

/// Column height in blocks, 2..=5.
fn terrain_height(x: i32, z: i32) -> i32 {
    // Smooth base from low-frequency waves plus one block of hash noise.
    let wave = ((x as f32 * 0.15).sin() + (z as f32 * 0.11).cos()) * 0.7 + 1.5;
    2 + wave as i32 + (scene_hash(x, z) % 2) as i32
}

/// Deterministic per-column hash.
fn scene_hash(x: i32, z: i32) -> u32 {
    let mut h = (x as u32).wrapping_mul(73_856_093) ^ (z as u32).wrapping_mul(19_349_663);
    h ^= h >> 13;
    h = h.wrapping_mul(0x5bd1_e995);
    h ^ (h >> 15)
}
