use std::cmp::Ordering;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::direction::ALL_DIRECTIONS;
use crate::error::CubemeshError;
use crate::types::{Voxel, VoxelFace};

fn full_uv() -> [f32; 4] {
    [0.0, 0.0, 1.0, 1.0]
}

/// One face as written in model RON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDef {
    #[serde(default = "full_uv")]
    pub uv: [f32; 4],
    pub texture: u32,
    #[serde(default)]
    pub cullface: bool,
}

/// Face set of a voxel in model RON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FacesDef {
    /// Same texture everywhere; every face culls against its own direction.
    Culled(u32),
    /// Same texture everywhere; no face ever culls (cutout/transparent geometry).
    Unculled(u32),
    /// Explicit face per direction.
    PerFace {
        down: FaceDef,
        up: FaceDef,
        north: FaceDef,
        south: FaceDef,
        east: FaceDef,
        west: FaceDef,
    },
}

impl FacesDef {
    fn build(&self) -> [VoxelFace; 6] {
        match self {
            FacesDef::Culled(texture) => ALL_DIRECTIONS.map(|_| VoxelFace::new(*texture, true)),
            FacesDef::Unculled(texture) => {
                ALL_DIRECTIONS.map(|_| VoxelFace::new(*texture, false))
            }
            FacesDef::PerFace {
                down,
                up,
                north,
                south,
                east,
                west,
            } => [down, up, north, south, east, west].map(|def| VoxelFace {
                uv: Vec4::from_array(def.uv),
                texture_index: def.texture,
                cullface: def.cullface,
            }),
        }
    }
}

/// One voxel as written in model RON. Bounds are block-local.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoxelDef {
    pub from: [f32; 3],
    pub to: [f32; 3],
    pub faces: FacesDef,
}

/// A named model definition parsed from RON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDef {
    pub name: String,
    /// Neighbors still see through this block; it never hides their faces.
    #[serde(default)]
    pub transparent: bool,
    pub voxels: Vec<VoxelDef>,
}

/// A block model: the voxels a block of this kind owns.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    /// Largest volume first.
    pub voxels: Vec<Voxel>,
    pub transparent: bool,
}

impl Model {
    /// Build a model, ordering voxels by descending volume. Ties keep input order.
    pub fn from_voxels(name: impl Into<String>, voxels: impl IntoIterator<Item = Voxel>) -> Self {
        let mut voxels: Vec<Voxel> = voxels.into_iter().collect();
        voxels.sort_by(|a, b| {
            b.volume()
                .partial_cmp(&a.volume())
                .unwrap_or(Ordering::Equal)
        });
        Self {
            name: name.into(),
            voxels,
            transparent: false,
        }
    }

    pub fn with_transparency(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    /// Convert a parsed definition, rejecting voxels with from > to.
    pub fn from_def(def: &ModelDef) -> Result<Self, CubemeshError> {
        let mut voxels = Vec::with_capacity(def.voxels.len());
        for (index, voxel_def) in def.voxels.iter().enumerate() {
            let voxel = Voxel {
                from: Vec3::from_array(voxel_def.from),
                to: Vec3::from_array(voxel_def.to),
                faces: voxel_def.faces.build(),
            };
            if !voxel.has_valid_bounds() {
                return Err(CubemeshError::InvalidVoxelBounds {
                    model: def.name.clone(),
                    index,
                });
            }
            voxels.push(voxel);
        }
        Ok(Self::from_voxels(def.name.clone(), voxels).with_transparency(def.transparent))
    }

    /// A model with no voxels; blocks using it are empty.
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Whether this model hides the faces of its neighbors.
    pub fn occludes(&self) -> bool {
        !self.is_empty() && !self.transparent
    }
}

/// Parse a list of model definitions from RON and build them.
pub fn load_models_from_str(ron_str: &str) -> Result<Vec<Model>, CubemeshError> {
    let options = ron::Options::default();
    let defs: Vec<ModelDef> = options
        .from_str(ron_str)
        .map_err(|e| CubemeshError::ModelParseError(e.to_string()))?;
    defs.iter().map(Model::from_def).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::Direction;

    const MODELS_RON: &str = r#"[
        (
            name: "stone",
            voxels: [
                (from: (0.0, 0.0, 0.0), to: (1.0, 1.0, 1.0), faces: Culled(1)),
            ],
        ),
        (
            name: "slab_with_post",
            transparent: true,
            voxels: [
                (from: (0.4, 0.5, 0.4), to: (0.6, 1.0, 0.6), faces: Unculled(2)),
                (from: (0.0, 0.0, 0.0), to: (1.0, 0.5, 1.0), faces: PerFace(
                    down: (texture: 3, cullface: true),
                    up: (texture: 4, uv: (0.0, 0.0, 1.0, 0.5)),
                    north: (texture: 3, cullface: true),
                    south: (texture: 3, cullface: true),
                    east: (texture: 3, cullface: true),
                    west: (texture: 3, cullface: true),
                )),
            ],
        ),
    ]"#;

    #[test]
    fn test_load_models() {
        let models = load_models_from_str(MODELS_RON).expect("models parse");
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "stone");
        assert!(models[0].voxels[0].faces.iter().all(|f| f.cullface));
        assert_eq!(models[0].voxels[0].face(Direction::Up).texture_index, 1);
    }

    #[test]
    fn test_voxels_sorted_by_volume() {
        let models = load_models_from_str(MODELS_RON).expect("models parse");
        let slab = &models[1];
        // The slab (0.5) is larger than the post (0.02) and must come first.
        assert!(slab.voxels[0].volume() > slab.voxels[1].volume());
        assert_eq!(slab.voxels[0].face(Direction::Up).texture_index, 4);
        assert!(!slab.voxels[0].face(Direction::Up).cullface);
        assert_eq!(
            slab.voxels[0].face(Direction::Up).uv,
            Vec4::new(0.0, 0.0, 1.0, 0.5)
        );
        assert_eq!(slab.voxels[0].face(Direction::Down).uv, VoxelFace::FULL_UV);
    }

    #[test]
    fn test_transparency_flag() {
        let models = load_models_from_str(MODELS_RON).expect("models parse");
        assert!(!models[0].transparent);
        assert!(models[0].occludes());
        assert!(models[1].transparent);
        assert!(!models[1].occludes());
        assert!(!Model::from_voxels("air", []).occludes());
    }

    #[test]
    fn test_inverted_voxel_rejected() {
        let ron = r#"[(name: "bad", voxels: [(from: (0.0, 1.0, 0.0), to: (1.0, 0.0, 1.0), faces: Culled(0))])]"#;
        match load_models_from_str(ron) {
            Err(CubemeshError::InvalidVoxelBounds { model, index }) => {
                assert_eq!(model, "bad");
                assert_eq!(index, 0);
            }
            other => panic!("expected InvalidVoxelBounds, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_ron() {
        assert!(matches!(
            load_models_from_str("[(name: 3)]"),
            Err(CubemeshError::ModelParseError(_))
        ));
    }

    #[test]
    fn test_from_voxels_stable_for_equal_volumes() {
        let a = Voxel::cube(1, false);
        let b = Voxel::cube(2, false);
        let model = Model::from_voxels("pair", [a, b]);
        assert_eq!(model.voxels[0].faces[0].texture_index, 1);
        assert_eq!(model.voxels[1].faces[0].texture_index, 2);
    }
}
