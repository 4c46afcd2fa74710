pub mod config;
pub mod constants;
pub mod direction;
pub mod error;
pub mod math;
pub mod model;
pub mod types;

pub use direction::{Direction, FaceMask, ALL_DIRECTIONS};
pub use error::CubemeshError;
pub use types::{Block, BlockRef, Voxel, VoxelFace};
