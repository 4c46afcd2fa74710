use thiserror::Error;

/// Errors raised on the host while loading data or building pipeline inputs.
///
/// The pipeline stages themselves have no error channel: they rely on these
/// checks having passed before a frame is run.
#[derive(Debug, Error)]
pub enum CubemeshError {
    #[error("Failed to parse pipeline config RON: {0}")]
    ConfigParseError(String),

    #[error("Failed to parse model RON: {0}")]
    ModelParseError(String),

    #[error("Invalid pipeline config: {0}")]
    InvalidConfig(String),

    #[error("Voxel {index} of model '{model}' has from > to")]
    InvalidVoxelBounds { model: String, index: usize },

    #[error("Unknown model '{0}'")]
    UnknownModel(String),

    #[error("Block voxel range {offset}+{len} exceeds voxel buffer length {voxel_count}")]
    VoxelRangeOutOfBounds {
        offset: u32,
        len: u32,
        voxel_count: usize,
    },
}
