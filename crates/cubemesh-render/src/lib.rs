pub mod gpu_types;
pub mod renderer;

pub use gpu_types::{GpuBlock, GpuFrameStats, GpuVertex, GpuVoxel};
pub use renderer::{MeshRenderer, DEPTH_FORMAT, MOTION_FORMAT};
