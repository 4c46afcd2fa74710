pub mod frame;
pub mod output;
pub mod passes;
pub mod pipeline;
pub mod placement;

#[cfg(test)]
mod test_harness;

pub use frame::{FrameTransforms, JitterSequence};
pub use output::{MeshOutput, VertexOut};
pub use passes::amplify::{amplify, Amplification, FullDensity, LodPolicy, TaskPayload, WorkUnit};
pub use passes::generate::{generate, generate_into};
pub use passes::shade::{
    motion_vector, shade, Fragment, FragmentOutput, Rgba8TextureArray, ShadingParams, TextureArray,
};
pub use pipeline::{FrameMesh, GroupOutput, MeshPipeline, PipelineStats, WorkSource};
pub use placement::{BlockPlacement, BlockTransform, BlockTranslation};
