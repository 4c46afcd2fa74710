use cubemesh_core::config::JitterConfig;
use cubemesh_core::math::{halton, jitter_phase_count};
use glam::{Mat4, UVec2, Vec2, Vec3};

/// Per-frame transform block, supplied once per frame and read-only for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransforms {
    pub view_proj: Mat4,
    /// Last frame's view-projection. `None` when no previous frame exists.
    pub prev_view_proj: Option<Mat4>,
    pub camera_position: Vec3,
    /// Clip-space sub-pixel offset, applied to the rasterized position only.
    pub jitter: Vec2,
}

impl FrameTransforms {
    /// First frame: no previous view-projection, no jitter.
    pub fn new(view_proj: Mat4, camera_position: Vec3) -> Self {
        Self {
            view_proj,
            prev_view_proj: None,
            camera_position,
            jitter: Vec2::ZERO,
        }
    }

    /// A camera that has not moved since the previous frame.
    pub fn stationary(view_proj: Mat4, camera_position: Vec3) -> Self {
        Self {
            prev_view_proj: Some(view_proj),
            ..Self::new(view_proj, camera_position)
        }
    }

    /// Next frame's transforms: the current view-projection becomes the previous one.
    pub fn advance(&self, view_proj: Mat4, camera_position: Vec3) -> Self {
        Self {
            view_proj,
            prev_view_proj: Some(self.view_proj),
            camera_position,
            jitter: Vec2::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Vec2) -> Self {
        self.jitter = jitter;
        self
    }
}

/// Halton(2, 3) sub-pixel jitter cycling over a fixed number of phases.
#[derive(Debug, Clone)]
pub struct JitterSequence {
    render_size: UVec2,
    phase_count: u32,
    frame: u32,
}

impl JitterSequence {
    pub fn new(render_size: [u32; 2], display_size: [u32; 2]) -> Self {
        Self {
            render_size: UVec2::from_array(render_size).max(UVec2::ONE),
            phase_count: jitter_phase_count(render_size[0], display_size[0]),
            frame: 0,
        }
    }

    /// `None` when jitter is disabled.
    pub fn from_config(config: &JitterConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.render_size, config.display_size))
    }

    pub fn phase_count(&self) -> u32 {
        self.phase_count
    }

    /// Pixel offset in [-0.5, 0.5)^2 for a frame number.
    pub fn pixel_offset(&self, frame: u32) -> Vec2 {
        let index = frame % self.phase_count + 1;
        Vec2::new(halton(index, 2) - 0.5, halton(index, 3) - 0.5)
    }

    /// Clip-space offset for a frame number. Y flips because pixel rows grow downward.
    pub fn clip_offset(&self, frame: u32) -> Vec2 {
        let px = self.pixel_offset(frame);
        let size = self.render_size.as_vec2();
        Vec2::new(2.0 * px.x / size.x, -2.0 * px.y / size.y)
    }

    /// Clip-space offset of the current frame, then step to the next.
    pub fn next_clip_offset(&mut self) -> Vec2 {
        let offset = self.clip_offset(self.frame);
        self.frame = self.frame.wrapping_add(1);
        offset
    }
}
