use cubemesh_core::config::{PipelineConfig, ShadingMode};
use cubemesh_core::math::perspective_divide;
use glam::{Vec2, Vec3, Vec4};

use crate::output::VertexOut;

/// Interpolated vertex-out record at one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub current_clip: Vec4,
    pub previous_clip: Option<Vec4>,
    pub world_position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub texture_index: u32,
}

impl From<&VertexOut> for Fragment {
    fn from(v: &VertexOut) -> Self {
        Self {
            current_clip: v.current_clip,
            previous_clip: v.previous_clip,
            world_position: v.world_position,
            normal: v.normal,
            uv: v.uv,
            texture_index: v.texture_index,
        }
    }
}

impl Fragment {
    /// Barycentric blend of a triangle. The texture index is flat and comes from
    /// the first vertex; the previous clip position exists only if all three have one.
    pub fn interpolate(tri: [&VertexOut; 3], weights: Vec3) -> Self {
        let [a, b, c] = tri;
        let mix4 = |x: Vec4, y: Vec4, z: Vec4| x * weights.x + y * weights.y + z * weights.z;
        let mix3 = |x: Vec3, y: Vec3, z: Vec3| x * weights.x + y * weights.y + z * weights.z;
        let previous_clip = match (a.previous_clip, b.previous_clip, c.previous_clip) {
            (Some(pa), Some(pb), Some(pc)) => Some(mix4(pa, pb, pc)),
            _ => None,
        };
        Self {
            current_clip: mix4(a.current_clip, b.current_clip, c.current_clip),
            previous_clip,
            world_position: mix3(a.world_position, b.world_position, c.world_position),
            normal: mix3(a.normal, b.normal, c.normal),
            uv: a.uv * weights.x + b.uv * weights.y + c.uv * weights.z,
            texture_index: a.texture_index,
        }
    }
}

/// Indexed array of 2-D textures sampled by flat texture index.
pub trait TextureArray: Sync {
    /// RGBA in [0, 1].
    fn sample(&self, layer: u32, uv: Vec2) -> Vec4;
}

/// Color returned for layers the array does not have.
pub const MISSING_TEXTURE: Vec4 = Vec4::new(1.0, 0.0, 1.0, 1.0);

/// CPU texture array of RGBA8 layers, sampled nearest with repeat addressing.
#[derive(Debug, Clone)]
pub struct Rgba8TextureArray {
    width: u32,
    height: u32,
    layer_count: u32,
    texels: Vec<[u8; 4]>,
}

impl Rgba8TextureArray {
    /// All layers start opaque white.
    pub fn new(width: u32, height: u32, layer_count: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            layer_count,
            texels: vec![[255; 4]; (width * height * layer_count) as usize],
        }
    }

    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    pub fn fill_layer(&mut self, layer: u32, rgba: [u8; 4]) {
        if layer >= self.layer_count {
            return;
        }
        let size = (self.width * self.height) as usize;
        let start = layer as usize * size;
        self.texels[start..start + size].fill(rgba);
    }

    pub fn set_texel(&mut self, layer: u32, x: u32, y: u32, rgba: [u8; 4]) {
        if layer < self.layer_count && x < self.width && y < self.height {
            let i = self.texel_index(layer, x, y);
            self.texels[i] = rgba;
        }
    }

    fn texel_index(&self, layer: u32, x: u32, y: u32) -> usize {
        ((layer * self.height + y) * self.width + x) as usize
    }
}

impl TextureArray for Rgba8TextureArray {
    fn sample(&self, layer: u32, uv: Vec2) -> Vec4 {
        if layer >= self.layer_count {
            return MISSING_TEXTURE;
        }
        let wrapped = uv - uv.floor();
        let x = ((wrapped.x * self.width as f32) as u32).min(self.width - 1);
        let y = ((wrapped.y * self.height as f32) as u32).min(self.height - 1);
        let [r, g, b, a] = self.texels[self.texel_index(layer, x, y)];
        Vec4::new(r as f32, g as f32, b as f32, a as f32) / 255.0
    }
}

/// Resolved shading inputs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingParams {
    pub mode: ShadingMode,
    /// Unit vector from the surface toward the light.
    pub light_direction: Vec3,
    pub light_color: Vec3,
    pub ambient: Vec3,
    pub specular_strength: f32,
    pub shininess: f32,
    pub camera_position: Vec3,
}

impl ShadingParams {
    pub fn from_config(config: &PipelineConfig, camera_position: Vec3) -> Self {
        let lighting = &config.lighting;
        Self {
            mode: config.shading,
            light_direction: Vec3::from_array(lighting.light_direction).normalize_or_zero(),
            light_color: Vec3::from_array(lighting.light_color),
            ambient: Vec3::from_array(lighting.ambient),
            specular_strength: lighting.specular_strength,
            shininess: lighting.shininess,
            camera_position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentOutput {
    pub color: Vec4,
    /// NDC delta from the current to the previous position.
    pub motion: Vec2,
}

/// `previous.xy / previous.w - current.xy / current.w`, or zero when either
/// position is missing or cannot be divided.
pub fn motion_vector(current_clip: Vec4, previous_clip: Option<Vec4>) -> Vec2 {
    match (previous_clip.and_then(perspective_divide), perspective_divide(current_clip)) {
        (Some(prev), Some(cur)) => prev - cur,
        _ => Vec2::ZERO,
    }
}

fn lit_color<T: TextureArray + ?Sized>(
    fragment: &Fragment,
    normal: Vec3,
    params: &ShadingParams,
    textures: &T,
) -> Vec4 {
    let albedo = textures.sample(fragment.texture_index, fragment.uv);
    let diffuse = normal.dot(params.light_direction).max(0.0);
    let specular = if diffuse > 0.0 {
        let view = (params.camera_position - fragment.world_position).normalize_or_zero();
        let half = (params.light_direction + view).normalize_or_zero();
        normal.dot(half).max(0.0).powf(params.shininess) * params.specular_strength
    } else {
        0.0
    };
    let rgb = albedo.truncate() * (params.ambient + params.light_color * diffuse)
        + params.light_color * specular;
    rgb.extend(albedo.w)
}

/// Stage 3 for one fragment.
pub fn shade<T: TextureArray + ?Sized>(
    fragment: &Fragment,
    params: &ShadingParams,
    textures: &T,
) -> FragmentOutput {
    let normal = fragment.normal.normalize_or_zero();
    let color = match params.mode {
        ShadingMode::NormalDebug => (normal * 0.5 + 0.5).extend(1.0),
        ShadingMode::Lit => lit_color(fragment, normal, params, textures),
    };
    FragmentOutput {
        color,
        motion: motion_vector(fragment.current_clip, fragment.previous_clip),
    }
}
