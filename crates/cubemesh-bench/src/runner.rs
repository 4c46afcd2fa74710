use std::time::Instant;

use cubemesh_core::config::PipelineConfig;
use cubemesh_core::error::CubemeshError;
use cubemesh_pipeline::{FrameTransforms, JitterSequence, MeshPipeline, PipelineStats, ShadingParams};
use cubemesh_render::{GpuFrameStats, MeshRenderer, DEPTH_FORMAT, MOTION_FORMAT};
use cubemesh_world::dispatch::WorldBuffers;
use glam::{Mat4, Vec3};

use crate::scenes::{self, SceneConfig};

const TARGET_WIDTH: u32 = 640;
const TARGET_HEIGHT: u32 = 480;
const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Timing data for a single benchmark run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TimingSeries {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Result of a single scene benchmark.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BenchmarkResult {
    pub scene_name: String,
    pub block_count: u32,
    pub chunk_count: u32,
    pub frame_count: u32,
    pub groups_emitted: u32,
    pub faces_emitted: u32,
    pub faces_culled: u32,
    pub triangles: u32,
    pub cpu_timings: TimingSeries,
    #[serde(default)]
    pub gpu_timings: Option<TimingSeries>,
    #[serde(default)]
    pub gpu_groups: Option<u32>,
}

struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

/// Runs scenes through the CPU executor and, when a native adapter exists, the GPU path.
pub struct BenchmarkRunner {
    config: PipelineConfig,
    frame_count: u32,
    gpu: Option<GpuContext>,
}

impl BenchmarkRunner {
    /// Blocks on the async adapter request when `use_gpu` is set.
    pub fn new(config: PipelineConfig, frame_count: u32, use_gpu: bool) -> Self {
        let gpu = if use_gpu { init_gpu() } else { None };
        Self {
            config,
            frame_count: frame_count.max(1),
            gpu,
        }
    }

    pub fn has_gpu(&self) -> bool {
        self.gpu.is_some()
    }

    /// Run a single benchmark scene and return timing results.
    pub fn run_scene(&self, scene: &SceneConfig) -> Result<BenchmarkResult, CubemeshError> {
        log::info!("Running scene '{}' (extent {})...", scene.name, scene.extent);

        let world = scenes::build_scene(scene, scenes::load_models()?)?;
        let buffers = world.build_buffers()?;
        log::info!(
            "  Populated {} blocks across {} chunks ({} voxels)",
            buffers.block_refs.len(),
            buffers.chunk_count(),
            buffers.voxels.len()
        );

        let pipeline = MeshPipeline::from_config(&self.config);
        let frames = camera_frames(scene, &self.config, self.frame_count);

        let mut frame_times = Vec::with_capacity(frames.len());
        let mut last_stats = PipelineStats::default();
        let mut last_triangles = 0;
        for frame in &frames {
            let frame_start = Instant::now();
            let mesh = pipeline.run_world(self.config.placement, &buffers, true, frame);
            frame_times.push(frame_start.elapsed().as_secs_f64() * 1000.0);
            last_stats = mesh.stats;
            last_triangles = mesh.total_primitives();
        }

        let cpu_timings = compute_timings(&frame_times);
        log::info!(
            "  CPU: mean={:.2}ms, p95={:.2}ms, p99={:.2}ms",
            cpu_timings.mean_ms,
            cpu_timings.p95_ms,
            cpu_timings.p99_ms
        );

        let (gpu_timings, gpu_stats) = match &self.gpu {
            Some(gpu) => {
                let (timings, stats) = self.run_gpu(gpu, &buffers, scene, &frames);
                log::info!(
                    "  GPU: mean={:.2}ms, p95={:.2}ms, p99={:.2}ms",
                    timings.mean_ms,
                    timings.p95_ms,
                    timings.p99_ms
                );
                (Some(timings), stats)
            }
            None => (None, None),
        };
        if let Some(stats) = gpu_stats {
            if stats.generated_groups != last_stats.groups_emitted {
                log::warn!(
                    "  GPU generated {} groups, CPU emitted {}",
                    stats.generated_groups,
                    last_stats.groups_emitted
                );
            }
        }

        Ok(BenchmarkResult {
            scene_name: scene.name.to_string(),
            block_count: buffers.block_refs.len() as u32,
            chunk_count: buffers.chunk_count(),
            frame_count: self.frame_count,
            groups_emitted: last_stats.groups_emitted,
            faces_emitted: last_stats.faces_emitted,
            faces_culled: last_stats.faces_culled,
            triangles: last_triangles,
            cpu_timings,
            gpu_timings,
            gpu_groups: gpu_stats.map(|s| s.generated_groups),
        })
    }

    fn run_gpu(
        &self,
        gpu: &GpuContext,
        buffers: &WorldBuffers,
        scene: &SceneConfig,
        frames: &[FrameTransforms],
    ) -> (TimingSeries, Option<GpuFrameStats>) {
        let mut renderer = MeshRenderer::new(&gpu.device, &gpu.queue, COLOR_FORMAT, &self.config);
        renderer.upload_world(&gpu.device, &gpu.queue, buffers);
        let palette = create_palette(&gpu.device, &gpu.queue);
        renderer.set_texture_array(&gpu.device, &palette);

        let color_view = create_target(&gpu.device, "bench-color", COLOR_FORMAT);
        let motion_view = create_target(&gpu.device, "bench-motion", MOTION_FORMAT);
        let depth_view = create_target(&gpu.device, "bench-depth", DEPTH_FORMAT);

        let camera = Vec3::from_array(scene.camera_position);
        let shading = ShadingParams::from_config(&self.config, camera);

        let mut frame_times = Vec::with_capacity(frames.len());
        for frame in frames {
            let frame_start = Instant::now();

            renderer.update_frame(&gpu.queue, frame, &shading);
            let mut encoder = gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("bench-encoder"),
                });
            renderer.render(&mut encoder, &color_view, &motion_view, &depth_view);
            gpu.queue.submit(std::iter::once(encoder.finish()));
            let _ = gpu.device.poll(wgpu::Maintain::Wait);

            frame_times.push(frame_start.elapsed().as_secs_f64() * 1000.0);
        }

        let stats = renderer.read_stats(&gpu.device, &gpu.queue);
        (compute_timings(&frame_times), stats)
    }
}

fn init_gpu() -> Option<GpuContext> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });

    let Some(adapter) = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    })) else {
        log::warn!("No suitable GPU adapter found, GPU timings disabled");
        return None;
    };

    log::info!("Benchmark adapter: {}", adapter.get_info().name);
    log::info!("Adapter limits: {:?}", adapter.limits());

    match pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("bench-device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::Performance,
        },
        None,
    )) {
        Ok((device, queue)) => Some(GpuContext { device, queue }),
        Err(e) => {
            log::warn!("Failed to create device ({e}), GPU timings disabled");
            None
        }
    }
}

/// One flat color per texture layer referenced by the bundled models.
const PALETTE: [[u8; 4]; 7] = [
    [128, 128, 128, 255], // stone
    [96, 160, 64, 255],   // grass top
    [120, 85, 60, 255],   // dirt
    [110, 120, 70, 255],  // grass side
    [200, 230, 240, 255], // glass
    [60, 60, 64, 255],    // iron
    [255, 220, 140, 255], // lamp
];

fn create_palette(device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::TextureView {
    use wgpu::util::DeviceExt;

    let texels: Vec<u8> = PALETTE.iter().flatten().copied().collect();
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("bench-palette"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: PALETTE.len() as u32,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &texels,
    );
    texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("bench-palette-view"),
        dimension: Some(wgpu::TextureViewDimension::D2Array),
        ..Default::default()
    })
}

/// Offscreen render target (bench doesn't present to screen).
fn create_target(
    device: &wgpu::Device,
    label: &str,
    format: wgpu::TextureFormat,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: TARGET_WIDTH,
            height: TARGET_HEIGHT,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Per-frame transforms for a slow orbit around the scene target.
/// The first frame has no history; later frames carry the previous view-projection.
pub fn camera_frames(scene: &SceneConfig, config: &PipelineConfig, count: u32) -> Vec<FrameTransforms> {
    let target = Vec3::from_array(scene.camera_target);
    let offset = Vec3::from_array(scene.camera_position) - target;
    let projection = Mat4::perspective_rh(
        60f32.to_radians(),
        TARGET_WIDTH as f32 / TARGET_HEIGHT as f32,
        0.1,
        1000.0,
    );
    let mut jitter = JitterSequence::from_config(&config.jitter);

    let mut frames: Vec<FrameTransforms> = Vec::with_capacity(count as usize);
    for i in 0..count {
        let angle = i as f32 * 0.01;
        let eye = target + Mat4::from_rotation_y(angle).transform_vector3(offset);
        let view_proj = projection * Mat4::look_at_rh(eye, target, Vec3::Y);
        let frame = match frames.last() {
            Some(prev) => prev.advance(view_proj, eye),
            None => FrameTransforms::new(view_proj, eye),
        };
        let frame = match jitter.as_mut() {
            Some(seq) => frame.with_jitter(seq.next_clip_offset()),
            None => frame,
        };
        frames.push(frame);
    }
    frames
}

/// Compute timing statistics from a list of frame times in milliseconds.
pub fn compute_timings(times: &[f64]) -> TimingSeries {
    if times.is_empty() {
        return TimingSeries {
            mean_ms: 0.0,
            median_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
        };
    }

    let mut sorted = times.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };

    TimingSeries {
        mean_ms: mean,
        median_ms: median,
        p95_ms: percentile(&sorted, 0.95),
        p99_ms: percentile(&sorted, 0.99),
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
    }
}

/// Nearest-rank percentile of an ascending, non-empty slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenes::SceneKind;

    fn scene(kind: SceneKind, extent: i32) -> SceneConfig {
        SceneConfig {
            name: "unit",
            kind,
            extent,
            camera_position: [10.0, 8.0, 10.0],
            camera_target: [2.0, 0.0, 2.0],
        }
    }

    #[test]
    fn test_compute_timings_odd() {
        let t = compute_timings(&[3.0, 1.0, 2.0]);
        assert_eq!(t.median_ms, 2.0);
        assert_eq!(t.mean_ms, 2.0);
        assert_eq!(t.min_ms, 1.0);
        assert_eq!(t.max_ms, 3.0);
        assert_eq!(t.p99_ms, 3.0);
    }

    #[test]
    fn test_compute_timings_even_and_empty() {
        let t = compute_timings(&[4.0, 1.0, 2.0, 3.0]);
        assert_eq!(t.median_ms, 2.5);
        assert_eq!(compute_timings(&[]).max_ms, 0.0);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let sorted: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(percentile(&sorted, 0.95), 95.0);
        assert_eq!(percentile(&sorted, 0.99), 99.0);
        assert_eq!(percentile(&[7.0], 0.5), 7.0);
    }

    #[test]
    fn test_camera_frames_chain_history() {
        let config = PipelineConfig::default();
        let frames = camera_frames(&scene(SceneKind::SolidCube, 4), &config, 3);
        assert_eq!(frames.len(), 3);
        assert!(frames[0].prev_view_proj.is_none());
        assert_eq!(frames[1].prev_view_proj, Some(frames[0].view_proj));
        assert_eq!(frames[2].prev_view_proj, Some(frames[1].view_proj));
        // Jitter is disabled by default.
        assert!(frames.iter().all(|f| f.jitter == glam::Vec2::ZERO));
    }

    #[test]
    fn test_camera_frames_jittered() {
        let mut config = PipelineConfig::default();
        config.jitter.enabled = true;
        let frames = camera_frames(&scene(SceneKind::SolidCube, 4), &config, 2);
        assert_ne!(frames[0].jitter, glam::Vec2::ZERO);
        assert_ne!(frames[0].jitter, frames[1].jitter);
    }

    #[test]
    fn test_palette_covers_model_textures() {
        let models = scenes::load_models().unwrap();
        let max_layer = models
            .iter()
            .flat_map(|m| m.voxels.iter())
            .flat_map(|v| v.faces.iter())
            .map(|f| f.texture_index)
            .max()
            .unwrap();
        assert!((max_layer as usize) < PALETTE.len());
    }

    #[test]
    fn test_cpu_run_solid_cube() {
        let runner = BenchmarkRunner::new(PipelineConfig::default(), 2, false);
        assert!(!runner.has_gpu());
        let result = runner.run_scene(&scene(SceneKind::SolidCube, 4)).unwrap();
        assert_eq!(result.block_count, 64);
        // Only the 6 * 16 shell faces survive.
        assert_eq!(result.faces_emitted, 96);
        assert_eq!(result.faces_culled, 64 * 6 - 96);
        assert_eq!(result.triangles, 192);
        assert!(result.gpu_timings.is_none());
    }

    #[test]
    fn test_cpu_run_checkerboard_culls_nothing() {
        let runner = BenchmarkRunner::new(PipelineConfig::default(), 1, false);
        let result = runner.run_scene(&scene(SceneKind::Checkerboard, 4)).unwrap();
        assert_eq!(result.block_count, 32);
        assert_eq!(result.faces_emitted, 32 * 6);
        assert_eq!(result.faces_culled, 0);
    }
}
