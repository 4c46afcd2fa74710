use bytemuck::Zeroable;
use cubemesh_core::config::{PipelineConfig, PlacementKind, ShadingMode};
use cubemesh_core::constants::{
    AMPLIFY_WORKGROUP_SIZE, BLOCKS_PER_CHUNK, BLOCK_SIZE, GENERATE_WORKGROUP_SIZE,
    INDICES_PER_VOXEL, MAX_EMIT_PER_BLOCK, MAX_PRIMITIVES_PER_VOXEL, MAX_VERTICES_PER_VOXEL,
};
use cubemesh_core::math::MIN_CLIP_W;
use cubemesh_pipeline::{FrameTransforms, ShadingParams};
use cubemesh_world::dispatch::WorldBuffers;
use wgpu::util::DeviceExt;

use crate::gpu_types::{
    build_index_pattern, count_tasks, max_generation_slots, shading_mode_id, GpuBlock, GpuBlockRef, GpuCounters, GpuFrameStats,
    GpuFrameUniforms, GpuMeshParams, GpuShadingUniforms, GpuTask, GpuVertex, GpuVoxel,
};

/// Format of the motion-vector target (NDC delta, two channels).
pub const MOTION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg16Float;

/// Format of the depth target passed to `render`.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const COUNTERS_SIZE: u64 = std::mem::size_of::<GpuCounters>() as u64;

/// Buffers and bind groups sized for one uploaded world.
struct WorldResources {
    // Kept alive for the bind groups that reference them.
    _block_buffer: wgpu::Buffer,
    _voxel_buffer: wgpu::Buffer,
    _block_ref_buffer: wgpu::Buffer,
    _task_buffer: wgpu::Buffer,
    _vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    amplify_bind_group: wgpu::BindGroup,
    generate_bind_group: wgpu::BindGroup,
    shade_bind_group: wgpu::BindGroup,
    work_count: u32,
    task_capacity: u32,
}

/// GPU realisation of the mesh pipeline:
/// amplify (compute) -> finalize indirect args (compute) -> generate (compute)
/// -> vertex-pulling raster pass writing color, motion vectors and depth.
/// All buffers are created at init or world upload; nothing is allocated per frame.
pub struct MeshRenderer {
    amplify_pipeline: wgpu::ComputePipeline,
    finalize_pipeline: wgpu::ComputePipeline,
    generate_pipeline: wgpu::ComputePipeline,
    shade_pipeline: wgpu::RenderPipeline,
    amplify_bgl: wgpu::BindGroupLayout,
    generate_bgl: wgpu::BindGroupLayout,
    shade_bgl: wgpu::BindGroupLayout,
    texture_bgl: wgpu::BindGroupLayout,
    finalize_bind_group: wgpu::BindGroup,
    texture_bind_group: wgpu::BindGroup,
    texture_sampler: wgpu::Sampler,
    frame_uniform_buffer: wgpu::Buffer,
    shading_uniform_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    counters_buffer: wgpu::Buffer,
    counters_staging: wgpu::Buffer,
    dispatch_args_buffer: wgpu::Buffer,
    draw_args_buffer: wgpu::Buffer,
    emit_ceiling: u32,
    world: Option<WorldResources>,
}

impl MeshRenderer {
    /// Build pipelines and world-independent resources.
    /// Until `set_texture_array` is called, lit shading samples a 1x1 white layer.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        config: &PipelineConfig,
    ) -> Self {
        // -- Shader source composition --
        let constants_preamble = shader_preamble();

        let types_wgsl = include_str!("../../../shaders/common/types.wgsl");
        let amplify_wgsl = include_str!("../../../shaders/mesh/amplify.wgsl");
        let finalize_wgsl = include_str!("../../../shaders/mesh/finalize.wgsl");
        let generate_wgsl = include_str!("../../../shaders/mesh/generate.wgsl");
        let shade_wgsl = include_str!("../../../shaders/mesh/shade.wgsl");

        let compose = |label: &str, body: &str| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(
                    format!("{constants_preamble}\n{types_wgsl}\n{body}").into(),
                ),
            })
        };
        let amplify_module = compose("amplify-shader", amplify_wgsl);
        let finalize_module = compose("finalize-shader", finalize_wgsl);
        let generate_module = compose("generate-shader", generate_wgsl);
        let shade_module = compose("shade-shader", shade_wgsl);

        // -- Uniform and control buffers --
        let frame_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame-uniforms"),
            size: std::mem::size_of::<GpuFrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shading = ShadingParams::from_config(config, glam::Vec3::ZERO);
        let shading_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("shading-uniforms"),
            contents: bytemuck::bytes_of(&GpuShadingUniforms::from(&shading)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let emit_ceiling = config.emit_ceiling.clamp(1, MAX_EMIT_PER_BLOCK);
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh-params"),
            contents: bytemuck::bytes_of(&GpuMeshParams {
                emit_ceiling,
                ..GpuMeshParams::default()
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let counters_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mesh-counters"),
            size: COUNTERS_SIZE,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let counters_staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mesh-counters-staging"),
            size: COUNTERS_SIZE,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let dispatch_args_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("generate-dispatch-args"),
            size: 3 * 4,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::INDIRECT,
            mapped_at_creation: false,
        });

        let draw_args_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("shade-draw-args"),
            size: 5 * 4,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::INDIRECT,
            mapped_at_creation: false,
        });

        // -- Bind group layouts --
        let compute = wgpu::ShaderStages::COMPUTE;
        let amplify_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("amplify-bgl"),
            entries: &[
                uniform_entry(0, compute),
                storage_entry(1, compute, true),
                storage_entry(2, compute, true),
                storage_entry(3, compute, false),
                storage_entry(4, compute, false),
            ],
        });

        let finalize_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("finalize-bgl"),
            entries: &[
                uniform_entry(0, compute),
                storage_entry(1, compute, false),
                storage_entry(2, compute, false),
                storage_entry(3, compute, false),
            ],
        });

        let generate_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("generate-bgl"),
            entries: &[
                uniform_entry(0, compute),
                uniform_entry(1, compute),
                storage_entry(2, compute, true),
                storage_entry(3, compute, true),
                storage_entry(4, compute, false),
                storage_entry(5, compute, false),
            ],
        });

        let raster = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let shade_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shade-bgl"),
            entries: &[
                uniform_entry(0, raster),
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
                storage_entry(2, wgpu::ShaderStages::VERTEX, true),
            ],
        });

        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture-bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // -- World-independent bind groups --
        let finalize_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("finalize-bg"),
            layout: &finalize_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: counters_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: dispatch_args_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: draw_args_buffer.as_entire_binding(),
                },
            ],
        });

        let texture_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("texture-array-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let white_view = Self::create_white_texture_array(device, queue);
        let texture_bind_group =
            Self::create_texture_bind_group(device, &texture_bgl, &white_view, &texture_sampler);

        // -- Pipelines --
        let compute_pipeline = |label: &str, bgl: &wgpu::BindGroupLayout, module| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[bgl],
                push_constant_ranges: &[],
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        };
        let amplify_pipeline = compute_pipeline("amplify-pipeline", &amplify_bgl, &amplify_module);
        let finalize_pipeline =
            compute_pipeline("finalize-pipeline", &finalize_bgl, &finalize_module);
        let generate_pipeline =
            compute_pipeline("generate-pipeline", &generate_bgl, &generate_module);

        let shade_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shade-pipeline-layout"),
            bind_group_layouts: &[&shade_bgl, &texture_bgl],
            push_constant_ranges: &[],
        });

        let shade_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shade-pipeline"),
            layout: Some(&shade_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shade_module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shade_module,
                entry_point: Some("fs_main"),
                targets: &[
                    Some(wgpu::ColorTargetState {
                        format: color_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    }),
                    Some(wgpu::ColorTargetState {
                        format: MOTION_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    }),
                ],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        });

        log::info!(
            "Mesh renderer ready (emit ceiling {emit_ceiling}, shading {:?})",
            config.shading
        );
        if let Some(note) = placement_note(config.placement) {
            log::warn!("{note}");
        }

        Self {
            amplify_pipeline,
            finalize_pipeline,
            generate_pipeline,
            shade_pipeline,
            amplify_bgl,
            generate_bgl,
            shade_bgl,
            texture_bgl,
            finalize_bind_group,
            texture_bind_group,
            texture_sampler,
            frame_uniform_buffer,
            shading_uniform_buffer,
            params_buffer,
            counters_buffer,
            counters_staging,
            dispatch_args_buffer,
            draw_args_buffer,
            emit_ceiling,
            world: None,
        }
    }

    /// Upload read-only world buffers and size task/vertex/index storage to fit
    /// the groups the compacted work list spawns, clamped to device limits.
    /// Groups past the clamp are dropped; frame stats count them as requested but not generated.
    pub fn upload_world(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, buffers: &WorldBuffers) {
        let blocks: Vec<GpuBlock> = buffers.blocks.iter().map(GpuBlock::from).collect();
        let voxels: Vec<GpuVoxel> = buffers.voxels.iter().map(GpuVoxel::from).collect();
        let block_refs: Vec<GpuBlockRef> = buffers.block_refs.iter().map(GpuBlockRef::from).collect();

        let limits = device.limits();
        let max_work = limits
            .max_compute_workgroups_per_dimension
            .saturating_mul(AMPLIFY_WORKGROUP_SIZE);
        let work_count = (block_refs.len() as u32).min(max_work);
        if work_count < block_refs.len() as u32 {
            log::warn!(
                "Work list of {} blocks exceeds one amplify dispatch; meshing the first {work_count}",
                block_refs.len()
            );
        }

        let required = count_tasks(buffers, self.emit_ceiling);
        let task_capacity = required.min(max_generation_slots(
            limits.max_buffer_size,
            limits.max_storage_buffer_binding_size,
            limits.max_compute_workgroups_per_dimension,
        ));
        if task_capacity < required {
            log::warn!(
                "World needs {required} generation slots but device limits allow {task_capacity}; \
                 excess groups will be dropped"
            );
        }

        let block_buffer = storage_buffer_init(device, "block-buffer", &blocks);
        let voxel_buffer = storage_buffer_init(device, "voxel-buffer", &voxels);
        let block_ref_buffer = storage_buffer_init(device, "block-ref-buffer", &block_refs);

        let slots = task_capacity.max(1) as u64;
        let task_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("task-buffer"),
            size: slots * std::mem::size_of::<GpuTask>() as u64,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("generated-vertex-buffer"),
            size: slots * MAX_VERTICES_PER_VOXEL as u64 * std::mem::size_of::<GpuVertex>() as u64,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("generated-index-buffer"),
            contents: bytemuck::cast_slice(&build_index_pattern(slots as u32)),
            usage: wgpu::BufferUsages::INDEX,
        });

        queue.write_buffer(
            &self.params_buffer,
            0,
            bytemuck::bytes_of(&GpuMeshParams {
                work_count,
                task_capacity,
                emit_ceiling: self.emit_ceiling,
                _pad: 0,
            }),
        );

        let amplify_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("amplify-bg"),
            layout: &self.amplify_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: block_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: block_ref_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: task_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: self.counters_buffer.as_entire_binding(),
                },
            ],
        });

        let generate_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("generate-bg"),
            layout: &self.generate_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.frame_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: voxel_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: task_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: self.counters_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: vertex_buffer.as_entire_binding(),
                },
            ],
        });

        let shade_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shade-bg"),
            layout: &self.shade_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.frame_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.shading_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: vertex_buffer.as_entire_binding(),
                },
            ],
        });

        log::info!(
            "Uploaded world: {} blocks, {} voxels, {} work units, {} generation slots ({:.1} MiB vertices)",
            blocks.len(),
            voxels.len(),
            work_count,
            task_capacity,
            vertex_buffer.size() as f64 / (1024.0 * 1024.0)
        );

        self.world = Some(WorldResources {
            _block_buffer: block_buffer,
            _voxel_buffer: voxel_buffer,
            _block_ref_buffer: block_ref_buffer,
            _task_buffer: task_buffer,
            _vertex_buffer: vertex_buffer,
            index_buffer,
            amplify_bind_group,
            generate_bind_group,
            shade_bind_group,
            work_count,
            task_capacity,
        });
    }

    /// Replace the texture array sampled by lit shading. `view` must be a D2Array view.
    pub fn set_texture_array(&mut self, device: &wgpu::Device, view: &wgpu::TextureView) {
        self.texture_bind_group =
            Self::create_texture_bind_group(device, &self.texture_bgl, view, &self.texture_sampler);
    }

    /// Upload the per-frame transform block and shading parameters.
    pub fn update_frame(&self, queue: &wgpu::Queue, frame: &FrameTransforms, shading: &ShadingParams) {
        queue.write_buffer(
            &self.frame_uniform_buffer,
            0,
            bytemuck::bytes_of(&GpuFrameUniforms::from(frame)),
        );
        queue.write_buffer(
            &self.shading_uniform_buffer,
            0,
            bytemuck::bytes_of(&GpuShadingUniforms::from(shading)),
        );
    }

    /// Encode all three stages. Clears the targets; does nothing without a world.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        motion_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
    ) {
        let Some(world) = &self.world else {
            return;
        };

        encoder.clear_buffer(&self.counters_buffer, 0, None);

        // 1. Amplification: one invocation per work unit
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("amplify-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.amplify_pipeline);
            pass.set_bind_group(0, &world.amplify_bind_group, &[]);
            pass.dispatch_workgroups(world.work_count.div_ceil(AMPLIFY_WORKGROUP_SIZE), 1, 1);
        }

        // 2. Indirect arguments from the reserved task count
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("finalize-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.finalize_pipeline);
            pass.set_bind_group(0, &self.finalize_bind_group, &[]);
            pass.dispatch_workgroups(1, 1, 1);
        }

        // 3. Geometry generation: one invocation per task
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("generate-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.generate_pipeline);
            pass.set_bind_group(0, &world.generate_bind_group, &[]);
            pass.dispatch_workgroups_indirect(&self.dispatch_args_buffer, 0);
        }

        // 4. Shading
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shade-pass"),
                color_attachments: &[
                    Some(wgpu::RenderPassColorAttachment {
                        view: color_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color {
                                r: 0.05,
                                g: 0.05,
                                b: 0.08,
                                a: 1.0,
                            }),
                            store: wgpu::StoreOp::Store,
                        },
                    }),
                    Some(wgpu::RenderPassColorAttachment {
                        view: motion_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                            store: wgpu::StoreOp::Store,
                        },
                    }),
                ],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.shade_pipeline);
            pass.set_bind_group(0, &world.shade_bind_group, &[]);
            pass.set_bind_group(1, &self.texture_bind_group, &[]);
            pass.set_index_buffer(world.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed_indirect(&self.draw_args_buffer, 0);
        }
    }

    /// Read back the counters of the last submitted frame. Blocks until the GPU is idle.
    pub fn read_stats(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Option<GpuFrameStats> {
        let task_capacity = self.world.as_ref()?.task_capacity;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("mesh-stats-readback"),
        });
        encoder.copy_buffer_to_buffer(&self.counters_buffer, 0, &self.counters_staging, 0, COUNTERS_SIZE);
        queue.submit(Some(encoder.finish()));

        let slice = self.counters_staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {
                let data = slice.get_mapped_range();
                let counters: GpuCounters = *bytemuck::from_bytes(&data);
                drop(data);
                self.counters_staging.unmap();
                Some(GpuFrameStats::from_counters(&counters, task_capacity))
            }
            _ => {
                log::warn!("Mesh counter readback failed");
                None
            }
        }
    }

    /// Work units of the uploaded world (0 before upload).
    pub fn work_count(&self) -> u32 {
        self.world.as_ref().map_or(0, |w| w.work_count)
    }

    /// Generation slots of the uploaded world (0 before upload).
    pub fn task_capacity(&self) -> u32 {
        self.world.as_ref().map_or(0, |w| w.task_capacity)
    }

    // -- Private helpers --

    fn create_white_texture_array(device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::TextureView {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("default-texture-array"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &[255, 255, 255, 255],
        );
        texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("default-texture-array-view"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        })
    }

    fn create_texture_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texture-bg"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }
}

/// WGSL constants shared with the CPU stages, prepended to every shader module.
fn shader_preamble() -> String {
    format!(
        "const BLOCKS_PER_CHUNK: u32 = {}u;\n\
         const BLOCK_SIZE: f32 = {:?};\n\
         const MAX_VERTICES_PER_VOXEL: u32 = {}u;\n\
         const MAX_PRIMITIVES_PER_VOXEL: u32 = {}u;\n\
         const INDICES_PER_VOXEL: u32 = {}u;\n\
         const AMPLIFY_WORKGROUP_SIZE: u32 = {}u;\n\
         const GENERATE_WORKGROUP_SIZE: u32 = {}u;\n\
         const MIN_CLIP_W: f32 = {:?};\n\
         const SHADING_NORMAL_DEBUG: u32 = {}u;\n\
         const SHADING_LIT: u32 = {}u;\n",
        BLOCKS_PER_CHUNK,
        BLOCK_SIZE,
        MAX_VERTICES_PER_VOXEL,
        MAX_PRIMITIVES_PER_VOXEL,
        INDICES_PER_VOXEL,
        AMPLIFY_WORKGROUP_SIZE,
        GENERATE_WORKGROUP_SIZE,
        MIN_CLIP_W,
        shading_mode_id(ShadingMode::NormalDebug),
        shading_mode_id(ShadingMode::Lit),
    )
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    read_only: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Read-only storage buffer. An empty slice still gets one zeroed element,
/// since zero-sized bindings are invalid.
fn storage_buffer_init<T: bytemuck::Pod>(device: &wgpu::Device, label: &str, data: &[T]) -> wgpu::Buffer {
    let placeholder = [T::zeroed()];
    let contents = if data.is_empty() { &placeholder[..] } else { data };
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(contents),
        usage: wgpu::BufferUsages::STORAGE,
    })
}

/// The GPU path always encodes translation payloads.
fn placement_note(placement: PlacementKind) -> Option<&'static str> {
    match placement {
        PlacementKind::Translation => None,
        PlacementKind::Matrix => Some(
            "Matrix placement is CPU-only; the GPU path places voxels with translation payloads",
        ),
    }
}
