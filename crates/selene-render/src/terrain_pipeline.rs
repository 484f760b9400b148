//! Render pipeline for terrain patches.
//!
//! Per-draw parameters live in one uniform buffer, one 256-byte-aligned slot
//! per draw, selected with a dynamic offset. Depth is reverse-Z.

use std::num::NonZeroU64;

use selene_mesh::PATCH_VERTEX_LAYOUT;

use crate::staging::align_up;
use crate::{PatchPushConstants, WgpuDevice, WgpuDrawList};

const PARAMS_SIZE: u64 = std::mem::size_of::<PatchPushConstants>() as u64;

/// The WGSL source for the terrain shader.
pub const TERRAIN_SHADER_SOURCE: &str = r#"
struct PatchParams {
    view_proj: mat4x4<f32>,
    camera_offset: vec3<f32>,
    light_direction: vec4<f32>,
    camera_position: vec3<f32>,
};

@group(0) @binding(0)
var<uniform> params: PatchParams;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) height: f32,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) height: f32,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let relative = in.position + params.camera_offset;
    out.clip_position = params.view_proj * vec4<f32>(relative, 1.0);
    out.normal = in.normal;
    out.height = in.height;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(in.normal);
    let l = normalize(params.light_direction.xyz);
    let diffuse = max(dot(n, l), 0.0);
    let tint = clamp(0.55 + in.height / 20000.0, 0.3, 0.8);
    let albedo = vec3<f32>(tint, tint, tint * 0.95);
    return vec4<f32>(albedo * (0.04 + 0.96 * diffuse), 1.0);
}
"#;

/// Terrain render pipeline plus its growable per-draw uniform buffer.
pub struct TerrainPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub params_bind_group_layout: wgpu::BindGroupLayout,
    params_stride: u64,
    params: Option<(wgpu::Buffer, wgpu::BindGroup, usize)>,
}

impl TerrainPipeline {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("terrain-shader"),
            source: wgpu::ShaderSource::Wgsl(TERRAIN_SHADER_SOURCE.into()),
        });

        let params_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("terrain-params-bind-group-layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: NonZeroU64::new(PARAMS_SIZE),
                    },
                    count: None,
                }],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("terrain-pipeline-layout"),
            bind_group_layouts: &[&params_bind_group_layout],
            immediate_size: 0,
        });

        let depth_stencil = depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::GreaterEqual, // reverse-Z
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("terrain-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[PATCH_VERTEX_LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        Self {
            pipeline,
            params_bind_group_layout,
            params_stride: align_up(PARAMS_SIZE, alignment),
            params: None,
        }
    }

    /// Bytes between consecutive per-draw slots.
    pub fn params_stride(&self) -> u64 {
        self.params_stride
    }

    fn ensure_capacity(&mut self, device: &wgpu::Device, draws: usize) {
        if self.params.as_ref().is_some_and(|(_, _, cap)| *cap >= draws) {
            return;
        }
        let capacity = draws.next_power_of_two().max(64);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("terrain-params"),
            size: capacity as u64 * self.params_stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("terrain-params-bind-group"),
            layout: &self.params_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(PARAMS_SIZE),
                }),
            }],
        });
        self.params = Some((buffer, bind_group, capacity));
    }

    /// Upload per-draw parameters and encode one render pass drawing every patch.
    pub fn encode(
        &mut self,
        gpu: &WgpuDevice,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth_view: Option<&wgpu::TextureView>,
        clear_color: wgpu::Color,
        draws: &WgpuDrawList,
    ) {
        self.ensure_capacity(gpu.device(), draws.len());
        let Some((buffer, bind_group, _)) = self.params.as_ref() else {
            return;
        };

        let stride = self.params_stride as usize;
        let mut staged = vec![0u8; draws.len() * stride];
        for (i, draw) in draws.draws.iter().enumerate() {
            staged[i * stride..i * stride + PARAMS_SIZE as usize]
                .copy_from_slice(bytemuck::bytes_of(&draw.constants));
        }
        if !staged.is_empty() {
            gpu.queue().write_buffer(buffer, 0, &staged);
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("terrain-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: depth_view.map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_pipeline(&self.pipeline);
        for (i, draw) in draws.draws.iter().enumerate() {
            pass.set_bind_group(0, bind_group, &[(i * stride) as u32]);
            pass.set_vertex_buffer(0, draw.vertex_buffer.slice(..));
            pass.set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..draw.index_count, 0, 0..1);
        }
    }
}
