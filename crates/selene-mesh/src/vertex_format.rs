//! Canonical `wgpu::VertexBufferLayout` for patch rendering.
//!
//! | Location | Offset | Format    | Field    |
//! |----------|--------|-----------|----------|
//! | 0        | 0      | Float32x3 | position |
//! | 1        | 12     | Float32x3 | normal   |
//! | 2        | 24     | Float32   | height   |

use std::mem;

use wgpu::{VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

use crate::PatchVertex;

pub const PATCH_VERTEX_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 12,
        shader_location: 1,
    },
    VertexAttribute {
        format: VertexFormat::Float32,
        offset: 24,
        shader_location: 2,
    },
];

/// The vertex buffer layout shared by every terrain pipeline.
pub const PATCH_VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: mem::size_of::<PatchVertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &PATCH_VERTEX_ATTRIBUTES,
};

/// Owned copy of [`PATCH_VERTEX_LAYOUT`].
pub fn patch_vertex_buffer_layout() -> VertexBufferLayout<'static> {
    PATCH_VERTEX_LAYOUT
}

const _: () = assert!(mem::offset_of!(PatchVertex, position) == 0);
const _: () = assert!(mem::offset_of!(PatchVertex, normal) == 12);
const _: () = assert!(mem::offset_of!(PatchVertex, height) == 24);
const _: () = assert!(
    PATCH_VERTEX_ATTRIBUTES[2].offset + 4 <= mem::size_of::<PatchVertex>() as u64,
    "Last attribute exceeds vertex stride"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_stride_matches_vertex_struct_size() {
        assert_eq!(PATCH_VERTEX_LAYOUT.array_stride, 28);
    }

    #[test]
    fn test_shader_locations_are_sequential() {
        for (i, attr) in PATCH_VERTEX_ATTRIBUTES.iter().enumerate() {
            assert_eq!(attr.shader_location, i as u32);
        }
    }

    #[test]
    fn test_helper_returns_same_layout() {
        let layout = patch_vertex_buffer_layout();
        assert_eq!(layout.array_stride, PATCH_VERTEX_LAYOUT.array_stride);
        assert_eq!(layout.attributes.len(), 3);
    }

    #[test]
    fn test_layout_is_valid_for_wgpu_pipeline() {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            force_fallback_adapter: true,
            ..Default::default()
        }));
        let Ok(adapter) = adapter else {
            return;
        };
        let Ok((device, _queue)) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default()))
        else {
            return;
        };

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("test_patch_shader"),
            source: wgpu::ShaderSource::Wgsl(
                r#"
                @vertex
                fn vs_main(
                    @location(0) position: vec3<f32>,
                    @location(1) normal: vec3<f32>,
                    @location(2) height: f32,
                ) -> @builtin(position) vec4<f32> {
                    return vec4<f32>(position + normal * height, 1.0);
                }

                @fragment
                fn fs_main() -> @location(0) vec4<f32> {
                    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
                }
                "#
                .into(),
            ),
        });

        let _pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("test_patch_pipeline"),
            layout: None,
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[PATCH_VERTEX_LAYOUT],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: wgpu::TextureFormat::Bgra8UnormSrgb,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview_mask: None,
            cache: None,
        });
    }
}
