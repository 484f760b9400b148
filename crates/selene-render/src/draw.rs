//! Draw command sinks for the patch walker.
//!
//! The walker sets per-draw parameters and then issues one indexed draw for
//! each visible leaf. A recorder turns that sequence into real commands or
//! captures it for inspection.

use crate::{GpuPatchMesh, PatchPushConstants};

/// Receives per-draw parameters and indexed draws, in that order, per patch.
pub trait DrawRecorder<B> {
    fn push_constants(&mut self, constants: &PatchPushConstants);
    fn draw_indexed(&mut self, mesh: &GpuPatchMesh<B>);
}

/// One captured draw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordedDraw {
    pub constants: PatchPushConstants,
    pub index_count: u32,
}

/// Captures draws in memory.
#[derive(Debug, Default)]
pub struct RecordingDrawRecorder {
    pub push_constant_count: usize,
    pub draws: Vec<RecordedDraw>,
    current: Option<PatchPushConstants>,
}

impl RecordingDrawRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }

    pub fn clear(&mut self) {
        self.push_constant_count = 0;
        self.draws.clear();
        self.current = None;
    }
}

impl<B> DrawRecorder<B> for RecordingDrawRecorder {
    fn push_constants(&mut self, constants: &PatchPushConstants) {
        self.push_constant_count += 1;
        self.current = Some(*constants);
    }

    fn draw_indexed(&mut self, mesh: &GpuPatchMesh<B>) {
        self.draws.push(RecordedDraw {
            constants: self.current.unwrap_or_default(),
            index_count: mesh.index_count,
        });
    }
}

/// A wgpu draw ready for encoding.
#[derive(Debug)]
pub(crate) struct WgpuDraw {
    pub constants: PatchPushConstants,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// Collects wgpu draws for one frame.
///
/// Per-draw parameters go into a dynamic-offset uniform buffer, which must be
/// written before the render pass begins, so draws are gathered here first and
/// encoded by [`TerrainPipeline::encode`](crate::TerrainPipeline::encode).
#[derive(Debug, Default)]
pub struct WgpuDrawList {
    pub(crate) draws: Vec<WgpuDraw>,
    current: PatchPushConstants,
}

impl WgpuDrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn clear(&mut self) {
        self.draws.clear();
    }
}

impl DrawRecorder<wgpu::Buffer> for WgpuDrawList {
    fn push_constants(&mut self, constants: &PatchPushConstants) {
        self.current = *constants;
    }

    fn draw_indexed(&mut self, mesh: &GpuPatchMesh<wgpu::Buffer>) {
        self.draws.push(WgpuDraw {
            constants: self.current,
            vertex_buffer: mesh.vertex_buffer.clone(),
            index_buffer: mesh.index_buffer.clone(),
            index_count: mesh.index_count,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};

    #[test]
    fn test_recording_pairs_constants_with_draws() {
        let mut recorder = RecordingDrawRecorder::new();
        let mesh = GpuPatchMesh {
            vertex_buffer: (),
            index_buffer: (),
            index_count: 96,
            byte_size: 0,
        };
        let pc = PatchPushConstants::new(Mat4::IDENTITY, Vec3::X, Vec3::Y, Vec3::Z);
        DrawRecorder::<()>::push_constants(&mut recorder, &pc);
        recorder.draw_indexed(&mesh);

        assert_eq!(recorder.push_constant_count, 1);
        assert_eq!(recorder.draw_count(), 1);
        assert_eq!(recorder.draws[0].constants.camera_offset(), Vec3::X);
        assert_eq!(recorder.draws[0].index_count, 96);

        recorder.clear();
        assert_eq!(recorder.draw_count(), 0);
    }
}
