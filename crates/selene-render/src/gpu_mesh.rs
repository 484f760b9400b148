//! Device-resident patch geometry.

/// Vertex and index buffers for one patch, owned by exactly one holder:
/// either a patch or the deferred-destroy queue.
#[derive(Debug)]
pub struct GpuPatchMesh<B> {
    pub vertex_buffer: B,
    pub index_buffer: B,
    pub index_count: u32,
    /// Bytes resident on the device across both buffers.
    pub byte_size: u64,
}

impl GpuPatchMesh<wgpu::Buffer> {
    /// Bind vertex and index buffers to a render pass.
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    }

    /// Draw the entire mesh using indexed rendering.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}
