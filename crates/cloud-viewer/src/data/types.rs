//! Core data types for the viewer, focused on GPU data representation.

/// One interleaved vertex as uploaded to the GPU: position followed by
/// color, 24 bytes total. Must match the instance inputs in
/// `points.wgsl` (position at byte offset 0, color at byte offset 12).
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq)]
pub struct PointVertex {
    /// Point position `[x, y, z]`.
    pub position: [f32; 3],
    /// RGB color in [0,1].
    pub color: [f32; 3],
}

/// Per-cloud uniform buffer data, respecting std140 layout.
/// Must match `CloudUniform` in `points.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CloudUniformStd140 {
    /// Combined model-view-projection matrix for the current frame.
    pub mvp: [[f32; 4]; 4],
    /// Size of the viewport in physical pixels.
    pub viewport_size: [f32; 2],
    /// Size of the point sprite in pixels.
    pub point_size_px: f32,
    pub _pad: f32,
}

/// All GPU resources and metadata for one loaded point cloud.
/// The vertex buffer is written once at load and read-only afterwards;
/// only the uniform buffer is rewritten per frame.
#[derive(Debug)]
pub struct CloudGpu {
    pub point_count: u32,
    /// Bounding-box center, used to recenter the cloud before rotation.
    pub center: [f32; 3],

    /// Vertex buffer containing `PointVertex` data.
    pub vtx: wgpu::Buffer,
    /// Uniform buffer containing `CloudUniformStd140` data.
    pub ubo: wgpu::Buffer,
    /// Bind group connecting the UBO to the pipeline.
    pub bind: wgpu::BindGroup,
}
