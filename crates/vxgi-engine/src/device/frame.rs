/// One acquired swapchain image plus the encoder recording into it.
///
/// Presentation happens when the surface texture is dropped after submission,
/// so hold it only for the duration of the frame.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
