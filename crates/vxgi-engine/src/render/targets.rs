//! Off-screen render targets.
//!
//! Each type owns its textures; dropping it releases the GPU memory, so a
//! reallocation is simply a replacement of the old value.

use glam::UVec2;

use super::common::{DEPTH_FORMAT, GBUFFER_FORMAT};

pub struct ColorTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub size: UVec2,
}

impl ColorTarget {
    pub fn new(device: &wgpu::Device, label: &str, size: UVec2, format: wgpu::TextureFormat) -> Self {
        let texture = create_2d(
            device,
            label,
            size,
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view, format, size }
    }
}

pub struct DepthTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: UVec2,
}

impl DepthTarget {
    pub fn new(device: &wgpu::Device, label: &str, size: UVec2) -> Self {
        let texture = create_2d(
            device,
            label,
            size,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view, size }
    }
}

/// G-buffer channels in attachment order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GBufferChannel {
    /// xyz: world position, w: linear view depth
    Position,
    Normal,
    /// Normal perturbed by the bump map.
    Bump,
    /// rgb: albedo, a: dissolve
    Albedo,
    /// rgb: specular color, a: specular exponent / 1000
    Specular,
    /// rgb: ambient reflectance times the ambient map
    Ambient,
    /// rgb: emitted radiance
    Emission,
}

impl GBufferChannel {
    pub const COUNT: usize = 7;

    pub const ALL: [GBufferChannel; Self::COUNT] = [
        GBufferChannel::Position,
        GBufferChannel::Normal,
        GBufferChannel::Bump,
        GBufferChannel::Albedo,
        GBufferChannel::Specular,
        GBufferChannel::Ambient,
        GBufferChannel::Emission,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GBufferChannel::Position => "vxgi gbuffer position",
            GBufferChannel::Normal => "vxgi gbuffer normal",
            GBufferChannel::Bump => "vxgi gbuffer bump",
            GBufferChannel::Albedo => "vxgi gbuffer albedo",
            GBufferChannel::Specular => "vxgi gbuffer specular",
            GBufferChannel::Ambient => "vxgi gbuffer ambient",
            GBufferChannel::Emission => "vxgi gbuffer emission",
        }
    }
}

/// Seven RGBA16F color targets plus a depth attachment, all at internal resolution.
pub struct GBuffer {
    pub channels: [ColorTarget; GBufferChannel::COUNT],
    pub depth: DepthTarget,
}

impl GBuffer {
    pub fn new(device: &wgpu::Device, size: UVec2) -> Self {
        Self {
            channels: GBufferChannel::ALL.map(|c| ColorTarget::new(device, c.label(), size, GBUFFER_FORMAT)),
            depth: DepthTarget::new(device, "vxgi gbuffer depth", size),
        }
    }

    #[inline]
    pub fn channel(&self, channel: GBufferChannel) -> &ColorTarget {
        &self.channels[channel as usize]
    }

    #[inline]
    pub fn size(&self) -> UVec2 {
        self.depth.size
    }
}

fn create_2d(
    device: &wgpu::Device,
    label: &str,
    size: UVec2,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.x.max(1),
            height: size.y.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_order_matches_attachment_index() {
        for (i, c) in GBufferChannel::ALL.iter().enumerate() {
            assert_eq!(*c as usize, i);
        }
    }

    #[test]
    fn gbuffer_fits_requested_attachment_budget() {
        // 7 × RGBA16F = 56 bytes per sample; the device is asked for 64.
        let bytes = GBufferChannel::ALL.len() as u32 * 8;
        assert!(bytes <= crate::device::GBUFFER_ATTACHMENT_BYTES_PER_SAMPLE);
        // WebGPU's default color attachment limit.
        assert!(GBufferChannel::ALL.len() <= 8);
    }
}
