/// Bytes per sample the G-buffer pass needs across its color attachments,
/// rounded up to what desktop adapters report.
pub const GBUFFER_ATTACHMENT_BYTES_PER_SAMPLE: u32 = 64;

/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface. The renderer applies gamma itself, so the
    /// viewer asks for a linear format.
    pub prefer_srgb: bool,

    pub present_mode: wgpu::PresentMode,

    /// Falls back to the first supported mode when unsupported.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,

    /// Base limits. `max_color_attachment_bytes_per_sample` is raised towards
    /// [`GBUFFER_ATTACHMENT_BYTES_PER_SAMPLE`] as far as the adapter allows.
    pub required_limits: wgpu::Limits,

    /// A hint; support depends on platform and backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

/// Limits to request from an adapter that reports `supported`.
pub(crate) fn resolve_limits(base: &wgpu::Limits, supported: &wgpu::Limits) -> wgpu::Limits {
    let mut limits = base.clone();
    limits.max_color_attachment_bytes_per_sample = base
        .max_color_attachment_bytes_per_sample
        .max(GBUFFER_ATTACHMENT_BYTES_PER_SAMPLE.min(supported.max_color_attachment_bytes_per_sample));
    limits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_surface_is_linear() {
        assert!(!GpuInit::default().prefer_srgb);
    }

    #[test]
    fn attachment_budget_is_raised_when_supported() {
        let mut supported = wgpu::Limits::default();
        supported.max_color_attachment_bytes_per_sample = 128;
        let limits = resolve_limits(&wgpu::Limits::default(), &supported);
        assert_eq!(limits.max_color_attachment_bytes_per_sample, GBUFFER_ATTACHMENT_BYTES_PER_SAMPLE);
    }

    #[test]
    fn attachment_budget_never_exceeds_adapter() {
        let mut supported = wgpu::Limits::default();
        supported.max_color_attachment_bytes_per_sample = 48;
        let limits = resolve_limits(&wgpu::Limits::default(), &supported);
        assert_eq!(limits.max_color_attachment_bytes_per_sample, 48);
    }
}
