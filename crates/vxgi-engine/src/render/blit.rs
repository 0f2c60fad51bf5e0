use crate::coords::Rect;
use crate::render::{RenderCtx, RenderTarget};

use super::common::{fullscreen_pipeline, pipeline_layout, sampler_entry, shader_module, texture_entry};
use super::targets::ColorTarget;

/// Window clear color around the letterboxed image.
pub const WINDOW_CLEAR_COLOR: wgpu::Color = wgpu::Color { r: 0.75, g: 0.75, b: 0.75, a: 1.0 };

/// Copies the internal image into the back-buffer, scaled into a viewport rectangle.
///
/// The pipeline depends on the surface format and is rebuilt when it changes.
#[derive(Default)]
pub struct Blitter {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    sampler: Option<wgpu::Sampler>,
    /// Keyed by the source texture's identity so reallocations rebind.
    bind_group: Option<(wgpu::Texture, wgpu::BindGroup)>,
}

impl Blitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the back-buffer and draws `source` into `viewport`.
    pub fn blit(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, source: &ColorTarget, viewport: Rect) {
        self.ensure_pipeline(ctx);
        self.ensure_bindings(ctx, source);

        let mut pass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vxgi blit pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(WINDOW_CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        if viewport.is_empty() {
            return;
        }
        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some((_, bind_group)) = self.bind_group.as_ref() else { return };

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_viewport(viewport.origin.x, viewport.origin.y, viewport.size.x, viewport.size.y, 0.0, 1.0);
        pass.draw(0..3, 0..1);
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let fs = wgpu::ShaderStages::FRAGMENT;
        let bind_group_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vxgi blit bgl"),
            entries: &[
                texture_entry(
                    0,
                    fs,
                    wgpu::TextureSampleType::Float { filterable: true },
                    wgpu::TextureViewDimension::D2,
                ),
                sampler_entry(1, fs, wgpu::SamplerBindingType::Filtering),
            ],
        });
        let layout = pipeline_layout(ctx.device, "vxgi blit layout", &[&bind_group_layout]);
        let module = shader_module(ctx.device, "vxgi blit", include_str!("shaders/blit.wgsl"));

        let pipeline = fullscreen_pipeline(
            ctx.device,
            "vxgi blit pipeline",
            &layout,
            &module,
            ctx.surface_format,
        );
        log::debug!("blit pipeline built for {:?}", ctx.surface_format);

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
        self.bind_group = None;
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>, source: &ColorTarget) {
        if self.bind_group.as_ref().is_some_and(|(tex, _)| *tex == source.texture) {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };

        let sampler = self.sampler.get_or_insert_with(|| {
            ctx.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("vxgi blit sampler"),
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            })
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vxgi blit bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&source.view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(sampler) },
            ],
        });
        self.bind_group = Some((source.texture.clone(), bind_group));
    }
}
