//! Depth-only shadow maps for directional lights.

use bytemuck::{Pod, Zeroable};
use glam::UVec2;

use crate::assets::{AssetProvider, ModelId, Vertex};
use crate::scene::{SceneLights, MAX_DIRECTIONAL_LIGHTS};

use super::common::{
    depth_attachment, draw_models, pipeline_layout, shader_module, uniform_buffer, uniform_entry,
    DrawBindings, LightsUniform, DEPTH_FORMAT,
};
use super::plan::ShadowsReady;
use super::targets::DepthTarget;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct LightViewUniform {
    view_proj: [[f32; 4]; 4],
}

struct LightShadow {
    depth: DepthTarget,
    resolution: u32,
    ubo: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Owns one depth target per light plus the light data shared with the
/// shading passes.
pub struct ShadowStage {
    pipeline: wgpu::RenderPipeline,
    light_layout: wgpu::BindGroupLayout,
    shadows: Vec<LightShadow>,
    /// Bound in place of a shadow map when the scene has no lights.
    empty: DepthTarget,
    empty_cleared: bool,
    lights_ubo: wgpu::Buffer,
    comparison_sampler: wgpu::Sampler,
    /// Bumped whenever the sampled shadow view changes identity.
    generation: u64,
}

impl ShadowStage {
    pub fn new(device: &wgpu::Device, assets: &dyn AssetProvider) -> Self {
        let light_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vxgi shadow light bgl"),
            entries: &[uniform_entry::<LightViewUniform>(0, wgpu::ShaderStages::VERTEX)],
        });
        let layout = pipeline_layout(device, "vxgi shadow layout", &[&light_layout, &assets.layouts().model]);
        let module = shader_module(device, "vxgi shadow map", include_str!("shaders/shadow_map.wgsl"));

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("vxgi shadow pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
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
            multiview_mask: None,
            cache: None,
        });

        let comparison_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("vxgi shadow sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        Self {
            pipeline,
            light_layout,
            shadows: Vec::new(),
            empty: DepthTarget::new(device, "vxgi empty shadow", UVec2::ONE),
            empty_cleared: false,
            lights_ubo: uniform_buffer::<LightsUniform>(device, "vxgi lights ubo"),
            comparison_sampler,
            generation: 0,
        }
    }

    /// Uploads the light data and re-renders every dirty shadow map.
    pub fn render_dirty(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        lights: &mut SceneLights,
        models: &[ModelId],
        assets: &dyn AssetProvider,
    ) -> ShadowsReady {
        if !self.empty_cleared {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("vxgi empty shadow clear"),
                color_attachments: &[],
                depth_stencil_attachment: Some(depth_attachment(&self.empty.view)),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            self.empty_cleared = true;
        }

        self.sync_targets(device, lights);
        queue.write_buffer(&self.lights_ubo, 0, bytemuck::bytes_of(&LightsUniform::from_lights(lights)));

        for (i, (light, shadow)) in lights.directional.iter_mut().zip(&self.shadows).enumerate() {
            let pipeline = &self.pipeline;
            let rendered = light.shadow_map_mut().render_if_dirty(|map| {
                let uniform = LightViewUniform { view_proj: map.view_projection().to_cols_array_2d() };
                queue.write_buffer(&shadow.ubo, 0, bytemuck::bytes_of(&uniform));

                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("vxgi shadow pass"),
                    color_attachments: &[],
                    depth_stencil_attachment: Some(depth_attachment(&shadow.depth.view)),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &shadow.bind_group, &[]);
                draw_models(
                    &mut pass,
                    assets,
                    models,
                    DrawBindings { model: 1, material: None, mesh_storage: None, vertex_buffer: true },
                );
            });
            if rendered {
                log::debug!("shadow map {i} re-rendered ({}²)", shadow.resolution);
            }
        }

        ShadowsReady::new()
    }

    /// Matches the depth targets to the lights. New or resized targets mark
    /// their light dirty.
    fn sync_targets(&mut self, device: &wgpu::Device, lights: &mut SceneLights) {
        let count = lights.directional.len().min(MAX_DIRECTIONAL_LIGHTS);
        if self.shadows.len() > count {
            self.shadows.truncate(count);
            self.generation += 1;
        }

        for (i, light) in lights.directional.iter_mut().take(count).enumerate() {
            let wanted = light.shadow_map().config().resolution.max(1);
            if self.shadows.get(i).is_some_and(|s| s.resolution == wanted) {
                continue;
            }

            let shadow = self.create_shadow(device, wanted);
            if i < self.shadows.len() {
                self.shadows[i] = shadow;
            } else {
                self.shadows.push(shadow);
            }
            light.shadow_map_mut().mark_dirty();
            if i == 0 {
                self.generation += 1;
            }
        }

        let settled = lights.settle_unshaded();
        if settled > 0 {
            log::debug!("{settled} light(s) past the {MAX_DIRECTIONAL_LIGHTS}-light cap have no shadow map");
        }
    }

    fn create_shadow(&self, device: &wgpu::Device, resolution: u32) -> LightShadow {
        let depth = DepthTarget::new(device, "vxgi shadow map", UVec2::splat(resolution));
        let ubo = uniform_buffer::<LightViewUniform>(device, "vxgi shadow light ubo");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vxgi shadow light bind group"),
            layout: &self.light_layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: ubo.as_entire_binding() }],
        });
        LightShadow { depth, resolution, ubo, bind_group }
    }

    /// Depth of the shadow-casting light, or the cleared 1×1 fallback.
    pub fn shadow_view(&self) -> &wgpu::TextureView {
        self.shadows.first().map_or(&self.empty.view, |s| &s.depth.view)
    }

    #[inline]
    pub fn has_shadow_map(&self) -> bool {
        !self.shadows.is_empty()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bind group entries for `lighting_entries(first_binding)` layouts.
    pub(crate) fn lighting_bindings(&self, first_binding: u32) -> [wgpu::BindGroupEntry<'_>; 3] {
        [
            wgpu::BindGroupEntry { binding: first_binding, resource: self.lights_ubo.as_entire_binding() },
            wgpu::BindGroupEntry {
                binding: first_binding + 1,
                resource: wgpu::BindingResource::TextureView(self.shadow_view()),
            },
            wgpu::BindGroupEntry {
                binding: first_binding + 2,
                resource: wgpu::BindingResource::Sampler(&self.comparison_sampler),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_view_uniform_is_one_matrix() {
        assert_eq!(std::mem::size_of::<LightViewUniform>(), 64);
    }
}
