use glam::UVec2;

use crate::assets::{AssetProvider, ModelId, Vertex};

use super::common::{
    color_attachment, depth_attachment, draw_models, pipeline_layout, shader_module, CameraBinding, DrawBindings,
    DEPTH_FORMAT, GBUFFER_FORMAT,
};
use super::plan::GBufferReady;
use super::targets::{GBuffer, GBufferChannel};

/// Deferred geometry pass writing world position, normals and the material
/// response (albedo, specular, ambient, emission) at internal resolution.
pub struct GBufferStage {
    pipeline: wgpu::RenderPipeline,
    targets: GBuffer,
}

impl GBufferStage {
    pub fn new(device: &wgpu::Device, camera: &CameraBinding, assets: &dyn AssetProvider, size: UVec2) -> Self {
        let layouts = assets.layouts();
        let layout = pipeline_layout(
            device,
            "vxgi gbuffer layout",
            &[&camera.layout, &layouts.model, &layouts.material],
        );
        let module = shader_module(device, "vxgi gbuffer", include_str!("shaders/gbuffer.wgsl"));

        let target = Some(wgpu::ColorTargetState {
            format: GBUFFER_FORMAT,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        });
        let targets = GBufferChannel::ALL.map(|_| target.clone());

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("vxgi gbuffer pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &targets,
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
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

        Self { pipeline, targets: GBuffer::new(device, size) }
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: UVec2) {
        if self.targets.size() != size {
            self.targets = GBuffer::new(device, size);
        }
    }

    #[inline]
    pub fn targets(&self) -> &GBuffer {
        &self.targets
    }

    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        camera: &CameraBinding,
        models: &[ModelId],
        assets: &dyn AssetProvider,
    ) -> GBufferReady {
        let clear = wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT);
        let attachments = GBufferChannel::ALL.map(|c| color_attachment(&self.targets.channel(c).view, clear));

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vxgi gbuffer pass"),
            color_attachments: &attachments,
            depth_stencil_attachment: Some(depth_attachment(&self.targets.depth.view)),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &camera.bind_group, &[]);
        let draws = draw_models(
            &mut pass,
            assets,
            models,
            DrawBindings { model: 1, material: Some(2), mesh_storage: None, vertex_buffer: true },
        );
        log::trace!("gbuffer: {draws} draws");

        GBufferReady::new()
    }
}
