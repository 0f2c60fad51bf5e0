//! Scene voxelization into the active radiance grid.

use bytemuck::{Pod, Zeroable};

use crate::assets::AssetProvider;
use crate::scene::Scene;

use super::common::{
    draw_models, lighting_entries, pipeline_layout, shader_module, storage_3d_entry, uniform_buffer,
    uniform_entry, DrawBindings,
};
use super::plan::{ShadowsReady, VoxelGridReady};
use super::shadow::ShadowStage;
use super::voxel_grid::{VoxelGrid, VoxelGridOps, VoxelGridSelection, VOXEL_RASTER_FORMAT};

/// Tunables that change what ends up in the grid.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VoxelizationSettings {
    /// Adds ambient × albedo to every written voxel.
    pub use_ambient_light: bool,
    /// Mip level shown by the voxel visualizer.
    pub visualize_mipmap_level: u32,
}

impl Default for VoxelizationSettings {
    fn default() -> Self {
        Self { use_ambient_light: true, visualize_mipmap_level: 0 }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct VoxelizeUniform {
    voxel_scale: [f32; 4],
    resolution: u32,
    use_ambient_light: u32,
    _pad: [u32; 2],
}

pub struct VoxelizationStage {
    pipeline: wgpu::RenderPipeline,
    frame_layout: wgpu::BindGroupLayout,
    ubo: wgpu::Buffer,
}

impl VoxelizationStage {
    pub fn new(device: &wgpu::Device, assets: &dyn AssetProvider) -> Self {
        let fs = wgpu::ShaderStages::FRAGMENT;
        let [lights, shadow, sampler] = lighting_entries(2);
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vxgi voxelize bgl"),
            entries: &[
                uniform_entry::<VoxelizeUniform>(0, wgpu::ShaderStages::VERTEX | fs),
                storage_3d_entry(1, fs),
                lights,
                shadow,
                sampler,
            ],
        });

        let layouts = assets.layouts();
        let layout = pipeline_layout(
            device,
            "vxgi voxelize layout",
            &[&frame_layout, &layouts.model, &layouts.material, &layouts.mesh_storage],
        );
        let module = shader_module(device, "vxgi voxelize", include_str!("shaders/voxelize.wgsl"));

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("vxgi voxelize pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                // Only sets the raster size; results go through the storage texture.
                targets: &[Some(wgpu::ColorTargetState {
                    format: VOXEL_RASTER_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::empty(),
                })],
            }),
            // Back faces must land in the grid too.
            primitive: wgpu::PrimitiveState { cull_mode: None, ..Default::default() },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Self { pipeline, frame_layout, ubo: uniform_buffer::<VoxelizeUniform>(device, "vxgi voxelize ubo") }
    }

    /// Clears `grid`, rasterizes every model into level 0 and rebuilds the mips.
    #[allow(clippy::too_many_arguments)]
    pub fn voxelize(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        grid: &VoxelGrid,
        ops: &VoxelGridOps,
        selection: &mut VoxelGridSelection,
        scene: &Scene,
        assets: &dyn AssetProvider,
        shadows: (&ShadowStage, &ShadowsReady),
        settings: &VoxelizationSettings,
    ) -> VoxelGridReady {
        let (shadow_stage, _) = shadows;
        let uniform = VoxelizeUniform {
            voxel_scale: scene.voxel_scale().extend(1.0).to_array(),
            resolution: grid.resolution,
            use_ambient_light: u32::from(settings.use_ambient_light),
            _pad: [0; 2],
        };
        queue.write_buffer(&self.ubo, 0, bytemuck::bytes_of(&uniform));

        let [lights, shadow, sampler] = shadow_stage.lighting_bindings(2);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vxgi voxelize bind group"),
            layout: &self.frame_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: self.ubo.as_entire_binding() },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&grid.base_storage_view),
                },
                lights,
                shadow,
                sampler,
            ],
        });

        grid.clear(ops, encoder);

        let draws = {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("vxgi voxelize pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &grid.raster_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Discard,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            draw_models(
                &mut pass,
                assets,
                scene.models(),
                DrawBindings { model: 1, material: Some(2), mesh_storage: Some(3), vertex_buffer: false },
            )
        };

        grid.generate_mipmaps(ops, encoder);
        log::debug!("voxelized '{}' into {}³ ({draws} draws)", scene.name, grid.resolution);
        selection.complete()
    }
}
