//! Debug views: the ray-marched voxel grid, the shadow map and the G-buffer tiles.

use bytemuck::{Pod, Zeroable};
use glam::{UVec2, Vec3};
use wgpu::util::DeviceExt;

use crate::coords::Rect;

use super::common::{
    color_attachment, depth_attachment, fullscreen_pipeline, pipeline_layout, shader_module, texture_entry,
    uniform_buffer, uniform_entry, unit_cube_positions, CameraBinding, DEPTH_FORMAT, GBUFFER_FORMAT,
    MAIN_TARGET_FORMAT,
};
use super::plan::ShadowsReady;
use super::shadow::ShadowStage;
use super::targets::{ColorTarget, DepthTarget, GBuffer, GBufferChannel};
use super::voxel_grid::{max_mip_level, VoxelGrid, VoxelGridOps};

// ── voxel grid ────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct VoxelViewUniform {
    camera_voxel_pos: [f32; 4],
    inv_voxel_scale: [f32; 4],
    mip_level: f32,
    resolution: f32,
    max_steps: u32,
    _pad: u32,
}

impl VoxelViewUniform {
    fn new(camera_position: Vec3, voxel_scale: Vec3, grid_resolution: u32, requested_level: u32) -> Self {
        let level = requested_level.min(max_mip_level(grid_resolution));
        Self {
            camera_voxel_pos: (camera_position * voxel_scale).extend(1.0).to_array(),
            inv_voxel_scale: voxel_scale.recip().extend(1.0).to_array(),
            mip_level: level as f32,
            resolution: grid_resolution as f32,
            // Half-voxel steps across the cube diagonal.
            max_steps: (grid_resolution >> level).max(1) * 4,
            _pad: 0,
        }
    }
}

/// Front/back cube-face positions plus the ray-march pass that reads them.
pub struct VoxelVisualizer {
    front_pipeline: wgpu::RenderPipeline,
    back_pipeline: wgpu::RenderPipeline,
    march_pipeline: wgpu::RenderPipeline,
    march_layout: wgpu::BindGroupLayout,
    cube: wgpu::Buffer,
    ubo: wgpu::Buffer,
    view_bind_group: wgpu::BindGroup,
    targets: CubeFaceTargets,
}

struct CubeFaceTargets {
    front: ColorTarget,
    back: ColorTarget,
    depth: DepthTarget,
    march_bind_group: wgpu::BindGroup,
}

impl VoxelVisualizer {
    pub fn new(device: &wgpu::Device, camera: &CameraBinding, grid_ops: &VoxelGridOps, size: UVec2) -> Self {
        let fs = wgpu::ShaderStages::FRAGMENT;
        let view_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vxgi voxel view bgl"),
            entries: &[uniform_entry::<VoxelViewUniform>(0, wgpu::ShaderStages::VERTEX | fs)],
        });
        let unfilterable = wgpu::TextureSampleType::Float { filterable: false };
        let march_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vxgi voxel march bgl"),
            entries: &[
                uniform_entry::<VoxelViewUniform>(0, fs),
                texture_entry(1, fs, unfilterable, wgpu::TextureViewDimension::D2),
                texture_entry(2, fs, unfilterable, wgpu::TextureViewDimension::D2),
            ],
        });

        let faces_layout = pipeline_layout(device, "vxgi cube faces layout", &[&camera.layout, &view_layout]);
        let faces_module = shader_module(device, "vxgi world pos", include_str!("shaders/world_pos.wgsl"));
        let front_pipeline = cube_face_pipeline(device, &faces_layout, &faces_module, wgpu::Face::Back);
        let back_pipeline = cube_face_pipeline(device, &faces_layout, &faces_module, wgpu::Face::Front);

        let march_module = shader_module(device, "vxgi voxel visualize", include_str!("shaders/voxel_visualize.wgsl"));
        let march_pipeline = fullscreen_pipeline(
            device,
            "vxgi voxel visualize pipeline",
            &pipeline_layout(device, "vxgi voxel visualize layout", &[&march_layout, &grid_ops.sample_layout]),
            &march_module,
            MAIN_TARGET_FORMAT,
        );

        let cube = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("vxgi voxel cube"),
            contents: bytemuck::cast_slice(&unit_cube_positions()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let ubo = uniform_buffer::<VoxelViewUniform>(device, "vxgi voxel view ubo");
        let view_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vxgi voxel view bind group"),
            layout: &view_layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: ubo.as_entire_binding() }],
        });
        let targets = CubeFaceTargets::new(device, &march_layout, &ubo, size);

        Self {
            front_pipeline,
            back_pipeline,
            march_pipeline,
            march_layout,
            cube,
            ubo,
            view_bind_group,
            targets,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: UVec2) {
        if self.targets.front.size != size {
            self.targets = CubeFaceTargets::new(device, &self.march_layout, &self.ubo, size);
        }
    }

    /// Uploads the view constants for this frame.
    pub fn prepare(
        &self,
        queue: &wgpu::Queue,
        camera_position: Vec3,
        voxel_scale: Vec3,
        grid: &VoxelGrid,
        mip_level: u32,
    ) {
        let uniform = VoxelViewUniform::new(camera_position, voxel_scale, grid.resolution, mip_level);
        queue.write_buffer(&self.ubo, 0, bytemuck::bytes_of(&uniform));
    }

    /// Renders the cube's back faces, then its front faces, as voxel-space positions.
    pub fn render_cube_faces(&self, encoder: &mut wgpu::CommandEncoder, camera: &CameraBinding) {
        let clear = wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT);
        for (target, pipeline, label) in [
            (&self.targets.back, &self.back_pipeline, "vxgi cube back faces"),
            (&self.targets.front, &self.front_pipeline, "vxgi cube front faces"),
        ] {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[color_attachment(&target.view, clear)],
                depth_stencil_attachment: Some(depth_attachment(&self.targets.depth.view)),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &camera.bind_group, &[]);
            pass.set_bind_group(1, &self.view_bind_group, &[]);
            pass.set_vertex_buffer(0, self.cube.slice(..));
            pass.draw(0..36, 0..1);
        }
    }

    /// Ray-marches `grid` into `target` between the cube faces.
    pub fn render_grid(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView, grid: &VoxelGrid) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vxgi voxel visualize pass"),
            color_attachments: &[color_attachment(target, wgpu::LoadOp::Load)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&self.march_pipeline);
        pass.set_bind_group(0, &self.targets.march_bind_group, &[]);
        pass.set_bind_group(1, &grid.sample_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

impl CubeFaceTargets {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, ubo: &wgpu::Buffer, size: UVec2) -> Self {
        let front = ColorTarget::new(device, "vxgi cube front", size, GBUFFER_FORMAT);
        let back = ColorTarget::new(device, "vxgi cube back", size, GBUFFER_FORMAT);
        let depth = DepthTarget::new(device, "vxgi cube depth", size);
        let march_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vxgi voxel march bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: ubo.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&front.view) },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::TextureView(&back.view) },
            ],
        });
        Self { front, back, depth, march_bind_group }
    }
}

fn cube_face_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    cull: wgpu::Face,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("vxgi cube faces pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x3],
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: GBUFFER_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(cull),
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
    })
}

// ── shadow map ────────────────────────────────────────────────────────────

pub struct ShadowVisualizer {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    bind_group: Option<(u64, wgpu::BindGroup)>,
}

impl ShadowVisualizer {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vxgi shadow visualize bgl"),
            entries: &[texture_entry(
                0,
                wgpu::ShaderStages::FRAGMENT,
                wgpu::TextureSampleType::Depth,
                wgpu::TextureViewDimension::D2,
            )],
        });
        let module = shader_module(device, "vxgi shadow visualize", include_str!("shaders/shadow_visualize.wgsl"));
        let pipeline = fullscreen_pipeline(
            device,
            "vxgi shadow visualize pipeline",
            &pipeline_layout(device, "vxgi shadow visualize layout", &[&layout]),
            &module,
            MAIN_TARGET_FORMAT,
        );
        Self { pipeline, layout, bind_group: None }
    }

    /// Draws the first light's depth over the whole of `target`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        shadows: (&ShadowStage, &ShadowsReady),
    ) {
        let (stage, _) = shadows;
        if !stage.has_shadow_map() {
            return;
        }

        let generation = stage.generation();
        if self.bind_group.as_ref().is_none_or(|(g, _)| *g != generation) {
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("vxgi shadow visualize bind group"),
                layout: &self.layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(stage.shadow_view()),
                }],
            });
            self.bind_group = Some((generation, bind_group));
        }
        let Some((_, bind_group)) = &self.bind_group else { return };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vxgi shadow visualize pass"),
            color_attachments: &[color_attachment(target, wgpu::LoadOp::Load)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

// ── G-buffer tiles ────────────────────────────────────────────────────────

/// Viewports of one tile per channel along the bottom edge of a `size` image.
pub fn gbuffer_tile_rects(size: UVec2) -> [Rect; GBufferChannel::COUNT] {
    let count = GBufferChannel::ALL.len() as f32;
    let w = (size.x as f32 / count).floor();
    let h = (size.y as f32 / count).floor();
    let y = size.y as f32 - h;
    std::array::from_fn(|i| Rect::new(i as f32 * w, y, w, h))
}

/// `(scale, bias)` that maps a channel into displayable `[0, 1]`.
pub fn channel_remap(channel: GBufferChannel) -> (f32, f32) {
    match channel {
        GBufferChannel::Position | GBufferChannel::Normal | GBufferChannel::Bump => (0.5, 0.5),
        GBufferChannel::Albedo | GBufferChannel::Specular | GBufferChannel::Ambient | GBufferChannel::Emission => {
            (1.0, 0.0)
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct RemapUniform {
    scale: f32,
    bias: f32,
    _pad: [f32; 2],
}

pub struct GBufferTiles {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    remaps: [wgpu::Buffer; GBufferChannel::COUNT],
    bind_groups: Option<(UVec2, Vec<wgpu::BindGroup>)>,
}

impl GBufferTiles {
    pub fn new(device: &wgpu::Device) -> Self {
        let fs = wgpu::ShaderStages::FRAGMENT;
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vxgi gbuffer tile bgl"),
            entries: &[
                texture_entry(
                    0,
                    fs,
                    wgpu::TextureSampleType::Float { filterable: false },
                    wgpu::TextureViewDimension::D2,
                ),
                uniform_entry::<RemapUniform>(1, fs),
            ],
        });
        let module = shader_module(device, "vxgi gbuffer visualize", include_str!("shaders/gbuffer_visualize.wgsl"));
        let pipeline = fullscreen_pipeline(
            device,
            "vxgi gbuffer tiles pipeline",
            &pipeline_layout(device, "vxgi gbuffer tiles layout", &[&layout]),
            &module,
            MAIN_TARGET_FORMAT,
        );

        let remaps = GBufferChannel::ALL.map(|c| {
            let (scale, bias) = channel_remap(c);
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("vxgi gbuffer tile remap"),
                contents: bytemuck::bytes_of(&RemapUniform { scale, bias, _pad: [0.0; 2] }),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        });

        Self { pipeline, layout, remaps, bind_groups: None }
    }

    pub fn render(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        target: &ColorTarget,
        gbuffer: &GBuffer,
    ) {
        let size = gbuffer.size();
        if self.bind_groups.as_ref().is_none_or(|(s, _)| *s != size) {
            let groups = GBufferChannel::ALL
                .iter()
                .zip(&self.remaps)
                .map(|(c, remap)| {
                    device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some(c.label()),
                        layout: &self.layout,
                        entries: &[
                            wgpu::BindGroupEntry {
                                binding: 0,
                                resource: wgpu::BindingResource::TextureView(&gbuffer.channel(*c).view),
                            },
                            wgpu::BindGroupEntry { binding: 1, resource: remap.as_entire_binding() },
                        ],
                    })
                })
                .collect();
            self.bind_groups = Some((size, groups));
        }
        let Some((_, groups)) = &self.bind_groups else { return };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vxgi gbuffer tiles pass"),
            color_attachments: &[color_attachment(&target.view, wgpu::LoadOp::Load)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&self.pipeline);
        for (rect, group) in gbuffer_tile_rects(target.size).iter().zip(groups) {
            if rect.is_empty() {
                continue;
            }
            pass.set_viewport(rect.origin.x, rect.origin.y, rect.size.x, rect.size.y, 0.0, 1.0);
            pass.set_bind_group(0, group, &[]);
            pass.draw(0..3, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── tiles ─────────────────────────────────────────────────────────────

    #[test]
    fn tiles_sit_along_the_bottom_edge() {
        let rects = gbuffer_tile_rects(UVec2::new(1400, 700));
        assert_eq!(rects.len(), GBufferChannel::ALL.len());
        for (i, r) in rects.iter().enumerate() {
            assert_eq!(*r, Rect::new(i as f32 * 200.0, 600.0, 200.0, 100.0));
            assert!(r.fits_within(glam::Vec2::new(1400.0, 700.0)));
        }
    }

    #[test]
    fn tiles_fit_odd_sizes() {
        let bounds = glam::Vec2::new(1023.0, 767.0);
        for r in gbuffer_tile_rects(UVec2::new(1023, 767)) {
            assert!(r.fits_within(bounds), "{r:?}");
        }
    }

    #[test]
    fn signed_channels_are_remapped() {
        assert_eq!(channel_remap(GBufferChannel::Normal), (0.5, 0.5));
        assert_eq!(channel_remap(GBufferChannel::Albedo), (1.0, 0.0));
        assert_eq!(channel_remap(GBufferChannel::Emission), (1.0, 0.0));
    }

    // ── voxel view ────────────────────────────────────────────────────────

    #[test]
    fn voxel_view_clamps_mip_level() {
        let u = VoxelViewUniform::new(Vec3::ZERO, Vec3::ONE, 64, 20);
        assert_eq!(u.mip_level, 6.0);
        assert_eq!(u.max_steps, 4);
    }

    #[test]
    fn voxel_view_moves_camera_into_grid_space() {
        let u = VoxelViewUniform::new(Vec3::new(2.0, 4.0, -2.0), Vec3::splat(0.25), 256, 0);
        assert_eq!(u.camera_voxel_pos, [0.5, 1.0, -0.5, 1.0]);
        assert_eq!(u.inv_voxel_scale, [4.0, 4.0, 4.0, 1.0]);
        assert_eq!(u.max_steps, 1024);
    }
}
