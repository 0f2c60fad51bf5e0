//! Full-screen voxel cone tracing over the G-buffer.

use bytemuck::{Pod, Zeroable};
use glam::{UVec2, Vec3};

use crate::scene::{ConeSettings, ConeTracingSettings, Scene};

use super::common::{
    color_attachment, fullscreen_pipeline, lighting_entries, pipeline_layout, shader_module, texture_entry, uniform_buffer,
    uniform_entry, MAIN_TARGET_FORMAT,
};
use super::plan::{GBufferReady, ShadowsReady, VoxelGridReady};
use super::shadow::ShadowStage;
use super::targets::{GBuffer, GBufferChannel};
use super::voxel_grid::{max_mip_level, VoxelGrid, VoxelGridOps};

/// Tangent-space directions (z along the normal) and weights of the diffuse
/// cone set: one cone along the normal, five at 60° around it.
const DIFFUSE_CONE_SET: [[f32; 4]; 6] = [
    [0.0, 0.0, 1.0, 0.25],
    [0.0, 0.866_025, 0.5, 0.15],
    [0.823_639, 0.267_617, 0.5, 0.15],
    [0.509_037, -0.700_629, 0.5, 0.15],
    [-0.509_037, -0.700_629, 0.5, 0.15],
    [-0.823_639, 0.267_617, 0.5, 0.15],
];

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Pod, Zeroable)]
struct GpuCone {
    aperture: f32,
    sampling_factor: f32,
    distance_offset: f32,
    max_distance: f32,
    result_intensity: f32,
    is_enabled: u32,
    _pad: [u32; 2],
}

impl From<&ConeSettings> for GpuCone {
    fn from(c: &ConeSettings) -> Self {
        Self {
            aperture: c.aperture,
            sampling_factor: c.sampling_factor,
            distance_offset: c.distance_offset,
            max_distance: c.max_distance,
            result_intensity: c.result_intensity,
            is_enabled: u32::from(c.is_enabled),
            _pad: [0; 2],
        }
    }
}

/// Layout must match `Settings` in `cone_tracing.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ConeTracingUniform {
    camera_position: [f32; 4],
    voxel_scale: [f32; 4],
    cones: [GpuCone; 4],
    voxel_size: f32,
    max_mipmap_level: f32,
    gamma: f32,
    hard_shadow_bias: f32,
    direct_light_intensity: f32,
    trace_ao_separately: u32,
    enable_direct_light: u32,
    enable_hard_shadows: u32,
    diffuse_set: [[f32; 4]; 6],
}

impl ConeTracingUniform {
    fn new(settings: &ConeTracingSettings, camera_position: Vec3, voxel_scale: Vec3, resolution: u32) -> Self {
        Self {
            camera_position: camera_position.extend(1.0).to_array(),
            voxel_scale: voxel_scale.extend(1.0).to_array(),
            cones: settings.cones().map(GpuCone::from),
            voxel_size: 1.0 / resolution.max(1) as f32,
            max_mipmap_level: max_mip_level(resolution) as f32,
            gamma: settings.gamma,
            hard_shadow_bias: settings.hard_shadow_bias,
            direct_light_intensity: settings.direct_light_intensity,
            trace_ao_separately: u32::from(settings.trace_ao_separately),
            enable_direct_light: u32::from(settings.enable_direct_light),
            enable_hard_shadows: u32::from(settings.enable_hard_shadows),
            diffuse_set: DIFFUSE_CONE_SET,
        }
    }
}

pub struct ConeTracingStage {
    pipeline: wgpu::RenderPipeline,
    frame_layout: wgpu::BindGroupLayout,
    gbuffer_layout: wgpu::BindGroupLayout,
    ubo: wgpu::Buffer,
    /// Rebuilt when the shadow stage swaps its sampled view.
    frame_bind_group: Option<(u64, wgpu::BindGroup)>,
    /// Rebuilt when the G-buffer is reallocated.
    gbuffer_bind_group: Option<(UVec2, wgpu::BindGroup)>,
}

impl ConeTracingStage {
    pub fn new(device: &wgpu::Device, grid_ops: &VoxelGridOps) -> Self {
        let fs = wgpu::ShaderStages::FRAGMENT;
        let [lights, shadow, sampler] = lighting_entries(1);
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vxgi cone tracing bgl"),
            entries: &[uniform_entry::<ConeTracingUniform>(0, fs), lights, shadow, sampler],
        });

        let gbuffer_entries = GBufferChannel::ALL.map(|c| {
            texture_entry(
                c as u32,
                fs,
                wgpu::TextureSampleType::Float { filterable: false },
                wgpu::TextureViewDimension::D2,
            )
        });
        let gbuffer_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vxgi gbuffer read bgl"),
            entries: &gbuffer_entries,
        });

        let layout = pipeline_layout(
            device,
            "vxgi cone tracing layout",
            &[&frame_layout, &grid_ops.sample_layout, &gbuffer_layout],
        );
        let module = shader_module(device, "vxgi cone tracing", include_str!("shaders/cone_tracing.wgsl"));
        let pipeline = fullscreen_pipeline(device, "vxgi cone tracing pipeline", &layout, &module, MAIN_TARGET_FORMAT);

        Self {
            pipeline,
            frame_layout,
            gbuffer_layout,
            ubo: uniform_buffer::<ConeTracingUniform>(device, "vxgi cone tracing ubo"),
            frame_bind_group: None,
            gbuffer_bind_group: None,
        }
    }

    /// Shades every G-buffer texel into `target`. Texels without geometry keep
    /// whatever `target` already holds.
    #[allow(clippy::too_many_arguments)]
    pub fn trace(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        scene: &Scene,
        camera_position: Vec3,
        shadows: (&ShadowStage, &ShadowsReady),
        grid: (&VoxelGrid, &VoxelGridReady),
        gbuffer: (&GBuffer, &GBufferReady),
    ) {
        let (shadow_stage, _) = shadows;
        let (grid, _) = grid;
        let (gbuffer, _) = gbuffer;

        let uniform =
            ConeTracingUniform::new(&scene.cone_settings, camera_position, scene.voxel_scale(), grid.resolution);
        queue.write_buffer(&self.ubo, 0, bytemuck::bytes_of(&uniform));

        let generation = shadow_stage.generation();
        if self.frame_bind_group.as_ref().is_none_or(|(g, _)| *g != generation) {
            let [lights, shadow, sampler] = shadow_stage.lighting_bindings(1);
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("vxgi cone tracing bind group"),
                layout: &self.frame_layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: self.ubo.as_entire_binding() },
                    lights,
                    shadow,
                    sampler,
                ],
            });
            self.frame_bind_group = Some((generation, bind_group));
        }

        let size = gbuffer.size();
        if self.gbuffer_bind_group.as_ref().is_none_or(|(s, _)| *s != size) {
            let entries = GBufferChannel::ALL.map(|c| wgpu::BindGroupEntry {
                binding: c as u32,
                resource: wgpu::BindingResource::TextureView(&gbuffer.channel(c).view),
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("vxgi gbuffer read bind group"),
                layout: &self.gbuffer_layout,
                entries: &entries,
            });
            self.gbuffer_bind_group = Some((size, bind_group));
        }

        let (Some((_, frame)), Some((_, gbuffer_group))) = (&self.frame_bind_group, &self.gbuffer_bind_group) else {
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vxgi cone tracing pass"),
            color_attachments: &[color_attachment(target, wgpu::LoadOp::Load)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, frame, &[]);
        pass.set_bind_group(1, &grid.sample_bind_group, &[]);
        pass.set_bind_group(2, gbuffer_group, &[]);
        pass.draw(0..3, 0..1);
    }

    /// Forces the G-buffer bind group to be rebuilt on the next trace.
    pub fn invalidate_gbuffer(&mut self) {
        self.gbuffer_bind_group = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    // ── uniform ───────────────────────────────────────────────────────────

    #[test]
    fn uniform_carries_grid_constants() {
        let settings = ConeTracingSettings { trace_ao_separately: true, ..Default::default() };
        let u = ConeTracingUniform::new(&settings, Vec3::new(1.0, 2.0, 3.0), Vec3::splat(0.5), 512);
        assert!(approx(u.voxel_size, 1.0 / 512.0));
        assert!(approx(u.max_mipmap_level, 9.0));
        assert_eq!(u.trace_ao_separately, 1);
        assert_eq!(u.cones[0].aperture, settings.diffuse.aperture);
        assert_eq!(u.cones[3].max_distance, settings.ambient_occlusion.max_distance);
        assert_eq!(u.camera_position, [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn uniform_uploads_the_diffuse_cone_set() {
        let u = ConeTracingUniform::new(&ConeTracingSettings::default(), Vec3::ZERO, Vec3::ONE, 64);
        assert_eq!(u.diffuse_set, DIFFUSE_CONE_SET);
    }

    #[test]
    fn uniform_layout_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<GpuCone>(), 32);
        assert_eq!(std::mem::size_of::<ConeTracingUniform>() % 16, 0);
    }

    // ── diffuse cone set ──────────────────────────────────────────────────

    #[test]
    fn diffuse_weights_sum_to_one() {
        let total: f32 = DIFFUSE_CONE_SET.iter().map(|c| c[3]).sum();
        assert!(approx(total, 1.0));
    }

    #[test]
    fn diffuse_cones_are_unit_and_in_the_upper_hemisphere() {
        for c in DIFFUSE_CONE_SET {
            let d = Vec3::new(c[0], c[1], c[2]);
            assert!((d.length() - 1.0).abs() < 1e-4, "{d:?}");
            assert!(d.z > 0.0);
        }
        assert_eq!(DIFFUSE_CONE_SET[0][..3], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn side_cones_are_spread_evenly() {
        let sides: Vec<Vec3> = DIFFUSE_CONE_SET[1..].iter().map(|c| Vec3::new(c[0], c[1], 0.0).normalize()).collect();
        for (i, a) in sides.iter().enumerate() {
            let b = sides[(i + 1) % sides.len()];
            assert!((a.angle_between(b).to_degrees() - 72.0).abs() < 0.1);
        }
    }
}
