//! Shared GPU types and helpers used by every render stage.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::assets::{AssetProvider, ModelId};
use crate::scene::{Camera, SceneLights, MAX_DIRECTIONAL_LIGHTS};

// ── formats ───────────────────────────────────────────────────────────────

/// Internal color image that is blitted to the window.
pub const MAIN_TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// G-buffer channels and the voxel visualizer's world-position targets.
pub const GBUFFER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const VOXEL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

pub const MAIN_CLEAR_COLOR: wgpu::Color = wgpu::Color { r: 0.75, g: 0.25, b: 0.25, a: 1.0 };

// ── uniforms ──────────────────────────────────────────────────────────────

/// Layout must match `Camera` in the WGSL shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 4],
}

impl From<&Camera> for CameraUniform {
    fn from(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            position: camera.position.extend(1.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Pod, Zeroable)]
pub(crate) struct GpuDirectionalLight {
    /// xyz: unit vector towards the light, w: strength
    pub direction: [f32; 4],
    pub color: [f32; 4],
    pub attenuation: [f32; 4],
}

/// Layout must match `Lights` in the WGSL shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct LightsUniform {
    /// Biased light VP of the shadow-casting light (texture space).
    pub shadow_view_proj: [[f32; 4]; 4],
    pub ambient: [f32; 4],
    /// x: light count, y: 1 when the shadow map holds a light's depth
    pub counts: [u32; 4],
    pub lights: [GpuDirectionalLight; MAX_DIRECTIONAL_LIGHTS],
}

impl LightsUniform {
    pub fn from_lights(lights: &SceneLights) -> Self {
        let mut out = Self {
            shadow_view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            ambient: lights.ambient.extend(1.0).to_array(),
            counts: [0; 4],
            lights: [GpuDirectionalLight::default(); MAX_DIRECTIONAL_LIGHTS],
        };

        if lights.directional.len() > MAX_DIRECTIONAL_LIGHTS {
            log::debug!(
                "{} directional lights; only the first {MAX_DIRECTIONAL_LIGHTS} are shaded",
                lights.directional.len()
            );
        }

        let mut count = 0;
        for (slot, light) in out.lights.iter_mut().zip(&lights.directional) {
            let dir = light.direction().normalize_or_zero();
            *slot = GpuDirectionalLight {
                direction: dir.extend(light.strength).to_array(),
                color: light.color.extend(1.0).to_array(),
                attenuation: light.attenuation.extend(1.0).to_array(),
            };
            count += 1;
        }
        out.counts[0] = count;

        if let Some(caster) = lights.shadow_caster() {
            out.shadow_view_proj = caster.shadow_map().view_projection_biased().to_cols_array_2d();
            out.counts[1] = 1;
        }
        out
    }
}

/// Viewer camera uniform with its bind group, shared by every pass that draws
/// with the renderer's camera.
pub(crate) struct CameraBinding {
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
    buffer: wgpu::Buffer,
}

impl CameraBinding {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vxgi camera bgl"),
            entries: &[uniform_entry::<CameraUniform>(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });
        let buffer = uniform_buffer::<CameraUniform>(device, "vxgi camera ubo");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vxgi camera bind group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: buffer.as_entire_binding() }],
        });
        Self { layout, bind_group, buffer }
    }

    pub fn write(&self, queue: &wgpu::Queue, camera: &Camera) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&CameraUniform::from(camera)));
    }
}

// ── bind group layout entries ─────────────────────────────────────────────

pub(crate) fn uniform_entry<T>(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
        },
        count: None,
    }
}

pub(crate) fn texture_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    sample_type: wgpu::TextureSampleType,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture { sample_type, view_dimension, multisampled: false },
        count: None,
    }
}

pub(crate) fn sampler_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    ty: wgpu::SamplerBindingType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry { binding, visibility, ty: wgpu::BindingType::Sampler(ty), count: None }
}

pub(crate) fn storage_3d_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format: VOXEL_FORMAT,
            view_dimension: wgpu::TextureViewDimension::D3,
        },
        count: None,
    }
}

/// Shadow depth + comparison sampler + lights, shared by voxelization and cone tracing.
pub(crate) fn lighting_entries(first_binding: u32) -> [wgpu::BindGroupLayoutEntry; 3] {
    let fs = wgpu::ShaderStages::FRAGMENT;
    [
        uniform_entry::<LightsUniform>(first_binding, fs),
        texture_entry(
            first_binding + 1,
            fs,
            wgpu::TextureSampleType::Depth,
            wgpu::TextureViewDimension::D2,
        ),
        sampler_entry(first_binding + 2, fs, wgpu::SamplerBindingType::Comparison),
    ]
}

// ── pipelines ─────────────────────────────────────────────────────────────

pub(crate) fn shader_module(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    log::debug!("compiling shader '{label}'");
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

pub(crate) fn pipeline_layout(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        immediate_size: 0,
    })
}

/// Full-screen pass: `vs_fullscreen` emits one oversized triangle, `fs_main` shades it.
pub(crate) fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_fullscreen"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

pub(crate) fn compute_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    entry_point: &str,
) -> wgpu::ComputePipeline {
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        module,
        entry_point: Some(entry_point),
        compilation_options: Default::default(),
        cache: None,
    })
}

// ── passes ────────────────────────────────────────────────────────────────

pub(crate) fn color_attachment(
    view: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
        depth_slice: None,
    })
}

pub(crate) fn depth_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
        stencil_ops: None,
    }
}

pub(crate) fn uniform_buffer<T: Pod>(device: &wgpu::Device, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<T>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Where a model pipeline expects the per-model resources.
#[derive(Debug, Copy, Clone)]
pub(crate) struct DrawBindings {
    pub model: u32,
    pub material: Option<u32>,
    pub mesh_storage: Option<u32>,
    pub vertex_buffer: bool,
}

/// Draws every sub-mesh of `models`. Returns the number of draw calls.
pub(crate) fn draw_models(
    pass: &mut wgpu::RenderPass<'_>,
    assets: &dyn AssetProvider,
    models: &[ModelId],
    bindings: DrawBindings,
) -> u32 {
    let mut draws = 0;
    for id in models {
        let Some(model) = assets.model(*id) else {
            log::trace!("skipping unknown model {id:?}");
            continue;
        };
        pass.set_bind_group(bindings.model, &model.bind_group, &[]);
        if let Some(group) = bindings.mesh_storage {
            pass.set_bind_group(group, &model.storage_bind_group, &[]);
        }
        if bindings.vertex_buffer {
            pass.set_vertex_buffer(0, model.vertex_buffer.slice(..));
        }

        for sub in &model.submeshes {
            if let Some(group) = bindings.material {
                let Some(material) = assets.material(sub.material) else { continue };
                pass.set_bind_group(group, &material.bind_group, &[]);
            }
            pass.draw(sub.vertices(), 0..1);
            draws += 1;
        }
    }
    draws
}

/// Unit cube `[-1, 1]³` as a triangle list, counter-clockwise seen from outside.
pub(crate) fn unit_cube_positions() -> [[f32; 3]; 36] {
    const FACES: [[Vec3; 4]; 6] = [
        [Vec3::new(-1.0, -1.0, 1.0), Vec3::new(1.0, -1.0, 1.0), Vec3::new(1.0, 1.0, 1.0), Vec3::new(-1.0, 1.0, 1.0)],
        [Vec3::new(1.0, -1.0, -1.0), Vec3::new(-1.0, -1.0, -1.0), Vec3::new(-1.0, 1.0, -1.0), Vec3::new(1.0, 1.0, -1.0)],
        [Vec3::new(1.0, -1.0, 1.0), Vec3::new(1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, -1.0), Vec3::new(1.0, 1.0, 1.0)],
        [Vec3::new(-1.0, -1.0, -1.0), Vec3::new(-1.0, -1.0, 1.0), Vec3::new(-1.0, 1.0, 1.0), Vec3::new(-1.0, 1.0, -1.0)],
        [Vec3::new(-1.0, 1.0, 1.0), Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 1.0, -1.0), Vec3::new(-1.0, 1.0, -1.0)],
        [Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, -1.0, -1.0), Vec3::new(1.0, -1.0, 1.0), Vec3::new(-1.0, -1.0, 1.0)],
    ];

    let mut out = [[0.0; 3]; 36];
    for (f, [a, b, c, d]) in FACES.iter().enumerate() {
        for (i, p) in [a, b, c, a, c, d].into_iter().enumerate() {
            out[f * 6 + i] = p.to_array();
        }
    }
    out
}
