use std::path::Path;

use anyhow::Result;
use wgpu::util::DeviceExt;

use crate::scene::BoundingBox;

use super::material::Material;
use super::mesh::{MeshData, ModelUniform, SubMesh, Transform, Vertex};
use super::texture::{self, Texture2d};
use super::{MaterialId, ModelId, TextureId};

/// Read access the renderer needs from whoever owns the geometry.
pub trait AssetProvider {
    fn model(&self, id: ModelId) -> Option<&GpuModel>;
    fn material(&self, id: MaterialId) -> Option<&GpuMaterial>;
    fn layouts(&self) -> &AssetLayouts;
}

/// Bind group layouts shared between the asset store and every pipeline that
/// draws models.
pub struct AssetLayouts {
    /// `Model` uniform (model + normal matrix).
    pub model: wgpu::BindGroupLayout,
    /// `Material` uniform, sampler and the five material maps.
    pub material: wgpu::BindGroupLayout,
    /// Read-only vertex storage for shaders that pull whole triangles.
    pub mesh_storage: wgpu::BindGroupLayout,
}

impl AssetLayouts {
    fn new(device: &wgpu::Device) -> Self {
        let model = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vxgi model bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniform>() as u64),
                },
                count: None,
            }],
        });

        let mut material_entries = vec![
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<super::material::MaterialUniform>() as u64,
                    ),
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ];
        material_entries.extend((0..MATERIAL_MAP_COUNT).map(|i| wgpu::BindGroupLayoutEntry {
            binding: 2 + i,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }));
        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vxgi material bgl"),
            entries: &material_entries,
        });

        let mesh_storage = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vxgi mesh storage bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        Self { model, material, mesh_storage }
    }
}

/// Ambient, diffuse, specular, emission, bump.
const MATERIAL_MAP_COUNT: u32 = 5;

pub struct GpuMaterial {
    pub material: Material,
    /// Textures actually bound for ambient, diffuse, specular, emission and
    /// bump, after fallback substitution.
    pub maps: [TextureId; MATERIAL_MAP_COUNT as usize],
    pub bind_group: wgpu::BindGroup,
    uniform: wgpu::Buffer,
}

/// Uploaded geometry plus its placement.
pub struct GpuModel {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub vertex_count: u32,
    pub submeshes: Vec<SubMesh>,
    /// Object-space bounds.
    pub bounds: BoundingBox,
    pub transform: Transform,
    pub bind_group: wgpu::BindGroup,
    pub storage_bind_group: wgpu::BindGroup,
    uniform: wgpu::Buffer,
}

/// Owns textures, materials and models on the GPU.
///
/// Texture index 0 is the white fallback; every material map that is missing
/// or failed to load resolves to it.
pub struct AssetStore {
    layouts: AssetLayouts,
    sampler: wgpu::Sampler,
    textures: Vec<Texture2d>,
    materials: Vec<GpuMaterial>,
    models: Vec<GpuModel>,
}

/// Id of the white texture substituted for missing maps.
pub const FALLBACK_TEXTURE: TextureId = TextureId(0);

impl AssetStore {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("vxgi material sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            layouts: AssetLayouts::new(device),
            sampler,
            textures: vec![Texture2d::white(device, queue)],
            materials: Vec::new(),
            models: Vec::new(),
        }
    }

    // ── textures ──────────────────────────────────────────────────────────

    /// Loads a texture from disk, falling back to the white texture on failure.
    pub fn load_texture(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, path: &Path) -> TextureId {
        match std::fs::read(path) {
            Ok(bytes) => self.texture_from_bytes(device, queue, &path.display().to_string(), &bytes),
            Err(e) => {
                log::warn!("texture {} unreadable ({e}); using fallback", path.display());
                FALLBACK_TEXTURE
            }
        }
    }

    /// Decodes an encoded image, falling back to the white texture on failure.
    pub fn texture_from_bytes(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        bytes: &[u8],
    ) -> TextureId {
        match texture::decode_rgba8(bytes) {
            Ok(img) => self.texture_from_image(device, queue, label, &img),
            Err(e) => {
                log::warn!("texture {label}: {e:#}; using fallback");
                FALLBACK_TEXTURE
            }
        }
    }

    pub fn texture_from_image(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        image: &image::RgbaImage,
    ) -> TextureId {
        if image.width() == 0 || image.height() == 0 {
            log::warn!("texture {label} is empty; using fallback");
            return FALLBACK_TEXTURE;
        }
        self.textures.push(Texture2d::from_image(device, queue, label, image));
        TextureId(self.textures.len() as u32 - 1)
    }

    /// The texture a map slot binds: `id` when it names a stored texture,
    /// otherwise the fallback.
    pub fn resolve_texture(&self, id: Option<TextureId>) -> TextureId {
        match id {
            Some(id) if (id.0 as usize) < self.textures.len() => id,
            Some(id) => {
                log::warn!("unknown texture {}; using fallback", id.0);
                FALLBACK_TEXTURE
            }
            None => FALLBACK_TEXTURE,
        }
    }

    #[inline]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    // ── materials ─────────────────────────────────────────────────────────

    pub fn add_material(&mut self, device: &wgpu::Device, material: Material) -> MaterialId {
        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("vxgi material ubo"),
            contents: bytemuck::bytes_of(&material.uniform()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let maps = [
            material.ambient_map,
            material.diffuse_map,
            material.specular_map,
            material.emission_map,
            material.bump_map,
        ]
        .map(|map| self.resolve_texture(map));
        let mut entries = vec![
            wgpu::BindGroupEntry { binding: 0, resource: uniform.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&self.sampler) },
        ];
        entries.extend(maps.iter().enumerate().map(|(i, TextureId(t))| wgpu::BindGroupEntry {
            binding: 2 + i as u32,
            resource: wgpu::BindingResource::TextureView(&self.textures[*t as usize].view),
        }));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vxgi material bind group"),
            layout: &self.layouts.material,
            entries: &entries,
        });

        log::debug!("material '{}' registered", material.name);
        self.materials.push(GpuMaterial { material, maps, bind_group, uniform });
        MaterialId(self.materials.len() as u32 - 1)
    }

    /// Re-uploads the scalar coefficients of a material. Map changes need a new material.
    pub fn update_material(&mut self, queue: &wgpu::Queue, id: MaterialId, f: impl FnOnce(&mut Material)) {
        let Some(m) = self.materials.get_mut(id.0 as usize) else {
            log::warn!("update_material: unknown material {}", id.0);
            return;
        };
        f(&mut m.material);
        queue.write_buffer(&m.uniform, 0, bytemuck::bytes_of(&m.material.uniform()));
    }

    // ── models ────────────────────────────────────────────────────────────

    pub fn add_model(&mut self, device: &wgpu::Device, name: &str, mesh: &MeshData) -> Result<ModelId> {
        anyhow::ensure!(!mesh.vertices.is_empty(), "model '{name}' has no vertices");
        anyhow::ensure!(
            mesh.vertices.len() % 3 == 0,
            "model '{name}' is not a triangle list ({} vertices)",
            mesh.vertices.len()
        );
        for sub in &mesh.submeshes {
            anyhow::ensure!(
                (sub.material.0 as usize) < self.materials.len(),
                "model '{name}' references unknown material {}",
                sub.material.0
            );
            anyhow::ensure!(
                sub.vertices().end as usize <= mesh.vertices.len(),
                "model '{name}' has a sub-mesh past the vertex buffer"
            );
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(name),
            contents: bytemuck::cast_slice::<Vertex, u8>(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::STORAGE,
        });

        let transform = Transform::default();
        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("vxgi model ubo"),
            contents: bytemuck::bytes_of(&ModelUniform::from(&transform)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vxgi model bind group"),
            layout: &self.layouts.model,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: uniform.as_entire_binding() }],
        });
        let storage_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vxgi mesh storage bind group"),
            layout: &self.layouts.mesh_storage,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: vertex_buffer.as_entire_binding() }],
        });

        log::info!(
            "model '{name}': {} triangles, {} sub-meshes",
            mesh.triangle_count(),
            mesh.submeshes.len()
        );

        self.models.push(GpuModel {
            name: name.to_string(),
            vertex_buffer,
            vertex_count: mesh.vertices.len() as u32,
            submeshes: mesh.submeshes.clone(),
            bounds: mesh.bounding_box(),
            transform,
            bind_group,
            storage_bind_group,
            uniform,
        });
        Ok(ModelId(self.models.len() as u32 - 1))
    }

    pub fn set_model_transform(&mut self, queue: &wgpu::Queue, id: ModelId, transform: Transform) {
        let Some(model) = self.models.get_mut(id.0 as usize) else {
            log::warn!("set_model_transform: unknown model {}", id.0);
            return;
        };
        model.transform = transform;
        queue.write_buffer(&model.uniform, 0, bytemuck::bytes_of(&ModelUniform::from(&transform)));
    }

    pub fn model_bounds(&self, id: ModelId) -> Option<BoundingBox> {
        self.models.get(id.0 as usize).map(|m| m.bounds)
    }
}

impl AssetProvider for AssetStore {
    fn model(&self, id: ModelId) -> Option<&GpuModel> {
        self.models.get(id.0 as usize)
    }

    fn material(&self, id: MaterialId) -> Option<&GpuMaterial> {
        self.materials.get(id.0 as usize)
    }

    fn layouts(&self) -> &AssetLayouts {
        &self.layouts
    }
}
