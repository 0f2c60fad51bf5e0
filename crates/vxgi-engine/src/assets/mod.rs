//! Asset store: GPU-resident models, materials and textures.
//!
//! Loading meshes from files is left to callers; they hand over CPU triangle
//! lists (`MeshData`) and decoded or encoded images.

mod material;
mod mesh;
mod store;
mod texture;

pub use material::Material;
pub use mesh::{MeshData, SubMesh, Transform, Vertex};
pub use store::{AssetLayouts, AssetProvider, AssetStore, GpuMaterial, GpuModel, FALLBACK_TEXTURE};
pub use texture::{decode_rgba8, Texture2d, MATERIAL_TEXTURE_FORMAT};
pub use image::{Rgba, RgbaImage};

pub(crate) use mesh::ModelUniform;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MaterialId(pub(crate) u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ModelId(pub(crate) u32);
