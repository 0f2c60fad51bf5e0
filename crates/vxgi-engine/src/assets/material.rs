use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::TextureId;

/// Surface description in the Wavefront MTL vocabulary.
///
/// Fields carry one canonical name per quantity; the short MTL keys
/// (`ka`, `kd`, ...) are available as accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,

    pub ambient_reflectance: Vec3,
    pub diffuse_reflectance: Vec3,
    pub specular_reflectance: Vec3,
    pub emission: Vec3,
    pub transmission_filter: Vec3,

    pub specular_exponent: f32,
    pub optical_density: f32,
    pub dissolve: f32,
    pub illumination_model: u32,

    pub ambient_map: Option<TextureId>,
    pub diffuse_map: Option<TextureId>,
    pub specular_map: Option<TextureId>,
    pub emission_map: Option<TextureId>,
    pub bump_map: Option<TextureId>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            ambient_reflectance: Vec3::ONE,
            diffuse_reflectance: Vec3::splat(0.8),
            specular_reflectance: Vec3::ZERO,
            emission: Vec3::ZERO,
            transmission_filter: Vec3::ONE,
            specular_exponent: 1.0,
            optical_density: 1.0,
            dissolve: 1.0,
            illumination_model: 2,
            ambient_map: None,
            diffuse_map: None,
            specular_map: None,
            emission_map: None,
            bump_map: None,
        }
    }
}

impl Material {
    /// Matte material with the given albedo.
    pub fn diffuse(name: impl Into<String>, albedo: Vec3) -> Self {
        Self {
            name: name.into(),
            ambient_reflectance: albedo,
            diffuse_reflectance: albedo,
            ..Self::default()
        }
    }

    #[inline]
    pub fn ka(&self) -> Vec3 {
        self.ambient_reflectance
    }

    #[inline]
    pub fn kd(&self) -> Vec3 {
        self.diffuse_reflectance
    }

    #[inline]
    pub fn ks(&self) -> Vec3 {
        self.specular_reflectance
    }

    #[inline]
    pub fn ke(&self) -> Vec3 {
        self.emission
    }

    #[inline]
    pub fn tf(&self) -> Vec3 {
        self.transmission_filter
    }

    #[inline]
    pub fn ns(&self) -> f32 {
        self.specular_exponent
    }

    #[inline]
    pub fn ni(&self) -> f32 {
        self.optical_density
    }

    #[inline]
    pub fn d(&self) -> f32 {
        self.dissolve
    }

    pub(crate) fn uniform(&self) -> MaterialUniform {
        let v = |c: Vec3, w: f32| [c.x, c.y, c.z, w];
        MaterialUniform {
            ambient: v(self.ambient_reflectance, self.dissolve),
            diffuse: v(self.diffuse_reflectance, self.optical_density),
            specular: v(self.specular_reflectance, self.specular_exponent),
            emission: v(self.emission, 0.0),
            transmission: v(self.transmission_filter, 0.0),
            flags: [u32::from(self.bump_map.is_some()), self.illumination_model, 0, 0],
        }
    }
}

/// Layout must match `Material` in the WGSL shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct MaterialUniform {
    /// rgb: Ka, a: dissolve
    pub ambient: [f32; 4],
    /// rgb: Kd, a: optical density
    pub diffuse: [f32; 4],
    /// rgb: Ks, a: specular exponent
    pub specular: [f32; 4],
    pub emission: [f32; 4],
    pub transmission: [f32; 4],
    /// x: has bump map, y: illumination model
    pub flags: [u32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_read_canonical_fields() {
        let m = Material {
            ambient_reflectance: Vec3::X,
            diffuse_reflectance: Vec3::Y,
            specular_reflectance: Vec3::Z,
            emission: Vec3::splat(2.0),
            transmission_filter: Vec3::splat(0.5),
            specular_exponent: 64.0,
            optical_density: 1.5,
            dissolve: 0.25,
            ..Material::default()
        };
        assert_eq!(m.ka(), Vec3::X);
        assert_eq!(m.kd(), Vec3::Y);
        assert_eq!(m.ks(), Vec3::Z);
        assert_eq!(m.ke(), Vec3::splat(2.0));
        assert_eq!(m.tf(), Vec3::splat(0.5));
        assert_eq!(m.ns(), 64.0);
        assert_eq!(m.ni(), 1.5);
        assert_eq!(m.d(), 0.25);
    }

    #[test]
    fn uniform_packs_scalars_into_w() {
        let m = Material { dissolve: 0.5, specular_exponent: 32.0, ..Material::diffuse("red", Vec3::X) };
        let u = m.uniform();
        assert_eq!(u.diffuse, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(u.ambient[3], 0.5);
        assert_eq!(u.specular[3], 32.0);
        assert_eq!(u.flags[0], 0);
    }

    #[test]
    fn bump_flag_follows_map() {
        let m = Material { bump_map: Some(TextureId(3)), ..Material::default() };
        assert_eq!(m.uniform().flags[0], 1);
    }
}
