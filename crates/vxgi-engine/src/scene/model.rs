use glam::{Quat, Vec3};

use crate::assets::{AssetStore, ModelId, Transform};

use super::bounds::{voxel_scale_for, BoundingBox, VOXEL_SCALE_MARGIN};
use super::cone::{ConeSettings, ConeTracingSettings};
use super::lights::{DirectionalLight, SceneLights, ShadowMapConfig};

/// Sun light of a scene preset.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SunConfig {
    pub direction: Vec3,
    pub shadow: ShadowMapConfig,
}

/// Per-scene defaults for lighting and cone tracing.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    pub name: String,
    pub scale: f32,
    pub ambient: Vec3,
    pub sun: Option<SunConfig>,
    pub cone_settings: ConeTracingSettings,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            scale: 1.0,
            ambient: Vec3::splat(0.2),
            sun: Some(SunConfig {
                direction: Vec3::new(0.3, 0.3, 1.0),
                shadow: ShadowMapConfig::default(),
            }),
            cone_settings: ConeTracingSettings::default(),
        }
    }
}

impl SceneConfig {
    pub const PRESETS: [&'static str; 2] = ["cornell", "courtyard"];

    /// Looks up a preset by name; unknown names fall back to `cornell`.
    pub fn preset(name: &str) -> Self {
        match name {
            "cornell" => Self::cornell(),
            "courtyard" => Self::courtyard(),
            other => {
                log::warn!("unknown scene '{other}', falling back to cornell");
                Self::cornell()
            }
        }
    }

    /// Closed box with colored walls; tuned for strong diffuse bounce.
    pub fn cornell() -> Self {
        let cone_settings = ConeTracingSettings {
            diffuse: ConeSettings::from_degrees(60.0, 0.272, 32.0, 2.0, 1.0, true),
            specular: ConeSettings::from_degrees(5.0, 1.0, 2.0, 2.0, 1.0, true),
            soft_shadows: ConeSettings::from_degrees(1.676, 1.865, 3.17, 2.0, 1.0, true),
            ambient_occlusion: ConeSettings::from_degrees(60.0, 1.0, 10.0, 0.6, 1.0, true),
            ..ConeTracingSettings::default()
        };
        Self {
            name: "cornell".to_string(),
            sun: Some(SunConfig {
                direction: Vec3::new(0.3, 0.3, 1.0),
                shadow: ShadowMapConfig { resolution: 2048, ortho: 1.5, near: -1.0, far: 3.5 },
            }),
            cone_settings,
            ..Self::default()
        }
    }

    /// Large open courtyard modelled in centimetres.
    pub fn courtyard() -> Self {
        let cone_settings = ConeTracingSettings {
            diffuse: ConeSettings::from_degrees(60.0, 0.1, 3.9, 2.0, 1.0, true),
            specular: ConeSettings::from_degrees(0.7, 1.0, 1.0, 2.0, 1.0, true),
            soft_shadows: ConeSettings::from_degrees(1.293, 0.359, 10.7, 2.0, 1.0, false),
            ambient_occlusion: ConeSettings::from_degrees(60.0, 0.594, 10.0, 0.5, 1.0, true),
            ..ConeTracingSettings::default()
        };
        Self {
            name: "courtyard".to_string(),
            scale: 0.01,
            sun: Some(SunConfig {
                direction: Vec3::new(0.061, 0.242, 0.0),
                shadow: ShadowMapConfig { resolution: 4096, ortho: 8.0, near: -20.0, far: 25.0 },
            }),
            cone_settings,
            ..Self::default()
        }
    }
}

/// Renderable scene: model references plus lighting and voxelization mapping.
///
/// Every model is scaled by `scale` and shifted so the scene bounding box is
/// centered on the origin; world positions times `voxel_scale` then land in
/// the voxelization cube.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub name: String,
    pub scale: f32,
    pub cone_settings: ConeTracingSettings,
    pub lights: SceneLights,
    bounding_box: BoundingBox,
    voxel_scale: Vec3,
    models: Vec<ModelId>,
}

impl Scene {
    /// Builds a scene from models and their object-space bounds.
    pub fn new(config: &SceneConfig, models: &[(ModelId, BoundingBox)]) -> Self {
        let bounding_box = models
            .iter()
            .fold(BoundingBox::EMPTY, |acc, (_, b)| acc.union(*b))
            .scaled(config.scale);
        let bounding_box = if bounding_box.is_empty() {
            log::warn!("scene '{}' has no geometry", config.name);
            BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0))
        } else {
            bounding_box
        };

        let (voxel_scale, clamped) = voxel_scale_for(&bounding_box, VOXEL_SCALE_MARGIN);
        if clamped {
            log::warn!("scene '{}' is flat along at least one axis; voxel scale clamped", config.name);
        }

        let mut lights = SceneLights { ambient: config.ambient, directional: Vec::new() };
        if let Some(sun) = config.sun {
            lights.directional.push(DirectionalLight::new(sun.direction.normalize_or_zero(), sun.shadow));
        }

        log::info!(
            "scene '{}': {} models, bounds {:?}..{:?}, voxel scale {:?}",
            config.name,
            models.len(),
            bounding_box.min,
            bounding_box.max,
            voxel_scale
        );

        Self {
            name: config.name.clone(),
            scale: config.scale,
            cone_settings: config.cone_settings,
            lights,
            bounding_box,
            voxel_scale,
            models: models.iter().map(|(id, _)| *id).collect(),
        }
    }

    /// Builds the scene from models already in `assets` and places them.
    pub fn from_store(config: &SceneConfig, models: &[ModelId], assets: &mut AssetStore, queue: &wgpu::Queue) -> Self {
        let bounded: Vec<(ModelId, BoundingBox)> = models
            .iter()
            .filter_map(|id| match assets.model_bounds(*id) {
                Some(b) => Some((*id, b)),
                None => {
                    log::warn!("scene '{}' references unknown model {id:?}", config.name);
                    None
                }
            })
            .collect();

        let scene = Self::new(config, &bounded);
        scene.apply_transforms(assets, queue);
        scene
    }

    /// Transform shared by all models: scene scale, then recentering.
    pub fn model_transform(&self) -> Transform {
        Transform {
            position: -self.bounding_box.center(),
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(self.scale),
        }
    }

    pub fn apply_transforms(&self, assets: &mut AssetStore, queue: &wgpu::Queue) {
        let transform = self.model_transform();
        for id in &self.models {
            assets.set_model_transform(queue, *id, transform);
        }
    }

    /// Scaled bounds before recentering.
    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    /// Bounds of the placed models in world space.
    pub fn world_bounds(&self) -> BoundingBox {
        let c = self.bounding_box.center();
        BoundingBox::new(self.bounding_box.min - c, self.bounding_box.max - c)
    }

    #[inline]
    pub fn voxel_scale(&self) -> Vec3 {
        self.voxel_scale
    }

    #[inline]
    pub fn models(&self) -> &[ModelId] {
        &self.models
    }
}
