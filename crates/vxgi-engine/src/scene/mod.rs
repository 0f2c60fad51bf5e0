//! Scene model: what gets rendered and how it is lit.
//!
//! Responsibilities:
//! - reference models owned by the asset store and place them in world space
//! - derive the world → voxel-space mapping from the scene bounds
//! - hold the directional lights, their shadow-map state and the cone tunables
//!
//! Everything here is CPU state; GPU resources live in `render`.

mod bounds;
mod camera;
mod cone;
mod lights;
mod model;

pub use bounds::{voxel_scale_for, BoundingBox, VOXEL_SCALE_MARGIN};
pub use camera::{Camera, FlyCamera, FlyInput, Projection};
pub use cone::{
    aperture_from_degrees, aperture_to_degrees, distance_to_voxels, voxels_to_distance, ConeSettings,
    ConeTracingSettings, REFERENCE_GRID_SIZE,
};
pub use lights::{
    DirectionalLight, SceneLights, ShadowMap, ShadowMapConfig, MAX_DIRECTIONAL_LIGHTS, SHADOW_BIAS,
};
pub use model::{Scene, SceneConfig, SunConfig};
