//! Step-wise edits of the scene's lights and cones, driven by key commands.
//!
//! Every function returns whether something changed so the viewer only logs
//! real edits. Light edits go through the light's setters, which mark its
//! shadow map for re-rendering.

use glam::{UVec2, Vec3};
use vxgi_engine::scene::{
    distance_to_voxels, voxels_to_distance, ConeSettings, SceneLights, ShadowMapConfig,
};

/// Degrees the sun turns per step.
pub const SUN_STEP_DEGREES: f32 = 5.0;
/// Elevation stays short of the poles so the light basis stays well defined.
const MAX_SUN_PITCH_DEGREES: f32 = 89.0;

/// Factor applied to the shadow frustum half extent per step.
pub const ORTHO_STEP: f32 = 1.1;
const MIN_ORTHO: f32 = 0.1;
/// Near/far plane step as a fraction of the frustum half extent.
pub const DEPTH_STEP: f32 = 0.1;

pub const AMBIENT_STEP: f32 = 0.05;
pub const APERTURE_STEP_DEGREES: f32 = 5.0;
pub const EMISSION_STEP: f32 = 0.25;
const MAX_EMISSION: f32 = 8.0;

/// Internal render target sizes the viewer cycles through.
pub const INTERNAL_RESOLUTIONS: [u32; 3] = [512, 1024, 2048];

/// Turns the shadow-casting sun by whole steps of yaw (around +Y) and pitch.
pub fn rotate_sun(lights: &mut SceneLights, yaw_steps: i32, pitch_steps: i32) -> bool {
    let Some(sun) = lights.directional.first_mut() else {
        return false;
    };
    let d = sun.direction().normalize_or_zero();
    if d == Vec3::ZERO {
        return false;
    }

    let yaw = d.x.atan2(d.z).to_degrees() + yaw_steps as f32 * SUN_STEP_DEGREES;
    let pitch = (d.y.clamp(-1.0, 1.0).asin().to_degrees() + pitch_steps as f32 * SUN_STEP_DEGREES)
        .clamp(-MAX_SUN_PITCH_DEGREES, MAX_SUN_PITCH_DEGREES);
    let (yaw, pitch) = (yaw.to_radians(), pitch.to_radians());
    let direction = Vec3::new(pitch.cos() * yaw.sin(), pitch.sin(), pitch.cos() * yaw.cos());

    let before = sun.direction();
    sun.set_direction(direction);
    sun.direction() != before
}

/// Scales the sun's orthographic half extent and moves its near/far planes.
/// Edits that would put the near plane at or past the far plane are refused.
pub fn step_shadow_frustum(lights: &mut SceneLights, ortho_steps: i32, near_steps: i32, far_steps: i32) -> bool {
    let Some(sun) = lights.directional.first_mut() else {
        return false;
    };
    let current = sun.shadow_map().config();
    let ortho = (current.ortho * ORTHO_STEP.powi(ortho_steps)).max(MIN_ORTHO);
    let depth_step = current.ortho * DEPTH_STEP;
    let next = ShadowMapConfig {
        ortho,
        near: current.near + near_steps as f32 * depth_step,
        far: current.far + far_steps as f32 * depth_step,
        ..current
    };
    if next.near >= next.far {
        log::warn!("shadow near plane {:.2} must stay below far plane {:.2}", next.near, next.far);
        return false;
    }

    sun.set_shadow_config(next);
    next != current
}

/// Moves every ambient component by whole steps, kept within `[0, 1]`.
pub fn step_ambient(lights: &mut SceneLights, steps: i32) -> bool {
    let next = (lights.ambient + Vec3::splat(steps as f32 * AMBIENT_STEP)).clamp(Vec3::ZERO, Vec3::ONE);
    let changed = next != lights.ambient;
    lights.ambient = next;
    changed
}

pub fn step_aperture(cone: &mut ConeSettings, steps: i32) -> bool {
    let before = cone.aperture;
    cone.set_aperture_degrees(cone.aperture_degrees() + steps as f32 * APERTURE_STEP_DEGREES);
    cone.aperture != before
}

/// Moves the cone start by whole voxels of the active `grid_size³` grid.
pub fn step_offset_voxels(cone: &mut ConeSettings, steps: i32, grid_size: u32) -> bool {
    let voxels = (distance_to_voxels(cone.distance_offset, grid_size).round() + steps as f32).max(0.0);
    let next = voxels_to_distance(voxels, grid_size);
    let changed = next != cone.distance_offset;
    cone.distance_offset = next;
    changed
}

/// Scales an emission color by whole steps; black stays black.
pub fn step_emission(emission: Vec3, steps: i32) -> Vec3 {
    let peak = emission.max_element();
    if peak <= 0.0 {
        return emission;
    }
    let target = (peak + steps as f32 * EMISSION_STEP).clamp(0.0, MAX_EMISSION);
    emission * (target / peak)
}

/// The next square internal size after `current`, wrapping to the smallest.
pub fn next_internal_resolution(current: UVec2) -> UVec2 {
    let side = INTERNAL_RESOLUTIONS
        .into_iter()
        .find(|&s| s > current.x)
        .unwrap_or(INTERNAL_RESOLUTIONS[0]);
    UVec2::splat(side)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vxgi_engine::scene::DirectionalLight;

    fn lights() -> SceneLights {
        let mut lights = SceneLights::default();
        lights.directional.push(DirectionalLight::new(Vec3::new(0.0, 0.0, 1.0), ShadowMapConfig::default()));
        lights
    }

    fn sun(lights: &SceneLights) -> &DirectionalLight {
        &lights.directional[0]
    }

    // ── sun ───────────────────────────────────────────────────────────────

    #[test]
    fn yaw_turns_around_the_up_axis() {
        let mut l = lights();
        assert!(rotate_sun(&mut l, 18, 0));
        let d = sun(&l).direction();
        assert!((d - Vec3::X).length() < 1e-4, "{d:?}");
    }

    #[test]
    fn pitch_stops_short_of_the_pole() {
        let mut l = lights();
        rotate_sun(&mut l, 0, 100);
        let d = sun(&l).direction();
        assert!(d.y < 1.0 && d.y > 0.99);
        assert!((d.length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn no_sun_means_no_change() {
        let mut l = SceneLights::default();
        assert!(!rotate_sun(&mut l, 1, 1));
        assert!(!step_shadow_frustum(&mut l, 1, 0, 0));
    }

    // ── shadow frustum ────────────────────────────────────────────────────

    #[test]
    fn ortho_steps_scale_the_extent() {
        let mut l = lights();
        assert!(step_shadow_frustum(&mut l, 1, 0, 0));
        assert!((sun(&l).shadow_map().config().ortho - 1.5 * ORTHO_STEP).abs() < 1e-5);
    }

    #[test]
    fn near_and_far_move_by_a_fraction_of_the_extent() {
        let mut l = lights();
        step_shadow_frustum(&mut l, 0, -2, 1);
        let c = sun(&l).shadow_map().config();
        assert!((c.near - (-1.0 - 0.3)).abs() < 1e-5);
        assert!((c.far - (3.5 + 0.15)).abs() < 1e-5);
    }

    #[test]
    fn crossing_planes_are_refused() {
        let mut l = lights();
        let before = sun(&l).shadow_map().config();
        assert!(!step_shadow_frustum(&mut l, 0, 40, 0));
        assert_eq!(sun(&l).shadow_map().config(), before);
    }

    // ── ambient and cones ─────────────────────────────────────────────────

    #[test]
    fn ambient_is_clamped_to_unit_range() {
        let mut l = lights();
        assert!(step_ambient(&mut l, 100));
        assert_eq!(l.ambient, Vec3::ONE);
        assert!(!step_ambient(&mut l, 1));
        step_ambient(&mut l, -100);
        assert_eq!(l.ambient, Vec3::ZERO);
    }

    #[test]
    fn aperture_steps_in_degrees() {
        let mut cone = ConeSettings::from_degrees(60.0, 1.0, 0.0, 2.0, 1.0, true);
        assert!(step_aperture(&mut cone, 1));
        assert!((cone.aperture_degrees() - 65.0).abs() < 1e-3);
    }

    #[test]
    fn offset_steps_in_active_grid_voxels() {
        let mut cone = ConeSettings::from_degrees(60.0, 1.0, 32.0, 2.0, 1.0, true);
        // 32 voxels of the 256³ reference grid are 16 voxels of a 128³ grid.
        assert!(step_offset_voxels(&mut cone, 1, 128));
        assert_eq!(cone.distance_offset, 17.0 / 128.0);
        step_offset_voxels(&mut cone, -100, 128);
        assert_eq!(cone.distance_offset, 0.0);
    }

    #[test]
    fn emission_keeps_its_hue() {
        let e = step_emission(Vec3::new(1.0, 0.5, 0.0), 2);
        assert!((e - Vec3::new(1.5, 0.75, 0.0)).length() < 1e-5);
        assert_eq!(step_emission(Vec3::ZERO, 3), Vec3::ZERO);
        assert_eq!(step_emission(Vec3::ONE, -10), Vec3::ZERO);
    }

    // ── internal resolution ───────────────────────────────────────────────

    #[test]
    fn internal_resolution_cycles_and_wraps() {
        assert_eq!(next_internal_resolution(UVec2::splat(512)), UVec2::splat(1024));
        assert_eq!(next_internal_resolution(UVec2::new(1280, 720)), UVec2::splat(2048));
        assert_eq!(next_internal_resolution(UVec2::splat(2048)), UVec2::splat(512));
    }
}
