//! Cone tracing tunables.
//!
//! Apertures are stored as the tangent of the cone half-angle. Distance offsets
//! are in grid-normalized units (one voxel of a `n³` grid is `1/n`), maximum
//! distances in normalized device units of the voxel cube (`[-1, 1]`, so `2.0`
//! spans the whole grid).

/// Grid size the scene presets express their distance offsets against.
pub const REFERENCE_GRID_SIZE: u32 = 256;

/// Converts a full cone angle in degrees to an aperture (half-angle tangent).
#[inline]
pub fn aperture_from_degrees(degrees: f32) -> f32 {
    (degrees.to_radians() * 0.5).tan()
}

/// Inverse of [`aperture_from_degrees`].
#[inline]
pub fn aperture_to_degrees(aperture: f32) -> f32 {
    2.0 * aperture.atan().to_degrees()
}

/// Converts a distance measured in voxels of a `grid_size³` grid to grid-normalized units.
#[inline]
pub fn voxels_to_distance(voxels: f32, grid_size: u32) -> f32 {
    voxels / grid_size.max(1) as f32
}

/// Inverse of [`voxels_to_distance`].
#[inline]
pub fn distance_to_voxels(distance: f32, grid_size: u32) -> f32 {
    distance * grid_size.max(1) as f32
}

/// Parameters of one cone category.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConeSettings {
    pub aperture: f32,
    pub sampling_factor: f32,
    pub distance_offset: f32,
    pub max_distance: f32,
    pub result_intensity: f32,
    pub is_enabled: bool,
}

impl ConeSettings {
    pub const fn new(
        aperture: f32,
        sampling_factor: f32,
        distance_offset: f32,
        max_distance: f32,
        result_intensity: f32,
        is_enabled: bool,
    ) -> Self {
        Self { aperture, sampling_factor, distance_offset, max_distance, result_intensity, is_enabled }
    }

    /// Builds settings from designer units: a full angle in degrees and an offset in voxels
    /// of the reference grid.
    pub fn from_degrees(
        degrees: f32,
        sampling_factor: f32,
        offset_voxels: f32,
        max_distance: f32,
        result_intensity: f32,
        is_enabled: bool,
    ) -> Self {
        Self {
            aperture: aperture_from_degrees(degrees),
            sampling_factor,
            distance_offset: voxels_to_distance(offset_voxels, REFERENCE_GRID_SIZE),
            max_distance,
            result_intensity,
            is_enabled,
        }
    }

    pub fn aperture_degrees(&self) -> f32 {
        aperture_to_degrees(self.aperture)
    }

    pub fn set_aperture_degrees(&mut self, degrees: f32) {
        self.aperture = aperture_from_degrees(degrees.clamp(1.0, 179.0));
    }
}

/// The four cone categories plus the global shading switches.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConeTracingSettings {
    pub diffuse: ConeSettings,
    pub specular: ConeSettings,
    pub soft_shadows: ConeSettings,
    pub ambient_occlusion: ConeSettings,

    /// Trace a dedicated AO cone instead of reusing the diffuse cone's opacity.
    pub trace_ao_separately: bool,
    pub direct_light_intensity: f32,
    pub enable_direct_light: bool,
    pub enable_hard_shadows: bool,
    pub hard_shadow_bias: f32,
    pub gamma: f32,
}

impl Default for ConeTracingSettings {
    fn default() -> Self {
        Self {
            diffuse: ConeSettings::new(0.577, 0.119, 0.081, 2.0, 1.0, true),
            specular: ConeSettings::new(0.027, 0.146, 0.190, 2.0, 1.0, true),
            soft_shadows: ConeSettings::new(0.017, 0.2, 0.12, 2.0, 1.0, true),
            ambient_occlusion: ConeSettings::new(0.577, 1.0, 0.5, 1.0, 1.0, true),
            trace_ao_separately: false,
            direct_light_intensity: 1.0,
            enable_direct_light: true,
            enable_hard_shadows: false,
            hard_shadow_bias: 0.005,
            gamma: 2.2,
        }
    }
}

impl ConeTracingSettings {
    /// All four categories in upload order.
    pub fn cones(&self) -> [&ConeSettings; 4] {
        [&self.diffuse, &self.specular, &self.soft_shadows, &self.ambient_occlusion]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── aperture ──────────────────────────────────────────────────────────

    #[test]
    fn ninety_degrees_is_unit_aperture() {
        assert!((aperture_from_degrees(90.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn aperture_round_trips_over_open_range() {
        let mut degrees = 0.5_f32;
        while degrees < 179.0 {
            let back = aperture_to_degrees(aperture_from_degrees(degrees));
            assert!((back - degrees).abs() < 1e-3, "{degrees} -> {back}");
            degrees += 0.5;
        }
    }

    #[test]
    fn default_cones_round_trip_through_degrees() {
        let settings = ConeTracingSettings::default();
        for cone in settings.cones() {
            let degrees = cone.aperture_degrees();
            assert!(degrees > 0.0 && degrees < 179.0);
            assert!((aperture_from_degrees(degrees) - cone.aperture).abs() < 1e-4);
        }
    }

    #[test]
    fn set_aperture_degrees_clamps_to_slider_range() {
        let mut cone = ConeSettings::new(0.5, 1.0, 0.0, 1.0, 1.0, true);
        cone.set_aperture_degrees(400.0);
        assert!((cone.aperture_degrees() - 179.0).abs() < 1e-3);
        cone.set_aperture_degrees(0.0);
        assert!((cone.aperture_degrees() - 1.0).abs() < 1e-3);
    }

    // ── distances ─────────────────────────────────────────────────────────

    #[test]
    fn voxel_offsets_are_relative_to_grid_size() {
        assert_eq!(voxels_to_distance(32.0, 256), 0.125);
        assert_eq!(distance_to_voxels(0.125, 256), 32.0);
        assert_eq!(voxels_to_distance(1.0, 0), 1.0);
    }

    #[test]
    fn from_degrees_converts_designer_units() {
        let cone = ConeSettings::from_degrees(60.0, 0.272, 32.0, 2.0, 1.0, true);
        assert!((cone.aperture - 0.57735).abs() < 1e-4);
        assert_eq!(cone.distance_offset, 0.125);
    }
}
