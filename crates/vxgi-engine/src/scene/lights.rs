use glam::{Mat4, Vec3, Vec4};

/// Upper bound on directional lights uploaded to the shading passes.
pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;

/// Maps clip space xy `[-1, 1]` (y up) onto texture space `[0, 1]` (v down).
/// Depth is already in `[0, 1]` and passes through unchanged.
pub const SHADOW_BIAS: Mat4 = Mat4::from_cols(
    Vec4::new(0.5, 0.0, 0.0, 0.0),
    Vec4::new(0.0, -0.5, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 1.0, 0.0),
    Vec4::new(0.5, 0.5, 0.0, 1.0),
);

/// Orthographic light frustum.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShadowMapConfig {
    /// Side length of the square depth target in texels.
    pub resolution: u32,
    /// Half extent of the orthographic box.
    pub ortho: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ShadowMapConfig {
    fn default() -> Self {
        Self { resolution: 1024, ortho: 1.5, near: -1.0, far: 3.5 }
    }
}

/// Light-space matrices of one directional light plus the re-render flag.
///
/// The depth texture itself is owned by the render stage; this type only
/// tracks what it must contain.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowMap {
    config: ShadowMapConfig,
    view: Mat4,
    projection: Mat4,
    view_projection: Mat4,
    view_projection_biased: Mat4,
    dirty: bool,
}

impl ShadowMap {
    pub fn new(config: ShadowMapConfig, direction: Vec3) -> Self {
        let mut map = Self {
            config,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            view_projection_biased: Mat4::IDENTITY,
            dirty: true,
        };
        map.update(direction);
        map
    }

    /// Recomputes the light matrices for `direction` (pointing towards the light).
    fn update(&mut self, direction: Vec3) {
        let c = self.config;
        self.view = Mat4::look_at_rh(direction, Vec3::ZERO, up_for(direction));
        self.projection = Mat4::orthographic_rh(-c.ortho, c.ortho, -c.ortho, c.ortho, c.near, c.far);
        self.view_projection = self.projection * self.view;
        self.view_projection_biased = SHADOW_BIAS * self.view_projection;
    }

    /// Runs `render` when the depth target is stale and clears the flag.
    ///
    /// Returns whether a render happened.
    pub fn render_if_dirty<F: FnOnce(&ShadowMap)>(&mut self, render: F) -> bool {
        if !self.dirty {
            return false;
        }
        render(self);
        self.dirty = false;
        true
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn config(&self) -> ShadowMapConfig {
        self.config
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        self.view
    }

    #[inline]
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    #[inline]
    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    #[inline]
    pub fn view_projection_biased(&self) -> Mat4 {
        self.view_projection_biased
    }
}

fn up_for(direction: Vec3) -> Vec3 {
    // look_at degenerates when the light looks straight down the up axis.
    if direction.normalize_or_zero().cross(Vec3::Y).length_squared() < 1e-6 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}

/// Directional light. `direction` points from the scene towards the light.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub strength: f32,
    pub color: Vec3,
    pub attenuation: Vec3,
    direction: Vec3,
    shadow_map: ShadowMap,
}

impl DirectionalLight {
    pub fn new(direction: Vec3, shadow: ShadowMapConfig) -> Self {
        Self {
            strength: 1.0,
            color: Vec3::ONE,
            attenuation: Vec3::ONE,
            direction,
            shadow_map: ShadowMap::new(shadow, direction),
        }
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Changes the light direction; the shadow map must be re-rendered.
    pub fn set_direction(&mut self, direction: Vec3) {
        if direction == self.direction {
            return;
        }
        self.direction = direction;
        self.shadow_map.update(direction);
        self.shadow_map.mark_dirty();
    }

    /// Changes the light frustum; the shadow map must be re-rendered.
    pub fn set_shadow_config(&mut self, config: ShadowMapConfig) {
        if config == self.shadow_map.config {
            return;
        }
        self.shadow_map.config = config;
        self.shadow_map.update(self.direction);
        self.shadow_map.mark_dirty();
    }

    #[inline]
    pub fn shadow_map(&self) -> &ShadowMap {
        &self.shadow_map
    }

    #[inline]
    pub fn shadow_map_mut(&mut self) -> &mut ShadowMap {
        &mut self.shadow_map
    }
}

/// Ambient term plus the directional lights. Only the first light casts shadows
/// in the shading passes.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneLights {
    pub ambient: Vec3,
    pub directional: Vec<DirectionalLight>,
}

impl Default for SceneLights {
    fn default() -> Self {
        Self { ambient: Vec3::splat(0.2), directional: Vec::new() }
    }
}

impl SceneLights {
    /// The light whose shadow map is sampled by voxelization and cone tracing.
    pub fn shadow_caster(&self) -> Option<&DirectionalLight> {
        self.directional.first()
    }

    /// Clears the re-render flag of lights past [`MAX_DIRECTIONAL_LIGHTS`].
    /// They have no depth target, so nothing would ever render them.
    ///
    /// Returns how many flags were cleared.
    pub fn settle_unshaded(&mut self) -> usize {
        self.directional
            .iter_mut()
            .skip(MAX_DIRECTIONAL_LIGHTS)
            .map(|l| l.shadow_map_mut().render_if_dirty(|_| {}))
            .filter(|&settled| settled)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light() -> DirectionalLight {
        DirectionalLight::new(Vec3::new(0.3, 0.3, 1.0), ShadowMapConfig::default())
    }

    // ── dirty flag ────────────────────────────────────────────────────────

    #[test]
    fn new_light_starts_dirty() {
        assert!(light().shadow_map().is_dirty());
    }

    #[test]
    fn render_if_dirty_clears_flag_and_skips_second_call() {
        let mut l = light();
        let mut renders = 0;
        assert!(l.shadow_map_mut().render_if_dirty(|_| renders += 1));
        assert!(!l.shadow_map().is_dirty());
        assert!(!l.shadow_map_mut().render_if_dirty(|_| renders += 1));
        assert_eq!(renders, 1);
    }

    #[test]
    fn direction_change_marks_dirty() {
        let mut l = light();
        l.shadow_map_mut().render_if_dirty(|_| {});
        l.set_direction(Vec3::new(0.0, 1.0, 0.2));
        assert!(l.shadow_map().is_dirty());
    }

    #[test]
    fn unchanged_direction_keeps_clean() {
        let mut l = light();
        l.shadow_map_mut().render_if_dirty(|_| {});
        l.set_direction(l.direction());
        assert!(!l.shadow_map().is_dirty());
    }

    #[test]
    fn config_change_marks_dirty_and_updates_projection() {
        let mut l = light();
        l.shadow_map_mut().render_if_dirty(|_| {});
        let before = l.shadow_map().projection();
        l.set_shadow_config(ShadowMapConfig { ortho: 8.0, ..ShadowMapConfig::default() });
        assert!(l.shadow_map().is_dirty());
        assert_ne!(l.shadow_map().projection(), before);
    }

    #[test]
    fn render_closure_sees_current_matrices() {
        let mut l = light();
        let expected = l.shadow_map().view_projection();
        l.shadow_map_mut().render_if_dirty(|m| assert_eq!(m.view_projection(), expected));
    }

    // ── matrices ──────────────────────────────────────────────────────────

    #[test]
    fn biased_projection_maps_origin_to_texture_center() {
        let l = DirectionalLight::new(Vec3::new(0.0, 0.0, 1.0), ShadowMapConfig::default());
        let p = l.shadow_map().view_projection_biased() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let p = p / p.w;
        assert!((p.x - 0.5).abs() < 1e-5);
        assert!((p.y - 0.5).abs() < 1e-5);
        assert!(p.z >= 0.0 && p.z <= 1.0);
    }

    #[test]
    fn biased_projection_flips_v() {
        let l = DirectionalLight::new(Vec3::new(0.0, 0.0, 1.0), ShadowMapConfig::default());
        // A point above the origin (world +Y) lands in the upper half of the texture.
        let p = l.shadow_map().view_projection_biased() * Vec4::new(0.0, 1.0, 0.0, 1.0);
        assert!(p.y < 0.5);
    }

    #[test]
    fn vertical_light_has_finite_matrices() {
        let l = DirectionalLight::new(Vec3::Y, ShadowMapConfig::default());
        assert!(l.shadow_map().view_projection().is_finite());
    }

    #[test]
    fn first_light_casts_shadows() {
        let mut lights = SceneLights::default();
        assert!(lights.shadow_caster().is_none());
        lights.directional.push(light());
        lights.directional.push(DirectionalLight::new(Vec3::X, ShadowMapConfig::default()));
        assert_eq!(lights.shadow_caster().map(|l| l.direction()), Some(Vec3::new(0.3, 0.3, 1.0)));
    }

    // ── light cap ─────────────────────────────────────────────────────────

    #[test]
    fn lights_past_the_cap_do_not_stay_dirty() {
        let mut lights = SceneLights::default();
        lights.directional = (0..MAX_DIRECTIONAL_LIGHTS + 2).map(|_| light()).collect();

        assert_eq!(lights.settle_unshaded(), 2);
        assert!(lights.directional[..MAX_DIRECTIONAL_LIGHTS].iter().all(|l| l.shadow_map().is_dirty()));
        assert!(lights.directional[MAX_DIRECTIONAL_LIGHTS..].iter().all(|l| !l.shadow_map().is_dirty()));

        // A later change past the cap is settled again.
        lights.directional[MAX_DIRECTIONAL_LIGHTS + 1].set_direction(Vec3::X);
        assert_eq!(lights.settle_unshaded(), 1);
        assert_eq!(lights.settle_unshaded(), 0);
    }
}
