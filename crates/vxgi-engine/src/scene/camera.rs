use glam::{Mat4, Vec2, Vec3};

/// Projection model of a [`Camera`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Projection {
    Perspective { fov_y_degrees: f32, aspect: f32, near: f32, far: f32 },
    Orthographic { left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32 },
}

/// Position/orientation plus cached matrices. Call `update` after mutating.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub projection: Projection,

    view: Mat4,
    proj: Mat4,
    view_proj: Mat4,
}

impl Camera {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::with_projection(Projection::Perspective { fov_y_degrees, aspect, near, far })
    }

    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self::with_projection(Projection::Orthographic { left, right, bottom, top, near, far })
    }

    fn with_projection(projection: Projection) -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            projection,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            view_proj: Mat4::IDENTITY,
        };
        camera.update();
        camera
    }

    /// Recomputes view and projection from the current fields.
    pub fn update(&mut self) {
        let forward = self.forward.try_normalize().unwrap_or(Vec3::NEG_Z);
        self.view = Mat4::look_to_rh(self.position, forward, self.up);
        self.proj = match self.projection {
            Projection::Perspective { fov_y_degrees, aspect, near, far } => {
                Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect.max(1e-4), near, far)
            }
            Projection::Orthographic { left, right, bottom, top, near, far } => {
                Mat4::orthographic_rh(left, right, bottom, top, near, far)
            }
        };
        self.view_proj = self.proj * self.view;
    }

    pub fn set_aspect(&mut self, new_aspect: f32) {
        if let Projection::Perspective { aspect, .. } = &mut self.projection {
            *aspect = new_aspect;
        }
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        self.view
    }

    #[inline]
    pub fn projection_matrix(&self) -> Mat4 {
        self.proj
    }

    #[inline]
    pub fn view_projection(&self) -> Mat4 {
        self.view_proj
    }
}

/// Per-frame movement request, produced by the input layer.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FlyInput {
    /// x: right, y: up, z: forward. Components in `[-1, 1]`.
    pub movement: Vec3,
    /// Pointer delta in pixels; applied only when `look` is set.
    pub look_delta: Vec2,
    pub look: bool,
}

/// First-person fly controller with smoothed position and orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct FlyCamera {
    pub move_speed: f32,
    pub lerp_speed: f32,
    pub mouse_sensitivity: f32,

    yaw: f32,
    pitch: f32,
    target_position: Vec3,
    target_yaw: f32,
    target_pitch: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            lerp_speed: 10.0,
            mouse_sensitivity: 0.0025,
            yaw: -std::f32::consts::FRAC_PI_2,
            pitch: 0.0,
            target_position: Vec3::ZERO,
            target_yaw: -std::f32::consts::FRAC_PI_2,
            target_pitch: 0.0,
        }
    }
}

const PITCH_LIMIT: f32 = 1.55;

impl FlyCamera {
    /// Starts at `position` looking at `target`.
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let dir = (target - position).try_normalize().unwrap_or(Vec3::NEG_Z);
        let yaw = dir.z.atan2(dir.x);
        let pitch = dir.y.asin().clamp(-PITCH_LIMIT, PITCH_LIMIT);
        Self {
            yaw,
            pitch,
            target_position: position,
            target_yaw: yaw,
            target_pitch: pitch,
            ..Self::default()
        }
    }

    /// Snaps `camera` onto the controller state without smoothing.
    pub fn place(&self, camera: &mut Camera) {
        camera.position = self.target_position;
        camera.forward = forward_from(self.target_yaw, self.target_pitch);
        camera.up = Vec3::Y;
        camera.update();
    }

    /// Advances the controller by `dt` seconds and writes the result into `camera`.
    pub fn update(&mut self, camera: &mut Camera, input: FlyInput, dt: f32) {
        if input.look {
            self.target_yaw += input.look_delta.x * self.mouse_sensitivity;
            self.target_pitch = (self.target_pitch - input.look_delta.y * self.mouse_sensitivity)
                .clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }

        let forward = forward_from(self.target_yaw, self.target_pitch);
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let wish = right * input.movement.x + Vec3::Y * input.movement.y + forward * input.movement.z;
        if let Some(dir) = wish.try_normalize() {
            self.target_position += dir * self.move_speed * dt;
        }

        let t = (self.lerp_speed * dt).clamp(0.0, 1.0);
        self.yaw += (self.target_yaw - self.yaw) * t;
        self.pitch += (self.target_pitch - self.pitch) * t;
        camera.position = camera.position.lerp(self.target_position, t);
        camera.forward = forward_from(self.yaw, self.pitch);
        camera.up = Vec3::Y;
        camera.update();
    }

    #[inline]
    pub fn target_position(&self) -> Vec3 {
        self.target_position
    }
}

fn forward_from(yaw: f32, pitch: f32) -> Vec3 {
    Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
}
