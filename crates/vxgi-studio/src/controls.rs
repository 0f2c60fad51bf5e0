//! Key bindings of the viewer.

use glam::Vec3;
use vxgi_engine::input::{InputFrame, InputState, Key, MouseButton};
use vxgi_engine::render::DisplayMode;
use vxgi_engine::scene::FlyInput;

/// One action on the renderer or the scene, triggered by a key press.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    SetDisplayMode(DisplayMode),
    Revoxelize,
    SetVoxelResolution(usize),
    ToggleGBufferTiles,
    /// Steps the visualized mip level by the given amount.
    StepVisualizedMip(i32),
    ToggleAmbientVoxelization,
    ToggleHardShadows,
    ToggleDirectLight,
    ToggleSeparateAo,
    /// Turns the sun by whole steps of yaw and pitch.
    RotateSun { yaw: i32, pitch: i32 },
    /// Scales the sun's shadow frustum extent by whole steps.
    StepShadowOrtho(i32),
    StepShadowNear(i32),
    StepShadowFar(i32),
    StepAmbient(i32),
    StepDiffuseAperture(i32),
    /// Moves the diffuse cone start by whole voxels.
    StepDiffuseOffset(i32),
    StepEmission(i32),
    CycleInternalResolution,
    Exit,
}

pub const HELP: &str = "\
1/2/3  scene / voxels / shadow map
V      revoxelize
F5-F8  voxel grid 64³ .. 512³
G      G-buffer tiles
N/M    visualized mip level -/+
B      ambient light in voxelization
H      hard shadows
L      direct light
O      separate AO cone
Arrows sun yaw / pitch
Z/X    shadow extent -/+
C/F    shadow near plane -/+
R/T    shadow far plane -/+
J/K    ambient light -/+
4/5    diffuse aperture -/+
6/7    diffuse offset -/+ one voxel
8/9    emission -/+ (revoxelizes)
P      internal resolution 512 / 1024 / 2048
WASD   move, Q/E down/up, Shift faster
RMB    look
Esc    quit";

pub fn command_for_key(key: Key) -> Option<Command> {
    Some(match key {
        Key::Digit1 => Command::SetDisplayMode(DisplayMode::Scene),
        Key::Digit2 => Command::SetDisplayMode(DisplayMode::VoxelizedScene),
        Key::Digit3 => Command::SetDisplayMode(DisplayMode::ShadowMap),
        Key::V => Command::Revoxelize,
        Key::F5 => Command::SetVoxelResolution(0),
        Key::F6 => Command::SetVoxelResolution(1),
        Key::F7 => Command::SetVoxelResolution(2),
        Key::F8 => Command::SetVoxelResolution(3),
        Key::G => Command::ToggleGBufferTiles,
        Key::N => Command::StepVisualizedMip(-1),
        Key::M => Command::StepVisualizedMip(1),
        Key::B => Command::ToggleAmbientVoxelization,
        Key::H => Command::ToggleHardShadows,
        Key::L => Command::ToggleDirectLight,
        Key::O => Command::ToggleSeparateAo,
        Key::ArrowLeft => Command::RotateSun { yaw: -1, pitch: 0 },
        Key::ArrowRight => Command::RotateSun { yaw: 1, pitch: 0 },
        Key::ArrowDown => Command::RotateSun { yaw: 0, pitch: -1 },
        Key::ArrowUp => Command::RotateSun { yaw: 0, pitch: 1 },
        Key::Z => Command::StepShadowOrtho(-1),
        Key::X => Command::StepShadowOrtho(1),
        Key::C => Command::StepShadowNear(-1),
        Key::F => Command::StepShadowNear(1),
        Key::R => Command::StepShadowFar(-1),
        Key::T => Command::StepShadowFar(1),
        Key::J => Command::StepAmbient(-1),
        Key::K => Command::StepAmbient(1),
        Key::Digit4 => Command::StepDiffuseAperture(-1),
        Key::Digit5 => Command::StepDiffuseAperture(1),
        Key::Digit6 => Command::StepDiffuseOffset(-1),
        Key::Digit7 => Command::StepDiffuseOffset(1),
        Key::Digit8 => Command::StepEmission(-1),
        Key::Digit9 => Command::StepEmission(1),
        Key::P => Command::CycleInternalResolution,
        Key::Escape => Command::Exit,
        _ => return None,
    })
}

/// Commands for the keys pressed this frame, in a stable order.
pub fn frame_commands(frame: &InputFrame) -> Vec<Command> {
    let mut keys: Vec<Key> = frame.keys_pressed.iter().copied().collect();
    keys.sort_by_key(|k| format!("{k}"));
    keys.into_iter().filter_map(command_for_key).collect()
}

/// Movement speed multiplier while Shift is held.
pub const SPRINT: f32 = 3.0;

pub fn speed_multiplier(input: &InputState) -> f32 {
    if input.key_down(Key::Shift) { SPRINT } else { 1.0 }
}

pub fn fly_input(input: &InputState, frame: &InputFrame) -> FlyInput {
    let axis = |pos: Key, neg: Key| f32::from(u8::from(input.key_down(pos))) - f32::from(u8::from(input.key_down(neg)));
    let movement = Vec3::new(axis(Key::D, Key::A), axis(Key::E, Key::Q), axis(Key::W, Key::S));
    FlyInput { movement, look_delta: frame.mouse_delta, look: input.button_down(MouseButton::Right) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vxgi_engine::input::{InputEvent, KeyState, MouseButtonState};

    fn press(state: &mut InputState, frame: &mut InputFrame, key: Key) {
        state.apply_event(frame, InputEvent::Key { key, state: KeyState::Pressed, repeat: false });
    }

    // ── bindings ──────────────────────────────────────────────────────────

    #[test]
    fn function_keys_select_voxel_resolution() {
        assert_eq!(command_for_key(Key::F5), Some(Command::SetVoxelResolution(0)));
        assert_eq!(command_for_key(Key::F8), Some(Command::SetVoxelResolution(3)));
    }

    #[test]
    fn digits_select_display_mode() {
        assert_eq!(command_for_key(Key::Digit2), Some(Command::SetDisplayMode(DisplayMode::VoxelizedScene)));
        assert_eq!(command_for_key(Key::Digit0), None);
    }

    #[test]
    fn arrows_turn_the_sun() {
        assert_eq!(command_for_key(Key::ArrowLeft), Some(Command::RotateSun { yaw: -1, pitch: 0 }));
        assert_eq!(command_for_key(Key::ArrowUp), Some(Command::RotateSun { yaw: 0, pitch: 1 }));
    }

    #[test]
    fn paired_keys_step_in_opposite_directions() {
        let pairs = [
            (Key::Z, Key::X),
            (Key::C, Key::F),
            (Key::R, Key::T),
            (Key::J, Key::K),
            (Key::Digit4, Key::Digit5),
            (Key::Digit6, Key::Digit7),
            (Key::Digit8, Key::Digit9),
        ];
        for (down, up) in pairs {
            let (Some(a), Some(b)) = (command_for_key(down), command_for_key(up)) else {
                panic!("{down} / {up} unbound");
            };
            assert_ne!(a, b);
            assert_eq!(std::mem::discriminant(&a), std::mem::discriminant(&b));
        }
    }

    #[test]
    fn help_lists_every_light_control() {
        for label in ["sun", "shadow extent", "near plane", "far plane", "ambient"] {
            assert!(HELP.contains(label), "{label}");
        }
    }

    #[test]
    fn pressed_keys_become_commands() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        press(&mut state, &mut frame, Key::V);
        press(&mut state, &mut frame, Key::W);
        assert_eq!(frame_commands(&frame), vec![Command::Revoxelize]);
    }

    // ── movement ──────────────────────────────────────────────────────────

    #[test]
    fn opposite_keys_cancel() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        press(&mut state, &mut frame, Key::W);
        press(&mut state, &mut frame, Key::S);
        press(&mut state, &mut frame, Key::D);
        let fly = fly_input(&state, &frame);
        assert_eq!(fly.movement, Vec3::new(1.0, 0.0, 0.0));
        assert!(!fly.look);
    }

    #[test]
    fn right_button_enables_look() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(
            &mut frame,
            InputEvent::PointerButton { button: MouseButton::Right, state: MouseButtonState::Pressed },
        );
        state.apply_event(&mut frame, InputEvent::MouseMotion { dx: 4.0, dy: -2.0 });
        let fly = fly_input(&state, &frame);
        assert!(fly.look);
        assert_eq!(fly.look_delta, glam::Vec2::new(4.0, -2.0));
    }

    #[test]
    fn shift_sprints() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        press(&mut state, &mut frame, Key::W);
        press(&mut state, &mut frame, Key::Shift);
        assert_eq!(fly_input(&state, &frame).movement.z, 1.0);
        assert_eq!(speed_multiplier(&state), SPRINT);
    }
}
