use std::collections::HashSet;

use glam::Vec2;

use super::frame::InputFrame;
use super::types::{InputEvent, Key, KeyState, Modifiers, MouseButton, MouseButtonState};

/// Held keys and buttons plus the cursor position of the window.
///
/// Transitions for the current frame are written to an [`InputFrame`].
#[derive(Debug, Default)]
pub struct InputState {
    pub modifiers: Modifiers,
    pub focused: bool,
    /// Physical pixels.
    pub pointer_pos: Option<Vec2>,
    pub keys_down: HashSet<Key>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::ModifiersChanged(m) => self.modifiers = *m,

            InputEvent::Focused(focused) => {
                self.focused = *focused;
                // Releases are not delivered to unfocused windows.
                if !*focused {
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved { x, y } => self.pointer_pos = Some(Vec2::new(*x, *y)),
            InputEvent::PointerLeft => self.pointer_pos = None,

            InputEvent::Key { key, state, .. } => match state {
                KeyState::Pressed => {
                    if self.keys_down.insert(*key) {
                        frame.keys_pressed.insert(*key);
                    }
                }
                KeyState::Released => {
                    if self.keys_down.remove(key) {
                        frame.keys_released.insert(*key);
                    }
                }
            },

            InputEvent::PointerButton { button, state } => match state {
                MouseButtonState::Pressed => {
                    if self.buttons_down.insert(*button) {
                        frame.buttons_pressed.insert(*button);
                    }
                }
                MouseButtonState::Released => {
                    if self.buttons_down.remove(button) {
                        frame.buttons_released.insert(*button);
                    }
                }
            },

            InputEvent::MouseMotion { dx, dy } => frame.mouse_delta += Vec2::new(*dx, *dy),

            InputEvent::MouseWheel(delta) => {
                frame.wheel.x += delta.x;
                frame.wheel.y += delta.y;
            }
        }

        frame.events.push(ev);
    }

    #[inline]
    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    #[inline]
    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::WheelDelta;

    fn key(key: Key, state: KeyState) -> InputEvent {
        InputEvent::Key { key, state, repeat: false }
    }

    // ── keys ──────────────────────────────────────────────────────────────

    #[test]
    fn press_is_reported_once_while_held() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, key(Key::W, KeyState::Pressed));
        frame.clear();
        state.apply_event(&mut frame, key(Key::W, KeyState::Pressed));
        assert!(state.key_down(Key::W));
        assert!(!frame.key_pressed(Key::W));
    }

    #[test]
    fn release_clears_held_key() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, key(Key::V, KeyState::Pressed));
        state.apply_event(&mut frame, key(Key::V, KeyState::Released));
        assert!(!state.key_down(Key::V));
        assert!(frame.key_pressed(Key::V));
        assert!(frame.keys_released.contains(&Key::V));
    }

    #[test]
    fn focus_loss_drops_held_input() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, key(Key::A, KeyState::Pressed));
        state.apply_event(
            &mut frame,
            InputEvent::PointerButton { button: MouseButton::Right, state: MouseButtonState::Pressed },
        );
        state.apply_event(&mut frame, InputEvent::Focused(false));
        assert!(state.keys_down.is_empty());
        assert!(!state.button_down(MouseButton::Right));
    }

    // ── mouse ─────────────────────────────────────────────────────────────

    #[test]
    fn motion_accumulates_until_cleared() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, InputEvent::MouseMotion { dx: 2.0, dy: -1.0 });
        state.apply_event(&mut frame, InputEvent::MouseMotion { dx: 3.0, dy: 4.0 });
        assert_eq!(frame.mouse_delta, Vec2::new(5.0, 3.0));
        frame.clear();
        assert_eq!(frame.mouse_delta, Vec2::ZERO);
    }

    #[test]
    fn wheel_accumulates() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, InputEvent::MouseWheel(WheelDelta { x: 0.0, y: 1.0 }));
        state.apply_event(&mut frame, InputEvent::MouseWheel(WheelDelta { x: 0.0, y: 2.0 }));
        assert_eq!(frame.wheel.y, 3.0);
        assert_eq!(frame.events.len(), 2);
    }

    #[test]
    fn pointer_leave_forgets_position() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, InputEvent::PointerMoved { x: 10.0, y: 20.0 });
        assert_eq!(state.pointer_pos, Some(Vec2::new(10.0, 20.0)));
        state.apply_event(&mut frame, InputEvent::PointerLeft);
        assert_eq!(state.pointer_pos, None);
    }
}
