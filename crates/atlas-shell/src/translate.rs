// SPDX-License-Identifier: CEPL-1.0
//! Native window events in, engine events out. Translation is pure apart
//! from the tracked pointer position, which exists because button and
//! wheel events carry no position of their own.

use atlas_platform::winit::event::{ElementState, Ime, MouseButton, MouseScrollDelta, WindowEvent};
use atlas_platform::winit::keyboard::{KeyCode, PhysicalKey};
use atlas_render::events::{
    Button, EngineEvent, KeyAction, KeyEvent, MouseEvent, TextEditingEvent, TextInputEvent,
};
use glam::DVec2;

/// Last pointer position seen in window coordinates. Stamped onto button
/// and wheel events, and differenced for move deltas.
#[derive(Debug, Default)]
pub struct PointerState {
    pos: DVec2,
}

impl PointerState {
    pub fn position(&self) -> DVec2 {
        self.pos
    }

    fn moved_to(&mut self, pos: DVec2) -> MouseEvent {
        let delta = pos - self.pos;
        self.pos = pos;
        MouseEvent::moved(pos, delta)
    }
}

/// What one native event amounts to. At most one engine event, plus the
/// shell-level side effects the pump acts on.
#[derive(Debug, Default, PartialEq)]
pub struct Translation {
    pub event: Option<EngineEvent>,
    pub resized: Option<(u32, u32)>,
    pub mark_dirty: bool,
    pub quit: bool,
}

pub fn translate_window_event(event: &WindowEvent, pointer: &mut PointerState) -> Translation {
    let mut out = Translation::default();
    match event {
        WindowEvent::CloseRequested => out.quit = true,

        WindowEvent::Resized(size) => {
            out.resized = Some((size.width, size.height));
            out.mark_dirty = true;
        }

        // The compositor wants the window repainted; also fires when it
        // becomes visible again.
        WindowEvent::RedrawRequested => out.mark_dirty = true,
        WindowEvent::Occluded(false) => out.mark_dirty = true,

        WindowEvent::KeyboardInput { event: key, .. } => {
            let (engine_event, quit) = translate_key(key.physical_key, key.state);
            out.event = Some(engine_event);
            out.quit = quit;
        }

        WindowEvent::Ime(ime) => out.event = translate_ime(ime),

        WindowEvent::CursorMoved { position, .. } => {
            let pos = DVec2::new(position.x, position.y);
            out.event = Some(EngineEvent::Mouse(pointer.moved_to(pos)));
        }

        WindowEvent::MouseInput { state, button, .. } => {
            let button = button_for(*button);
            let mouse = match state {
                ElementState::Pressed => MouseEvent::press(pointer.position(), button),
                ElementState::Released => MouseEvent::release(pointer.position(), button),
            };
            out.event = Some(EngineEvent::Mouse(mouse));
        }

        WindowEvent::MouseWheel { delta, .. } => {
            let mouse = MouseEvent::wheel(pointer.position(), wheel_notches(delta));
            out.event = Some(EngineEvent::Mouse(mouse));
        }

        _ => {}
    }
    out
}

/// Key repeats arrive as further presses and are forwarded as such.
/// Releasing Escape asks the shell to quit, in addition to the normal
/// key event the engine sees.
fn translate_key(key: PhysicalKey, state: ElementState) -> (EngineEvent, bool) {
    let quit = state == ElementState::Released && key == PhysicalKey::Code(KeyCode::Escape);
    let action = match state {
        ElementState::Pressed => KeyAction::Press,
        ElementState::Released => KeyAction::Release,
    };
    let event = EngineEvent::Key(KeyEvent {
        action,
        key_code: key_code_name(key),
    });
    (event, quit)
}

fn key_code_name(key: PhysicalKey) -> String {
    match key {
        PhysicalKey::Code(code) => format!("{code:?}"),
        PhysicalKey::Unidentified(_) => String::from("Unidentified"),
    }
}

fn translate_ime(ime: &Ime) -> Option<EngineEvent> {
    match ime {
        Ime::Commit(text) => Some(EngineEvent::TextInput(TextInputEvent {
            text: text.clone(),
        })),
        Ime::Preedit(text, cursor) => {
            let (cursor, selection_len) = match cursor {
                Some((begin, end)) => (*begin as i32, end.saturating_sub(*begin) as i32),
                None => (-1, 0),
            };
            Some(EngineEvent::TextEditing(TextEditingEvent {
                text: text.clone(),
                cursor,
                selection_len,
            }))
        }
        Ime::Enabled | Ime::Disabled => None,
    }
}

fn button_for(button: MouseButton) -> Button {
    match button {
        MouseButton::Left => Button::Left,
        MouseButton::Right => Button::Right,
        _ => Button::None,
    }
}

fn wheel_notches(delta: &MouseScrollDelta) -> f32 {
    match *delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_platform::winit::dpi::{PhysicalPosition, PhysicalSize};
    use atlas_platform::winit::event::{DeviceId, TouchPhase};
    use atlas_render::events::MouseAction;

    #[test]
    fn close_requested_quits_without_an_event() {
        let mut pointer = PointerState::default();
        let out = translate_window_event(&WindowEvent::CloseRequested, &mut pointer);
        assert!(out.quit);
        assert!(out.event.is_none());
        assert!(!out.mark_dirty);
    }

    #[test]
    fn resize_reports_size_and_dirties() {
        let mut pointer = PointerState::default();
        let out = translate_window_event(
            &WindowEvent::Resized(PhysicalSize::new(640, 480)),
            &mut pointer,
        );
        assert_eq!(out.resized, Some((640, 480)));
        assert!(out.mark_dirty);
        assert!(!out.quit);
    }

    #[test]
    fn redraw_and_unocclude_dirty_only() {
        let mut pointer = PointerState::default();
        let redraw = translate_window_event(&WindowEvent::RedrawRequested, &mut pointer);
        assert!(redraw.mark_dirty);
        assert!(redraw.event.is_none());

        let shown = translate_window_event(&WindowEvent::Occluded(false), &mut pointer);
        assert!(shown.mark_dirty);

        let hidden = translate_window_event(&WindowEvent::Occluded(true), &mut pointer);
        assert_eq!(hidden, Translation::default());
    }

    #[test]
    fn unrelated_events_translate_to_nothing() {
        let mut pointer = PointerState::default();
        let out = translate_window_event(&WindowEvent::Focused(true), &mut pointer);
        assert_eq!(out, Translation::default());
    }

    #[test]
    fn escape_quits_on_release_only() {
        let escape = PhysicalKey::Code(KeyCode::Escape);
        let (event, quit) = translate_key(escape, ElementState::Pressed);
        assert!(!quit);
        assert_eq!(
            event,
            EngineEvent::Key(KeyEvent {
                action: KeyAction::Press,
                key_code: "Escape".into(),
            })
        );

        let (event, quit) = translate_key(escape, ElementState::Released);
        assert!(quit);
        assert_eq!(
            event,
            EngineEvent::Key(KeyEvent {
                action: KeyAction::Release,
                key_code: "Escape".into(),
            })
        );
    }

    #[test]
    fn ordinary_keys_never_quit() {
        let (event, quit) = translate_key(PhysicalKey::Code(KeyCode::KeyW), ElementState::Released);
        assert!(!quit);
        assert_eq!(
            event,
            EngineEvent::Key(KeyEvent {
                action: KeyAction::Release,
                key_code: "KeyW".into(),
            })
        );
    }

    #[test]
    fn commit_and_preedit_translate() {
        let commit = translate_ime(&Ime::Commit("héllo".into()));
        assert_eq!(
            commit,
            Some(EngineEvent::TextInput(TextInputEvent {
                text: "héllo".into(),
            }))
        );

        let preedit = translate_ime(&Ime::Preedit("abc".into(), Some((1, 3))));
        assert_eq!(
            preedit,
            Some(EngineEvent::TextEditing(TextEditingEvent {
                text: "abc".into(),
                cursor: 1,
                selection_len: 2,
            }))
        );
    }

    #[test]
    fn preedit_without_caret_reports_negative_cursor() {
        let preedit = translate_ime(&Ime::Preedit("abc".into(), None));
        assert_eq!(
            preedit,
            Some(EngineEvent::TextEditing(TextEditingEvent {
                text: "abc".into(),
                cursor: -1,
                selection_len: 0,
            }))
        );
        assert_eq!(translate_ime(&Ime::Enabled), None);
    }

    #[test]
    fn pointer_tracks_position_and_deltas() {
        let mut pointer = PointerState::default();

        let first = pointer.moved_to(DVec2::new(10.0, 4.0));
        assert_eq!(first.action, MouseAction::Move);
        assert_eq!(first.pos, DVec2::new(10.0, 4.0));
        assert_eq!(first.pos_delta, DVec2::new(10.0, 4.0));

        let second = pointer.moved_to(DVec2::new(12.0, 4.0));
        assert_eq!(second.pos_delta, DVec2::new(2.0, 0.0));
        assert_eq!(pointer.position(), DVec2::new(12.0, 4.0));
    }

    #[test]
    fn wheel_and_button_events_carry_the_tracked_position() {
        let mut pointer = PointerState::default();
        let device_id = DeviceId::dummy();
        let pos = DVec2::new(40.0, 70.0);

        translate_window_event(
            &WindowEvent::CursorMoved {
                device_id,
                position: PhysicalPosition::new(pos.x, pos.y),
            },
            &mut pointer,
        );

        let wheel = translate_window_event(
            &WindowEvent::MouseWheel {
                device_id,
                delta: MouseScrollDelta::LineDelta(0.0, -2.0),
                phase: TouchPhase::Moved,
            },
            &mut pointer,
        );
        assert_eq!(
            wheel.event,
            Some(EngineEvent::Mouse(MouseEvent::wheel(pos, -2.0)))
        );

        let press = translate_window_event(
            &WindowEvent::MouseInput {
                device_id,
                state: ElementState::Pressed,
                button: MouseButton::Left,
            },
            &mut pointer,
        );
        assert_eq!(
            press.event,
            Some(EngineEvent::Mouse(MouseEvent::press(pos, Button::Left)))
        );
    }

    #[test]
    fn buttons_beyond_left_and_right_are_anonymous() {
        assert_eq!(button_for(MouseButton::Left), Button::Left);
        assert_eq!(button_for(MouseButton::Right), Button::Right);
        assert_eq!(button_for(MouseButton::Middle), Button::None);
        assert_eq!(button_for(MouseButton::Back), Button::None);
    }

    #[test]
    fn wheel_deltas_keep_their_units() {
        assert_eq!(wheel_notches(&MouseScrollDelta::LineDelta(0.0, 3.0)), 3.0);
        assert_eq!(
            wheel_notches(&MouseScrollDelta::PixelDelta(PhysicalPosition::new(
                0.0, -24.0
            ))),
            -24.0
        );
    }
}
