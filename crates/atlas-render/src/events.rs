// SPDX-License-Identifier: CEPL-1.0
//! Engine-level event records. The shell's translator produces these from
//! native window events; engines consume them through the `RenderEngine`
//! input callbacks and never see the windowing layer's own types.

use glam::DVec2;

/// Pointer button identity. Buttons other than left and right arrive as
/// `None` rather than being dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    Left,
    Right,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseAction {
    Press,
    Release,
    Move,
    Wheel,
}

/// One pointer event. `pos` is always the pointer position in window
/// coordinates; wheel events carry no position of their own natively, so
/// the shell stamps the last tracked position onto them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseEvent {
    pub action: MouseAction,
    pub pos: DVec2,
    /// Motion since the previous move event. `Move` only.
    pub pos_delta: DVec2,
    /// Scroll amount in wheel notches for line scrolls; pixel scrolls
    /// arrive unscaled. `Wheel` only.
    pub wheel_delta: f32,
    /// The button pressed or released. `Press`/`Release` only.
    pub button: Button,
}

impl MouseEvent {
    pub fn press(pos: DVec2, button: Button) -> Self {
        MouseEvent {
            action: MouseAction::Press,
            pos,
            pos_delta: DVec2::ZERO,
            wheel_delta: 0.0,
            button,
        }
    }

    pub fn release(pos: DVec2, button: Button) -> Self {
        MouseEvent {
            action: MouseAction::Release,
            pos,
            pos_delta: DVec2::ZERO,
            wheel_delta: 0.0,
            button,
        }
    }

    pub fn moved(pos: DVec2, pos_delta: DVec2) -> Self {
        MouseEvent {
            action: MouseAction::Move,
            pos,
            pos_delta,
            wheel_delta: 0.0,
            button: Button::None,
        }
    }

    pub fn wheel(pos: DVec2, wheel_delta: f32) -> Self {
        MouseEvent {
            action: MouseAction::Wheel,
            pos,
            pos_delta: DVec2::ZERO,
            wheel_delta,
            button: Button::None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
}

/// One keyboard event. `key_code` names the physical key
/// (layout-independent), e.g. `"Escape"`, `"KeyW"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub action: KeyAction,
    pub key_code: String,
}

/// Committed text from the input method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextInputEvent {
    pub text: String,
}

/// In-progress composition text. `cursor` is a byte offset into `text`,
/// or -1 when the input method reports no caret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextEditingEvent {
    pub text: String,
    pub cursor: i32,
    pub selection_len: i32,
}

/// A translated event, ready for dispatch to the matching `RenderEngine`
/// callback.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    Mouse(MouseEvent),
    Key(KeyEvent),
    TextInput(TextInputEvent),
    TextEditing(TextEditingEvent),
}
