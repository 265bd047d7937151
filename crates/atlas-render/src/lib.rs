// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]

pub mod events;
pub mod texture;

use events::{KeyEvent, MouseEvent, TextEditingEvent, TextInputEvent};

/// Background both backends clear to before the engine paints.
pub const BACKGROUND_COLOR: [f32; 4] = [0.02, 0.02, 0.04, 1.0];

/// Shader dialect of a negotiated OpenGL context. Recorded from the
/// candidate that won negotiation and reported to the engine before
/// `initialize`, so shader sources can be picked to match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderProfile {
    Glsl410,
    Glsl330,
    Glsl120,
    Glsl100Es,
}

impl ShaderProfile {
    /// The `#version` line shaders built for this profile should open with.
    pub fn version_directive(self) -> &'static str {
        match self {
            ShaderProfile::Glsl410 => "#version 410",
            ShaderProfile::Glsl330 => "#version 330",
            ShaderProfile::Glsl120 => "#version 120",
            ShaderProfile::Glsl100Es => "#version 100",
        }
    }
}

/// Callbacks a render engine receives from the shell.
///
/// Lifecycle callbacks are mandatory. Input callbacks default to no-ops so
/// engines that do not consume input implement nothing extra.
pub trait RenderEngine {
    /// One-time engine setup. The graphics context is live and current.
    fn initialize(&mut self);

    /// Drawable size in pixels; called once right after context creation
    /// and again on every window resize.
    fn resize(&mut self, width: u32, height: u32);

    /// Repaint the frame. The context is current; the shell presents
    /// immediately after this returns.
    fn paint(&mut self);

    /// Animation step. `timestamp_ms` is monotonic milliseconds since the
    /// shell started; only differences between timestamps are meaningful.
    fn animate(&mut self, timestamp_ms: f64);

    /// OpenGL only: reports the negotiated dialect before `initialize`.
    fn select_shader_profile(&mut self, profile: ShaderProfile) {
        let _ = profile;
    }

    fn mouse_event(&mut self, event: &MouseEvent) {
        let _ = event;
    }

    fn key_event(&mut self, event: &KeyEvent) {
        let _ = event;
    }

    fn text_input_event(&mut self, event: &TextInputEvent) {
        let _ = event;
    }

    fn text_editing_event(&mut self, event: &TextEditingEvent) {
        let _ = event;
    }
}
