// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
//! The windowing shell: owns one native window, one graphics context and
//! the frame pump that drives a [`RenderEngine`](atlas_render::RenderEngine)
//! hosted inside it.

mod pacing;
mod shell;
mod tasks;
mod translate;

pub use shell::{BackendKind, RedrawScope, Shell, ShellOptions};
pub use tasks::AsyncQueue;
