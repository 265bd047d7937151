// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]

// Single import point for the windowing layer; the rest of the workspace
// takes winit (and raw-window-handle through it) from here.
pub use winit;

pub mod display;
