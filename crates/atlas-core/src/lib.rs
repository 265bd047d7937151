// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]

use thiserror::Error;

pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}

/// Process-level failures of the shell. Everything below these (a refused
/// context candidate, a failed swapchain call) is logged where it happens
/// and folded into one of these before it reaches the caller.
#[derive(Debug, Error)]
pub enum ShellError {
    /// Every OpenGL context candidate was attempted and refused.
    #[error("no usable OpenGL context after {attempts} candidate(s)")]
    NegotiationExhausted { attempts: usize },

    /// A Vulkan bootstrap stage failed. Stages acquired before it have
    /// already been released by the time this is observed.
    #[error("vulkan bootstrap halted at {stage}: {reason}")]
    BootstrapHalt { stage: &'static str, reason: String },

    /// The shell has no window or graphics context and cannot run.
    #[error("window or graphics context unavailable; shell cannot run")]
    ContextUnavailable,
}
