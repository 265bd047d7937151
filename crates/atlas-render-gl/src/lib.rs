// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]

pub mod candidates;
mod context;

pub use candidates::{default_candidates, negotiate_with, CandidateApi, ContextCandidate, ProfileKind};
pub use context::GlContext;
