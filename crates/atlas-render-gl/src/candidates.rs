// SPDX-License-Identifier: CEPL-1.0
//! Context candidates and the negotiation walk. Candidates are plain data
//! in a fixed order; one attempt routine tries them until a context comes
//! up, so adding or reordering candidates never touches the attempt code.

use std::fmt;

use atlas_core::ShellError;
use atlas_render::ShaderProfile;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileKind {
    Core,
    Compatibility,
}

/// Requested context API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CandidateApi {
    OpenGl {
        major: u8,
        minor: u8,
        profile: ProfileKind,
    },
    Gles {
        major: u8,
        minor: u8,
    },
}

/// One immutable context attempt description.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextCandidate {
    pub api: CandidateApi,
    /// Multisample count; 0 asks for a non-MSAA config.
    pub samples: u8,
    pub double_buffer: bool,
    /// Reported to the engine when this candidate wins.
    pub shader_profile: ShaderProfile,
}

impl fmt::Display for ContextCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.api {
            CandidateApi::OpenGl {
                major,
                minor,
                profile,
            } => {
                let profile = match profile {
                    ProfileKind::Core => "core",
                    ProfileKind::Compatibility => "compat",
                };
                write!(f, "GL {major}.{minor} {profile}")?;
            }
            CandidateApi::Gles { major, minor } => write!(f, "GLES {major}.{minor}")?,
        }
        if self.samples > 0 {
            write!(f, " {}x msaa", self.samples)?;
        }
        Ok(())
    }
}

pub const GL41_CORE: ContextCandidate = ContextCandidate {
    api: CandidateApi::OpenGl {
        major: 4,
        minor: 1,
        profile: ProfileKind::Core,
    },
    samples: 0,
    double_buffer: true,
    shader_profile: ShaderProfile::Glsl410,
};

pub const GL33_CORE_MSAA4: ContextCandidate = ContextCandidate {
    api: CandidateApi::OpenGl {
        major: 3,
        minor: 3,
        profile: ProfileKind::Core,
    },
    samples: 4,
    double_buffer: true,
    shader_profile: ShaderProfile::Glsl330,
};

pub const GL21_COMPAT: ContextCandidate = ContextCandidate {
    api: CandidateApi::OpenGl {
        major: 2,
        minor: 1,
        profile: ProfileKind::Compatibility,
    },
    samples: 0,
    double_buffer: true,
    shader_profile: ShaderProfile::Glsl120,
};

pub const GLES2: ContextCandidate = ContextCandidate {
    api: CandidateApi::Gles { major: 2, minor: 0 },
    samples: 0,
    double_buffer: true,
    shader_profile: ShaderProfile::Glsl100Es,
};

/// The built-in candidate order: mobile targets get GLES only; desktop
/// walks from the newest profile the platform offers down to GLES as the
/// universal fallback. macOS caps core-profile GL at 4.1, so the 4.1
/// candidate exists only there.
pub fn default_candidates() -> Vec<ContextCandidate> {
    if cfg!(any(target_os = "android", target_os = "ios")) {
        return vec![GLES2];
    }
    let mut list = Vec::new();
    if cfg!(feature = "mobile-gl") {
        list.push(GLES2);
    }
    if cfg!(target_os = "macos") {
        list.push(GL41_CORE);
    }
    list.push(GL33_CORE_MSAA4);
    list.push(GL21_COMPAT);
    list.push(GLES2);
    list
}

/// Walks `candidates` in order, returning the first successful attempt
/// and the shader profile it was negotiated under. Every refusal logs one
/// warning; nothing after the winning candidate is attempted.
pub fn negotiate_with<T, F>(
    candidates: &[ContextCandidate],
    mut attempt: F,
) -> Result<(T, ShaderProfile), ShellError>
where
    F: FnMut(&ContextCandidate) -> anyhow::Result<T>,
{
    for candidate in candidates {
        match attempt(candidate) {
            Ok(value) => {
                info!("negotiated {candidate}");
                return Ok((value, candidate.shader_profile));
            }
            Err(e) => warn!("context candidate {candidate} refused: {e:#}"),
        }
    }
    Err(ShellError::NegotiationExhausted {
        attempts: candidates.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_success_stops_the_walk() {
        let list = [GL33_CORE_MSAA4, GL21_COMPAT, GLES2];
        let mut attempts = Vec::new();
        let result = negotiate_with(&list, |c| {
            attempts.push(*c);
            if *c == GL21_COMPAT {
                Ok("ctx")
            } else {
                Err(anyhow::anyhow!("refused"))
            }
        });

        let (value, profile) = result.unwrap();
        assert_eq!(value, "ctx");
        assert_eq!(profile, ShaderProfile::Glsl120);
        assert_eq!(attempts, vec![GL33_CORE_MSAA4, GL21_COMPAT]);
    }

    #[test]
    fn exhaustion_reports_every_attempt() {
        let list = [GL33_CORE_MSAA4, GL21_COMPAT, GLES2];
        let mut attempts = 0;
        let result: Result<((), _), _> = negotiate_with(&list, |_| {
            attempts += 1;
            Err(anyhow::anyhow!("refused"))
        });

        assert_eq!(attempts, 3);
        match result {
            Err(ShellError::NegotiationExhausted { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn empty_list_exhausts_immediately() {
        let result: Result<((), _), _> =
            negotiate_with(&[], |_| panic!("attempt on empty list"));
        assert!(matches!(
            result,
            Err(ShellError::NegotiationExhausted { attempts: 0 })
        ));
    }

    #[test]
    fn default_order_falls_back_to_gles() {
        let list = default_candidates();
        assert_eq!(*list.last().unwrap(), GLES2);

        let newer = list.iter().position(|c| *c == GL33_CORE_MSAA4);
        let older = list.iter().position(|c| *c == GL21_COMPAT);
        if let (Some(newer), Some(older)) = (newer, older) {
            assert!(newer < older);
        }
    }

    #[test]
    fn candidates_describe_themselves() {
        assert_eq!(GL33_CORE_MSAA4.to_string(), "GL 3.3 core 4x msaa");
        assert_eq!(GL21_COMPAT.to_string(), "GL 2.1 compat");
        assert_eq!(GLES2.to_string(), "GLES 2.0");
    }
}
