// SPDX-License-Identifier: CEPL-1.0
use std::ffi::CString;
use std::num::NonZeroU32;

use anyhow::{anyhow, Context as _, Result};
use atlas_core::ShellError;
use atlas_render::{ShaderProfile, BACKGROUND_COLOR};
use glow::HasContext as _;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use tracing::{info, warn};

use glutin::{
    config::{Api, ConfigTemplateBuilder},
    context::{
        ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentContext,
        NotCurrentGlContext as _, PossiblyCurrentContext, PossiblyCurrentGlContext as _, Version,
    },
    display::{Display, DisplayApiPreference, GlDisplay as _},
    surface::{GlSurface as _, Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface},
};

use crate::candidates::{negotiate_with, CandidateApi, ContextCandidate, ProfileKind};

/// A live OpenGL context on one window surface, carrying the shader
/// profile it was negotiated under.
pub struct GlContext {
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    gl: glow::Context,
    profile: ShaderProfile,
    size: (u32, u32),
}

impl GlContext {
    /// Walks `candidates` against the native display until one yields a
    /// current context. Depth size is shared configuration rather than a
    /// candidate property. On success the context is current, the swap
    /// interval is 1 and the driver's version string has been logged.
    pub fn negotiate(
        display_handle: RawDisplayHandle,
        window_handle: RawWindowHandle,
        size: (u32, u32),
        depth_buffer: bool,
        candidates: &[ContextCandidate],
    ) -> Result<Self, ShellError> {
        let display = match unsafe { Display::new(display_handle, display_preference()) } {
            Ok(display) => display,
            Err(e) => {
                warn!("no GL display: {e}");
                return Err(ShellError::NegotiationExhausted { attempts: 0 });
            }
        };

        let ((surface, context), profile) = negotiate_with(candidates, |candidate| {
            attempt(&display, window_handle, size, depth_buffer, candidate)
        })?;

        let gl = unsafe {
            glow::Context::from_loader_function(|s| {
                display.get_proc_address(&CString::new(s).unwrap()) as *const _
            })
        };
        let version = unsafe { gl.get_parameter_string(glow::VERSION) };
        info!("GL ready: {version}");

        let _ =
            surface.set_swap_interval(&context, SwapInterval::Wait(NonZeroU32::new(1).unwrap()));

        Ok(Self {
            surface,
            context,
            gl,
            profile,
            size,
        })
    }

    pub fn shader_profile(&self) -> ShaderProfile {
        self.profile
    }

    /// Makes this context current again if something else took over.
    /// Refusal is logged rather than propagated; the next paint retries.
    pub fn make_current(&self) {
        if self.context.is_current() {
            return;
        }
        if let Err(e) = self.context.make_current(&self.surface) {
            warn!("make_current failed: {e}");
        }
    }

    /// Clears color and depth to the background so every frame the engine
    /// paints starts defined, mirroring the recorded clears on the Vulkan
    /// path.
    pub fn clear_frame(&self) {
        let (width, height) = self.size;
        if width == 0 || height == 0 {
            return;
        }
        unsafe {
            self.gl.viewport(0, 0, width as i32, height as i32);
            self.gl.clear_color(
                BACKGROUND_COLOR[0],
                BACKGROUND_COLOR[1],
                BACKGROUND_COLOR[2],
                BACKGROUND_COLOR[3],
            );
            self.gl.clear_depth_f32(1.0);
            self.gl
                .clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    pub fn swap_buffers(&self) -> Result<()> {
        self.surface
            .swap_buffers(&self.context)
            .context("swap_buffers")?;
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        let w = NonZeroU32::new(width.max(1)).unwrap();
        let h = NonZeroU32::new(height.max(1)).unwrap();
        self.surface.resize(&self.context, w, h);
    }
}

fn attempt(
    display: &Display,
    window_handle: RawWindowHandle,
    (width, height): (u32, u32),
    depth_buffer: bool,
    candidate: &ContextCandidate,
) -> Result<(Surface<WindowSurface>, PossiblyCurrentContext)> {
    let mut template = ConfigTemplateBuilder::new()
        .with_api(api_mask(candidate))
        .with_depth_size(if depth_buffer { 24 } else { 0 })
        .with_single_buffering(!candidate.double_buffer);
    if candidate.samples > 0 {
        template = template.with_multisampling(candidate.samples);
    }

    let mut configs = unsafe { display.find_configs(template.build()) }.context("find_configs")?;
    let config = configs.next().ok_or_else(|| anyhow!("no matching GL configs"))?;

    let w = NonZeroU32::new(width.max(1)).unwrap();
    let h = NonZeroU32::new(height.max(1)).unwrap();
    let sattrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(window_handle, w, h);
    let surface = unsafe { display.create_window_surface(&config, &sattrs) }
        .context("create_window_surface")?;

    let ctx_attrs = attributes(candidate).build(Some(window_handle));
    let not_current: NotCurrentContext =
        unsafe { display.create_context(&config, &ctx_attrs) }.context("create_context")?;
    let context = not_current.make_current(&surface).context("make_current")?;

    Ok((surface, context))
}

fn api_mask(candidate: &ContextCandidate) -> Api {
    match candidate.api {
        CandidateApi::OpenGl { .. } => Api::OPENGL,
        CandidateApi::Gles { major: 3, .. } => Api::GLES3,
        CandidateApi::Gles { .. } => Api::GLES2,
    }
}

fn attributes(candidate: &ContextCandidate) -> ContextAttributesBuilder {
    match candidate.api {
        CandidateApi::OpenGl {
            major,
            minor,
            profile,
        } => ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(major, minor))))
            .with_profile(match profile {
                ProfileKind::Core => GlProfile::Core,
                ProfileKind::Compatibility => GlProfile::Compatibility,
            }),
        CandidateApi::Gles { major, minor } => ContextAttributesBuilder::new()
            .with_context_api(ContextApi::Gles(Some(Version::new(major, minor)))),
    }
}

#[cfg(target_os = "macos")]
fn display_preference() -> DisplayApiPreference {
    DisplayApiPreference::Cgl
}

#[cfg(not(target_os = "macos"))]
fn display_preference() -> DisplayApiPreference {
    DisplayApiPreference::Egl
}
