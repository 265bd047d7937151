// SPDX-License-Identifier: CEPL-1.0

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use atlas_core::ShellError;
use atlas_platform::display::resolve_bounds;
use atlas_platform::winit::application::ApplicationHandler;
use atlas_platform::winit::dpi::{PhysicalPosition, PhysicalSize};
use atlas_platform::winit::event::{DeviceEvent, DeviceId, WindowEvent};
use atlas_platform::winit::event_loop::{ActiveEventLoop, EventLoop};
use atlas_platform::winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use atlas_platform::winit::raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use atlas_platform::winit::window::{CursorGrabMode, Fullscreen, Window, WindowId};
use atlas_render::events::{EngineEvent, MouseEvent};
use atlas_render::RenderEngine;
use atlas_render_gl::{default_candidates, GlContext};
use atlas_render_vk::VulkanContext;
use glam::DVec2;
use tracing::{debug, error, info, warn};

use crate::pacing::FramePacing;
use crate::tasks::{AsyncQueue, TaskQueue};
use crate::translate::{translate_window_event, PointerState};

/// Drawable size requested at creation when not fullscreen.
const DEFAULT_SIZE: (u32, u32) = (512, 512);

/// Pause between exec iterations.
const EXEC_SLEEP: Duration = Duration::from_millis(16);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Gl,
    Vulkan,
}

#[derive(Clone, Debug)]
pub struct ShellOptions {
    pub title: String,
    pub fullscreen: bool,
    pub depth_buffer: bool,
}

impl Default for ShellOptions {
    fn default() -> Self {
        ShellOptions {
            title: String::from("atlas"),
            fullscreen: false,
            depth_buffer: true,
        }
    }
}

/// How much of the frame a repaint request covers. Painting is always a
/// full frame; the stage hint exists for engines that track their own
/// intermediate buffers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RedrawScope {
    #[default]
    Full,
    FromStage(u32),
}

enum GraphicsContext {
    Gl(GlContext),
    Vulkan(VulkanContext),
}

// Field order is teardown order: the engine goes down with its context
// still alive, and the context before its window.
struct ShellApp {
    engine: Box<dyn RenderEngine>,
    gfx: Option<GraphicsContext>,
    window: Option<Window>,
    backend: BackendKind,
    options: ShellOptions,
    pointer: PointerState,
    pacing: FramePacing,
    init_error: Option<ShellError>,
    relative_pointer: bool,
    quit: bool,
}

impl ShellApp {
    fn build_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), ShellError> {
        let mut attributes = Window::default_attributes()
            .with_title(self.options.title.clone())
            .with_inner_size(PhysicalSize::new(DEFAULT_SIZE.0, DEFAULT_SIZE.1));
        if self.options.fullscreen {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
            self.relative_pointer = true;
        } else if let Some(bounds) = resolve_bounds(event_loop, None) {
            let (x, y) = bounds.centered(DEFAULT_SIZE.0, DEFAULT_SIZE.1);
            attributes = attributes.with_position(PhysicalPosition::new(x, y));
        }

        let window = event_loop.create_window(attributes).map_err(|e| {
            warn!("create_window: {e}");
            ShellError::ContextUnavailable
        })?;
        let display = window
            .display_handle()
            .map_err(|e| {
                warn!("display_handle: {e}");
                ShellError::ContextUnavailable
            })?
            .as_raw();
        let surface = window
            .window_handle()
            .map_err(|e| {
                warn!("window_handle: {e}");
                ShellError::ContextUnavailable
            })?
            .as_raw();

        let inner = window.inner_size();
        let size = (inner.width.max(1), inner.height.max(1));

        let gfx = match self.backend {
            BackendKind::Gl => {
                let gl = GlContext::negotiate(
                    display,
                    surface,
                    size,
                    self.options.depth_buffer,
                    &default_candidates(),
                )?;
                self.engine.select_shader_profile(gl.shader_profile());
                GraphicsContext::Gl(gl)
            }
            BackendKind::Vulkan => {
                let vk = VulkanContext::bootstrap(display, surface, &self.options.title, size)?;
                GraphicsContext::Vulkan(vk)
            }
        };

        self.engine.initialize();
        self.engine.resize(size.0, size.1);
        self.pacing.mark_dirty();

        if self.relative_pointer {
            set_pointer_grab(&window, true);
        }

        info!(
            "shell ready ({}, {}x{})",
            match self.backend {
                BackendKind::Gl => "gl",
                BackendKind::Vulkan => "vulkan",
            },
            size.0,
            size.1
        );
        self.gfx = Some(gfx);
        self.window = Some(window);
        Ok(())
    }

    fn handle_resize(&mut self, width: u32, height: u32) {
        if let Some(GraphicsContext::Gl(gl)) = &mut self.gfx {
            gl.resize(width, height);
        }
        self.engine.resize(width, height);
    }

    fn dispatch(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::Mouse(e) => self.engine.mouse_event(e),
            EngineEvent::Key(e) => self.engine.key_event(e),
            EngineEvent::TextInput(e) => self.engine.text_input_event(e),
            EngineEvent::TextEditing(e) => self.engine.text_editing_event(e),
        }
    }

    fn make_current(&self) {
        if let Some(GraphicsContext::Gl(gl)) = &self.gfx {
            gl.make_current();
        }
    }

    /// The per-tick half that runs after the native events have been
    /// pumped: the animation clock, then a paint if anything is dirty.
    fn frame(&mut self) {
        if self.gfx.is_none() {
            return;
        }
        if let Some(timestamp) = self.pacing.take_animation_tick(Instant::now()) {
            self.make_current();
            self.engine.animate(timestamp);
        }
        if self.pacing.take_paint() {
            self.make_current();
            self.paint();
        }
    }

    fn paint(&mut self) {
        match &mut self.gfx {
            Some(GraphicsContext::Gl(gl)) => {
                gl.clear_frame();
                self.engine.paint();
                if let Err(e) = gl.swap_buffers() {
                    error!("present failed: {e:#}");
                }
            }
            Some(GraphicsContext::Vulkan(vk)) => {
                self.engine.paint();
                if let Err(e) = vk.present_frame() {
                    error!("present failed: {e:#}");
                }
            }
            None => {}
        }
    }
}

impl ApplicationHandler for ShellApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.build_window(event_loop) {
            error!("shell init failed: {e}");
            self.init_error = Some(e);
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = &self.window else { return };
        if window_id != window.id() {
            return;
        }

        // In relative mode motion arrives through device events; absolute
        // cursor positions from a confined cursor would double up.
        if self.relative_pointer {
            if let WindowEvent::CursorMoved { .. } = event {
                return;
            }
        }

        let translation = translate_window_event(&event, &mut self.pointer);
        if translation.quit {
            info!("quit requested");
            self.quit = true;
        }
        if let Some((width, height)) = translation.resized {
            self.handle_resize(width, height);
        }
        if translation.mark_dirty {
            self.pacing.mark_dirty();
        }
        if let Some(engine_event) = &translation.event {
            self.dispatch(engine_event);
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if !self.relative_pointer {
            return;
        }
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            let mouse = MouseEvent::moved(self.pointer.position(), DVec2::new(dx, dy));
            self.engine.mouse_event(&mouse);
        }
    }
}

/// One native window hosting one [`RenderEngine`] behind one graphics
/// context. The window and context appear on the first
/// [`process_events`](Shell::process_events) call, when the platform
/// delivers its activation; a failure to produce either is returned from
/// that call and the shell reports not ready.
pub struct Shell {
    app: ShellApp,
    tasks: TaskQueue,
    queue: AsyncQueue,
    event_loop: EventLoop<()>,
}

impl Shell {
    pub fn new(
        engine: Box<dyn RenderEngine>,
        backend: BackendKind,
        options: ShellOptions,
    ) -> Result<Self> {
        let event_loop = EventLoop::new().context("event loop")?;
        let tasks = TaskQueue::new();
        let queue = tasks.handle();
        Ok(Shell {
            app: ShellApp {
                engine,
                gfx: None,
                window: None,
                backend,
                options,
                pointer: PointerState::default(),
                pacing: FramePacing::new(),
                init_error: None,
                relative_pointer: false,
                quit: false,
            },
            tasks,
            queue,
            event_loop,
        })
    }

    /// One pump of the frame loop: queued tasks, pending native events,
    /// then the animation clock and a paint if anything is dirty.
    pub fn process_events(&mut self) -> Result<(), ShellError> {
        let ran = self.tasks.drain();
        if ran > 0 {
            debug!("ran {ran} queued task(s)");
        }

        if !self.app.quit {
            let status = self
                .event_loop
                .pump_app_events(Some(Duration::ZERO), &mut self.app);
            if let PumpStatus::Exit(code) = status {
                debug!("event loop exited with code {code}");
                self.app.quit = true;
            }
        }

        if let Some(error) = self.app.init_error.take() {
            self.app.quit = true;
            return Err(error);
        }

        // The tick that observes quit still finishes its animate/paint half.
        self.app.frame();
        Ok(())
    }

    /// Runs the frame loop until quit. Fails up front if the first pump
    /// produced no usable window and context.
    pub fn exec(&mut self) -> Result<(), ShellError> {
        self.process_events()?;
        if !self.is_ready() {
            return Err(ShellError::ContextUnavailable);
        }
        while !self.app.quit {
            std::thread::sleep(EXEC_SLEEP);
            self.process_events()?;
        }
        Ok(())
    }

    /// Marks the frame dirty so the next tick paints. The scope is a
    /// hint; painting always covers the full frame.
    pub fn update(&mut self, scope: RedrawScope) {
        if let RedrawScope::FromStage(stage) = scope {
            debug!("redraw from stage {stage} widened to full frame");
        }
        self.app.pacing.mark_dirty();
    }

    pub fn make_current(&self) {
        self.app.make_current();
    }

    /// Posts a closure to run on the shell thread at the top of the next
    /// tick.
    pub fn call_async(&self, task: impl FnOnce() + Send + 'static) {
        self.queue.post(task);
    }

    /// A cloneable handle for posting work from other threads.
    pub fn async_queue(&self) -> AsyncQueue {
        self.queue.clone()
    }

    pub fn set_relative_pointer_mode(&mut self, enabled: bool) {
        if self.app.relative_pointer == enabled {
            return;
        }
        self.app.relative_pointer = enabled;
        if let Some(window) = &self.app.window {
            set_pointer_grab(window, enabled);
        }
    }

    pub fn relative_pointer_mode(&self) -> bool {
        self.app.relative_pointer
    }

    pub fn start_text_input(&self) {
        if let Some(window) = &self.app.window {
            window.set_ime_allowed(true);
        }
    }

    pub fn stop_text_input(&self) {
        if let Some(window) = &self.app.window {
            window.set_ime_allowed(false);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.app.window.is_some() && self.app.gfx.is_some()
    }

    pub fn quitting(&self) -> bool {
        self.app.quit
    }
}

fn set_pointer_grab(window: &Window, grabbed: bool) {
    if grabbed {
        if let Err(e) = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
        {
            warn!("pointer grab refused: {e}");
        }
    } else if let Err(e) = window.set_cursor_grab(CursorGrabMode::None) {
        warn!("pointer release refused: {e}");
    }
    window.set_cursor_visible(!grabbed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_to_a_windowed_depth_buffered_shell() {
        let options = ShellOptions::default();
        assert!(!options.fullscreen);
        assert!(options.depth_buffer);
        assert_eq!(options.title, "atlas");
    }

    #[test]
    fn redraw_defaults_to_the_full_frame() {
        assert_eq!(RedrawScope::default(), RedrawScope::Full);
    }
}
