// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use anyhow::Result;
use atlas_core::init_tracing;
use atlas_render::events::{KeyEvent, MouseEvent, TextEditingEvent, TextInputEvent};
use atlas_render::texture::load_pixels;
use atlas_render::{RenderEngine, ShaderProfile};
use atlas_shell::{BackendKind, Shell, ShellOptions};
use clap::Parser;
use serde::Deserialize;
use tracing::{debug, info};

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Choose graphics backend: gl | vk
    #[arg(long)]
    backend: Option<String>,

    /// Borderless fullscreen on the current display
    #[arg(long)]
    fullscreen: bool,

    /// Window title
    #[arg(long)]
    title: Option<String>,

    /// Image to decode at startup, reported then discarded
    #[arg(long)]
    texture: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
struct ShellCfg {
    #[serde(default = "default_backend")]
    backend: String,
    #[serde(default)]
    fullscreen: bool,
    #[serde(default = "default_depth")]
    depth_buffer: bool,
    #[serde(default = "default_title")]
    title: String,
}

#[derive(Debug, Deserialize, Default)]
struct AppCfg {
    #[serde(default)]
    shell: ShellCfg,
}

impl Default for ShellCfg {
    fn default() -> Self {
        ShellCfg {
            backend: default_backend(),
            fullscreen: false,
            depth_buffer: true,
            title: default_title(),
        }
    }
}

fn default_backend() -> String {
    "gl".into()
}
fn default_depth() -> bool {
    true
}
fn default_title() -> String {
    "atlas demo".into()
}
fn load_cfg() -> AppCfg {
    match fs::read_to_string("atlas.toml") {
        Ok(s) => toml::from_str::<AppCfg>(&s).unwrap_or_default(),
        Err(_) => AppCfg::default(),
    }
}

/// Logs everything the shell feeds it and reports the paint/animate rate
/// once a second.
struct DemoEngine {
    size: (u32, u32),
    frames: u32,
    animate_ticks: u32,
    last_report: Instant,
}

impl DemoEngine {
    fn new() -> Self {
        DemoEngine {
            size: (0, 0),
            frames: 0,
            animate_ticks: 0,
            last_report: Instant::now(),
        }
    }
}

impl RenderEngine for DemoEngine {
    fn initialize(&mut self) {
        info!("engine up");
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        debug!("drawable {}x{}", width, height);
    }

    fn paint(&mut self) {
        self.frames = self.frames.saturating_add(1);
    }

    fn animate(&mut self, timestamp_ms: f64) {
        self.animate_ticks = self.animate_ticks.saturating_add(1);

        let now = Instant::now();
        if now.duration_since(self.last_report).as_secs_f32() >= 1.0 {
            info!(
                "paints {} / animate {} (t = {:.0}ms, {}x{})",
                self.frames, self.animate_ticks, timestamp_ms, self.size.0, self.size.1
            );
            self.frames = 0;
            self.animate_ticks = 0;
            self.last_report = now;
        }
    }

    fn select_shader_profile(&mut self, profile: ShaderProfile) {
        info!("shader profile: {}", profile.version_directive());
    }

    fn mouse_event(&mut self, event: &MouseEvent) {
        debug!(
            "mouse {:?} at {:.0},{:.0}",
            event.action, event.pos.x, event.pos.y
        );
    }

    fn key_event(&mut self, event: &KeyEvent) {
        debug!("key {:?} {}", event.action, event.key_code);
    }

    fn text_input_event(&mut self, event: &TextInputEvent) {
        debug!("text committed: {:?}", event.text);
    }

    fn text_editing_event(&mut self, event: &TextEditingEvent) {
        debug!("composing: {:?} (cursor {})", event.text, event.cursor);
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = load_cfg();

    if let Some(path) = &args.texture {
        let map = load_pixels(path);
        info!("texture {}: {}x{}", path.display(), map.width(), map.height());
    }

    let backend_name = args.backend.unwrap_or(cfg.shell.backend);
    let backend = match backend_name.as_str() {
        "vk" | "vulkan" => BackendKind::Vulkan,
        _ => BackendKind::Gl,
    };
    let options = ShellOptions {
        title: args.title.unwrap_or(cfg.shell.title),
        fullscreen: args.fullscreen || cfg.shell.fullscreen,
        depth_buffer: cfg.shell.depth_buffer,
    };
    info!("backend = {backend_name}");

    let mut shell = Shell::new(Box::new(DemoEngine::new()), backend, options)?;
    shell.exec()?;
    Ok(())
}
