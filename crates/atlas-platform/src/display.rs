// SPDX-License-Identifier: CEPL-1.0
//! Display-bounds resolution for initial window placement: prefer the
//! display under the pointer, fall back to the primary display.

use tracing::debug;
use winit::event_loop::ActiveEventLoop;
use winit::monitor::MonitorHandle;

/// Screen-space rectangle in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= f64::from(self.x)
            && y >= f64::from(self.y)
            && x < f64::from(self.x) + f64::from(self.width)
            && y < f64::from(self.y) + f64::from(self.height)
    }

    /// Top-left position that centers a `width` x `height` window inside
    /// these bounds. Windows larger than the bounds pin to the top-left.
    pub fn centered(&self, width: u32, height: u32) -> (i32, i32) {
        let x = self.x + (self.width.saturating_sub(width) / 2) as i32;
        let y = self.y + (self.height.saturating_sub(height) / 2) as i32;
        (x, y)
    }
}

/// Pure selection rule: the rectangle containing `pointer` wins, then the
/// primary, then the first enumerated.
pub fn pick_bounds(
    all: &[Bounds],
    primary: Option<Bounds>,
    pointer: Option<(f64, f64)>,
) -> Option<Bounds> {
    if let Some((px, py)) = pointer {
        if let Some(bounds) = all.iter().find(|b| b.contains(px, py)) {
            return Some(*bounds);
        }
    }
    primary.or_else(|| all.first().copied())
}

fn monitor_bounds(monitor: &MonitorHandle) -> Bounds {
    let pos = monitor.position();
    let size = monitor.size();
    Bounds {
        x: pos.x,
        y: pos.y,
        width: size.width,
        height: size.height,
    }
}

/// Resolves the display a new window should be placed on. `pointer` is
/// the last known pointer position in screen coordinates; the windowing
/// layer offers no global pointer query, so callers pass what they have
/// (typically nothing before the first window exists).
pub fn resolve_bounds(
    event_loop: &ActiveEventLoop,
    pointer: Option<(f64, f64)>,
) -> Option<Bounds> {
    let all: Vec<Bounds> = event_loop
        .available_monitors()
        .map(|m| monitor_bounds(&m))
        .collect();
    let primary = event_loop.primary_monitor().map(|m| monitor_bounds(&m));
    let picked = pick_bounds(&all, primary, pointer);
    if let Some(b) = picked {
        debug!(
            "placing on display at {},{} ({}x{})",
            b.x, b.y, b.width, b.height
        );
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEFT: Bounds = Bounds {
        x: 0,
        y: 0,
        width: 1920,
        height: 1080,
    };
    const RIGHT: Bounds = Bounds {
        x: 1920,
        y: 0,
        width: 1280,
        height: 1024,
    };

    #[test]
    fn pointer_inside_a_display_picks_it() {
        let picked = pick_bounds(&[LEFT, RIGHT], Some(LEFT), Some((2000.0, 500.0)));
        assert_eq!(picked, Some(RIGHT));
    }

    #[test]
    fn pointer_outside_all_falls_back_to_primary() {
        let picked = pick_bounds(&[LEFT, RIGHT], Some(RIGHT), Some((-50.0, -50.0)));
        assert_eq!(picked, Some(RIGHT));
    }

    #[test]
    fn no_pointer_and_no_primary_uses_first() {
        let picked = pick_bounds(&[LEFT, RIGHT], None, None);
        assert_eq!(picked, Some(LEFT));
    }

    #[test]
    fn no_displays_resolves_to_nothing() {
        assert_eq!(pick_bounds(&[], None, Some((10.0, 10.0))), None);
    }

    #[test]
    fn edges_are_half_open() {
        assert!(LEFT.contains(0.0, 0.0));
        assert!(!LEFT.contains(1920.0, 500.0));
        assert!(RIGHT.contains(1920.0, 500.0));
    }

    #[test]
    fn centering_a_small_window() {
        assert_eq!(RIGHT.centered(512, 512), (1920 + 384, 256));
    }

    #[test]
    fn oversized_window_pins_to_origin() {
        assert_eq!(LEFT.centered(4000, 4000), (0, 0));
    }
}
