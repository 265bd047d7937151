// SPDX-License-Identifier: CEPL-1.0
//! When to animate and when to paint. Animation runs on a floor clock,
//! at most once per step, rescheduled from the moment it actually ran.
//! Painting happens only when something marked the frame dirty.

use std::time::{Duration, Instant};

/// Floor between animation callbacks.
pub const ANIMATION_STEP: Duration = Duration::from_millis(8);

pub struct FramePacing {
    epoch: Instant,
    animation_deadline: Option<Instant>,
    dirty: bool,
}

impl FramePacing {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(epoch: Instant) -> Self {
        FramePacing {
            epoch,
            animation_deadline: None,
            dirty: false,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Consumes the dirty flag. Any number of marks since the last paint
    /// collapse into one `true`.
    pub fn take_paint(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Returns the animation timestamp in milliseconds since the shell
    /// started, if the step has elapsed. The next deadline counts from
    /// `now`, not from the previous deadline, so a stalled pump does not
    /// owe a burst of catch-up ticks.
    pub fn take_animation_tick(&mut self, now: Instant) -> Option<f64> {
        match self.animation_deadline {
            Some(deadline) if now < deadline => None,
            _ => {
                self.animation_deadline = Some(now + ANIMATION_STEP);
                Some(now.duration_since(self.epoch).as_secs_f64() * 1000.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_animates_immediately() {
        let epoch = Instant::now();
        let mut pacing = FramePacing::starting_at(epoch);
        assert!(pacing.take_animation_tick(epoch).is_some());
    }

    #[test]
    fn ticks_inside_the_step_are_swallowed() {
        let epoch = Instant::now();
        let mut pacing = FramePacing::starting_at(epoch);

        assert!(pacing.take_animation_tick(epoch).is_some());
        assert!(pacing
            .take_animation_tick(epoch + Duration::from_millis(1))
            .is_none());
        assert!(pacing
            .take_animation_tick(epoch + Duration::from_millis(7))
            .is_none());
        assert!(pacing
            .take_animation_tick(epoch + ANIMATION_STEP)
            .is_some());
    }

    #[test]
    fn deadline_counts_from_the_tick_that_ran() {
        let epoch = Instant::now();
        let mut pacing = FramePacing::starting_at(epoch);

        assert!(pacing.take_animation_tick(epoch).is_some());
        // A late tick reschedules from itself, not from the 8ms grid.
        assert!(pacing
            .take_animation_tick(epoch + Duration::from_millis(20))
            .is_some());
        assert!(pacing
            .take_animation_tick(epoch + Duration::from_millis(24))
            .is_none());
        assert!(pacing
            .take_animation_tick(epoch + Duration::from_millis(28))
            .is_some());
    }

    #[test]
    fn timestamps_are_milliseconds_since_start() {
        let epoch = Instant::now();
        let mut pacing = FramePacing::starting_at(epoch);

        let first = pacing.take_animation_tick(epoch).unwrap();
        assert!(first.abs() < 1e-6);

        let later = pacing
            .take_animation_tick(epoch + Duration::from_millis(16))
            .unwrap();
        assert!((later - 16.0).abs() < 1e-6);
    }

    #[test]
    fn repeated_marks_collapse_into_one_paint() {
        let mut pacing = FramePacing::starting_at(Instant::now());
        assert!(!pacing.take_paint());

        pacing.mark_dirty();
        pacing.mark_dirty();
        pacing.mark_dirty();
        assert!(pacing.take_paint());
        assert!(!pacing.take_paint());
    }
}
