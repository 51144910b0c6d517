// World clock: monotonically increasing elapsed time plus a clamped frame delta.
// The delta clamp keeps a resume-from-pause or a breakpoint from turning into
// one enormous integration step.

use std::time::Instant;

use bevy_ecs::prelude::*;

#[derive(Resource, Debug, Clone)]
pub struct WorldClock {
    start: Instant,
    /// Seconds since start, as of the last tick.
    elapsed: f64,
    /// Clamped seconds between the last two ticks.
    delta: f32,
    max_delta: f32,
    frame: u64,
}

impl WorldClock {
    pub fn new(max_delta: f32) -> Self {
        Self {
            start: Instant::now(),
            elapsed: 0.0,
            delta: 0.0,
            max_delta,
            frame: 0,
        }
    }

    /// Sample the wall clock. Returns `true` when the delta had to be clamped.
    pub fn tick(&mut self) -> bool {
        let now = self.start.elapsed().as_secs_f64();
        self.advance_to(now)
    }

    /// Move the clock to `now` seconds since start.
    ///
    /// Times earlier than the current one are treated as "no time passed".
    /// Returns `true` when the delta had to be clamped.
    pub fn advance_to(&mut self, now: f64) -> bool {
        let now = now.max(self.elapsed);
        let raw = (now - self.elapsed) as f32;
        self.elapsed = now;
        self.delta = raw.min(self.max_delta);
        self.frame += 1;
        raw > self.max_delta
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn max_delta(&self) -> f32 {
        self.max_delta
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let clock = WorldClock::new(0.1);
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.delta(), 0.0);
        assert_eq!(clock.frame(), 0);
    }

    #[test]
    fn delta_tracks_elapsed() {
        let mut clock = WorldClock::new(0.1);
        assert!(!clock.advance_to(0.016));
        assert!(!clock.advance_to(0.048));
        assert!((clock.delta() - 0.032).abs() < 1e-6);
        assert_eq!(clock.elapsed(), 0.048);
        assert_eq!(clock.frame(), 2);
    }

    #[test]
    fn long_frames_are_clamped() {
        let mut clock = WorldClock::new(0.1);
        assert!(clock.advance_to(5.0));
        assert_eq!(clock.delta(), 0.1);
        // Elapsed time still follows the wall clock.
        assert_eq!(clock.elapsed(), 5.0);
    }

    #[test]
    fn time_never_runs_backwards() {
        let mut clock = WorldClock::new(0.1);
        clock.advance_to(2.0);
        clock.advance_to(1.0);
        assert_eq!(clock.elapsed(), 2.0);
        assert_eq!(clock.delta(), 0.0);
    }

    #[test]
    fn wall_clock_ticks_forward() {
        let mut clock = WorldClock::new(0.1);
        std::thread::sleep(std::time::Duration::from_millis(5));
        clock.tick();
        assert!(clock.elapsed() > 0.0);
        assert!(clock.delta() > 0.0);
    }
}
