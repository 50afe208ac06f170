//! Frame timing.

use std::time::{Duration, Instant};

/// Monotonic frame clock.
///
/// Each call to [`Clock::tick`] returns the time since the previous tick in
/// seconds.
#[derive(Debug, Clone)]
pub struct Clock {
    start: Instant,
    last: Instant,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    #[must_use]
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
        }
    }

    /// Advance the clock and return the delta since the last tick in seconds.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last).as_secs_f32();
        self.last = now;
        dt
    }

    /// Total time since the clock was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Averages frame times over a refresh window and logs the result.
#[derive(Debug, Clone)]
pub struct FpsService {
    refresh: f32,
    accumulated: f32,
    frames: u32,
    last_fps: f32,
}

impl Default for FpsService {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl FpsService {
    /// Create a service that reports once per `refresh` interval.
    #[must_use]
    pub fn new(refresh: Duration) -> Self {
        Self {
            refresh: refresh.as_secs_f32(),
            accumulated: 0.0,
            frames: 0,
            last_fps: 0.0,
        }
    }

    /// Record one frame. Returns the averaged FPS when a refresh window closes.
    #[allow(clippy::cast_precision_loss)]
    pub fn update(&mut self, dt: f32) -> Option<f32> {
        self.accumulated += dt;
        self.frames += 1;

        if self.accumulated < self.refresh {
            return None;
        }

        let fps = self.frames as f32 / self.accumulated;
        tracing::info!("FPS: {:.1} ({:.2} ms)", fps, 1000.0 / fps);

        self.last_fps = fps;
        self.accumulated = 0.0;
        self.frames = 0;
        Some(fps)
    }

    /// The most recently reported FPS value.
    #[must_use]
    pub const fn fps(&self) -> f32 {
        self.last_fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn clock_reports_delta() {
        let mut clock = Clock::new();
        let base = clock.last;
        let dt = clock.tick_at(base + Duration::from_millis(250));
        assert_relative_eq!(dt, 0.25, epsilon = 1e-6);

        let dt = clock.tick_at(base + Duration::from_millis(300));
        assert_relative_eq!(dt, 0.05, epsilon = 1e-6);
    }

    #[test]
    fn clock_never_goes_backwards() {
        let mut clock = Clock::new();
        let base = clock.last;
        clock.tick_at(base + Duration::from_millis(10));
        assert_relative_eq!(clock.tick_at(base), 0.0);
    }

    #[test]
    fn fps_reports_once_per_window() {
        let mut fps = FpsService::new(Duration::from_secs(1));
        for _ in 0..7 {
            assert!(fps.update(0.125).is_none());
        }
        let reported = fps.update(0.125).expect("window closed");
        assert_relative_eq!(reported, 8.0);
        assert_relative_eq!(fps.fps(), reported);

        // Window restarts
        assert!(fps.update(0.1).is_none());
    }
}
