//! Frame timing
//!
//! The frame driver needs a strictly positive delta every frame, so both
//! wall-clock and simulated ticks are clamped to one nanosecond.

use std::time::{Duration, Instant};

/// Smallest delta handed to the update passes, in seconds
pub const MIN_FRAME_DELTA: f32 = 1.0e-9;

/// Frame timer producing per-frame deltas
///
/// Works either from the wall clock ([`Timer::tick`]) or from externally
/// supplied deltas ([`Timer::advance`]), which is what headless runs and
/// tests use.
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
    fps_window: f32,
    fps_frames: u32,
    fps: f32,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
            fps_window: 0.0,
            fps_frames: 0,
            fps: 0.0,
        }
    }

    /// Measure the wall-clock time since the previous tick and record it
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.advance(elapsed.as_secs_f32())
    }

    /// Record a frame of `seconds` without looking at the clock
    pub fn advance(&mut self, seconds: f32) -> f32 {
        let delta = seconds.max(MIN_FRAME_DELTA);
        self.delta_time = delta;
        self.total_time += delta;
        self.frame_count += 1;

        self.fps_window += delta;
        self.fps_frames += 1;
        if self.fps_window >= 1.0 {
            self.fps = self.fps_frames as f32 / self.fps_window;
            log::trace!("fps: {:.1}", self.fps);
            self.fps_window = 0.0;
            self.fps_frames = 0;
        }
        delta
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second measured over the last full second
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

/// Accumulating stopwatch, used to measure query cost
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Start (or resume) measuring
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Stop and accumulate the running interval
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed += start.elapsed();
        }
    }

    /// Total measured time
    pub fn elapsed(&self) -> Duration {
        self.elapsed + self.start_time.map_or(Duration::ZERO, |start| start.elapsed())
    }

    /// Total measured time in milliseconds
    pub fn elapsed_millis(&self) -> f32 {
        self.elapsed().as_secs_f32() * 1000.0
    }
}
