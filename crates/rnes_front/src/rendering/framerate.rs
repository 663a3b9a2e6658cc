use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Moving average over the last few presented frames.
pub struct FrameRate {
    frame_lengths: VecDeque<Duration>,
    window: usize,
    frame_sum: Duration,
    last_time: Instant,
}

impl FrameRate {
    pub fn new() -> Self {
        Self::with_window(120)
    }

    /// # Arguments
    ///
    /// * `window` - The amount of frames to average over.
    pub fn with_window(window: usize) -> Self {
        Self {
            frame_lengths: VecDeque::with_capacity(window),
            window: window.max(1),
            frame_sum: Duration::ZERO,
            last_time: Instant::now(),
        }
    }

    pub fn frame_finished(&mut self) {
        self.frame_finished_at(Instant::now());
    }

    pub fn frame_finished_at(&mut self, now: Instant) {
        let delta = now.saturating_duration_since(self.last_time);

        if self.frame_lengths.len() == self.window {
            if let Some(oldest) = self.frame_lengths.pop_front() {
                self.frame_sum -= oldest;
            }
        }

        self.frame_lengths.push_back(delta);
        self.frame_sum += delta;
        self.last_time = now;
    }

    pub fn fps(&self) -> f32 {
        if self.frame_sum.is_zero() {
            return 0.0;
        }

        self.frame_lengths.len() as f32 / self.frame_sum.as_secs_f32()
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::new()
    }
}
