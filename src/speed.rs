use crate::config::SpeedConfig;
use crate::sample_buffer::{SampleBuffer, TouchSample};

/// Per-axis drag speed. Raw values are px/ms; normalized values are the
/// dimensionless scale callers clamp into their own range.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

impl Velocity {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
}

/// Windowed speed tracker over the recent touch path.
///
/// Speed is path length over elapsed time, so back-and-forth jitter counts
/// as motion. Samples that fall out of the window are evicted whenever a
/// speed is read.
pub struct SpeedEstimator {
    samples: SampleBuffer,
    window_ms: u64,
    normalize_factor: f32,
}

impl SpeedEstimator {
    pub fn new(window_ms: u64, normalize_factor: f32) -> Self {
        Self {
            samples: SampleBuffer::new(window_ms),
            window_ms,
            normalize_factor,
        }
    }

    pub fn from_config(config: &SpeedConfig) -> Self {
        Self::new(config.window_ms, config.normalize_factor)
    }

    pub fn add(&mut self, sample: TouchSample) {
        self.samples.push(sample);
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    pub fn samples(&self) -> &SampleBuffer {
        &self.samples
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn speed(&mut self, now_ms: u64) -> Velocity {
        let mut expired = 0usize;
        let mut live = 0usize;
        let mut start_ms = 0u64;
        let mut end_ms = 0u64;
        let mut prev: Option<TouchSample> = None;
        let mut distance_x = 0.0f32;
        let mut distance_y = 0.0f32;

        for sample in self.samples.iter() {
            if now_ms.saturating_sub(sample.t_ms) > self.window_ms {
                expired += 1;
                continue;
            }
            if let Some(prev) = prev {
                distance_x += (sample.x - prev.x).abs();
                distance_y += (sample.y - prev.y).abs();
            } else {
                start_ms = sample.t_ms;
            }
            end_ms = sample.t_ms;
            prev = Some(*sample);
            live += 1;
        }

        if expired > 0 {
            self.samples.evict_front(expired);
        }
        if live < 2 {
            return Velocity::ZERO;
        }

        let elapsed_ms = end_ms.saturating_sub(start_ms).max(1) as f32;
        Velocity {
            x: distance_x / elapsed_ms,
            y: distance_y / elapsed_ms,
        }
    }

    pub fn normalized_speed(&mut self, now_ms: u64) -> Velocity {
        let speed = self.speed(now_ms);
        if self.normalize_factor <= 0.0 {
            return speed;
        }
        Velocity {
            x: speed.x / self.normalize_factor,
            y: speed.y / self.normalize_factor,
        }
    }
}
