//! Bounded per-object observation history.

use std::collections::VecDeque;

use denm_core::geo::Position;

#[derive(Debug, Clone)]
pub struct ObjectHistory {
    samples: VecDeque<(f64, Position)>,
    capacity: usize,
    smoothed_speed: f64,
}

impl ObjectHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            smoothed_speed: 0.0,
        }
    }

    /// Record an observation, evicting the oldest once full.
    pub fn observation_record(&mut self, timestamp: f64, position: Position) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back((timestamp, position));
    }

    /// Displacement between oldest and newest sample over elapsed time.
    /// Zero with fewer than two samples or no elapsed time.
    pub fn raw_speed(&self) -> f64 {
        let (Some(oldest), Some(newest)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };
        if self.samples.len() < 2 {
            return 0.0;
        }
        let elapsed = newest.0 - oldest.0;
        if elapsed <= 0.0 {
            return 0.0;
        }
        oldest.1.distance_to(&newest.1) / elapsed
    }

    /// Fold the raw speed into the exponential estimate and clamp it.
    pub fn speed_smooth(&mut self, alpha: f64, max_speed: f64) -> f64 {
        let raw = self.raw_speed();
        self.smoothed_speed = (alpha * raw + (1.0 - alpha) * self.smoothed_speed).min(max_speed);
        self.smoothed_speed
    }

    pub fn smoothed_speed(&self) -> f64 {
        self.smoothed_speed
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = &(f64, Position)> {
        self.samples.iter()
    }
}
