// Rolling statistic for one counter kind of one interface: rate, max, sum, trailing average.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::models::StatValues;

/// Default averaging window (30 s).
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(30_000);

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    at: Instant,
    delta: u64,
    elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct RollingStat {
    window_duration: Duration,
    current_rate: Option<f64>,
    running_max: f64,
    running_sum: u64,
    window: VecDeque<WindowEntry>,
    // integer totals over `window`; kept exact so the average never drifts
    window_delta: u128,
    window_elapsed: Duration,
}

impl RollingStat {
    pub fn new(window_duration: Duration) -> Self {
        Self {
            window_duration,
            current_rate: None,
            running_max: 0.0,
            running_sum: 0,
            window: VecDeque::new(),
            window_delta: 0,
            window_elapsed: Duration::ZERO,
        }
    }

    /// Feeds one interval's delta observed at `now`. Zero-length intervals are ignored.
    pub fn update(&mut self, delta: u64, elapsed: Duration, now: Instant) {
        if elapsed.is_zero() {
            return;
        }
        let rate = delta as f64 / elapsed.as_secs_f64();
        self.current_rate = Some(rate);
        self.running_max = self.running_max.max(rate);
        self.running_sum = self.running_sum.saturating_add(delta);

        self.evict(now);
        self.window.push_back(WindowEntry {
            at: now,
            delta,
            elapsed,
        });
        self.window_delta += delta as u128;
        self.window_elapsed += elapsed;
    }

    /// Drops entries recorded at or before `now - window_duration`.
    fn evict(&mut self, now: Instant) {
        while let Some(front) = self.window.front() {
            let age = now.saturating_duration_since(front.at);
            if age < self.window_duration {
                break;
            }
            self.window_delta -= front.delta as u128;
            self.window_elapsed = self.window_elapsed.saturating_sub(front.elapsed);
            self.window.pop_front();
        }
    }

    pub fn current_rate(&self) -> Option<f64> {
        self.current_rate
    }

    pub fn running_max(&self) -> f64 {
        self.running_max
    }

    pub fn running_sum(&self) -> u64 {
        self.running_sum
    }

    pub fn average(&self) -> Option<f64> {
        if self.window.is_empty() || self.window_elapsed.is_zero() {
            return None;
        }
        Some(self.window_delta as f64 / self.window_elapsed.as_secs_f64())
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn window_duration(&self) -> Duration {
        self.window_duration
    }

    /// Clears max, sum and window. The current rate survives until the next update.
    pub fn reset(&mut self) {
        self.running_max = 0.0;
        self.running_sum = 0;
        self.window.clear();
        self.window_delta = 0;
        self.window_elapsed = Duration::ZERO;
    }

    pub fn values(&self) -> StatValues {
        StatValues {
            rate: self.current_rate,
            max: self.running_max,
            sum: self.running_sum,
            average: self.average(),
        }
    }
}

impl Default for RollingStat {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
