// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rolling-average emission rate tracking.

use std::time::Duration;
use tokio::time::Instant;

/// The two independent emission streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// Sonar samples on the Sample endpoint.
    Sonar,
    /// Position fixes on the Location endpoint.
    Location,
}

impl Stream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Sonar => "sonar",
            Stream::Location => "location",
        }
    }
}

/// Slowest accepted emission rate.
pub const MIN_RATE_HZ: f64 = 0.001;
/// Fastest accepted emission rate.
pub const MAX_RATE_HZ: f64 = 1000.0;

/// Whether `hz` is an emission rate a stream can run at.
pub fn is_valid_rate(hz: f64) -> bool {
    (MIN_RATE_HZ..=MAX_RATE_HZ).contains(&hz)
}

/// Tracks the observed tick rate of one stream against its target.
#[derive(Debug, Clone)]
pub struct RateTracker {
    target_hz: f64,
    average_hz: f64,
    count: u64,
    last_tick: Option<Instant>,
}

impl RateTracker {
    /// Create a tracker. `target_hz` should satisfy [`is_valid_rate`].
    pub fn new(target_hz: f64) -> Self {
        Self {
            target_hz,
            average_hz: target_hz,
            count: 0,
            last_tick: None,
        }
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.average_hz = self.target_hz;
        self.count = 0;
        self.last_tick = None;
    }

    /// Change the target rate; history is discarded.
    pub fn set_target(&mut self, target_hz: f64) {
        self.target_hz = target_hz;
        self.reset();
    }

    /// Record a tick at `now`.
    ///
    /// The first tick after a reset only stamps the time. Two ticks at the
    /// same instant contribute no rate sample.
    pub fn record_tick(&mut self, now: Instant) {
        if let Some(last) = self.last_tick {
            let elapsed_ms = now.saturating_duration_since(last).as_secs_f64() * 1000.0;
            if elapsed_ms > 0.0 {
                let rate = 1000.0 / elapsed_ms;
                let count = self.count as f64;
                self.average_hz = (self.average_hz * count + rate) / (count + 1.0);
                self.count += 1;
            }
        }
        self.last_tick = Some(now);
    }

    /// Delay between ticks at the target rate, clamped to the accepted
    /// rate bounds.
    pub fn period(&self) -> Duration {
        let longest = Duration::from_secs_f64(1.0 / MIN_RATE_HZ);
        if self.target_hz.is_nan() {
            return longest;
        }
        let hz = self.target_hz.clamp(MIN_RATE_HZ, MAX_RATE_HZ);
        Duration::try_from_secs_f64(1.0 / hz).unwrap_or(longest)
    }

    pub fn target_hz(&self) -> f64 {
        self.target_hz
    }

    pub fn average_hz(&self) -> f64 {
        self.average_hz
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_only_stamps() {
        let mut tracker = RateTracker::new(8.0);
        tracker.record_tick(Instant::now());
        assert_eq!(tracker.count(), 0);
        assert_eq!(tracker.average_hz(), 8.0);
    }

    #[test]
    fn test_converges_to_true_rate() {
        let mut tracker = RateTracker::new(8.0);
        let start = Instant::now();
        // 100 ms interval while targeting 8 Hz
        for i in 0..60u64 {
            tracker.record_tick(start + Duration::from_millis(100 * i));
        }
        assert_eq!(tracker.count(), 59);
        let error = (tracker.average_hz() - 10.0).abs() / 10.0;
        assert!(error < 0.01, "average {}", tracker.average_hz());
    }

    #[test]
    fn test_rolling_average_formula() {
        let mut tracker = RateTracker::new(1.0);
        let start = Instant::now();
        tracker.record_tick(start);
        tracker.record_tick(start + Duration::from_millis(500)); // 2 Hz
        assert_eq!(tracker.average_hz(), 2.0);
        tracker.record_tick(start + Duration::from_millis(750)); // 4 Hz
        assert_eq!(tracker.average_hz(), 3.0);
        assert_eq!(tracker.count(), 2);
    }

    #[test]
    fn test_set_target_resets() {
        let mut tracker = RateTracker::new(8.0);
        let start = Instant::now();
        tracker.record_tick(start);
        tracker.record_tick(start + Duration::from_millis(50));
        assert_eq!(tracker.count(), 1);

        tracker.set_target(4.0);
        assert_eq!(tracker.count(), 0);
        assert_eq!(tracker.average_hz(), 4.0);
        assert_eq!(tracker.period(), Duration::from_millis(250));
    }

    #[test]
    fn test_rate_bounds() {
        assert!(is_valid_rate(MIN_RATE_HZ));
        assert!(is_valid_rate(8.0));
        assert!(is_valid_rate(MAX_RATE_HZ));
        assert!(!is_valid_rate(0.0));
        assert!(!is_valid_rate(1e-20));
        assert!(!is_valid_rate(1e6));
        assert!(!is_valid_rate(f64::NAN));
        assert!(!is_valid_rate(f64::INFINITY));
    }

    #[test]
    fn test_period_never_panics() {
        assert_eq!(RateTracker::new(1e-20).period(), Duration::from_secs(1000));
        assert_eq!(RateTracker::new(0.0).period(), Duration::from_secs(1000));
        assert_eq!(RateTracker::new(f64::NAN).period(), Duration::from_secs(1000));
        assert_eq!(RateTracker::new(1e9).period(), Duration::from_millis(1));
    }

    #[test]
    fn test_same_instant_is_ignored() {
        let mut tracker = RateTracker::new(8.0);
        let now = Instant::now();
        tracker.record_tick(now);
        tracker.record_tick(now);
        assert_eq!(tracker.count(), 0);
        assert!(tracker.average_hz().is_finite());
    }
}
