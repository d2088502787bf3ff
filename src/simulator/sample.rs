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

//! Synthetic sensor snapshot.

/// Metres to feet.
pub const METRES_TO_FEET: f64 = 3.2808399;

/// One snapshot of synthetic sonar and location state.
///
/// All fields are canonical units: degrees, epoch milliseconds, metres,
/// percent (0-100) and degrees Celsius. Conversion to device units happens
/// in the packet codec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp_ms: i64,
    /// Metres below the transducer; 0 means dry.
    pub depth: f32,
    /// Bottom signal strength, percent.
    pub strength: f32,
    pub fish_depth: f32,
    /// Fish signal strength, percent.
    pub fish_strength: f32,
    /// Battery level, percent.
    pub battery: f32,
    /// Water temperature, Celsius.
    pub temperature: f32,
}

impl Sample {
    pub fn depth_ft(&self) -> f64 {
        self.depth as f64 * METRES_TO_FEET
    }

    pub fn fish_depth_ft(&self) -> f64 {
        self.fish_depth as f64 * METRES_TO_FEET
    }

    /// Temperature in Fahrenheit. The product is taken in single precision
    /// before widening, which the device firmware reproduces.
    pub fn temperature_f(&self) -> f64 {
        (9.0 * self.temperature) as f64 / 5.0 + 32.0
    }

    /// Enforce the sample invariants.
    ///
    /// Non-finite values are a generator bug: they panic in debug builds and
    /// are replaced by zero in release builds. Depth is clamped to
    /// `[0, max_depth]` and percent fields to `[0, 100]`.
    pub fn checked(self, max_depth: f32) -> Self {
        debug_assert!(
            self.latitude.is_finite() && self.longitude.is_finite(),
            "non-finite position in {:?}",
            self
        );
        debug_assert!(
            [
                self.depth,
                self.strength,
                self.fish_depth,
                self.fish_strength,
                self.battery,
                self.temperature,
            ]
            .iter()
            .all(|v| v.is_finite()),
            "non-finite reading in {:?}",
            self
        );

        Self {
            latitude: finite_or_zero64(self.latitude),
            longitude: finite_or_zero64(self.longitude),
            timestamp_ms: self.timestamp_ms,
            depth: finite_or_zero(self.depth).clamp(0.0, max_depth),
            strength: percent(self.strength),
            fish_depth: finite_or_zero(self.fish_depth).clamp(0.0, max_depth),
            fish_strength: percent(self.fish_strength),
            battery: percent(self.battery),
            temperature: finite_or_zero(self.temperature),
        }
    }

    /// Whether the transducer is out of the water.
    pub fn is_dry(&self) -> bool {
        self.depth <= 0.0
    }
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn finite_or_zero64(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn percent(v: f32) -> f32 {
    finite_or_zero(v).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sample {
        Sample {
            latitude: 0.0,
            longitude: 0.0,
            timestamp_ms: 0,
            depth: 10.0,
            strength: 50.0,
            fish_depth: 5.0,
            fish_strength: 25.0,
            battery: 100.0,
            temperature: 20.0,
        }
    }

    #[test]
    fn test_unit_conversions() {
        let s = sample();
        assert!((s.depth_ft() - 32.808399).abs() < 1e-9);
        assert!((s.fish_depth_ft() - 16.4041995).abs() < 1e-9);
        assert_eq!(s.temperature_f(), 68.0);
    }

    #[test]
    fn test_checked_clamps_depth_and_percentages() {
        let s = Sample {
            depth: 50.0,
            strength: 130.0,
            battery: -4.0,
            ..sample()
        }
        .checked(36.0);

        assert_eq!(s.depth, 36.0);
        assert_eq!(s.strength, 100.0);
        assert_eq!(s.battery, 0.0);
        assert_eq!(s.temperature, 20.0);
    }

    #[test]
    fn test_negative_depth_is_dry() {
        let s = Sample {
            depth: -0.01,
            ..sample()
        }
        .checked(36.0);
        assert_eq!(s.depth, 0.0);
        assert!(s.is_dry());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "non-finite")]
    fn test_nan_fails_fast_in_debug() {
        let _ = Sample {
            depth: f32::NAN,
            ..sample()
        }
        .checked(36.0);
    }
}
