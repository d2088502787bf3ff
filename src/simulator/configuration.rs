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

//! Device configuration state (sensitivity, noise filter, depth range).

/// Depth scale in metres, indexed by range.
pub const RANGE_DEPTH: [u16; 7] = [3, 6, 9, 18, 24, 36, 36];

/// Noise filter names, indexed by noise.
pub const NOISE_NAMES: [&str; 4] = ["Off", "Low", "Medium", "High"];

/// Noise filter level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseLevel {
    Off,
    Low,
    Medium,
    High,
}

impl NoiseLevel {
    /// Parse from a wire index.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Off),
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        NOISE_NAMES[*self as usize]
    }
}

/// Maximum depth a generator may emit for a range index.
///
/// Indices outside the table fall through to the deepest scale.
pub fn max_depth_for_range(range: u8) -> f32 {
    match range {
        0 => 3.0,
        1 => 6.0,
        2 => 9.0,
        3 => 18.0,
        4 => 24.0,
        _ => 36.0,
    }
}

/// Configuration as last written by the companion.
///
/// Values are stored exactly as received; only the packet structure is
/// validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    /// Sensitivity, 0-100.
    pub sensitivity: u8,
    /// Index into [`NOISE_NAMES`].
    pub noise: u8,
    /// Index into [`RANGE_DEPTH`].
    pub range: u8,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            sensitivity: 50,
            noise: 0,
            range: 6,
        }
    }
}

impl Configuration {
    pub fn new(sensitivity: u8, noise: u8, range: u8) -> Self {
        Self {
            sensitivity,
            noise,
            range,
        }
    }

    pub fn noise_level(&self) -> Option<NoiseLevel> {
        NoiseLevel::from_index(self.noise)
    }

    /// Noise name for display; indices past the table read as the last entry.
    pub fn noise_name(&self) -> &'static str {
        self.noise_level().unwrap_or(NoiseLevel::High).as_str()
    }

    /// Depth scale in metres for display.
    pub fn range_depth(&self) -> u16 {
        RANGE_DEPTH
            .get(self.range as usize)
            .copied()
            .unwrap_or(RANGE_DEPTH[RANGE_DEPTH.len() - 1])
    }

    pub fn max_depth(&self) -> f32 {
        max_depth_for_range(self.range)
    }
}

impl std::fmt::Display for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "sensitivity {} noise {} range {} ({}m)",
            self.sensitivity,
            self.noise_name(),
            self.range,
            self.range_depth()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Configuration::default();
        assert_eq!(config.sensitivity, 50);
        assert_eq!(config.noise_level(), Some(NoiseLevel::Off));
        assert_eq!(config.range, 6);
        assert_eq!(config.range_depth(), 36);
        assert_eq!(config.max_depth(), 36.0);
    }

    #[test]
    fn test_range_table() {
        let expected = [3.0, 6.0, 9.0, 18.0, 24.0, 36.0, 36.0];
        for (range, depth) in expected.iter().enumerate() {
            assert_eq!(max_depth_for_range(range as u8), *depth);
            assert_eq!(RANGE_DEPTH[range] as f32, *depth);
        }
        // Out-of-table indices fall through to the default
        assert_eq!(max_depth_for_range(7), 36.0);
        assert_eq!(max_depth_for_range(255), 36.0);
        assert_eq!(Configuration::new(50, 0, 200).range_depth(), 36);
    }

    #[test]
    fn test_noise_names() {
        assert_eq!(Configuration::new(0, 2, 0).noise_name(), "Medium");
        assert_eq!(Configuration::new(0, 9, 0).noise_name(), "High");
        assert_eq!(Configuration::new(0, 9, 0).noise_level(), None);
        assert_eq!(NoiseLevel::Low.as_str(), "Low");
    }

    #[test]
    fn test_display() {
        let config = Configuration::new(75, 1, 3);
        assert_eq!(config.to_string(), "sensitivity 75 noise Low range 3 (18m)");
    }
}
