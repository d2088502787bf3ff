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

//! Sample generation strategies.
//!
//! Three closed variants selected through [`SampleGenerator`]:
//!
//! - **Demo**: stateful, advances one phase step per tick.
//! - **Wave**: derived from wall-clock time, one revolution every 30 seconds.
//! - **Flatline**: constant readings for no-signal testing.
//!
//! Every variant passes its output through [`Sample::checked`], so a
//! non-finite value panics in debug builds and is clamped in release builds.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::configuration::max_depth_for_range;
use super::sample::Sample;

/// Seconds per full revolution for the time-driven generators.
const CYCLE_SECS: f32 = 30.0;

/// Demo phase advance per tick, in degrees.
const DEMO_PHASE_STEP_DEG: f64 = 1.0;
/// Largest bottom-strength change per tick, in percent.
const DEMO_STRENGTH_STEP: f32 = 0.5;
/// Battery drained per tick, in percent.
const DEMO_BATTERY_DRAIN: f32 = 0.01;
/// Chance of a fish return on any tick.
const DEMO_FISH_PROBABILITY: f64 = 0.2;
/// Depth jitter as a fraction of the range, indexed by noise level.
const DEMO_NOISE_JITTER: [f32; 4] = [0.0, 0.01, 0.02, 0.04];

/// Fish strength percent that encodes to `level` in the packet nibble.
fn fish_level_percent(level: u8) -> f32 {
    (level as f32 + 0.5) * 100.0 / 15.0
}

/// Which generator drives the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    #[default]
    Demo,
    Wave,
    Flatline,
}

impl GeneratorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Demo => "demo",
            Self::Wave => "wave",
            Self::Flatline => "flatline",
        }
    }
}

/// Active sample generator.
#[derive(Debug)]
pub enum SampleGenerator {
    Demo(DemoGenerator),
    Wave(WaveGenerator),
    Flatline(FlatlineGenerator),
}

impl SampleGenerator {
    /// Create a fresh generator of the given kind, configured for the deepest range.
    pub fn new(kind: GeneratorKind) -> Self {
        match kind {
            GeneratorKind::Demo => Self::Demo(DemoGenerator::new()),
            GeneratorKind::Wave => Self::Wave(WaveGenerator::new()),
            GeneratorKind::Flatline => Self::Flatline(FlatlineGenerator::new()),
        }
    }

    pub fn kind(&self) -> GeneratorKind {
        match self {
            Self::Demo(_) => GeneratorKind::Demo,
            Self::Wave(_) => GeneratorKind::Wave,
            Self::Flatline(_) => GeneratorKind::Flatline,
        }
    }

    /// Produce a sample for the current wall-clock time.
    pub fn get_sample(&mut self) -> Sample {
        self.sample_at(Utc::now().timestamp_millis())
    }

    /// Produce a sample for `now_ms` (epoch milliseconds).
    pub fn sample_at(&mut self, now_ms: i64) -> Sample {
        match self {
            Self::Demo(g) => g.sample_at(now_ms),
            Self::Wave(g) => g.sample_at(now_ms),
            Self::Flatline(g) => g.sample_at(now_ms),
        }
    }

    /// Apply a device configuration. Never fails; unknown ranges use the
    /// deepest scale. Sensitivity is accepted but has no effect on any
    /// variant.
    pub fn configure(&mut self, _sensitivity: u8, noise: u8, range: u8) {
        let max_depth = max_depth_for_range(range);
        match self {
            Self::Demo(g) => {
                g.max_depth = max_depth;
                g.noise = noise;
            }
            Self::Wave(g) => g.max_depth = max_depth,
            Self::Flatline(g) => g.max_depth = max_depth,
        }
    }

    pub fn max_depth(&self) -> f32 {
        match self {
            Self::Demo(g) => g.max_depth,
            Self::Wave(g) => g.max_depth,
            Self::Flatline(g) => g.max_depth,
        }
    }
}

/// Position on an ellipse of one minute of arc (about one nautical mile).
fn ellipse(theta: f64) -> (f64, f64) {
    (theta.sin() / 60.0, theta.cos() / 60.0)
}

/// Seconds into the current cycle, in `[0, 30)`.
fn cycle_seconds(start_ms: i64, now_ms: i64) -> f32 {
    ((now_ms - start_ms) as f32 / 1000.0).rem_euclid(CYCLE_SECS)
}

fn cycle_angle(t: f32) -> f64 {
    t as f64 * (2.0 * PI) / CYCLE_SECS as f64
}

/// Stateful demo generator.
///
/// Depth follows a sine over a fixed phase step per tick, bottom strength
/// random-walks, fish appear on one tick in five and the battery drains.
#[derive(Debug)]
pub struct DemoGenerator {
    max_depth: f32,
    noise: u8,
    phase_deg: f64,
    strength: f32,
    battery: f32,
    rng: StdRng,
}

impl DemoGenerator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Demo generator with a reproducible random sequence.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            max_depth: max_depth_for_range(u8::MAX),
            noise: 0,
            phase_deg: 0.0,
            strength: 50.0,
            battery: 100.0,
            rng,
        }
    }

    fn sample_at(&mut self, now_ms: i64) -> Sample {
        self.phase_deg = (self.phase_deg + DEMO_PHASE_STEP_DEG) % 360.0;
        let theta = self.phase_deg.to_radians();

        let jitter = self.max_depth * DEMO_NOISE_JITTER[(self.noise as usize).min(3)];
        let mut depth = (self.max_depth as f64 * (theta.sin() + 1.0) / 2.0) as f32;
        if jitter > 0.0 {
            depth += self.rng.gen_range(-jitter..=jitter);
        }

        self.strength += self
            .rng
            .gen_range(-DEMO_STRENGTH_STEP..=DEMO_STRENGTH_STEP);
        if !(0.0..=100.0).contains(&self.strength) {
            self.strength = 50.0;
        }

        let (fish_depth, fish_strength) = if self.rng.gen_bool(DEMO_FISH_PROBABILITY) {
            let level: u8 = self.rng.gen_range(1..=4);
            let fraction: f32 = self.rng.gen_range(0.1..0.9);
            (depth * fraction, fish_level_percent(level))
        } else {
            (0.0, 0.0)
        };

        self.battery = (self.battery - DEMO_BATTERY_DRAIN).max(0.0);

        let (latitude, longitude) = ellipse(theta);
        Sample {
            latitude,
            longitude,
            timestamp_ms: now_ms,
            depth,
            strength: self.strength,
            fish_depth,
            fish_strength,
            battery: self.battery,
            temperature: (20.0 + 15.0 * theta.cos()) as f32,
        }
        .checked(self.max_depth)
    }
}

impl Default for DemoGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Time-driven generator tracing a smooth wave every 30 seconds.
#[derive(Debug)]
pub struct WaveGenerator {
    max_depth: f32,
    start_ms: Option<i64>,
}

impl WaveGenerator {
    pub fn new() -> Self {
        Self {
            max_depth: max_depth_for_range(u8::MAX),
            start_ms: None,
        }
    }

    fn sample_at(&mut self, now_ms: i64) -> Sample {
        let start = *self.start_ms.get_or_insert(now_ms);
        let t = cycle_seconds(start, now_ms);
        let theta = cycle_angle(t);
        let (latitude, longitude) = ellipse(theta);
        let max_depth = self.max_depth as f64;

        Sample {
            latitude,
            longitude,
            timestamp_ms: now_ms,
            depth: (max_depth * (theta.sin() + 1.0) / 2.0) as f32,
            strength: 50.0,
            fish_depth: (max_depth * ((3.0 * theta).cos() + 1.0) / 4.0) as f32,
            fish_strength: 25.0,
            battery: 100.0 * t / CYCLE_SECS,
            temperature: (22.0 + 10.0 * (5.0 * theta).sin()) as f32,
        }
        .checked(self.max_depth)
    }
}

impl Default for WaveGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Depth held by a flatline generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlatlineDepth {
    /// Half of the configured range's maximum depth.
    HalfRange,
    /// A fixed depth in metres.
    Fixed(f32),
}

/// Constant-reading generator for degenerate and no-signal conditions.
#[derive(Debug)]
pub struct FlatlineGenerator {
    max_depth: f32,
    depth: FlatlineDepth,
    start_ms: Option<i64>,
}

impl FlatlineGenerator {
    pub fn new() -> Self {
        Self::holding(FlatlineDepth::HalfRange)
    }

    /// A flatline that reports the transducer out of the water.
    pub fn dry() -> Self {
        Self::holding(FlatlineDepth::Fixed(0.0))
    }

    pub fn holding(depth: FlatlineDepth) -> Self {
        Self {
            max_depth: max_depth_for_range(u8::MAX),
            depth,
            start_ms: None,
        }
    }

    fn sample_at(&mut self, now_ms: i64) -> Sample {
        let start = *self.start_ms.get_or_insert(now_ms);
        let (latitude, longitude) = ellipse(cycle_angle(cycle_seconds(start, now_ms)));
        let depth = match self.depth {
            FlatlineDepth::HalfRange => self.max_depth / 2.0,
            FlatlineDepth::Fixed(depth) => depth,
        };

        Sample {
            latitude,
            longitude,
            timestamp_ms: now_ms,
            depth,
            strength: 0.0,
            fish_depth: 0.0,
            fish_strength: 0.0,
            battery: 100.0,
            temperature: 15.0,
        }
        .checked(self.max_depth)
    }
}

impl Default for FlatlineGenerator {
    fn default() -> Self {
        Self::new()
    }
}
