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

//! Fishfinder simulation: sample generation, configuration and emission
//! scheduling, independent of the Bluetooth transport.

pub mod configuration;
pub mod generator;
pub mod peripheral;
pub mod rate;
pub mod sample;
pub mod scheduler;
pub mod sink;

pub use configuration::{Configuration, NoiseLevel};
pub use generator::{
    DemoGenerator, FlatlineDepth, FlatlineGenerator, GeneratorKind, SampleGenerator,
    WaveGenerator,
};
pub use peripheral::{
    Peripheral, PeripheralOptions, PeripheralStatus, SimulatorError, DEFAULT_LOCATION_RATE_HZ,
    DEFAULT_SONAR_RATE_HZ,
};
pub use rate::{RateTracker, Stream};
pub use sample::Sample;
pub use scheduler::PeriodicTask;
pub use sink::{LogBuffer, LogSink, NotificationSink, DEFAULT_LOG_LINES};
