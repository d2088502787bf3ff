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

//! Configuration module.
//!
//! Handles loading and saving application settings.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::simulator::rate::{self, MAX_RATE_HZ, MIN_RATE_HZ};
use crate::simulator::{
    GeneratorKind, PeripheralOptions, DEFAULT_LOCATION_RATE_HZ, DEFAULT_SONAR_RATE_HZ,
};

const APP_DIR: &str = "ping-simulator";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bluetooth settings.
    pub bluetooth: BluetoothConfig,

    /// Simulator settings.
    pub simulator: SimulatorSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Device name advertised over Bluetooth.
    pub device_name: String,

    /// Advertise the fishfinder service on start.
    pub advertise: bool,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            device_name: "FishFinder".to_string(),
            advertise: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSettings {
    /// Sample generator used at start-up.
    pub generator: GeneratorKind,

    /// Sonar emission rate in Hz.
    pub sonar_rate_hz: f64,

    /// Location emission rate in Hz.
    pub location_rate_hz: f64,

    /// Always report the transducer as out of water.
    pub dry: bool,

    /// Run the streams without sending notifications.
    pub silent: bool,

    /// Seconds between status log lines, 0 to disable.
    pub status_interval_secs: u64,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            generator: GeneratorKind::Demo,
            sonar_rate_hz: DEFAULT_SONAR_RATE_HZ,
            location_rate_hz: DEFAULT_LOCATION_RATE_HZ,
            dry: false,
            silent: false,
            status_interval_secs: 5,
        }
    }
}

impl SimulatorSettings {
    pub fn validate(&self) -> Result<()> {
        for (name, hz) in [
            ("sonar_rate_hz", self.sonar_rate_hz),
            ("location_rate_hz", self.location_rate_hz),
        ] {
            if !rate::is_valid_rate(hz) {
                bail!(
                    "{} must be between {} and {} Hz, got {}",
                    name,
                    MIN_RATE_HZ,
                    MAX_RATE_HZ,
                    hz
                );
            }
        }
        Ok(())
    }

    pub fn peripheral_options(&self) -> PeripheralOptions {
        PeripheralOptions {
            generator: self.generator,
            sonar_rate_hz: self.sonar_rate_hz,
            location_rate_hz: self.location_rate_hz,
            dry: self.dry,
            silent: self.silent,
        }
    }
}

impl Config {
    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Load configuration from file or create default.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from `path`, writing defaults there if it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            let config = Self::default();
            config.save_to(path)?;
            config
        };

        config.simulator.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
