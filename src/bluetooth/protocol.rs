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

//! Fishfinder packet codec.
//!
//! Sample packet (18 bytes, notified on the Sample characteristic):
//!
//! | Byte  | Meaning                                                   |
//! |-------|-----------------------------------------------------------|
//! | 0-1   | ID bytes `83, 70`                                         |
//! | 2-3   | reserved, 0                                               |
//! | 4     | status flags, `0x08` = dry                                |
//! | 5     | fixed `9`                                                 |
//! | 6-7   | depth in feet, integer part and hundredths                |
//! | 8     | bottom strength, 0-255                                    |
//! | 9-10  | fish depth in feet, integer part and hundredths           |
//! | 11    | low nibble fish strength 0-15, high nibble battery 0-6    |
//! | 12-13 | temperature in Fahrenheit, integer part and hundredths    |
//! | 14-16 | reserved, 0                                               |
//! | 17    | checksum, sum of bytes 0-16 modulo 256                    |
//!
//! Configure packet (12 bytes, written by the companion): ID bytes, two
//! reserved bytes, command `1`, payload size `3`, then sensitivity, noise
//! and range. Bytes 9-11 are ignored.
//!
//! Location packet (16 bytes): latitude and longitude as big-endian `f64`.

use thiserror::Error;

use super::ble_constants::GattStatus;
use crate::simulator::{Configuration, Sample};

/// First ID byte ('S').
pub const ID0: u8 = 83;
/// Second ID byte ('F').
pub const ID1: u8 = 70;

/// The only command fishfinders accept.
pub const COMMAND_CONFIGURE: u8 = 1;
/// Payload size of a configure command.
pub const CONFIGURE_PAYLOAD_SIZE: u8 = 3;

pub const SAMPLE_PACKET_LEN: usize = 18;
pub const CONFIGURE_PACKET_LEN: usize = 12;
pub const LOCATION_PACKET_LEN: usize = 16;

/// Sample packet status flags (byte 4).
pub mod flags {
    pub const DRY: u8 = 0x08;
}

/// Fixed value of sample packet byte 5.
const SAMPLE_BYTE5: u8 = 9;

/// Reasons a configure packet is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("ID bytes don't match: {id0} {id1}")]
    BadMagic { id0: u8, id1: u8 },
    #[error("unexpected command {command} with size {size}")]
    UnexpectedCommand { command: u8, size: u8 },
}

impl PacketError {
    /// Result code reported to the transport.
    pub fn status(&self) -> GattStatus {
        match self {
            PacketError::WrongLength { .. } => GattStatus::InvalidAttributeLength,
            PacketError::BadMagic { .. } | PacketError::UnexpectedCommand { .. } => {
                GattStatus::Failure
            }
        }
    }
}

/// Split a value into an integer byte and a hundredths byte, both floored.
///
/// Out-of-range parts wrap like the device's byte casts.
fn fixed_point(value: f64) -> (u8, u8) {
    let whole = value.floor();
    let hundredths = ((value - whole) * 100.0).floor();
    (whole as i32 as u8, hundredths as i32 as u8)
}

/// Sum of bytes modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// Encode a sample notification.
///
/// The dry flag is set when `dry` is requested or the sample depth is not
/// positive.
pub fn encode_sample(sample: &Sample, dry: bool) -> [u8; SAMPLE_PACKET_LEN] {
    let mut data = [0u8; SAMPLE_PACKET_LEN];
    data[0] = ID0;
    data[1] = ID1;
    if dry || sample.is_dry() {
        data[4] = flags::DRY;
    }
    data[5] = SAMPLE_BYTE5;

    (data[6], data[7]) = fixed_point(sample.depth_ft());
    data[8] = (sample.strength * 255.0 / 100.0) as i32 as u8;
    (data[9], data[10]) = fixed_point(sample.fish_depth_ft());

    let fish = (sample.fish_strength * 15.0 / 100.0) as i32;
    let battery = (6.0 * sample.battery / 100.0).floor() as i32;
    data[11] = ((fish & 0x0f) | (battery << 4)) as u8;

    (data[12], data[13]) = fixed_point(sample.temperature_f());

    data[17] = checksum(&data[..17]);
    data
}

/// Encode a location notification.
pub fn encode_location(sample: &Sample) -> [u8; LOCATION_PACKET_LEN] {
    let mut data = [0u8; LOCATION_PACKET_LEN];
    data[..8].copy_from_slice(&sample.latitude.to_be_bytes());
    data[8..].copy_from_slice(&sample.longitude.to_be_bytes());
    data
}

/// Decode a location notification into (latitude, longitude).
pub fn decode_location(data: &[u8]) -> Result<(f64, f64), PacketError> {
    let data: &[u8; LOCATION_PACKET_LEN] =
        data.try_into().map_err(|_| PacketError::WrongLength {
            expected: LOCATION_PACKET_LEN,
            actual: data.len(),
        })?;
    let mut lat = [0u8; 8];
    let mut lon = [0u8; 8];
    lat.copy_from_slice(&data[..8]);
    lon.copy_from_slice(&data[8..]);
    Ok((f64::from_be_bytes(lat), f64::from_be_bytes(lon)))
}

/// A decoded configure command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureCommand {
    pub sensitivity: u8,
    pub noise: u8,
    pub range: u8,
}

impl ConfigureCommand {
    pub fn new(sensitivity: u8, noise: u8, range: u8) -> Self {
        Self {
            sensitivity,
            noise,
            range,
        }
    }

    /// Parse a configure packet as written by the companion.
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() != CONFIGURE_PACKET_LEN {
            return Err(PacketError::WrongLength {
                expected: CONFIGURE_PACKET_LEN,
                actual: data.len(),
            });
        }
        if data[0] != ID0 || data[1] != ID1 {
            return Err(PacketError::BadMagic {
                id0: data[0],
                id1: data[1],
            });
        }
        let (command, size) = (data[4], data[5]);
        if command != COMMAND_CONFIGURE || size != CONFIGURE_PAYLOAD_SIZE {
            return Err(PacketError::UnexpectedCommand { command, size });
        }
        Ok(Self::new(data[6], data[7], data[8]))
    }

    /// Build the packet a companion would write.
    pub fn encode(&self) -> [u8; CONFIGURE_PACKET_LEN] {
        let mut data = [0u8; CONFIGURE_PACKET_LEN];
        data[0] = ID0;
        data[1] = ID1;
        data[4] = COMMAND_CONFIGURE;
        data[5] = CONFIGURE_PAYLOAD_SIZE;
        data[6] = self.sensitivity;
        data[7] = self.noise;
        data[8] = self.range;
        data
    }
}

impl From<ConfigureCommand> for Configuration {
    fn from(cmd: ConfigureCommand) -> Self {
        Configuration::new(cmd.sensitivity, cmd.noise, cmd.range)
    }
}
