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

//! BLE service, characteristic and descriptor identifiers for the fishfinder.

use uuid::Uuid;

/// Custom fishfinder GATT service UUID.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x0000fff0_0000_1000_8000_00805f9b34fb);

/// Sample characteristic UUID (sonar packets).
/// Properties: Read, Notify, Indicate
pub const SAMPLE_UUID: Uuid = Uuid::from_u128(0x0000fff1_0000_1000_8000_00805f9b34fb);

/// Configure characteristic UUID (companion writes configuration commands here).
/// Properties: Write, Write Without Response
pub const CONFIGURE_UUID: Uuid = Uuid::from_u128(0x0000fff2_0000_1000_8000_00805f9b34fb);

/// Location characteristic UUID (simulated position).
/// Properties: Read, Notify, Indicate
pub const LOCATION_UUID: Uuid = Uuid::from_u128(0x0000fff3_0000_1000_8000_00805f9b34fb);

/// Client Characteristic Configuration descriptor UUID.
pub const CCCD_UUID: Uuid = Uuid::from_u128(0x00002902_0000_1000_8000_00805f9b34fb);

/// Client Characteristic Configuration descriptor values.
pub mod cccd {
    pub const DISABLE: [u8; 2] = [0x00, 0x00];
    pub const ENABLE_NOTIFICATION: [u8; 2] = [0x01, 0x00];
    pub const ENABLE_INDICATION: [u8; 2] = [0x02, 0x00];
}

/// Result codes returned to the transport for every read or write request.
///
/// The discriminants are the ATT protocol error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GattStatus {
    Success = 0x00,
    RequestNotSupported = 0x06,
    InvalidOffset = 0x07,
    InvalidAttributeLength = 0x0d,
    Failure = 0x0e,
}

impl GattStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, GattStatus::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GattStatus::Success => "Success",
            GattStatus::RequestNotSupported => "RequestNotSupported",
            GattStatus::InvalidOffset => "InvalidOffset",
            GattStatus::InvalidAttributeLength => "InvalidAttributeLength",
            GattStatus::Failure => "Failure",
        }
    }
}

impl std::fmt::Display for GattStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        assert_eq!(
            SERVICE_UUID.to_string(),
            "0000fff0-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(SAMPLE_UUID.to_string(), "0000fff1-0000-1000-8000-00805f9b34fb");
        assert_eq!(
            CONFIGURE_UUID.to_string(),
            "0000fff2-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            LOCATION_UUID.to_string(),
            "0000fff3-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(CCCD_UUID.to_string(), "00002902-0000-1000-8000-00805f9b34fb");
    }

    #[test]
    fn test_status_codes() {
        assert!(GattStatus::Success.is_success());
        assert!(!GattStatus::Failure.is_success());
        assert_eq!(GattStatus::InvalidOffset as u8, 0x07);
        assert_eq!(GattStatus::InvalidAttributeLength as u8, 0x0d);
        assert_eq!(GattStatus::RequestNotSupported.to_string(), "RequestNotSupported");
    }
}
