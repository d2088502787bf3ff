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

//! Characteristic identities and the per-endpoint subscription state machine.

use uuid::Uuid;

use super::ble_constants::{cccd, GattStatus, CONFIGURE_UUID, LOCATION_UUID, SAMPLE_UUID};

/// One addressable characteristic of the fishfinder service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Sonar samples, notified.
    Sample,
    /// Simulated position, notified.
    Location,
    /// Configuration commands, written by the companion.
    Configure,
}

/// Characteristic properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Properties {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
    pub indicate: bool,
}

impl Endpoint {
    pub const ALL: [Endpoint; 3] = [Endpoint::Sample, Endpoint::Location, Endpoint::Configure];

    pub fn uuid(&self) -> Uuid {
        match self {
            Endpoint::Sample => SAMPLE_UUID,
            Endpoint::Location => LOCATION_UUID,
            Endpoint::Configure => CONFIGURE_UUID,
        }
    }

    pub fn from_uuid(uuid: &Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.uuid() == *uuid)
    }

    pub fn properties(&self) -> Properties {
        match self {
            Endpoint::Sample | Endpoint::Location => Properties {
                read: true,
                write: false,
                notify: true,
                indicate: true,
            },
            Endpoint::Configure => Properties {
                read: false,
                write: true,
                notify: false,
                indicate: false,
            },
        }
    }

    /// Whether clients may subscribe to this endpoint.
    pub fn supports_subscription(&self) -> bool {
        let props = self.properties();
        props.notify || props.indicate
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Sample => "sample",
            Endpoint::Location => "location",
            Endpoint::Configure => "configure",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription state of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Unsubscribed,
    Notifying,
    Indicating,
}

impl Subscription {
    pub fn is_subscribed(&self) -> bool {
        !matches!(self, Subscription::Unsubscribed)
    }
}

/// Effect of a descriptor write on the endpoint's stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Moved from unsubscribed to subscribed.
    Subscribed,
    /// Moved from subscribed to unsubscribed.
    Unsubscribed,
    /// Subscription flag unchanged.
    Unchanged,
}

/// Per-endpoint state: subscription, descriptor value and last delivered value.
#[derive(Debug, Clone)]
pub struct EndpointState {
    endpoint: Endpoint,
    subscription: Subscription,
    descriptor: [u8; 2],
    value: Vec<u8>,
}

impl EndpointState {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            subscription: Subscription::Unsubscribed,
            descriptor: cccd::DISABLE,
            value: Vec::new(),
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_subscribed()
    }

    /// Last value delivered (or accepted, for the Configure endpoint).
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn set_value(&mut self, value: &[u8]) {
        self.value.clear();
        self.value.extend_from_slice(value);
    }

    /// Handle a characteristic read request.
    pub fn read(&self, offset: usize) -> Result<&[u8], GattStatus> {
        if offset != 0 {
            return Err(GattStatus::InvalidOffset);
        }
        Ok(&self.value)
    }

    /// Handle a read of the client characteristic configuration descriptor.
    pub fn read_descriptor(&self, offset: usize) -> Result<[u8; 2], GattStatus> {
        if offset != 0 {
            return Err(GattStatus::InvalidOffset);
        }
        Ok(self.descriptor)
    }

    /// Handle a write of the client characteristic configuration descriptor.
    ///
    /// State is only changed on success.
    pub fn write_descriptor(&mut self, offset: usize, value: &[u8]) -> Result<Transition, GattStatus> {
        if offset != 0 {
            return Err(GattStatus::InvalidOffset);
        }
        if !self.endpoint.supports_subscription() {
            return Err(GattStatus::RequestNotSupported);
        }
        let props = self.endpoint.properties();
        let value: [u8; 2] = value
            .try_into()
            .map_err(|_| GattStatus::InvalidAttributeLength)?;

        let next = if value == cccd::DISABLE {
            Subscription::Unsubscribed
        } else if props.notify && value == cccd::ENABLE_NOTIFICATION {
            Subscription::Notifying
        } else if props.indicate && value == cccd::ENABLE_INDICATION {
            Subscription::Indicating
        } else {
            return Err(GattStatus::RequestNotSupported);
        };

        let was_subscribed = self.subscription.is_subscribed();
        self.subscription = next;
        self.descriptor = value;

        Ok(match (was_subscribed, next.is_subscribed()) {
            (false, true) => Transition::Subscribed,
            (true, false) => Transition::Unsubscribed,
            _ => Transition::Unchanged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_lookup() {
        for endpoint in Endpoint::ALL {
            assert_eq!(Endpoint::from_uuid(&endpoint.uuid()), Some(endpoint));
        }
        assert_eq!(Endpoint::from_uuid(&crate::bluetooth::ble_constants::CCCD_UUID), None);
    }

    #[test]
    fn test_subscribe_lifecycle() {
        let mut state = EndpointState::new(Endpoint::Sample);
        assert!(!state.is_subscribed());
        assert_eq!(state.read_descriptor(0), Ok(cccd::DISABLE));

        assert_eq!(
            state.write_descriptor(0, &cccd::ENABLE_NOTIFICATION),
            Ok(Transition::Subscribed)
        );
        assert_eq!(state.subscription, Subscription::Notifying);
        assert_eq!(state.read_descriptor(0), Ok(cccd::ENABLE_NOTIFICATION));

        // Switching to indications keeps the subscription
        assert_eq!(
            state.write_descriptor(0, &cccd::ENABLE_INDICATION),
            Ok(Transition::Unchanged)
        );
        assert_eq!(state.subscription, Subscription::Indicating);

        assert_eq!(
            state.write_descriptor(0, &cccd::DISABLE),
            Ok(Transition::Unsubscribed)
        );
        assert_eq!(
            state.write_descriptor(0, &cccd::DISABLE),
            Ok(Transition::Unchanged)
        );
    }

    #[test]
    fn test_descriptor_errors_leave_state() {
        let mut state = EndpointState::new(Endpoint::Location);
        assert_eq!(
            state.write_descriptor(0, &[1]),
            Err(GattStatus::InvalidAttributeLength)
        );
        assert_eq!(
            state.write_descriptor(0, &[1, 0, 0]),
            Err(GattStatus::InvalidAttributeLength)
        );
        assert_eq!(
            state.write_descriptor(0, &[3, 0]),
            Err(GattStatus::RequestNotSupported)
        );
        assert_eq!(
            state.write_descriptor(1, &cccd::ENABLE_NOTIFICATION),
            Err(GattStatus::InvalidOffset)
        );
        assert!(!state.is_subscribed());
        assert_eq!(state.read_descriptor(0), Ok(cccd::DISABLE));
    }

    #[test]
    fn test_configure_cannot_subscribe() {
        let mut state = EndpointState::new(Endpoint::Configure);
        assert!(!Endpoint::Configure.supports_subscription());
        assert_eq!(
            state.write_descriptor(0, &cccd::ENABLE_NOTIFICATION),
            Err(GattStatus::RequestNotSupported)
        );
        // Unsupported wins over a bad length
        assert_eq!(
            state.write_descriptor(0, &[0]),
            Err(GattStatus::RequestNotSupported)
        );
    }

    #[test]
    fn test_read() {
        let mut state = EndpointState::new(Endpoint::Sample);
        assert_eq!(state.read(0), Ok(&[][..]));
        state.set_value(&[1, 2, 3]);
        assert_eq!(state.read(0), Ok(&[1u8, 2, 3][..]));
        assert_eq!(state.read(2), Err(GattStatus::InvalidOffset));
    }
}
