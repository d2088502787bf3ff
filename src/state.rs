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

//! Application state management.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::bluetooth::Endpoint;

/// Advertising status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvertisingStatus {
    Off,
    Advertising,
    Failed(String),
}

impl AdvertisingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvertisingStatus::Off => "Off",
            AdvertisingStatus::Advertising => "Advertising",
            AdvertisingStatus::Failed(_) => "Failed",
        }
    }
}

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Current advertising status.
    pub advertising: RwLock<AdvertisingStatus>,

    /// Name of the Bluetooth adapter in use.
    pub adapter_name: RwLock<Option<String>>,

    /// Open notification sessions on the Sample endpoint.
    sample_sessions: RwLock<usize>,

    /// Open notification sessions on the Location endpoint.
    location_sessions: RwLock<usize>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            advertising: RwLock::new(AdvertisingStatus::Off),
            adapter_name: RwLock::new(None),
            sample_sessions: RwLock::new(0),
            location_sessions: RwLock::new(0),
        }
    }
}

impl AppState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn sessions(&self, endpoint: Endpoint) -> Option<&RwLock<usize>> {
        match endpoint {
            Endpoint::Sample => Some(&self.sample_sessions),
            Endpoint::Location => Some(&self.location_sessions),
            Endpoint::Configure => None,
        }
    }

    /// Record a new notification session and return the open count.
    pub fn session_opened(&self, endpoint: Endpoint) -> usize {
        match self.sessions(endpoint) {
            Some(sessions) => {
                let mut sessions = sessions.write();
                *sessions += 1;
                *sessions
            }
            None => 0,
        }
    }

    /// Record a closed notification session and return the open count.
    pub fn session_closed(&self, endpoint: Endpoint) -> usize {
        match self.sessions(endpoint) {
            Some(sessions) => {
                let mut sessions = sessions.write();
                *sessions = sessions.saturating_sub(1);
                *sessions
            }
            None => 0,
        }
    }

    pub fn session_count(&self, endpoint: Endpoint) -> usize {
        self.sessions(endpoint).map_or(0, |s| *s.read())
    }

    pub fn set_advertising(&self) {
        *self.advertising.write() = AdvertisingStatus::Advertising;
    }

    pub fn set_advertising_failed(&self, reason: String) {
        *self.advertising.write() = AdvertisingStatus::Failed(reason);
    }

    pub fn set_advertising_off(&self) {
        *self.advertising.write() = AdvertisingStatus::Off;
    }

    pub fn get_advertising(&self) -> AdvertisingStatus {
        self.advertising.read().clone()
    }

    pub fn set_adapter_name(&self, name: String) {
        *self.adapter_name.write() = Some(name);
    }

    pub fn get_adapter_name(&self) -> Option<String> {
        self.adapter_name.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_counts() {
        let state = AppState::new();
        assert_eq!(state.session_opened(Endpoint::Sample), 1);
        assert_eq!(state.session_opened(Endpoint::Sample), 2);
        assert_eq!(state.session_count(Endpoint::Location), 0);
        assert_eq!(state.session_closed(Endpoint::Sample), 1);
        assert_eq!(state.session_closed(Endpoint::Sample), 0);
        assert_eq!(state.session_closed(Endpoint::Sample), 0);
        assert_eq!(state.session_opened(Endpoint::Configure), 0);
    }

    #[test]
    fn test_advertising_status() {
        let state = AppState::new();
        assert_eq!(state.get_advertising(), AdvertisingStatus::Off);
        state.set_advertising();
        assert_eq!(state.get_advertising().as_str(), "Advertising");
        state.set_advertising_failed("no adapter".into());
        assert_eq!(
            state.get_advertising(),
            AdvertisingStatus::Failed("no adapter".into())
        );
        state.set_advertising_off();
        assert_eq!(state.get_advertising(), AdvertisingStatus::Off);
    }

    #[test]
    fn test_adapter_name() {
        let state = AppState::new();
        assert_eq!(state.get_adapter_name(), None);
        state.set_adapter_name("hci0".into());
        assert_eq!(state.get_adapter_name().as_deref(), Some("hci0"));
    }
}
