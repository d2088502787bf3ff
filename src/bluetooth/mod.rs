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

//! Bluetooth transport for the simulated fishfinder.
//!
//! Endpoint state and the packet codec are transport independent; the GATT
//! server maps them onto BlueZ.

pub mod ble_constants;
pub mod endpoint;
mod gatt_server;
pub mod protocol;

pub use ble_constants::GattStatus;
pub use endpoint::{Endpoint, EndpointState, Properties, Subscription, Transition};
pub use gatt_server::{req_result, BroadcastSink, GattServer};
pub use protocol::{ConfigureCommand, PacketError};
