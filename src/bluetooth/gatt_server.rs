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

//! BLE GATT server exposing a [`Peripheral`] over BlueZ.

use anyhow::Result;
use bluer::adv::{Advertisement, AdvertisementHandle};
use bluer::gatt::local::{
    Application, ApplicationHandle, Characteristic, CharacteristicNotifier,
    CharacteristicNotify, CharacteristicNotifyMethod, CharacteristicRead,
    CharacteristicReadRequest, CharacteristicWrite, CharacteristicWriteMethod,
    CharacteristicWriteRequest, ReqError, Service,
};
use bluer::Adapter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::ble_constants::{cccd, GattStatus, SERVICE_UUID};
use super::endpoint::Endpoint;
use crate::simulator::{NotificationSink, Peripheral};
use crate::state::AppState;

/// Packets buffered per endpoint before slow clients start lagging.
const NOTIFY_QUEUE: usize = 32;

/// How often an idle notification session checks whether it was stopped.
const STOP_POLL: Duration = Duration::from_millis(500);

/// Map a request result onto the BlueZ error it is reported as.
pub fn req_result(status: GattStatus) -> Result<(), ReqError> {
    match status {
        GattStatus::Success => Ok(()),
        GattStatus::RequestNotSupported => Err(ReqError::NotSupported),
        GattStatus::InvalidOffset => Err(ReqError::InvalidOffset),
        GattStatus::InvalidAttributeLength => Err(ReqError::InvalidValueLength),
        GattStatus::Failure => Err(ReqError::Failed),
    }
}

/// Fans encoded packets out to every open notification session.
pub struct BroadcastSink {
    sample: broadcast::Sender<Vec<u8>>,
    location: broadcast::Sender<Vec<u8>>,
}

impl BroadcastSink {
    pub fn new() -> Arc<Self> {
        let (sample, _) = broadcast::channel(NOTIFY_QUEUE);
        let (location, _) = broadcast::channel(NOTIFY_QUEUE);
        Arc::new(Self { sample, location })
    }

    fn sender(&self, endpoint: Endpoint) -> Option<&broadcast::Sender<Vec<u8>>> {
        match endpoint {
            Endpoint::Sample => Some(&self.sample),
            Endpoint::Location => Some(&self.location),
            Endpoint::Configure => None,
        }
    }

    /// Receive packets sent on `endpoint` from now on.
    pub fn subscribe(&self, endpoint: Endpoint) -> Option<broadcast::Receiver<Vec<u8>>> {
        self.sender(endpoint).map(|tx| tx.subscribe())
    }
}

impl NotificationSink for BroadcastSink {
    fn notify_all(&self, endpoint: Endpoint, value: &[u8]) {
        if let Some(tx) = self.sender(endpoint) {
            // No receivers just means nobody is listening right now.
            let _ = tx.send(value.to_vec());
        }
    }
}

/// GATT server for the fishfinder service.
pub struct GattServer {
    adapter: Adapter,
    peripheral: Arc<Peripheral>,
    sink: Arc<BroadcastSink>,
    state: Arc<AppState>,
    _adv_handle: Option<AdvertisementHandle>,
    _app_handle: Option<ApplicationHandle>,
}

impl GattServer {
    /// Create a new GATT server on the default adapter.
    pub async fn new(
        peripheral: Arc<Peripheral>,
        sink: Arc<BroadcastSink>,
        state: Arc<AppState>,
    ) -> Result<Self> {
        info!("Initializing BLE GATT server...");

        let session = bluer::Session::new().await?;
        let adapter = session.default_adapter().await?;
        info!("Using Bluetooth adapter: {}", adapter.name());
        state.set_adapter_name(adapter.name().to_string());

        if !adapter.is_powered().await? {
            info!("Powering on Bluetooth adapter...");
            adapter.set_powered(true).await?;
        }

        Ok(Self {
            adapter,
            peripheral,
            sink,
            state,
            _adv_handle: None,
            _app_handle: None,
        })
    }

    /// Set the device name.
    pub async fn set_name(&self, name: &str) -> Result<()> {
        self.adapter.set_alias(name.to_string()).await?;
        info!("Bluetooth name set to: {}", name);
        Ok(())
    }

    /// Register the service and, if requested, start advertising.
    pub async fn start(&mut self, local_name: &str, advertise: bool) -> Result<()> {
        self.register_gatt_service().await?;

        if advertise {
            if let Err(e) = self.start_advertising(local_name).await {
                self.state.set_advertising_failed(e.to_string());
                return Err(e);
            }
        }

        info!("GATT server started successfully");
        Ok(())
    }

    /// Stop advertising and unregister the service.
    pub fn stop(&mut self) {
        self._adv_handle = None;
        self._app_handle = None;
        self.state.set_advertising_off();
        info!("GATT server stopped");
    }

    fn readable(&self, endpoint: Endpoint) -> CharacteristicRead {
        let peripheral = self.peripheral.clone();
        CharacteristicRead {
            read: true,
            fun: Box::new(move |req: CharacteristicReadRequest| {
                let peripheral = peripheral.clone();
                Box::pin(async move {
                    let (value, status) = peripheral.handle_read(endpoint, req.offset as usize);
                    req_result(status).map(|()| value)
                })
            }),
            ..Default::default()
        }
    }

    fn notifying(&self, endpoint: Endpoint) -> CharacteristicNotify {
        let peripheral = self.peripheral.clone();
        let sink = self.sink.clone();
        let state = self.state.clone();
        CharacteristicNotify {
            notify: true,
            indicate: true,
            method: CharacteristicNotifyMethod::Fun(Box::new(move |notifier| {
                let peripheral = peripheral.clone();
                let sink = sink.clone();
                let state = state.clone();
                Box::pin(async move {
                    run_notify_session(endpoint, notifier, peripheral, sink, state).await;
                })
            })),
            ..Default::default()
        }
    }

    fn writable(&self, endpoint: Endpoint) -> CharacteristicWrite {
        let peripheral = self.peripheral.clone();
        CharacteristicWrite {
            write: true,
            write_without_response: true,
            method: CharacteristicWriteMethod::Fun(Box::new(
                move |data: Vec<u8>, req: CharacteristicWriteRequest| {
                    let peripheral = peripheral.clone();
                    Box::pin(async move {
                        let status =
                            peripheral.handle_write(endpoint, req.offset as usize, &data);
                        if !status.is_success() {
                            warn!("Write to {} rejected: {}", endpoint, status);
                        }
                        req_result(status)
                    })
                },
            )),
            ..Default::default()
        }
    }

    /// Register the GATT service with BlueZ.
    async fn register_gatt_service(&mut self) -> Result<()> {
        let characteristics: Vec<Characteristic> = Endpoint::ALL
            .iter()
            .map(|&endpoint| {
                let props = endpoint.properties();
                Characteristic {
                    uuid: endpoint.uuid(),
                    read: props.read.then(|| self.readable(endpoint)),
                    write: props.write.then(|| self.writable(endpoint)),
                    notify: endpoint
                        .supports_subscription()
                        .then(|| self.notifying(endpoint)),
                    ..Default::default()
                }
            })
            .collect();

        let app = Application {
            services: vec![Service {
                uuid: SERVICE_UUID,
                primary: true,
                characteristics,
                ..Default::default()
            }],
            ..Default::default()
        };

        self._app_handle = Some(self.adapter.serve_gatt_application(app).await?);
        info!("GATT service registered");
        Ok(())
    }

    /// Start BLE advertising.
    async fn start_advertising(&mut self, local_name: &str) -> Result<()> {
        let adv = Advertisement {
            service_uuids: vec![SERVICE_UUID].into_iter().collect(),
            discoverable: Some(true),
            local_name: Some(local_name.to_string()),
            ..Default::default()
        };

        let handle = self.adapter.advertise(adv).await?;
        self._adv_handle = Some(handle);
        self.state.set_advertising();

        info!("BLE advertising started");
        Ok(())
    }
}

/// Serve one client's notification session until it stops.
///
/// The first session on an endpoint subscribes the peripheral, the last one
/// to close unsubscribes it.
async fn run_notify_session(
    endpoint: Endpoint,
    mut notifier: CharacteristicNotifier,
    peripheral: Arc<Peripheral>,
    sink: Arc<BroadcastSink>,
    state: Arc<AppState>,
) {
    let Some(mut rx) = sink.subscribe(endpoint) else {
        return;
    };

    if state.session_opened(endpoint) == 1 {
        let value = if notifier.confirming() {
            cccd::ENABLE_INDICATION
        } else {
            cccd::ENABLE_NOTIFICATION
        };
        let status = peripheral.handle_descriptor_write(endpoint, 0, &value);
        if !status.is_success() {
            error!("Failed to subscribe {}: {}", endpoint, status);
        }
    }
    info!("Notification session opened on {}", endpoint);

    loop {
        tokio::select! {
            packet = rx.recv() => match packet {
                Ok(packet) => {
                    if let Err(e) = notifier.notify(packet).await {
                        debug!("Notification on {} failed: {}", endpoint, e);
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Notification session on {} skipped {} packets", endpoint, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::time::sleep(STOP_POLL) => {
                if notifier.is_stopped() {
                    break;
                }
            }
        }
    }

    if state.session_closed(endpoint) == 0 {
        peripheral.on_subscription_changed(endpoint, false);
    }
    info!("Notification session closed on {}", endpoint);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(req_result(GattStatus::Success).is_ok());
        let cases = [
            (GattStatus::RequestNotSupported, ReqError::NotSupported),
            (GattStatus::InvalidOffset, ReqError::InvalidOffset),
            (GattStatus::InvalidAttributeLength, ReqError::InvalidValueLength),
            (GattStatus::Failure, ReqError::Failed),
        ];
        for (status, expected) in cases {
            assert_eq!(req_result(status), Err(expected));
        }
    }

    #[tokio::test]
    async fn test_broadcast_sink_fans_out() {
        let sink = BroadcastSink::new();
        // Sending with nobody listening is fine
        sink.notify_all(Endpoint::Sample, &[1]);

        let mut a = sink.subscribe(Endpoint::Sample).unwrap();
        let mut b = sink.subscribe(Endpoint::Sample).unwrap();
        let mut loc = sink.subscribe(Endpoint::Location).unwrap();
        assert!(sink.subscribe(Endpoint::Configure).is_none());

        sink.notify_all(Endpoint::Sample, &[2, 3]);
        sink.notify_all(Endpoint::Configure, &[9]);

        assert_eq!(a.recv().await.unwrap(), vec![2, 3]);
        assert_eq!(b.recv().await.unwrap(), vec![2, 3]);
        assert!(loc.try_recv().is_err());
    }
}
