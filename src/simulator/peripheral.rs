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

//! The simulated fishfinder peripheral.
//!
//! Owns the configuration, the active sample generator, the endpoint state
//! and both emission streams. Every tick and every request runs under one
//! lock, so a tick sees either the old or the new configuration, never a
//! mix. The transport only sees [`GattStatus`] results.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::configuration::Configuration;
use super::generator::{GeneratorKind, SampleGenerator};
use super::rate::{self, RateTracker, Stream};
use super::sample::Sample;
use super::scheduler::PeriodicTask;
use super::sink::{LogSink, NotificationSink};
use crate::bluetooth::ble_constants::{cccd, GattStatus};
use crate::bluetooth::endpoint::{EndpointState, Transition};
use crate::bluetooth::protocol::{self, ConfigureCommand};
use crate::bluetooth::Endpoint;

/// Default sonar emission rate.
pub const DEFAULT_SONAR_RATE_HZ: f64 = 8.0;
/// Default location emission rate.
pub const DEFAULT_LOCATION_RATE_HZ: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulatorError {
    #[error("invalid {stream} rate {hz} Hz: must be between 0.001 and 1000 Hz")]
    InvalidRate { stream: &'static str, hz: f64 },
}

/// Start-up settings for a [`Peripheral`].
#[derive(Debug, Clone, PartialEq)]
pub struct PeripheralOptions {
    pub generator: GeneratorKind,
    pub sonar_rate_hz: f64,
    pub location_rate_hz: f64,
    pub dry: bool,
    pub silent: bool,
}

impl Default for PeripheralOptions {
    fn default() -> Self {
        Self {
            generator: GeneratorKind::Demo,
            sonar_rate_hz: DEFAULT_SONAR_RATE_HZ,
            location_rate_hz: DEFAULT_LOCATION_RATE_HZ,
            dry: false,
            silent: false,
        }
    }
}

/// Snapshot of the peripheral for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PeripheralStatus {
    pub configuration: Configuration,
    pub generator: GeneratorKind,
    pub sonar_hz: f64,
    pub sonar_target_hz: f64,
    pub location_hz: f64,
    pub location_target_hz: f64,
    pub sample_subscribed: bool,
    pub location_subscribed: bool,
    pub dry: bool,
    pub silent: bool,
    pub latest: Option<Sample>,
}

fn check_rate(stream: Stream, hz: f64) -> Result<f64, SimulatorError> {
    if rate::is_valid_rate(hz) {
        Ok(hz)
    } else {
        Err(SimulatorError::InvalidRate {
            stream: stream.as_str(),
            hz,
        })
    }
}

fn stream_for(endpoint: Endpoint) -> Option<Stream> {
    match endpoint {
        Endpoint::Sample => Some(Stream::Sonar),
        Endpoint::Location => Some(Stream::Location),
        Endpoint::Configure => None,
    }
}

fn endpoint_for(stream: Stream) -> Endpoint {
    match stream {
        Stream::Sonar => Endpoint::Sample,
        Stream::Location => Endpoint::Location,
    }
}

/// State shared between request handlers and stream ticks.
struct Core {
    configuration: Configuration,
    generator: SampleGenerator,
    sample: EndpointState,
    location: EndpointState,
    configure: EndpointState,
    sonar_rate: RateTracker,
    location_rate: RateTracker,
    latest: Option<Sample>,
    dry: bool,
    silent: bool,
}

impl Core {
    fn endpoint(&self, endpoint: Endpoint) -> &EndpointState {
        match endpoint {
            Endpoint::Sample => &self.sample,
            Endpoint::Location => &self.location,
            Endpoint::Configure => &self.configure,
        }
    }

    fn endpoint_mut(&mut self, endpoint: Endpoint) -> &mut EndpointState {
        match endpoint {
            Endpoint::Sample => &mut self.sample,
            Endpoint::Location => &mut self.location,
            Endpoint::Configure => &mut self.configure,
        }
    }

    fn tracker(&self, stream: Stream) -> &RateTracker {
        match stream {
            Stream::Sonar => &self.sonar_rate,
            Stream::Location => &self.location_rate,
        }
    }

    fn tracker_mut(&mut self, stream: Stream) -> &mut RateTracker {
        match stream {
            Stream::Sonar => &mut self.sonar_rate,
            Stream::Location => &mut self.location_rate,
        }
    }

    fn tick(&mut self, stream: Stream, now: Instant, sink: &dyn NotificationSink) {
        self.tracker_mut(stream).record_tick(now);

        let sample = self.generator.get_sample();
        self.latest = Some(sample);
        let endpoint = endpoint_for(stream);
        match stream {
            Stream::Sonar => {
                let packet = protocol::encode_sample(&sample, self.dry);
                self.deliver(endpoint, &packet, sink);
            }
            Stream::Location => {
                let packet = protocol::encode_location(&sample);
                self.deliver(endpoint, &packet, sink);
            }
        }
    }

    fn deliver(&mut self, endpoint: Endpoint, packet: &[u8], sink: &dyn NotificationSink) {
        self.endpoint_mut(endpoint).set_value(packet);
        if !self.silent {
            sink.notify_all(endpoint, packet);
        }
    }
}

/// The fishfinder protocol engine.
///
/// Stream tasks are spawned on the current tokio runtime when an endpoint is
/// subscribed, so subscription changes must happen inside a runtime.
pub struct Peripheral {
    core: Arc<Mutex<Core>>,
    streams: Mutex<HashMap<Stream, PeriodicTask>>,
    sink: Arc<dyn NotificationSink>,
    log: Arc<dyn LogSink>,
}

impl Peripheral {
    /// Create a peripheral with default configuration (sensitivity 50, noise
    /// off, range 6).
    pub fn new(
        options: PeripheralOptions,
        sink: Arc<dyn NotificationSink>,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, SimulatorError> {
        let sonar_hz = check_rate(Stream::Sonar, options.sonar_rate_hz)?;
        let location_hz = check_rate(Stream::Location, options.location_rate_hz)?;

        let configuration = Configuration::default();
        let mut generator = SampleGenerator::new(options.generator);
        generator.configure(
            configuration.sensitivity,
            configuration.noise,
            configuration.range,
        );

        let core = Core {
            configuration,
            generator,
            sample: EndpointState::new(Endpoint::Sample),
            location: EndpointState::new(Endpoint::Location),
            configure: EndpointState::new(Endpoint::Configure),
            sonar_rate: RateTracker::new(sonar_hz),
            location_rate: RateTracker::new(location_hz),
            latest: None,
            dry: options.dry,
            silent: options.silent,
        };

        log.log(&format!(
            "Created fishfinder service with {} generator",
            options.generator.as_str()
        ));

        Ok(Self {
            core: Arc::new(Mutex::new(core)),
            streams: Mutex::new(HashMap::new()),
            sink,
            log,
        })
    }

    /// Handle a characteristic read request.
    pub fn handle_read(&self, endpoint: Endpoint, offset: usize) -> (Vec<u8>, GattStatus) {
        let core = self.core.lock();
        match core.endpoint(endpoint).read(offset) {
            Ok(value) => (value.to_vec(), GattStatus::Success),
            Err(status) => {
                debug!("Read of {} at offset {} rejected: {}", endpoint, offset, status);
                (Vec::new(), status)
            }
        }
    }

    /// Handle a characteristic write request.
    ///
    /// Only the Configure endpoint accepts writes. A rejected packet leaves
    /// all state unchanged.
    pub fn handle_write(&self, endpoint: Endpoint, offset: usize, value: &[u8]) -> GattStatus {
        if endpoint != Endpoint::Configure {
            warn!("Bad write characteristic {}", endpoint);
            return GattStatus::Failure;
        }
        if offset != 0 {
            warn!("Bad write offset {}", offset);
            return GattStatus::InvalidOffset;
        }

        let command = match ConfigureCommand::decode(value) {
            Ok(command) => command,
            Err(e) => {
                self.log.log(&format!("Bad configuration packet: {}", e));
                return e.status();
            }
        };

        let configuration = Configuration::from(command);
        {
            let mut core = self.core.lock();
            core.configuration = configuration;
            core.generator
                .configure(command.sensitivity, command.noise, command.range);
            core.configure.set_value(value);
        }

        self.log.log(&format!("Configuration {}", configuration));
        GattStatus::Success
    }

    /// Handle a read of an endpoint's subscription descriptor.
    pub fn handle_descriptor_read(&self, endpoint: Endpoint, offset: usize) -> (Vec<u8>, GattStatus) {
        let core = self.core.lock();
        match core.endpoint(endpoint).read_descriptor(offset) {
            Ok(value) => (value.to_vec(), GattStatus::Success),
            Err(status) => (Vec::new(), status),
        }
    }

    /// Handle a write of an endpoint's subscription descriptor, starting or
    /// stopping the matching stream.
    pub fn handle_descriptor_write(
        &self,
        endpoint: Endpoint,
        offset: usize,
        value: &[u8],
    ) -> GattStatus {
        let mut streams = self.streams.lock();

        let (transition, subscribed) = {
            let mut core = self.core.lock();
            let state = core.endpoint_mut(endpoint);
            match state.write_descriptor(offset, value) {
                Ok(transition) => (transition, state.is_subscribed()),
                Err(status) => {
                    warn!(
                        "Descriptor write {:?} on {} rejected: {}",
                        value, endpoint, status
                    );
                    return status;
                }
            }
        };

        if let Some(stream) = stream_for(endpoint) {
            match transition {
                Transition::Subscribed => {
                    self.log.log(&format!("Notifications enabled on {}", endpoint));
                }
                Transition::Unsubscribed => {
                    self.log.log(&format!("Notifications disabled on {}", endpoint));
                    self.stop_stream(&mut streams, stream);
                }
                Transition::Unchanged => {}
            }
            // Also restarts a stream stopped by shutdown
            if subscribed {
                self.start_stream(&mut streams, stream);
            }
        }

        GattStatus::Success
    }

    /// A client subscribed to or unsubscribed from `endpoint`.
    pub fn on_subscription_changed(&self, endpoint: Endpoint, subscribed: bool) -> GattStatus {
        let value = if subscribed {
            cccd::ENABLE_NOTIFICATION
        } else {
            cccd::DISABLE
        };
        self.handle_descriptor_write(endpoint, 0, &value)
    }

    fn start_stream(&self, streams: &mut HashMap<Stream, PeriodicTask>, stream: Stream) {
        if streams.get(&stream).is_some_and(|task| task.is_active()) {
            return;
        }

        let target = {
            let mut core = self.core.lock();
            let tracker = core.tracker_mut(stream);
            tracker.reset();
            tracker.target_hz()
        };

        let period_core = self.core.clone();
        let tick_core = self.core.clone();
        let sink = self.sink.clone();
        let task = PeriodicTask::spawn(
            stream.as_str(),
            move || period_core.lock().tracker(stream).period(),
            move || tick_core.lock().tick(stream, Instant::now(), sink.as_ref()),
        );
        streams.insert(stream, task);
        self.log.log(&format!("Starting {} stream at {} Hz", stream.as_str(), target));
    }

    fn stop_stream(&self, streams: &mut HashMap<Stream, PeriodicTask>, stream: Stream) {
        if let Some(task) = streams.remove(&stream) {
            task.cancel();
            self.log.log(&format!("Stopping {} stream", stream.as_str()));
        }
        self.core.lock().tracker_mut(stream).reset();
    }

    /// Whether a stream task is currently running.
    pub fn is_streaming(&self, stream: Stream) -> bool {
        self.streams
            .lock()
            .get(&stream)
            .is_some_and(|task| task.is_active())
    }

    /// Configuration as last written by the companion.
    pub fn current_configuration(&self) -> Configuration {
        self.core.lock().configuration
    }

    /// Observed (sonar, location) emission rates in Hz.
    pub fn current_rates(&self) -> (f64, f64) {
        let core = self.core.lock();
        (core.sonar_rate.average_hz(), core.location_rate.average_hz())
    }

    /// Retune a stream. Takes effect at the stream's next reschedule.
    pub fn set_target_rate(&self, stream: Stream, hz: f64) -> Result<(), SimulatorError> {
        let hz = check_rate(stream, hz)?;
        self.core.lock().tracker_mut(stream).set_target(hz);
        self.log.log(&format!("{} rate {} Hz", stream.as_str(), hz));
        Ok(())
    }

    /// Switch to a fresh generator of `kind`.
    pub fn select_generator(&self, kind: GeneratorKind) {
        self.replace_generator(SampleGenerator::new(kind));
    }

    /// Install `generator`, configured for the current configuration. Both
    /// rate trackers restart.
    pub fn replace_generator(&self, mut generator: SampleGenerator) {
        let kind = generator.kind();
        {
            let mut core = self.core.lock();
            let config = core.configuration;
            generator.configure(config.sensitivity, config.noise, config.range);
            core.generator = generator;
            core.sonar_rate.reset();
            core.location_rate.reset();
        }
        self.log.log(&format!("Sample generator {}", kind.as_str()));
    }

    pub fn set_dry(&self, dry: bool) {
        self.core.lock().dry = dry;
    }

    pub fn set_silent(&self, silent: bool) {
        self.core.lock().silent = silent;
    }

    /// Most recent sample produced by either stream.
    pub fn latest_sample(&self) -> Option<Sample> {
        self.core.lock().latest
    }

    pub fn status(&self) -> PeripheralStatus {
        let core = self.core.lock();
        PeripheralStatus {
            configuration: core.configuration,
            generator: core.generator.kind(),
            sonar_hz: core.sonar_rate.average_hz(),
            sonar_target_hz: core.sonar_rate.target_hz(),
            location_hz: core.location_rate.average_hz(),
            location_target_hz: core.location_rate.target_hz(),
            sample_subscribed: core.sample.is_subscribed(),
            location_subscribed: core.location.is_subscribed(),
            dry: core.dry,
            silent: core.silent,
            latest: core.latest,
        }
    }

    /// Stop both streams. A later enable on a subscribed endpoint starts
    /// its stream again.
    pub fn shutdown(&self) {
        let mut streams = self.streams.lock();
        for (_, task) in streams.drain() {
            task.cancel();
            debug!("Stopped {} stream", task.name());
        }
        let mut core = self.core.lock();
        core.sonar_rate.reset();
        core.location_rate.reset();
    }
}

impl Drop for Peripheral {
    fn drop(&mut self) {
        self.shutdown();
    }
}
