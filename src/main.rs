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

//! Ping Simulator

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ping_simulator::bluetooth::{BroadcastSink, Endpoint, GattServer};
use ping_simulator::config::Config;
use ping_simulator::simulator::{LogBuffer, Peripheral, PeripheralStatus};
use ping_simulator::state::AppState;

fn log_status(status: &PeripheralStatus, state: &AppState) {
    info!(
        "{} | sonar {:.2}/{} Hz ({} clients) | location {:.2}/{} Hz ({} clients) | {} | {} on {}",
        status.configuration,
        status.sonar_hz,
        status.sonar_target_hz,
        state.session_count(Endpoint::Sample),
        status.location_hz,
        status.location_target_hz,
        state.session_count(Endpoint::Location),
        status.generator.as_str(),
        state.get_advertising().as_str(),
        state.get_adapter_name().as_deref().unwrap_or("no adapter"),
    );
    if let Some(sample) = status.latest {
        info!(
            "depth {:.2}ft strength {:.0}% fish {:.2}ft battery {:.1}% temp {:.1}F",
            sample.depth_ft(),
            sample.strength,
            sample.fish_depth_ft(),
            sample.battery,
            sample.temperature_f(),
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ping_simulator=info".parse()?),
        )
        .init();

    info!("Starting Ping Simulator v{}...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded");

    let state = AppState::new();
    let sink = BroadcastSink::new();
    let peripheral = Arc::new(Peripheral::new(
        config.simulator.peripheral_options(),
        sink.clone(),
        Arc::new(LogBuffer::default()),
    )?);

    let mut gatt_server = GattServer::new(peripheral.clone(), sink, state.clone()).await?;
    gatt_server.set_name(&config.bluetooth.device_name).await?;
    if let Err(e) = gatt_server
        .start(&config.bluetooth.device_name, config.bluetooth.advertise)
        .await
    {
        error!("Failed to start GATT server: {}", e);
        peripheral.shutdown();
        return Err(e);
    }
    info!(
        "Fishfinder service ready as '{}' ({})",
        config.bluetooth.device_name,
        state.get_advertising().as_str()
    );

    let interval = config.simulator.status_interval_secs;
    let status_task = {
        let peripheral = peripheral.clone();
        let state = state.clone();
        tokio::spawn(async move {
            if interval == 0 {
                return;
            }
            let mut ticker = tokio::time::interval(Duration::from_secs(interval));
            loop {
                ticker.tick().await;
                log_status(&peripheral.status(), &state);
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    status_task.abort();
    peripheral.shutdown();
    gatt_server.stop();

    Ok(())
}
