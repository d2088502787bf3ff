//! Integration tests for the peripheral's request and streaming flow.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use ping_simulator::bluetooth::ble_constants::cccd;
use ping_simulator::bluetooth::protocol::{self, ConfigureCommand};
use ping_simulator::bluetooth::{Endpoint, GattStatus};
use ping_simulator::simulator::{
    Configuration, FlatlineGenerator, GeneratorKind, LogBuffer, NotificationSink, Peripheral,
    PeripheralOptions, SampleGenerator, Stream,
};

#[derive(Default)]
struct RecordingSink {
    packets: Mutex<Vec<(Endpoint, Vec<u8>)>>,
}

impl RecordingSink {
    fn on(&self, endpoint: Endpoint) -> Vec<Vec<u8>> {
        self.packets
            .lock()
            .iter()
            .filter(|(e, _)| *e == endpoint)
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn last(&self, endpoint: Endpoint) -> Option<Vec<u8>> {
        self.on(endpoint).pop()
    }
}

impl NotificationSink for RecordingSink {
    fn notify_all(&self, endpoint: Endpoint, value: &[u8]) {
        self.packets.lock().push((endpoint, value.to_vec()));
    }
}

fn flatline_peripheral() -> (Peripheral, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let options = PeripheralOptions {
        generator: GeneratorKind::Flatline,
        ..Default::default()
    };
    let peripheral =
        Peripheral::new(options, sink.clone(), Arc::new(LogBuffer::default())).unwrap();
    (peripheral, sink)
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_then_unsubscribe() {
    let (peripheral, sink) = flatline_peripheral();

    assert_eq!(
        peripheral.on_subscription_changed(Endpoint::Sample, true),
        GattStatus::Success
    );
    sleep_ms(1_000).await;
    let sent = sink.on(Endpoint::Sample).len();
    assert!((8..=9).contains(&sent), "sent {}", sent);

    assert_eq!(
        peripheral.on_subscription_changed(Endpoint::Sample, false),
        GattStatus::Success
    );
    assert!(!peripheral.is_streaming(Stream::Sonar));
    let stopped_at = sink.on(Endpoint::Sample).len();

    sleep_ms(2_000).await;
    assert_eq!(sink.on(Endpoint::Sample).len(), stopped_at);
    assert_eq!(peripheral.current_rates().0, 8.0);
}

#[tokio::test(start_paused = true)]
async fn test_streams_are_independent() {
    let (peripheral, sink) = flatline_peripheral();
    peripheral.on_subscription_changed(Endpoint::Sample, true);
    peripheral.on_subscription_changed(Endpoint::Location, true);

    sleep_ms(3_050).await;
    // Location ticks at 0, 1, 2 and 3 s
    assert_eq!(sink.on(Endpoint::Location).len(), 4);
    assert!(sink.on(Endpoint::Sample).len() >= 24);

    peripheral.on_subscription_changed(Endpoint::Location, false);
    let sonar_before = sink.on(Endpoint::Sample).len();
    sleep_ms(1_000).await;
    assert_eq!(sink.on(Endpoint::Location).len(), 4);
    assert!(sink.on(Endpoint::Sample).len() > sonar_before);

    for packet in sink.on(Endpoint::Location) {
        assert_eq!(packet.len(), protocol::LOCATION_PACKET_LEN);
        let (lat, lon) = protocol::decode_location(&packet).unwrap();
        assert!(lat.abs() <= 1.0 / 60.0 + 1e-9);
        assert!(lon.abs() <= 1.0 / 60.0 + 1e-9);
    }
}

#[tokio::test(start_paused = true)]
async fn test_repeated_subscribe_is_idempotent() {
    let (peripheral, sink) = flatline_peripheral();
    peripheral.on_subscription_changed(Endpoint::Location, true);
    peripheral.on_subscription_changed(Endpoint::Location, true);
    assert_eq!(
        peripheral.handle_descriptor_write(Endpoint::Location, 0, &cccd::ENABLE_INDICATION),
        GattStatus::Success
    );

    sleep_ms(2_500).await;
    assert_eq!(sink.on(Endpoint::Location).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_rate_converges_to_target() {
    let (peripheral, _sink) = flatline_peripheral();
    peripheral.on_subscription_changed(Endpoint::Sample, true);
    sleep_ms(10_000).await;

    let (sonar, location) = peripheral.current_rates();
    assert!((sonar - 8.0).abs() < 0.5, "sonar {}", sonar);
    assert_eq!(location, 1.0);

    peripheral.set_target_rate(Stream::Sonar, 20.0).unwrap();
    sleep_ms(5_000).await;
    let (sonar, _) = peripheral.current_rates();
    assert!((sonar - 20.0).abs() < 1.0, "sonar {}", sonar);
}

#[tokio::test(start_paused = true)]
async fn test_configuration_write_while_streaming() {
    let (peripheral, sink) = flatline_peripheral();
    peripheral.on_subscription_changed(Endpoint::Sample, true);
    sleep_ms(50).await;

    // Default range 6: 36 m maximum, flatline holds 18 m (59.05 ft)
    let packet = sink.last(Endpoint::Sample).unwrap();
    assert_eq!(&packet[6..8], &[59, 5]);

    let write = ConfigureCommand::new(75, 1, 3).encode();
    assert_eq!(
        peripheral.handle_write(Endpoint::Configure, 0, &write),
        GattStatus::Success
    );
    assert_eq!(peripheral.current_configuration(), Configuration::new(75, 1, 3));

    sleep_ms(200).await;
    // Range 3: 18 m maximum, flatline holds 9 m (29.52 ft)
    let packet = sink.last(Endpoint::Sample).unwrap();
    assert_eq!(&packet[6..8], &[29, 52]);
    assert_eq!(packet[17], protocol::checksum(&packet[..17]));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_writes_leave_stream_unchanged() {
    let (peripheral, sink) = flatline_peripheral();
    peripheral.on_subscription_changed(Endpoint::Sample, true);

    let mut bad_magic = ConfigureCommand::new(10, 0, 0).encode();
    bad_magic[1] = 71;
    assert_eq!(
        peripheral.handle_write(Endpoint::Configure, 0, &bad_magic),
        GattStatus::Failure
    );
    assert_eq!(
        peripheral.handle_write(Endpoint::Configure, 0, &bad_magic[..11]),
        GattStatus::InvalidAttributeLength
    );
    assert_eq!(
        peripheral.handle_write(Endpoint::Location, 0, &bad_magic),
        GattStatus::Failure
    );

    sleep_ms(500).await;
    assert_eq!(peripheral.current_configuration(), Configuration::default());
    assert!(sink
        .on(Endpoint::Sample)
        .iter()
        .all(|packet| packet[6..8] == [59, 5]));
}

#[tokio::test(start_paused = true)]
async fn test_generator_switch() {
    let (peripheral, sink) = flatline_peripheral();
    peripheral.on_subscription_changed(Endpoint::Sample, true);
    sleep_ms(300).await;

    peripheral.replace_generator(SampleGenerator::Flatline(FlatlineGenerator::dry()));
    // Trackers restart at the target rate
    assert_eq!(peripheral.current_rates(), (8.0, 1.0));
    sleep_ms(300).await;

    let packet = sink.last(Endpoint::Sample).unwrap();
    assert_eq!(packet[4] & protocol::flags::DRY, protocol::flags::DRY);
    assert_eq!(&packet[6..8], &[0, 0]);

    peripheral.select_generator(GeneratorKind::Demo);
    assert_eq!(peripheral.status().generator, GeneratorKind::Demo);
    assert!(peripheral.is_streaming(Stream::Sonar));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_everything() {
    let (peripheral, sink) = flatline_peripheral();
    peripheral.on_subscription_changed(Endpoint::Sample, true);
    peripheral.on_subscription_changed(Endpoint::Location, true);
    sleep_ms(100).await;

    peripheral.shutdown();
    let sent = sink.packets.lock().len();
    sleep_ms(3_000).await;
    assert_eq!(sink.packets.lock().len(), sent);
    assert!(!peripheral.is_streaming(Stream::Sonar));
    assert!(!peripheral.is_streaming(Stream::Location));
}
