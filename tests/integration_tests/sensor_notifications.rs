// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Unsolicited notification dispatch: PDO sensor readings and alarm
//! bitmaps arriving from the read loop outside of any request/reply
//! correlation.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use comfoconnect_rs::{
    client::client::BridgeConnection,
    codec::{self, BodyKind, GatewayResult},
    proto,
    sensors::{AlarmCallback, SensorCallback, SensorHold, SensorSpec, SensorValue},
};
use serial_test::serial;
use tokio::io::AsyncWriteExt;

use crate::integration_tests::common::{bind_mock_bridge, MOCK_DST, MOCK_SRC};

struct RecordingSensor {
    seen: Arc<Mutex<Vec<(u32, SensorValue)>>>,
}

impl SensorCallback for RecordingSensor {
    fn on_sensor(&self, sensor: &SensorSpec, value: SensorValue) {
        self.seen.lock().expect("lock").push((sensor.id, value));
    }
}

struct RecordingAlarm {
    seen: Arc<Mutex<Vec<(u32, HashMap<u32, &'static str>)>>>,
}

impl AlarmCallback for RecordingAlarm {
    fn on_alarm(&self, node_id: u32, errors: HashMap<u32, &'static str>) {
        self.seen.lock().expect("lock").push((node_id, errors));
    }
}

/// Writes a notification frame with no `reference`, matching how
/// unsolicited `CnRpdoNotification`/`CnAlarmNotification` frames actually
/// arrive on the wire.
async fn write_notification(stream: &mut tokio::net::TcpStream, body: BodyKind) {
    let cmd = codec::build_cmd(&body, GatewayResult::Ok, None, None);
    let frame = codec::encode_frame(&cmd, &body, &MOCK_SRC, &MOCK_DST);
    stream.write_all(&frame).await.expect("write notification frame");
}

#[tokio::test]
#[serial]
async fn rpdo_notification_reaches_the_sensor_callback_decoded() {
    let listener = bind_mock_bridge().await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_for_server_check = Arc::clone(&seen);

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        // Outdoor temperature sensor (pdid 274), raw 215 -> 21.5 degrees
        // after the DivideBy10 transform.
        let raw: i16 = 215;
        write_notification(
            &mut stream,
            BodyKind::CnRpdoNotification(proto::CnRpdoNotification {
                pdid: 274,
                data: raw.to_le_bytes().to_vec(),
                zone: None,
            }),
        )
        .await;
        // Give the client time to dispatch before the socket is dropped.
        tokio::time::sleep(Duration::from_millis(50)).await;
    });

    struct NoopAlarm;
    impl AlarmCallback for NoopAlarm {
        fn on_alarm(&self, _node_id: u32, _errors: HashMap<u32, &'static str>) {}
    }

    let _conn = BridgeConnection::connect(
        "127.0.0.1",
        [1u8; 16],
        [2u8; 16],
        Duration::from_secs(2),
        Duration::from_secs(2),
        Arc::new(RecordingSensor { seen: Arc::clone(&seen) }),
        Arc::new(NoopAlarm),
        Arc::new(SensorHold::new()),
    )
    .await
    .expect("connect");

    server.await.expect("mock bridge task panicked");

    let recorded = seen_for_server_check.lock().expect("lock");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0], (274, SensorValue::Float(21.5)));
}

#[tokio::test]
#[serial]
async fn notifications_for_unregistered_pdids_are_silently_dropped() {
    let listener = bind_mock_bridge().await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_check = Arc::clone(&seen);

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        write_notification(
            &mut stream,
            BodyKind::CnRpdoNotification(proto::CnRpdoNotification {
                pdid: 999_999,
                data: vec![0x01],
                zone: None,
            }),
        )
        .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
    });

    struct NoopAlarm;
    impl AlarmCallback for NoopAlarm {
        fn on_alarm(&self, _node_id: u32, _errors: HashMap<u32, &'static str>) {}
    }

    let _conn = BridgeConnection::connect(
        "127.0.0.1",
        [1u8; 16],
        [2u8; 16],
        Duration::from_secs(2),
        Duration::from_secs(2),
        Arc::new(RecordingSensor { seen: Arc::clone(&seen) }),
        Arc::new(NoopAlarm),
        Arc::new(SensorHold::new()),
    )
    .await
    .expect("connect");

    server.await.expect("mock bridge task panicked");
    assert!(seen_check.lock().expect("lock").is_empty());
}

#[tokio::test]
#[serial]
async fn alarm_notification_decodes_errors_via_the_current_firmware_table() {
    let listener = bind_mock_bridge().await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_check = Arc::clone(&seen);

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        // Bit 21 set (byte index 2, bit offset 5): current-generation
        // firmware maps it to the "not commissioned" error text.
        write_notification(
            &mut stream,
            BodyKind::CnAlarmNotification(proto::CnAlarmNotification {
                node_id: Some(1),
                sw_program_version: Some(3_300_000_000),
                errors: Some(vec![0x00, 0x00, 0x20]),
                ..Default::default()
            }),
        )
        .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
    });

    struct NoopSensor;
    impl SensorCallback for NoopSensor {
        fn on_sensor(&self, _sensor: &SensorSpec, _value: SensorValue) {}
    }

    let _conn = BridgeConnection::connect(
        "127.0.0.1",
        [1u8; 16],
        [2u8; 16],
        Duration::from_secs(2),
        Duration::from_secs(2),
        Arc::new(NoopSensor),
        Arc::new(RecordingAlarm { seen: Arc::clone(&seen) }),
        Arc::new(SensorHold::new()),
    )
    .await
    .expect("connect");

    server.await.expect("mock bridge task panicked");

    let recorded = seen_check.lock().expect("lock");
    assert_eq!(recorded.len(), 1);
    let (node_id, errors) = &recorded[0];
    assert_eq!(*node_id, 1);
    assert_eq!(errors.get(&21), Some(&"The Ventilation Unit has not been commissioned (INIT ERROR)"));
}
