// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Covers the self-deregistration guard (S5) and the deregister-a-stranger
//! happy path.

use std::{sync::Arc, time::Duration};

use comfoconnect_rs::{
    BridgeError,
    client::client::BridgeConnection,
    codec::BodyKind,
    proto,
    sensors::{AlarmCallback, SensorCallback, SensorHold, SensorSpec, SensorValue},
};
use serial_test::serial;

use crate::integration_tests::common::{bind_mock_bridge, read_frame, write_reply};

struct NoopSensor;
impl SensorCallback for NoopSensor {
    fn on_sensor(&self, _sensor: &SensorSpec, _value: SensorValue) {}
}

struct NoopAlarm;
impl AlarmCallback for NoopAlarm {
    fn on_alarm(&self, _node_id: u32, _errors: std::collections::HashMap<u32, &'static str>) {}
}

/// S5: deregistering one's own uuid fails synchronously, without writing
/// any bytes or advancing the reference counter. We confirm the "no bytes
/// written, no reference advanced" part by observing that the very next
/// request the mock bridge receives still carries reference 1.
#[tokio::test]
#[serial]
async fn self_deregistration_is_rejected_without_touching_the_wire() {
    let local_uuid = [0xaa; 16];
    let listener = bind_mock_bridge().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let frame = read_frame(&mut stream).await;
        assert_eq!(frame.cmd.reference, Some(1), "reference must not have advanced past 1");
        assert!(matches!(frame.body, BodyKind::ListRegisteredAppsRequest(_)));
        write_reply(
            &mut stream,
            1,
            BodyKind::ListRegisteredAppsConfirm(proto::ListRegisteredAppsConfirm { apps: Vec::new() }),
        )
        .await;
    });

    let conn = BridgeConnection::connect(
        "127.0.0.1",
        local_uuid,
        [2u8; 16],
        Duration::from_secs(2),
        Duration::from_secs(2),
        Arc::new(NoopSensor),
        Arc::new(NoopAlarm),
        Arc::new(SensorHold::new()),
    )
    .await
    .expect("connect");

    let err = conn.deregister_app(local_uuid).await.unwrap_err();
    assert!(matches!(err, BridgeError::SelfDeregistration));

    conn.list_registered_apps().await.expect("list_registered_apps");

    server.await.expect("mock bridge task panicked");
}

#[tokio::test]
#[serial]
async fn deregistering_another_app_round_trips_normally() {
    let listener = bind_mock_bridge().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let frame = read_frame(&mut stream).await;
        let BodyKind::DeregisterAppRequest(req) = frame.body else {
            panic!("expected DeregisterAppRequest, got {:?}", frame.body);
        };
        assert_eq!(req.uuid, vec![0x09; 16]);
        let reference = frame.cmd.reference.expect("reference present");
        write_reply(
            &mut stream,
            reference,
            BodyKind::DeregisterAppConfirm(proto::DeregisterAppConfirm {}),
        )
        .await;
    });

    let conn = BridgeConnection::connect(
        "127.0.0.1",
        [0xaa; 16],
        [2u8; 16],
        Duration::from_secs(2),
        Duration::from_secs(2),
        Arc::new(NoopSensor),
        Arc::new(NoopAlarm),
        Arc::new(SensorHold::new()),
    )
    .await
    .expect("connect");

    conn.deregister_app([0x09; 16]).await.expect("deregister_app");

    server.await.expect("mock bridge task panicked");
}
