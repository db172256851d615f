// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Exercises a full connect -> start_session -> rmi_request round trip
//! against an in-process mock bridge, standing in for the real device.

use std::{sync::Arc, time::Duration};

use comfoconnect_rs::{
    client::client::BridgeConnection,
    codec::{BodyKind, GatewayResult},
    proto,
    rmi::ventilation,
    sensors::{AlarmCallback, SensorCallback, SensorHold, SensorSpec, SensorValue},
};
use serial_test::serial;
use tokio::io::AsyncWriteExt;

use crate::integration_tests::common::{bind_mock_bridge, read_frame, write_reply};

struct NoopSensor;
impl SensorCallback for NoopSensor {
    fn on_sensor(&self, _sensor: &SensorSpec, _value: SensorValue) {}
}

struct NoopAlarm;
impl AlarmCallback for NoopAlarm {
    fn on_alarm(&self, _node_id: u32, _errors: std::collections::HashMap<u32, &'static str>) {}
}

#[tokio::test]
#[serial]
async fn connects_starts_session_and_completes_an_rmi_request() {
    let listener = bind_mock_bridge().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");

        // start_session
        let frame = read_frame(&mut stream).await;
        assert!(matches!(frame.body, BodyKind::StartSessionRequest(_)));
        let reference = frame.cmd.reference.expect("reference present");
        write_reply(
            &mut stream,
            reference,
            BodyKind::StartSessionConfirm(proto::StartSessionConfirm {}),
        )
        .await;

        // rmi_request (get_speed -> schedule-mode GET on subunit 1, selector 1)
        let frame = read_frame(&mut stream).await;
        let BodyKind::CnRmiRequest(req) = frame.body else {
            panic!("expected CnRmiRequest, got {:?}", frame.body);
        };
        assert_eq!(req.message, vec![0x83, 0x15, 0x01, 0x01]);
        let reference = frame.cmd.reference.expect("reference present");
        write_reply(
            &mut stream,
            reference,
            BodyKind::CnRmiResponse(proto::CnRmiResponse { message: Some(vec![0x03]) }),
        )
        .await;

        stream.shutdown().await.ok();
    });

    let conn = BridgeConnection::connect(
        "127.0.0.1",
        [1u8; 16],
        [2u8; 16],
        Duration::from_secs(2),
        Duration::from_secs(2),
        Arc::new(NoopSensor),
        Arc::new(NoopAlarm),
        Arc::new(SensorHold::new()),
    )
    .await
    .expect("connect");

    conn.start_session(true).await.expect("start_session");

    let speed = ventilation::get_speed(&conn).await.expect("get_speed");
    assert_eq!(speed, comfoconnect_rs::vocab::VentilationSpeed::High);

    server.await.expect("mock bridge task panicked");
}

#[tokio::test]
#[serial]
async fn set_speed_high_matches_the_documented_wire_payload() {
    let listener = bind_mock_bridge().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let frame = read_frame(&mut stream).await;
        let BodyKind::CnRmiRequest(req) = frame.body else {
            panic!("expected CnRmiRequest, got {:?}", frame.body);
        };
        assert_eq!(
            req.message,
            vec![0x84, 0x15, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x03]
        );
        let reference = frame.cmd.reference.expect("reference present");
        write_reply(
            &mut stream,
            reference,
            BodyKind::CnRmiResponse(proto::CnRmiResponse { message: Some(Vec::new()) }),
        )
        .await;
        stream.shutdown().await.ok();
    });

    let conn = BridgeConnection::connect(
        "127.0.0.1",
        [1u8; 16],
        [2u8; 16],
        Duration::from_secs(2),
        Duration::from_secs(2),
        Arc::new(NoopSensor),
        Arc::new(NoopAlarm),
        Arc::new(SensorHold::new()),
    )
    .await
    .expect("connect");

    ventilation::set_speed(&conn, comfoconnect_rs::vocab::VentilationSpeed::High).await.expect("set_speed");

    server.await.expect("mock bridge task panicked");
}

#[tokio::test]
#[serial]
async fn non_ok_result_fails_the_waiting_request() {
    let listener = bind_mock_bridge().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let frame = read_frame(&mut stream).await;
        let reference = frame.cmd.reference.expect("reference present");

        let body = BodyKind::RegisterAppConfirm(proto::RegisterAppConfirm {});
        let cmd = comfoconnect_rs::codec::build_cmd(
            &body,
            GatewayResult::NotAllowed,
            Some(reference),
            Some("wrong pin".to_string()),
        );
        let frame_bytes = comfoconnect_rs::codec::encode_frame(
            &cmd,
            &body,
            &crate::integration_tests::common::MOCK_SRC,
            &crate::integration_tests::common::MOCK_DST,
        );
        stream.write_all(&frame_bytes).await.expect("write error reply");
        stream.shutdown().await.ok();
    });

    let conn = BridgeConnection::connect(
        "127.0.0.1",
        [1u8; 16],
        [2u8; 16],
        Duration::from_secs(2),
        Duration::from_secs(2),
        Arc::new(NoopSensor),
        Arc::new(NoopAlarm),
        Arc::new(SensorHold::new()),
    )
    .await
    .expect("connect");

    let err = conn.register_app([9u8; 16], "test".to_string(), 1234).await.unwrap_err();
    assert!(matches!(err, comfoconnect_rs::BridgeError::NotAllowed { .. }));

    server.await.expect("mock bridge task panicked");
}
