// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Cancellation and timeout behavior of [`BridgeConnection`]: a caller
//! disconnect drains in-flight waiters with `NotConnected`, and a
//! non-responding bridge times out and tears the connection down.

use std::{sync::Arc, time::Duration};

use comfoconnect_rs::{
    BridgeError,
    client::client::BridgeConnection,
    sensors::{AlarmCallback, SensorCallback, SensorHold, SensorSpec, SensorValue},
};
use serial_test::serial;

use crate::integration_tests::common::bind_mock_bridge;

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
async fn disconnect_fails_pending_request_with_not_connected() {
    let listener = bind_mock_bridge().await;

    let server = tokio::spawn(async move {
        // Accept and then just sit there: never reply to anything.
        let (stream, _) = listener.accept().await.expect("accept");
        tokio::time::sleep(Duration::from_millis(200)).await;
        drop(stream);
    });

    let conn = BridgeConnection::connect(
        "127.0.0.1",
        [1u8; 16],
        [2u8; 16],
        Duration::from_secs(2),
        Duration::from_secs(5),
        Arc::new(NoopSensor),
        Arc::new(NoopAlarm),
        Arc::new(SensorHold::new()),
    )
    .await
    .expect("connect");

    let conn_for_request = Arc::clone(&conn);
    let request = tokio::spawn(async move { conn_for_request.list_registered_apps().await });

    // Give the request a moment to register itself on the event bus before
    // we pull the rug out.
    tokio::time::sleep(Duration::from_millis(20)).await;
    conn.disconnect().await;

    let result = request.await.expect("request task");
    assert!(matches!(result, Err(BridgeError::NotConnected)));

    server.abort();
}

#[tokio::test]
#[serial]
async fn request_times_out_and_tears_down_the_connection() {
    let listener = bind_mock_bridge().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        // Never reply; hold the socket open past the request timeout.
        tokio::time::sleep(Duration::from_millis(500)).await;
        drop(stream);
    });

    let conn = BridgeConnection::connect(
        "127.0.0.1",
        [1u8; 16],
        [2u8; 16],
        Duration::from_millis(50),
        Duration::from_secs(2),
        Arc::new(NoopSensor),
        Arc::new(NoopAlarm),
        Arc::new(SensorHold::new()),
    )
    .await
    .expect("connect");

    let started = tokio::time::Instant::now();
    let result = conn.list_registered_apps().await;
    assert!(matches!(result, Err(BridgeError::Timeout)));
    assert!(started.elapsed() < Duration::from_millis(500), "timeout should fire near the 50ms bound");

    assert!(!conn.is_connected(), "a timed-out request tears the connection down");

    server.abort();
}
