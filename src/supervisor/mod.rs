// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The connection supervisor: orchestrates connect -> start-session ->
//! sensor-hold -> re-subscribe -> read, reconnecting transparently on
//! disconnect or timeout and re-registering every sensor the caller has
//! ever asked for.
//!
//! Modeled as an explicit state machine over
//! `{Connecting, SessionStarting, Holding, SubscribingSensors, Reading,
//! Backoff}`: one unit struct per state, each implementing [`StateMachine`]
//! and returning a [`Transition`] to the next one. A step never blocks on
//! wire replies directly — it drives a [`BridgeConnection`], which owns its
//! own request/reply correlation.

mod common;

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::{RwLock, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use self::common::{StateMachine, Transition};
use crate::{
    cfg::config::{Config, SensorSubscription},
    client::client::BridgeConnection,
    error::{BridgeError, Result},
    sensors::{AlarmCallback, SensorCallback, SensorHold},
};

/// Pause between reconnect attempts after a connect or session-start
/// failure that is not fatal.
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// State shared with [`BridgeHandle`]s. Separate from [`SupervisorCtx`] so
/// the run loop can hold the latter by exclusive `&mut` reference, as
/// [`StateMachine::step`] requires, while handles keep read/write access to
/// just the pieces they need through interior mutability.
struct Shared {
    sensors: DashMap<u32, SensorSubscription>,
    current: RwLock<Option<Arc<BridgeConnection>>>,
    cancel: CancellationToken,
}

/// Everything a supervisor step needs. Owned exclusively by the run loop;
/// never shared directly.
struct SupervisorCtx {
    host: String,
    local_uuid: [u8; 16],
    bridge_uuid: [u8; 16],
    connect_timeout: Duration,
    request_timeout: Duration,
    sensor_hold_timeout: Duration,
    shared: Arc<Shared>,
    sensor_callback: Arc<dyn SensorCallback>,
    alarm_callback: Arc<dyn AlarmCallback>,
    sensor_hold: Arc<SensorHold>,
    connected_tx: Option<oneshot::Sender<Result<()>>>,
}

impl SupervisorCtx {
    /// Fulfils the first-connect handshake exactly once; every later call is
    /// a no-op, so subsequent reconnects don't block on a receiver nobody is
    /// awaiting anymore.
    fn fulfil_connected(&mut self, result: Result<()>) {
        if let Some(tx) = self.connected_tx.take() {
            let _ = tx.send(result);
        }
    }
}

/// A live, self-reconnecting session. Cheap to clone; every clone shares the
/// same underlying supervisor task and connection.
#[derive(Clone)]
pub struct BridgeHandle {
    shared: Arc<Shared>,
}

impl BridgeHandle {
    /// The connection currently in use, if any. Transiently `None` while
    /// reconnecting.
    pub async fn current(&self) -> Result<Arc<BridgeConnection>> {
        self.shared.current.read().await.clone().ok_or(BridgeError::NotConnected)
    }

    /// Adds (or replaces) a PDO subscription in the registry and, if a
    /// session is currently live, arms it immediately. The registry entry
    /// survives reconnects: [`SubscribingSensors`] replays it on every
    /// (re)connect.
    pub async fn register_sensor(&self, pdid: u32, pdo_type: u8, zone: u32) -> Result<()> {
        self.shared.sensors.insert(pdid, SensorSubscription { pdid, pdo_type });
        if let Some(conn) = self.shared.current.read().await.as_ref() {
            conn.rpdo_request(pdid, u32::from(pdo_type), zone, Some(u32::MAX)).await?;
        }
        Ok(())
    }

    /// Removes a PDO subscription from the registry and, if a session is
    /// currently live, disarms it (`timeout=0`).
    pub async fn deregister_sensor(&self, pdid: u32, pdo_type: u8, zone: u32) -> Result<()> {
        self.shared.sensors.remove(&pdid);
        if let Some(conn) = self.shared.current.read().await.as_ref() {
            conn.rpdo_request(pdid, u32::from(pdo_type), zone, Some(0)).await?;
        }
        Ok(())
    }

    /// Caller-initiated shutdown: cancels the supervisor task and the
    /// current connection's reader, and awaits both closing. No further
    /// reconnect attempt is made afterwards.
    pub async fn disconnect(&self) {
        self.shared.cancel.cancel();
        if let Some(conn) = self.shared.current.read().await.clone() {
            conn.disconnect().await;
        }
    }
}

/// Starts the supervisor loop as a background task and awaits the first
/// connect/start-session pass before returning. Resolves to an error only
/// when that first pass fails fatally (`NotAllowed`, e.g. an unregistered
/// `local_uuid`); transient timeouts are retried internally behind the
/// scenes and are invisible to the caller.
pub async fn connect(
    cfg: &Config,
    bridge_uuid: [u8; 16],
    local_uuid: [u8; 16],
    sensor_callback: Arc<dyn SensorCallback>,
    alarm_callback: Arc<dyn AlarmCallback>,
) -> Result<BridgeHandle> {
    let sensors = DashMap::with_capacity(cfg.sensors.len());
    for sub in &cfg.sensors {
        sensors.insert(sub.pdid, *sub);
    }

    let shared = Arc::new(Shared { sensors, current: RwLock::new(None), cancel: CancellationToken::new() });

    let (connected_tx, connected_rx) = oneshot::channel();
    let mut ctx = SupervisorCtx {
        host: cfg.bridge.host.clone(),
        local_uuid,
        bridge_uuid,
        connect_timeout: cfg.runtime.connect_timeout,
        request_timeout: cfg.runtime.request_timeout,
        sensor_hold_timeout: cfg.runtime.sensor_hold_timeout,
        shared: Arc::clone(&shared),
        sensor_callback,
        alarm_callback,
        sensor_hold: Arc::new(SensorHold::new()),
        connected_tx: Some(connected_tx),
    };

    tokio::spawn(async move {
        run(&mut ctx).await;
    });

    match connected_rx.await {
        Ok(result) => result.map(|()| BridgeHandle { shared }),
        Err(_) => Err(BridgeError::NotConnected),
    }
}

async fn run(ctx: &mut SupervisorCtx) {
    let mut state = SupervisorState::Connecting(Connecting);
    loop {
        let transition = state.step(ctx).await;
        match transition {
            Transition::Next(next, Ok(())) => {
                if matches!(next, SupervisorState::Reading(_)) {
                    ctx.fulfil_connected(Ok(()));
                }
                state = next;
            },
            Transition::Next(next, Err(e)) => {
                warn!("supervisor step failed, retrying: {e}");
                state = next;
            },
            Transition::Stay(_) => {},
            Transition::Done(result) => {
                if let Err(e) = &result {
                    warn!("supervisor exiting: {e}");
                }
                ctx.fulfil_connected(result);
                return;
            },
        }
    }
}

#[derive(Debug)]
enum SupervisorState {
    Connecting(Connecting),
    SessionStarting(SessionStarting),
    Holding(Holding),
    SubscribingSensors(SubscribingSensors),
    Reading(Reading),
    Backoff(Backoff),
}

type Step = Transition<SupervisorState, Result<()>>;
type BoxStep<'a> = Pin<Box<dyn Future<Output = Step> + Send + 'a>>;

impl SupervisorState {
    fn step(&mut self, ctx: &mut SupervisorCtx) -> BoxStep<'_> {
        match self {
            Self::Connecting(s) => s.step(ctx),
            Self::SessionStarting(s) => s.step(ctx),
            Self::Holding(s) => s.step(ctx),
            Self::SubscribingSensors(s) => s.step(ctx),
            Self::Reading(s) => s.step(ctx),
            Self::Backoff(s) => s.step(ctx),
        }
    }
}

/// Opens the TCP socket. Any failure (timeout, refused, unreachable) backs
/// off and retries from here; a caller-initiated disconnect observed before
/// dialing ends the loop outright.
#[derive(Debug)]
struct Connecting;

impl StateMachine<SupervisorCtx, Step> for Connecting {
    type StepResult<'a> = BoxStep<'a>;

    fn step<'a>(&'a mut self, ctx: &'a mut SupervisorCtx) -> Self::StepResult<'a> {
        Box::pin(async move {
            if ctx.shared.cancel.is_cancelled() {
                return Transition::Done(Ok(()));
            }

            let conn = BridgeConnection::connect(
                &ctx.host,
                ctx.local_uuid,
                ctx.bridge_uuid,
                ctx.request_timeout,
                ctx.connect_timeout,
                Arc::clone(&ctx.sensor_callback),
                Arc::clone(&ctx.alarm_callback),
                Arc::clone(&ctx.sensor_hold),
            )
            .await;

            match conn {
                Ok(conn) => {
                    *ctx.shared.current.write().await = Some(conn);
                    Transition::Next(SupervisorState::SessionStarting(SessionStarting), Ok(()))
                },
                Err(e) => {
                    info!("connect failed, retrying in {:?}: {e}", RECONNECT_BACKOFF);
                    Transition::Next(SupervisorState::Backoff(Backoff { duration: RECONNECT_BACKOFF }), Err(e))
                },
            }
        })
    }
}

/// Claims the session with `takeover=true`. `NOT_ALLOWED` (typically an
/// unregistered `local_uuid`) is fatal for the whole supervisor; every other
/// error retries from [`Connecting`].
#[derive(Debug)]
struct SessionStarting;

impl StateMachine<SupervisorCtx, Step> for SessionStarting {
    type StepResult<'a> = BoxStep<'a>;

    fn step<'a>(&'a mut self, ctx: &'a mut SupervisorCtx) -> Self::StepResult<'a> {
        Box::pin(async move {
            let Some(conn) = ctx.shared.current.read().await.clone() else {
                return Transition::Next(SupervisorState::Connecting(Connecting), Ok(()));
            };

            match conn.start_session(true).await {
                Ok(_) => Transition::Next(SupervisorState::Holding(Holding), Ok(())),
                Err(e) if e.is_fatal_for_supervisor() => {
                    conn.disconnect().await;
                    Transition::Done(Err(e))
                },
                Err(e) => {
                    conn.disconnect().await;
                    Transition::Next(SupervisorState::Backoff(Backoff { duration: RECONNECT_BACKOFF }), Err(e))
                },
            }
        })
    }
}

/// Arms the sensor-hold window. Raw PDO values arriving from here on are
/// cached by [`SensorHold`] but not yet dispatched, masking the known
/// firmware bug that emits garbage readings right after session start.
#[derive(Debug)]
struct Holding;

impl StateMachine<SupervisorCtx, Step> for Holding {
    type StepResult<'a> = BoxStep<'a>;

    fn step<'a>(&'a mut self, ctx: &'a mut SupervisorCtx) -> Self::StepResult<'a> {
        Box::pin(async move {
            ctx.sensor_hold.arm(ctx.sensor_hold_timeout);
            Transition::Next(SupervisorState::SubscribingSensors(SubscribingSensors), Ok(()))
        })
    }
}

/// Replays every registered sensor's `rpdo_request`, idempotently, so a
/// reconnect looks identical to first connect from the bridge's point of
/// view.
#[derive(Debug)]
struct SubscribingSensors;

impl StateMachine<SupervisorCtx, Step> for SubscribingSensors {
    type StepResult<'a> = BoxStep<'a>;

    fn step<'a>(&'a mut self, ctx: &'a mut SupervisorCtx) -> Self::StepResult<'a> {
        Box::pin(async move {
            let Some(conn) = ctx.shared.current.read().await.clone() else {
                return Transition::Next(SupervisorState::Connecting(Connecting), Ok(()));
            };

            let subs: Vec<SensorSubscription> = ctx.shared.sensors.iter().map(|e| *e.value()).collect();
            for sub in subs {
                if let Err(e) = conn.rpdo_request(sub.pdid, u32::from(sub.pdo_type), 1, Some(u32::MAX)).await {
                    conn.disconnect().await;
                    return Transition::Next(SupervisorState::Connecting(Connecting), Err(e));
                }
            }

            Transition::Next(SupervisorState::Reading(Reading), Ok(()))
        })
    }
}

/// Waits for the current connection to tear down, either because the
/// socket closed/timed out or because the caller called
/// [`BridgeHandle::disconnect`]. A disconnect observed here reconnects
/// immediately, with no backoff.
#[derive(Debug)]
struct Reading;

impl StateMachine<SupervisorCtx, Step> for Reading {
    type StepResult<'a> = BoxStep<'a>;

    fn step<'a>(&'a mut self, ctx: &'a mut SupervisorCtx) -> Self::StepResult<'a> {
        Box::pin(async move {
            let Some(conn) = ctx.shared.current.read().await.clone() else {
                return Transition::Next(SupervisorState::Connecting(Connecting), Ok(()));
            };

            tokio::select! {
                () = ctx.shared.cancel.cancelled() => {
                    conn.disconnect().await;
                    Transition::Done(Ok(()))
                },
                () = conn.wait_disconnected() => {
                    *ctx.shared.current.write().await = None;
                    Transition::Next(SupervisorState::Connecting(Connecting), Ok(()))
                },
            }
        })
    }
}

/// Sleeps before the next reconnect attempt, or exits immediately if the
/// caller disconnects while waiting.
#[derive(Debug)]
struct Backoff {
    duration: Duration,
}

impl StateMachine<SupervisorCtx, Step> for Backoff {
    type StepResult<'a> = BoxStep<'a>;

    fn step<'a>(&'a mut self, ctx: &'a mut SupervisorCtx) -> Self::StepResult<'a> {
        Box::pin(async move {
            tokio::select! {
                () = ctx.shared.cancel.cancelled() => Transition::Done(Ok(())),
                () = tokio::time::sleep(self.duration) => {
                    Transition::Next(SupervisorState::Connecting(Connecting), Ok(()))
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopSensor;
    impl SensorCallback for NoopSensor {
        fn on_sensor(&self, _sensor: &crate::sensors::SensorSpec, _value: crate::sensors::SensorValue) {}
    }

    struct NoopAlarm;
    impl AlarmCallback for NoopAlarm {
        fn on_alarm(&self, _node_id: u32, _errors: std::collections::HashMap<u32, &'static str>) {}
    }

    fn sample_config() -> Config {
        let mut cfg: Config = serde_yaml::from_str(
            r#"
bridge:
  Host: "127.0.0.1"
app:
  DeviceName: "test"
  Pin: 1234
sensors:
  - Pdid: 16
    PdoType: 1
runtime:
  ConnectTimeout: 1
  RequestTimeout: 1
  DiscoveryTimeout: 1
  SensorHoldTimeout: 1
"#,
        )
        .expect("parse");
        cfg.validate_and_normalize().expect("validate");
        cfg
    }

    #[tokio::test]
    async fn connect_does_not_hang_when_nothing_listens() {
        let cfg = sample_config();
        let fut = connect(&cfg, [0u8; 16], [1u8; 16], Arc::new(NoopSensor), Arc::new(NoopAlarm));
        // With nothing listening on 127.0.0.1:56747, the supervisor retries
        // the connect step forever; this only asserts the call doesn't
        // resolve within the window, i.e. it's genuinely retrying rather
        // than terminating or panicking.
        let outcome = tokio::time::timeout(Duration::from_millis(200), fut).await;
        assert!(outcome.is_err(), "connect should still be retrying, not resolved");
    }
}
