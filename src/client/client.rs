// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A single session transport connection to a ComfoConnect LAN C bridge.
//!
//! One TCP socket, split into a reader task and a writer guarded by a mutex.
//! Requests are correlated to replies by the envelope's `reference` field: a
//! oneshot sender is registered in the event bus before the frame is
//! written, and the reader task resolves it when a reply with a matching
//! reference comes back. Unsolicited notifications (sensor PDOs, alarms,
//! close-session requests) are dispatched directly from the reader task
//! instead of going through the event bus.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::{Mutex, oneshot},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::common::io_with_timeout;
use crate::{
    codec::{self, BodyKind, DecodedFrame, GatewayResult},
    error::{BridgeError, Result},
    proto,
    sensors::{AlarmCallback, SensorCallback, SensorHold},
    util,
};

/// TCP port the ComfoConnect LAN C bridge listens on.
pub const PORT: u16 = 56747;

/// A live session to one bridge. Cheap to clone via `Arc`; the reader task
/// holds its own `Arc` clone so the connection outlives any single caller.
pub struct BridgeConnection {
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
    local_uuid: [u8; 16],
    bridge_uuid: [u8; 16],
    reference: AtomicU32,
    event_bus: DashMap<u32, oneshot::Sender<Result<BodyKind>>>,
    cancel: CancellationToken,
    sensor_callback: Arc<dyn SensorCallback>,
    alarm_callback: Arc<dyn AlarmCallback>,
    sensor_hold: Arc<SensorHold>,
    request_timeout: Duration,
}

impl BridgeConnection {
    /// Opens a TCP connection to `host:PORT`, bounded by `connect_timeout`,
    /// and spawns the reader task.
    #[allow(clippy::too_many_arguments)]
    pub async fn connect(
        host: &str,
        local_uuid: [u8; 16],
        bridge_uuid: [u8; 16],
        request_timeout: Duration,
        connect_timeout: Duration,
        sensor_callback: Arc<dyn SensorCallback>,
        alarm_callback: Arc<dyn AlarmCallback>,
        sensor_hold: Arc<SensorHold>,
    ) -> Result<Arc<Self>> {
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect((host, PORT)))
            .await
            .map_err(|_| BridgeError::Timeout)?
            .map_err(BridgeError::Io)?;
        stream.set_nodelay(true).map_err(BridgeError::Io)?;

        let (r, w) = stream.into_split();
        let conn = Arc::new(Self {
            reader: Mutex::new(r),
            writer: Mutex::new(w),
            local_uuid,
            bridge_uuid,
            reference: AtomicU32::new(1),
            event_bus: DashMap::new(),
            cancel: CancellationToken::new(),
            sensor_callback,
            alarm_callback,
            sensor_hold,
            request_timeout,
        });

        let reader = Arc::clone(&conn);
        tokio::spawn(async move {
            reader.read_loop().await;
        });

        Ok(conn)
    }

    pub fn is_connected(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Resolves once this connection has torn down, whether by remote
    /// close, read timeout, or an explicit [`Self::disconnect`]. Used by the
    /// connection supervisor to notice a dead session without polling.
    pub async fn wait_disconnected(&self) {
        self.cancel.cancelled().await;
    }

    /// Tears down the connection: cancels the reader task, fails every
    /// pending request with `NotConnected`, and half-closes the socket.
    pub async fn disconnect(&self) {
        self.teardown();
        let mut w = self.writer.lock().await;
        let _ = w.shutdown().await;
    }

    fn teardown(&self) {
        self.cancel.cancel();
        let pending: Vec<u32> = self.event_bus.iter().map(|e| *e.key()).collect();
        for reference in pending {
            if let Some((_, tx)) = self.event_bus.remove(&reference) {
                let _ = tx.send(Err(BridgeError::NotConnected));
            }
        }
    }

    /// Sends one request, optionally awaiting its reply. Mirrors the
    /// session's send contract: the reference is registered before the
    /// frame is written, and is advanced unconditionally regardless of
    /// whether a reply is expected.
    async fn send(&self, body: BodyKind, expect_reply: bool) -> Result<BodyKind> {
        if self.cancel.is_cancelled() {
            return Err(BridgeError::NotConnected);
        }

        let reference = self.reference.fetch_add(1, Ordering::SeqCst);

        let rx = if expect_reply {
            let (tx, rx) = oneshot::channel();
            self.event_bus.insert(reference, tx);
            Some(rx)
        } else {
            None
        };

        let cmd = codec::build_cmd(&body, GatewayResult::Ok, Some(reference), None);
        let frame = codec::encode_frame(&cmd, &body, &self.local_uuid, &self.bridge_uuid);

        if let Err(e) = self.write_frame(&frame).await {
            self.event_bus.remove(&reference);
            return Err(e);
        }

        let Some(rx) = rx else {
            return Ok(BodyKind::Empty);
        };

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BridgeError::NotConnected),
            Err(_) => {
                self.event_bus.remove(&reference);
                warn!("request (reference={reference}) timed out, disconnecting");
                self.teardown();
                Err(BridgeError::Timeout)
            },
        }
    }

    async fn write_frame(&self, bytes: &[u8]) -> Result<()> {
        let mut w = self.writer.lock().await;
        io_with_timeout("write frame", w.write_all(bytes), self.request_timeout, &self.cancel)
            .await
            .map_err(|_| BridgeError::NotConnected)
    }

    async fn read_loop(self: Arc<Self>) {
        loop {
            match self.read_one_frame().await {
                Ok(frame) => self.dispatch(frame),
                Err(BridgeError::DecodeError(e)) => {
                    warn!("dropping malformed frame: {e}");
                },
                Err(e) => {
                    info!("session transport read loop ending: {e}");
                    self.teardown();
                    return;
                },
            }
        }
    }

    async fn read_one_frame(&self) -> Result<DecodedFrame> {
        let mut len_buf = [0u8; 4];
        self.read_exact_cancelable(&mut len_buf).await?;
        let total_len = u32::from_be_bytes(len_buf) as usize;

        let mut body = vec![0u8; total_len];
        self.read_exact_cancelable(&mut body).await?;

        codec::decode_frame(&body)
    }

    /// Blocks until exactly `buf.len()` bytes have arrived or the
    /// connection is cancelled. Unlike `write_frame` this is not bounded by
    /// `request_timeout`: the reader must sit and wait for whatever comes
    /// next, which may be a long time if the bridge is merely idle.
    async fn read_exact_cancelable(&self, buf: &mut [u8]) -> Result<()> {
        let mut r = self.reader.lock().await;
        tokio::select! {
            () = self.cancel.cancelled() => Err(BridgeError::NotConnected),
            res = r.read_exact(buf) => res.map(|_| ()).map_err(|_| BridgeError::NotConnected),
        }
    }

    fn dispatch(&self, frame: DecodedFrame) {
        let reference = frame.cmd.reference;
        let result = frame.cmd.result;
        let description = frame.cmd.result_description.clone();

        match frame.body {
            BodyKind::CnRpdoNotification(notif) => self.dispatch_sensor_notification(&notif),
            BodyKind::CnAlarmNotification(notif) => self.dispatch_alarm_notification(&notif),
            BodyKind::CloseSessionRequest(_) => info!("bridge asked us to close the connection"),
            BodyKind::GatewayNotification(_) | BodyKind::CnNodeNotification(_) => {
                debug!("received notification with no handler, ignoring");
            },
            other => match reference {
                Some(reference) => self.resolve(reference, result, description, other),
                None => warn!("unhandled frame with no reference: {other:?}"),
            },
        }
    }

    fn resolve(&self, reference: u32, result: Option<i32>, description: Option<String>, body: BodyKind) {
        let Some((_, tx)) = self.event_bus.remove(&reference) else {
            warn!("resolve: no waiter registered for reference {reference}");
            return;
        };

        let result = GatewayResult::try_from(result.unwrap_or(0)).unwrap_or(GatewayResult::InternalError);
        let outcome = match BridgeError::from_result(result, Some(reference), description.unwrap_or_default()) {
            Some(err) => Err(err),
            None => Ok(body),
        };
        let _ = tx.send(outcome);
    }

    fn dispatch_sensor_notification(&self, notif: &proto::CnRpdoNotification) {
        let raw = util::decode_signed_le(&notif.data);
        for (pdid, raw) in self.sensor_hold.dispatch(notif.pdid, raw) {
            match crate::sensors::lookup(pdid) {
                Some(spec) => self.sensor_callback.on_sensor(spec, spec.decode(raw)),
                None => debug!("notification for unregistered pdid {pdid}"),
            }
        }
    }

    fn dispatch_alarm_notification(&self, notif: &proto::CnAlarmNotification) {
        let sw_program_version = notif.sw_program_version.unwrap_or(0);
        let errors = notif.errors.as_deref().unwrap_or(&[]);
        let table = crate::sensors::decode_alarm_errors(sw_program_version, errors);
        self.alarm_callback.on_alarm(notif.node_id.unwrap_or(0), table);
    }

    pub async fn start_session(&self, take_over: bool) -> Result<proto::StartSessionConfirm> {
        let body = BodyKind::StartSessionRequest(proto::StartSessionRequest { takeover: Some(take_over) });
        match self.send(body, true).await? {
            BodyKind::StartSessionConfirm(c) => Ok(c),
            other => Err(unexpected_reply("start_session", &other)),
        }
    }

    /// `cmd_close_session` in the original protocol sends no reply.
    pub async fn close_session(&self) -> Result<()> {
        self.send(BodyKind::CloseSessionRequest(proto::CloseSessionRequest {}), false).await?;
        Ok(())
    }

    pub async fn list_registered_apps(&self) -> Result<proto::ListRegisteredAppsConfirm> {
        let body = BodyKind::ListRegisteredAppsRequest(proto::ListRegisteredAppsRequest {});
        match self.send(body, true).await? {
            BodyKind::ListRegisteredAppsConfirm(c) => Ok(c),
            other => Err(unexpected_reply("list_registered_apps", &other)),
        }
    }

    pub async fn register_app(
        &self,
        uuid: [u8; 16],
        devicename: String,
        pin: u32,
    ) -> Result<proto::RegisterAppConfirm> {
        let body = BodyKind::RegisterAppRequest(proto::RegisterAppRequest { uuid: uuid.to_vec(), pin, devicename });
        match self.send(body, true).await? {
            BodyKind::RegisterAppConfirm(c) => Ok(c),
            other => Err(unexpected_reply("register_app", &other)),
        }
    }

    /// Deregistering the local app's own uuid would sever the session it is
    /// issued on; rejected synchronously, before any bytes are written and
    /// without advancing the reference counter.
    pub async fn deregister_app(&self, uuid: [u8; 16]) -> Result<proto::DeregisterAppConfirm> {
        if uuid == self.local_uuid {
            return Err(BridgeError::SelfDeregistration);
        }
        let body = BodyKind::DeregisterAppRequest(proto::DeregisterAppRequest { uuid: uuid.to_vec() });
        match self.send(body, true).await? {
            BodyKind::DeregisterAppConfirm(c) => Ok(c),
            other => Err(unexpected_reply("deregister_app", &other)),
        }
    }

    pub async fn rmi_request(&self, message: Vec<u8>, node_id: u32) -> Result<Vec<u8>> {
        let node_id = if node_id == 0 { 1 } else { node_id };
        let body = BodyKind::CnRmiRequest(proto::CnRmiRequest { node_id, message });
        match self.send(body, true).await? {
            BodyKind::CnRmiResponse(resp) => Ok(resp.message.unwrap_or_default()),
            other => Err(unexpected_reply("rmi_request", &other)),
        }
    }

    pub async fn rpdo_request(&self, pdid: u32, pdo_type: u32, zone: u32, timeout: Option<u32>) -> Result<()> {
        let zone = if zone == 0 { 1 } else { zone };
        let body = BodyKind::CnRpdoRequest(proto::CnRpdoRequest {
            pdid,
            zone: Some(zone),
            r#type: Some(pdo_type),
            timeout,
            interval: None,
        });
        self.send(body, true).await?;
        Ok(())
    }

    /// `cmd_keepalive` sends no reply.
    pub async fn keepalive(&self) -> Result<()> {
        self.send(BodyKind::KeepAlive(proto::KeepAlive {}), false).await?;
        Ok(())
    }

    pub async fn version_request(&self) -> Result<proto::VersionConfirm> {
        match self.send(BodyKind::VersionRequest(proto::VersionRequest {}), true).await? {
            BodyKind::VersionConfirm(c) => Ok(c),
            other => Err(unexpected_reply("version_request", &other)),
        }
    }

    pub async fn time_request(&self) -> Result<proto::CnTimeConfirm> {
        let body = BodyKind::CnTimeRequest(proto::CnTimeRequest { set_time: None });
        match self.send(body, true).await? {
            BodyKind::CnTimeConfirm(c) => Ok(c),
            other => Err(unexpected_reply("time_request", &other)),
        }
    }
}

fn unexpected_reply(op: &'static str, body: &BodyKind) -> BridgeError {
    BridgeError::DecodeError(format!("unexpected reply to {op}: {:?}", body.operation_type()))
}
