// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! UDP discovery of ComfoConnect LAN C bridges on the local network.
//!
//! A 2-byte probe is broadcast (or sent unicast to a known host) on port
//! [`crate::client::client::PORT`]; bridges answer with a `DiscoveryOperation`
//! protobuf record. The probe is echoed back on the broadcast domain and
//! must be filtered out by comparing against the literal probe bytes.

use std::{net::Ipv4Addr, time::Duration};

use prost::Message;
use tokio::net::UdpSocket;
use tracing::{debug, error};

use crate::{client::client::PORT, error::BridgeError, proto};

const PROBE: [u8; 2] = [0x0a, 0x00];
const FALLBACK_BROADCAST: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 255);

/// One discovered bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bridge {
    pub host: String,
    pub uuid: String,
}

/// Resolves the default route interface's broadcast address, falling back
/// to the limited broadcast address on any failure.
fn broadcast_addr() -> Ipv4Addr {
    resolve_broadcast_addr().unwrap_or(FALLBACK_BROADCAST)
}

fn resolve_broadcast_addr() -> Option<Ipv4Addr> {
    let iface = default_net::get_default_interface().ok()?;
    let net = iface.ipv4.first()?;
    let addr = u32::from(net.addr);
    let netmask = u32::from(net.netmask);
    Some(Ipv4Addr::from(addr | !netmask))
}

/// Sends the discovery probe and collects `DiscoveryOperation` replies.
///
/// When `host` is given, the probe is sent unicast and the result is
/// returned as soon as the first valid reply arrives (or `timeout`
/// elapses). When `host` is `None`, the probe is broadcast and every reply
/// received within `timeout` is collected.
pub async fn discover_bridges(host: Option<&str>, timeout: Duration) -> Result<Vec<Bridge>, BridgeError> {
    let socket = UdpSocket::bind(("0.0.0.0", 0)).await.map_err(BridgeError::Io)?;

    let target = match host {
        Some(host) => host.to_string(),
        None => {
            socket.set_broadcast(true).map_err(BridgeError::Io)?;
            broadcast_addr().to_string()
        },
    };

    socket.send_to(&PROBE, (target.as_str(), PORT)).await.map_err(BridgeError::Io)?;

    let mut bridges = Vec::new();
    let deadline = tokio::time::Instant::now() + timeout;
    let mut buf = [0u8; 2048];

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }

        let recv = tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await;
        let Ok(Ok((n, _from))) = recv else {
            break;
        };

        if &buf[..n] == PROBE.as_slice() {
            debug!("ignoring echoed discovery probe");
            continue;
        }

        match proto::DiscoveryOperation::decode(&buf[..n]) {
            Ok(op) =>
                if let Some(resp) = op.search_gateway_response {
                    bridges.push(Bridge { host: resp.ipaddress, uuid: hex::encode(resp.uuid) });
                    if host.is_some() {
                        break;
                    }
                },
            Err(e) => error!("failed to parse discovery response: {e}"),
        }
    }

    Ok(bridges)
}

/// Convenience wrapper for callers that need exactly one bridge: resolves
/// via [`discover_bridges`] and fails with [`BridgeError::BridgeNotFound`]
/// if nothing answered.
pub async fn discover_one(host: Option<&str>, timeout: Duration) -> Result<Bridge, BridgeError> {
    discover_bridges(host, timeout).await?.into_iter().next().ok_or(BridgeError::BridgeNotFound)
}
