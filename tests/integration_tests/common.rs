// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use comfoconnect_rs::{
    client::client::PORT,
    codec::{self, BodyKind, DecodedFrame, GatewayResult},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

/// Envelope UUIDs the mock bridge stamps on its replies. Arbitrary: real
/// sessions only correlate by `cmd.reference`, never by these fields.
pub const MOCK_SRC: [u8; 16] = [0x22; 16];
pub const MOCK_DST: [u8; 16] = [0x11; 16];

/// Binds the one TCP port a [`comfoconnect_rs::client::client::BridgeConnection`]
/// will ever dial. Tests using this must be `#[serial]` so they don't race
/// each other for the port.
pub async fn bind_mock_bridge() -> TcpListener {
    TcpListener::bind(("127.0.0.1", PORT)).await.expect("bind mock bridge port")
}

/// Reads exactly one length-prefixed frame and decodes it.
pub async fn read_frame(stream: &mut TcpStream) -> DecodedFrame {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.expect("read frame length prefix");
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await.expect("read frame body");
    codec::decode_frame(&buf).expect("decode frame")
}

/// Writes a reply with the given `reference` and an `Ok` result.
pub async fn write_reply(stream: &mut TcpStream, reference: u32, body: BodyKind) {
    let cmd = codec::build_cmd(&body, GatewayResult::Ok, Some(reference), None);
    let frame = codec::encode_frame(&cmd, &body, &MOCK_SRC, &MOCK_DST);
    stream.write_all(&frame).await.expect("write reply frame");
}
