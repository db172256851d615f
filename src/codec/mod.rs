// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The wire codec: framing (length-prefixed envelope carrying two protobuf
//! records) plus the [`BodyKind`] registry that turns `GatewayOperation.type`
//! into a concrete, statically typed body.
//!
//! The envelope itself is not protobuf — only `cmd` and `body` are. Framing
//! is `len_prefix(4) ‖ src(16) ‖ dst(16) ‖ cmd_len(2) ‖ cmd_bytes ‖
//! body_bytes`, with `len_prefix` counting everything after itself.

mod registry;

use prost::Message;

pub use self::registry::BodyKind;
pub use crate::proto::gateway_operation::GatewayResult;
use crate::{error::BridgeError, proto};

/// A fully decoded frame: the two UUIDs from the envelope, the decoded `cmd`
/// record, and the body dispatched from the registry by `cmd.type`.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub src: [u8; 16],
    pub dst: [u8; 16],
    pub cmd: proto::GatewayOperation,
    pub body: BodyKind,
}

/// Builds a `GatewayOperation` header for `body`, stamping its registry
/// operation type automatically.
pub fn build_cmd(
    body: &BodyKind,
    result: GatewayResult,
    reference: Option<u32>,
    result_description: Option<String>,
) -> proto::GatewayOperation {
    proto::GatewayOperation {
        r#type: Some(body.operation_type() as i32),
        result: Some(result as i32),
        result_description,
        reference,
    }
}

/// Encodes `cmd` and `body` into one length-prefixed frame, as specified by
/// the wire codec's encode contract.
pub fn encode_frame(
    cmd: &proto::GatewayOperation,
    body: &BodyKind,
    src: &[u8; 16],
    dst: &[u8; 16],
) -> Vec<u8> {
    let cmd_bytes = cmd.encode_to_vec();
    let body_bytes = body.encode_to_vec();
    let cmd_len = u16::try_from(cmd_bytes.len()).unwrap_or(u16::MAX);

    let total_len = 32 + cmd_bytes.len() + body_bytes.len() + 2;
    let mut out = Vec::with_capacity(4 + total_len);
    out.extend_from_slice(&u32::try_from(total_len).unwrap_or(u32::MAX).to_be_bytes());
    out.extend_from_slice(src);
    out.extend_from_slice(dst);
    out.extend_from_slice(&cmd_len.to_be_bytes());
    out.extend_from_slice(&cmd_bytes);
    out.extend_from_slice(&body_bytes);
    out
}

/// Decodes a framed buffer, excluding the 4-byte length prefix the caller
/// already stripped off the wire.
///
/// Unknown `cmd.type` values yield [`BridgeError::DecodeError`]; per the
/// connection policy this is logged and the connection kept open, never a
/// reason to abort.
pub fn decode_frame(buf: &[u8]) -> Result<DecodedFrame, BridgeError> {
    if buf.len() < 34 {
        return Err(BridgeError::DecodeError(format!(
            "frame too short: {} bytes, need at least 34",
            buf.len()
        )));
    }

    let mut src = [0u8; 16];
    let mut dst = [0u8; 16];
    src.copy_from_slice(&buf[0..16]);
    dst.copy_from_slice(&buf[16..32]);
    let cmd_len = u16::from_be_bytes([buf[32], buf[33]]) as usize;

    let cmd_start = 34;
    let cmd_end = cmd_start
        .checked_add(cmd_len)
        .filter(|&end| end <= buf.len())
        .ok_or_else(|| BridgeError::DecodeError("cmd_len exceeds frame length".to_string()))?;

    let cmd = proto::GatewayOperation::decode(&buf[cmd_start..cmd_end])
        .map_err(|e| BridgeError::DecodeError(e.to_string()))?;
    let body_bytes = &buf[cmd_end..];

    let op_type = cmd.r#type.unwrap_or(0);
    let operation_type = proto::gateway_operation::OperationType::try_from(op_type)
        .map_err(|_| BridgeError::DecodeError(format!("unknown operation type {op_type}")))?;

    let body = BodyKind::decode(operation_type, body_bytes)?;

    Ok(DecodedFrame { src, dst, cmd, body })
}
