// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Typed error kinds for the ComfoConnect client, one per protocol result
//! code plus the local/transport conditions the session transport and
//! supervisor can raise.

use thiserror::Error;

use crate::codec::GatewayResult;

/// Errors surfaced to callers of the bridge client.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("bad request (reference={reference:?}): {description}")]
    BadRequest {
        reference: Option<u32>,
        description: String,
    },

    #[error("internal error on bridge (reference={reference:?}): {description}")]
    InternalError {
        reference: Option<u32>,
        description: String,
    },

    #[error("bridge not reachable (reference={reference:?}): {description}")]
    NotReachable {
        reference: Option<u32>,
        description: String,
    },

    #[error("session taken over by another client (reference={reference:?})")]
    OtherSession { reference: Option<u32> },

    #[error("operation not allowed (reference={reference:?}): {description}")]
    NotAllowed {
        reference: Option<u32>,
        description: String,
    },

    #[error("bridge has no resources left (reference={reference:?})")]
    NoResources { reference: Option<u32> },

    #[error("object does not exist (reference={reference:?})")]
    NotExist { reference: Option<u32> },

    #[error("RMI error (reference={reference:?}): {description}")]
    RmiError {
        reference: Option<u32>,
        description: String,
    },

    #[error("not connected to bridge")]
    NotConnected,

    #[error("request timed out")]
    Timeout,

    #[error("no ComfoConnect bridge found")]
    BridgeNotFound,

    #[error("cannot deregister the local app's own uuid")]
    SelfDeregistration,

    #[error("value {value} is not valid for {context}")]
    InvalidValue { context: &'static str, value: i64 },

    #[error("failed to decode frame: {0}")]
    DecodeError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Maps a non-OK `GatewayOperation.result` plus its optional
    /// human-readable description into the corresponding typed error.
    pub fn from_result(
        result: GatewayResult,
        reference: Option<u32>,
        description: impl Into<String>,
    ) -> Option<Self> {
        let description = description.into();
        match result {
            GatewayResult::Ok => None,
            GatewayResult::BadRequest => Some(Self::BadRequest {
                reference,
                description,
            }),
            GatewayResult::InternalError => Some(Self::InternalError {
                reference,
                description,
            }),
            GatewayResult::NotReachable => Some(Self::NotReachable {
                reference,
                description,
            }),
            GatewayResult::OtherSession => Some(Self::OtherSession { reference }),
            GatewayResult::NotAllowed => Some(Self::NotAllowed {
                reference,
                description,
            }),
            GatewayResult::NoResources => Some(Self::NoResources { reference }),
            GatewayResult::NotExist => Some(Self::NotExist { reference }),
            GatewayResult::RmiError => Some(Self::RmiError {
                reference,
                description,
            }),
        }
    }

    /// `start_session` failing with `NOT_ALLOWED` is the one transport error
    /// the supervisor treats as fatal rather than reconnect-and-retry.
    pub fn is_fatal_for_supervisor(&self) -> bool {
        matches!(self, Self::NotAllowed { .. })
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
