// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The session transport: a single TCP connection to a ComfoConnect bridge,
//! framing requests/replies and dispatching unsolicited notifications.

mod common;
#[allow(clippy::module_inception)]
pub mod client;

pub use client::BridgeConnection;
