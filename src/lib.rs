// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A pure-Rust async client for the Zehnder ComfoConnect LAN C
//! ventilation-bridge protocol: wire codec, UDP discovery, session
//! transport, the RMI/PDO semantic layer, and a reconnecting supervisor.

pub mod cfg;
pub mod client;
pub mod codec;
pub mod discovery;
pub mod error;
pub mod proto;
pub mod rmi;
pub mod sensors;
pub mod supervisor;
pub mod util;
pub mod utils;
pub mod vocab;

pub use error::{BridgeError, Result};
