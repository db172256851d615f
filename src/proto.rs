// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Generated protobuf bindings for the ComfoConnect wire schema
//! (`proto/zehnder.proto`), compiled by `build.rs` via `prost-build`.

#![allow(clippy::all)]

include!(concat!(env!("OUT_DIR"), "/zehnder.rs"));
