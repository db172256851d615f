// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

fn main() -> std::io::Result<()> {
    println!("cargo:rerun-if-changed=proto/zehnder.proto");
    prost_build::compile_protos(&["proto/zehnder.proto"], &["proto/"])
}
