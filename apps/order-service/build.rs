//! Build Script for Order Service
//!
//! Generates Rust protobuf stubs from workspace proto definitions.
//!
//! # Panics Policy
//!
//! Build scripts halt on any failure: a missing or malformed proto file
//! leaves nothing to compile against, and Cargo reports the panic message.
#![allow(clippy::expect_used)]

use std::{env, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../../packages/proto/");

    // Emit cfg for coverage detection
    if env::var("CARGO_LLVM_COV").is_ok()
        || env::var("LLVM_PROFILE_FILE").is_ok()
        || env::var("RUSTFLAGS")
            .map(|f| f.contains("instrument-coverage"))
            .unwrap_or(false)
    {
        println!("cargo:rustc-cfg=coverage");
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let proto_root = manifest_dir.join("../../packages/proto");
    let proto_files = [
        proto_root.join("common/v1/common.proto"),
        proto_root.join("order/v1/order.proto"),
        proto_root.join("spot_instrument/v1/spot_instrument.proto"),
    ];

    for proto in &proto_files {
        println!("cargo:rerun-if-changed={}", proto.display());
    }

    // Parse in-process with protox so neither protoc nor buf is needed in PATH.
    let fds = protox::compile(&proto_files, [&proto_root])
        .expect("Failed to parse protobuf definitions");

    tonic_prost_build::configure()
        .build_client(true) // Spot instrument client + integration tests
        .build_server(true)
        .compile_fds(fds)
        .expect("Failed to compile protobuf definitions");
}
