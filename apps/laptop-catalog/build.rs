//! Build Script for Laptop Catalog
//!
//! Generates the `LaptopService` client and server stubs. Message types are
//! declared by hand with `prost` derives in `src/domain/laptop` and
//! `src/infrastructure/grpc/messages.rs`, so no `protoc` is needed.

use std::env;

const CODEC: &str = "tonic_prost::ProstCodec";
const MESSAGES: &str = "crate::infrastructure::grpc::messages";

fn main() {
    // Rerun build script if it changes
    println!("cargo:rerun-if-changed=build.rs");

    // Emit cfg for coverage detection
    if env::var("CARGO_LLVM_COV").is_ok()
        || env::var("LLVM_PROFILE_FILE").is_ok()
        || env::var("RUSTFLAGS")
            .map(|f| f.contains("instrument-coverage"))
            .unwrap_or(false)
    {
        println!("cargo:rustc-cfg=coverage");
    }

    let service = tonic_build::manual::Service::builder()
        .name("LaptopService")
        .package("catalog.v1")
        .comment("Laptop catalog: create, search, image upload and rating.")
        .method(
            tonic_build::manual::Method::builder()
                .name("create_laptop")
                .route_name("CreateLaptop")
                .input_type(format!("{MESSAGES}::CreateLaptopRequest"))
                .output_type(format!("{MESSAGES}::CreateLaptopResponse"))
                .codec_path(CODEC)
                .build(),
        )
        .method(
            tonic_build::manual::Method::builder()
                .name("search_laptop")
                .route_name("SearchLaptop")
                .input_type(format!("{MESSAGES}::SearchLaptopRequest"))
                .output_type(format!("{MESSAGES}::SearchLaptopResponse"))
                .codec_path(CODEC)
                .server_streaming()
                .build(),
        )
        .method(
            tonic_build::manual::Method::builder()
                .name("upload_image")
                .route_name("UploadImage")
                .input_type(format!("{MESSAGES}::UploadImageRequest"))
                .output_type(format!("{MESSAGES}::UploadImageResponse"))
                .codec_path(CODEC)
                .client_streaming()
                .build(),
        )
        .method(
            tonic_build::manual::Method::builder()
                .name("rate_laptop")
                .route_name("RateLaptop")
                .input_type(format!("{MESSAGES}::RateLaptopRequest"))
                .output_type(format!("{MESSAGES}::RateLaptopResponse"))
                .codec_path(CODEC)
                .client_streaming()
                .server_streaming()
                .build(),
        )
        .build();

    tonic_build::manual::Builder::new().compile(&[service]);
}
