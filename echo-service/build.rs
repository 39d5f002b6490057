use std::{env, path::PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto");

    let descriptors = PathBuf::from(env::var("OUT_DIR")?).join("descriptors.bin");

    tonic_prost_build::configure()
        .build_client(false)
        .build_server(true)
        .file_descriptor_set_path(descriptors)
        .compile_protos(&["proto/echo.proto"], &["proto"])?;

    Ok(())
}
