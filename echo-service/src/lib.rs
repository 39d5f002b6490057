//! An in-process echo server for the `grepl-core` integration tests.
//!
//! It exposes one method per streaming shape (`echo.EchoService`) and the encoded descriptor set
//! of `echo.proto`, so tests can also serve it through server reflection.

pub mod pb {
    include!(concat!(env!("OUT_DIR"), "/echo.rs"));
}

pub use pb::echo_service_server::{EchoService, EchoServiceServer};

/// The encoded `FileDescriptorSet` of `echo.proto`.
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("descriptors");
