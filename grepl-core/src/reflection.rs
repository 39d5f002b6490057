//! # Server Reflection
//!
//! This module contains the logic necessary to interact with the gRPC Server Reflection Protocol.
//!
//! It lets `grepl` discover a server's Protobuf schema at runtime, without local `.proto` files.
//! The protocol bindings come from `tonic-reflection`.
pub mod client;
