//! # Grepl Core
//!
//! `grepl-core` is the engine powering the `grepl` interactive client. It resolves Protobuf
//! schemas at runtime, lets callers navigate them and builds request messages field by field,
//! without any compile-time knowledge of the services being called.
//!
//! ## Key Components
//!
//! * **[`source`]:** The [`DescriptorSource`](source::DescriptorSource) contract and its two
//!   implementations, one backed by local `.proto` files (or a compiled descriptor set) and one
//!   backed by gRPC Server Reflection.
//! * **[`registry`]:** The process-wide descriptor registry, seeded with the well-known types.
//! * **[`resolver`]:** Resolution of message types by name or by `google.protobuf.Any` type URL,
//!   falling back to the registry.
//! * **[`idl`]:** Package → service → RPC navigation.
//! * **[`fill`]:** The interactive and silent message fillers.
//! * **[`present`]:** Rendering of responses over a closed set of shapes.
//!
//! ## Transport
//!
//! * **[`GrpcClient`](grpc::client::GrpcClient):** A dynamic gRPC client exchanging
//!   `DynamicMessage`s through a custom codec.
//! * **[`ReflectionClient`](reflection::client::ReflectionClient):** A minimal
//!   `grpc.reflection.v1` client used by the reflection descriptor source.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod fill;
pub mod grpc;
pub mod idl;
pub mod present;
pub mod reflection;
pub mod registry;
pub mod resolver;
pub mod source;

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
