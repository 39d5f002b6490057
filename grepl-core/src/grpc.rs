//! # Generic gRPC Transport
//!
//! Low-level building blocks for performing gRPC calls with dynamic message types.
//!
//! Unlike standard `tonic` clients, which are generated per service, the components here work with
//! [`prost_reflect::DynamicMessage`] and a [`prost_reflect::MethodDescriptor`] picked at runtime.
pub mod client;
pub mod codec;

pub use client::{GrpcClient, GrpcRequestError, Invoker, UnaryResponse};
