//! # Descriptor Sources
//!
//! A descriptor source answers one question: *given a fully qualified symbol name, what is its
//! descriptor?* Two implementations are provided:
//!
//! 1. **[`FileDescriptorSource`]**: Compiles local `.proto` files (or decodes a binary
//!    `FileDescriptorSet`) into an in-process pool.
//! 2. **[`ReflectionDescriptorSource`]**: Asks a live server through the gRPC Server Reflection
//!    Protocol (`grpc.reflection.v1`).
//!
//! Looking up a symbol that does not exist is an ordinary outcome and is reported as
//! [`SourceError::NotFound`].
mod file;
mod reflection;

pub use file::FileDescriptorSource;
pub use reflection::ReflectionDescriptorSource;

use crate::reflection::client::ReflectionResolveError;
use prost_reflect::{
    DescriptorError, DescriptorPool, EnumDescriptor, MessageDescriptor, MethodDescriptor,
    ServiceDescriptor,
};
use std::future::Future;

/// Errors produced while resolving symbols.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Symbol '{0}' not found")]
    NotFound(String),
    #[error("Failed to parse proto file '{file}': {source}")]
    Parse {
        file: String,
        #[source]
        source: protox::Error,
    },
    #[error("Failed to build descriptor pool: '{0}'")]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Transport(#[from] ReflectionResolveError),
}

/// The capability shared by every schema origin.
pub trait DescriptorSource {
    /// Resolves a fully qualified symbol (`my.package.Service`, `my.package.Message`,
    /// `my.package.Service.Method`, ...) into its descriptor.
    fn find_symbol(
        &mut self,
        symbol: &str,
    ) -> impl Future<Output = Result<Descriptor, SourceError>>;

    /// Lists the fully qualified names of every service this source knows about.
    fn list_services(&mut self) -> impl Future<Output = Result<Vec<String>, SourceError>>;
}

/// A generic wrapper for different types of Protobuf descriptors.
///
/// This enum allows sources to return a single type when resolving symbols,
/// regardless of whether the symbol points to a Service, a Method, a Message, or an Enum.
#[derive(Debug, Clone)]
pub enum Descriptor {
    MessageDescriptor(MessageDescriptor),
    ServiceDescriptor(ServiceDescriptor),
    MethodDescriptor(MethodDescriptor),
    EnumDescriptor(EnumDescriptor),
}

impl Descriptor {
    /// Returns the name (e.g.,`MyMessage`) of the inner descriptor
    pub fn name(&self) -> &str {
        match self {
            Descriptor::MessageDescriptor(v) => v.name(),
            Descriptor::ServiceDescriptor(v) => v.name(),
            Descriptor::MethodDescriptor(v) => v.name(),
            Descriptor::EnumDescriptor(v) => v.name(),
        }
    }

    /// Returns the full_name (e.g.,`my.package.v1.MyMessage`) of the inner descriptor
    pub fn full_name(&self) -> &str {
        match self {
            Descriptor::MessageDescriptor(v) => v.full_name(),
            Descriptor::ServiceDescriptor(v) => v.full_name(),
            Descriptor::MethodDescriptor(v) => v.full_name(),
            Descriptor::EnumDescriptor(v) => v.full_name(),
        }
    }

    /// Returns the package name (e.g.,`my.package.v1`) of the inner descriptor
    pub fn package_name(&self) -> &str {
        match self {
            Descriptor::MessageDescriptor(v) => v.package_name(),
            Descriptor::ServiceDescriptor(v) => v.package_name(),
            Descriptor::MethodDescriptor(v) => v.parent_service().package_name(),
            Descriptor::EnumDescriptor(v) => v.package_name(),
        }
    }

    /// Returns the file that declares this descriptor.
    pub fn parent_file(&self) -> prost_reflect::FileDescriptor {
        match self {
            Descriptor::MessageDescriptor(v) => v.parent_file(),
            Descriptor::ServiceDescriptor(v) => v.parent_file(),
            Descriptor::MethodDescriptor(v) => v.parent_service().parent_file(),
            Descriptor::EnumDescriptor(v) => v.parent_file(),
        }
    }

    /// Returns the inner [`MessageDescriptor`] if this variant is `MessageDescriptor`.
    pub fn message_descriptor(&self) -> Option<&MessageDescriptor> {
        match self {
            Descriptor::MessageDescriptor(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the inner [`ServiceDescriptor`] if this variant is `ServiceDescriptor`.
    pub fn service_descriptor(&self) -> Option<&ServiceDescriptor> {
        match self {
            Descriptor::ServiceDescriptor(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the inner [`MethodDescriptor`] if this variant is `MethodDescriptor`.
    pub fn method_descriptor(&self) -> Option<&MethodDescriptor> {
        match self {
            Descriptor::MethodDescriptor(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the inner [`EnumDescriptor`] if this variant is `EnumDescriptor`.
    pub fn enum_descriptor(&self) -> Option<&EnumDescriptor> {
        match self {
            Descriptor::EnumDescriptor(d) => Some(d),
            _ => None,
        }
    }
}

/// Looks up a symbol in a whole pool, services first.
pub(crate) fn descriptor_by_symbol(pool: &DescriptorPool, symbol: &str) -> Option<Descriptor> {
    if let Some(descriptor) = pool.get_service_by_name(symbol) {
        return Some(Descriptor::ServiceDescriptor(descriptor));
    }
    if let Some(descriptor) = pool.get_message_by_name(symbol) {
        return Some(Descriptor::MessageDescriptor(descriptor));
    }
    if let Some(descriptor) = pool.get_enum_by_name(symbol) {
        return Some(Descriptor::EnumDescriptor(descriptor));
    }
    let (service, method) = symbol.rsplit_once('.')?;
    pool.get_service_by_name(service)?
        .methods()
        .find(|m| m.name() == method)
        .map(Descriptor::MethodDescriptor)
}
