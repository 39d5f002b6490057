//! # Type Resolver
//!
//! Resolves message types for `google.protobuf.Any` payloads and other late-bound references.
//!
//! Resolution asks the wrapped [`DescriptorSource`] first. When the source does not know the
//! symbol, the process-wide [`registry`] is consulted, which always carries the well-known
//! types, so schemas can reference `google.protobuf.Timestamp` and friends without importing them.
use crate::{
    registry,
    source::{Descriptor, DescriptorSource, SourceError},
};
use prost_reflect::MessageDescriptor;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Message type '{0}' not found")]
    NotFound(String),
    #[error("Symbol '{0}' is not a message type")]
    NotAMessage(String),
    #[error(transparent)]
    Source(SourceError),
}

/// Wraps a descriptor source for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct TypeResolver<D> {
    source: D,
}

impl<D: DescriptorSource> TypeResolver<D> {
    pub fn new(source: D) -> Self {
        Self { source }
    }

    /// Resolves a fully qualified message name (e.g. `my.package.Message`).
    pub async fn resolve_by_name(
        &mut self,
        full_name: &str,
    ) -> Result<MessageDescriptor, ResolveError> {
        match self.source.find_symbol(full_name).await {
            Ok(Descriptor::MessageDescriptor(message)) => Ok(message),
            Ok(_) => Err(ResolveError::NotAMessage(full_name.to_string())),
            Err(SourceError::NotFound(_)) => {
                tracing::debug!(full_name, "falling back to the descriptor registry");
                registry::find_message(full_name)
                    .ok_or_else(|| ResolveError::NotFound(full_name.to_string()))
            }
            Err(err) => Err(ResolveError::Source(err)),
        }
    }

    /// Resolves an `Any` type URL (e.g. `type.googleapis.com/my.package.Message`).
    ///
    /// Everything up to and including the last `/` is ignored.
    pub async fn resolve_by_url(&mut self, url: &str) -> Result<MessageDescriptor, ResolveError> {
        self.resolve_by_name(type_name_from_url(url)).await
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut D {
        &mut self.source
    }

    pub fn into_source(self) -> D {
        self.source
    }
}

/// Strips the authority part of an `Any` type URL.
pub fn type_name_from_url(url: &str) -> &str {
    url.rsplit_once('/').map_or(url, |(_, name)| name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn type_name_from_url_keeps_the_trailing_symbol() {
        assert_eq!(
            type_name_from_url("type.googleapis.com/google.protobuf.Duration"),
            "google.protobuf.Duration"
        );
        assert_eq!(
            type_name_from_url("example.com/a/b/pkg.Message"),
            "pkg.Message"
        );
        assert_eq!(type_name_from_url("pkg.Message"), "pkg.Message");
    }
}
