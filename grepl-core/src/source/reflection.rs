//! # Reflection Descriptor Source
//!
//! Serves descriptors straight from a server's reflection service. The server is authoritative:
//! there is no local cache and no fallback, every lookup is a fresh round trip.
use super::{Descriptor, DescriptorSource, SourceError, descriptor_by_symbol};
use crate::{BoxError, reflection::client::ReflectionClient};
use http_body::Body as HttpBody;
use prost_reflect::DescriptorPool;
use tonic::{client::GrpcService, transport::Channel};

/// Services that only exist to describe the server itself.
const REFLECTION_SERVICES: &[&str] = &[
    "grpc.reflection.v1.ServerReflection",
    "grpc.reflection.v1alpha.ServerReflection",
];

#[derive(Debug, Clone)]
pub struct ReflectionDescriptorSource<S = Channel> {
    client: ReflectionClient<S>,
}

impl<S> ReflectionDescriptorSource<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Creates a source over an open connection (or any in-process `tonic` service).
    pub fn new(service: S) -> Self {
        Self {
            client: ReflectionClient::new(service),
        }
    }
}

impl<S> DescriptorSource for ReflectionDescriptorSource<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    async fn find_symbol(&mut self, symbol: &str) -> Result<Descriptor, SourceError> {
        let fd_set = self
            .client
            .file_descriptor_set_containing_symbol(symbol)
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    SourceError::NotFound(symbol.to_string())
                } else {
                    SourceError::Transport(err)
                }
            })?;

        let pool = DescriptorPool::from_file_descriptor_set(fd_set)?;

        descriptor_by_symbol(&pool, symbol).ok_or_else(|| SourceError::NotFound(symbol.to_string()))
    }

    async fn list_services(&mut self) -> Result<Vec<String>, SourceError> {
        let services = self.client.list_services().await?;

        Ok(services
            .into_iter()
            .filter(|s| !REFLECTION_SERVICES.contains(&s.as_str()))
            .collect())
    }
}
