//! # Generic gRPC Client
//!
//! Wraps a `tonic` client to perform calls on any method, with requests and responses carried as
//! [`DynamicMessage`]s by the [`DynamicCodec`].
//!
//! * **Dynamic pathing**: the HTTP/2 path (`/package.Service/Method`) is built at runtime.
//! * **Metadata**: `(key, value)` string pairs become request metadata, with typed errors for
//!   invalid keys and values.
//! * **Access patterns**: unary, server streaming, client streaming and bidirectional calls.
use super::codec::DynamicCodec;
use crate::BoxError;
use futures_util::Stream;
use http_body::Body as HttpBody;
use prost_reflect::{DynamicMessage, MethodDescriptor};
use std::{future::Future, str::FromStr};
use tonic::{
    Status,
    client::GrpcService,
    metadata::{
        MetadataKey, MetadataMap, MetadataValue,
        errors::{InvalidMetadataKey, InvalidMetadataValue},
    },
    transport::Channel,
};

#[derive(thiserror::Error, Debug)]
pub enum GrpcRequestError {
    #[error("Internal error, the client was not ready: '{0}'")]
    ClientNotReady(#[source] BoxError),
    #[error("Invalid metadata (header) key '{key}': '{source}'")]
    InvalidMetadataKey {
        key: String,
        source: InvalidMetadataKey,
    },
    #[error("Invalid metadata (header) value for key '{key}': '{source}'")]
    InvalidMetadataValue {
        key: String,
        source: InvalidMetadataValue,
    },
}

/// The outcome of a unary call that reached the server.
#[derive(Debug)]
pub struct UnaryResponse {
    /// The response message, or the status the server failed the call with.
    pub message: Result<DynamicMessage, Status>,
    /// Response headers and trailers.
    pub metadata: MetadataMap,
}

/// Sends a single request and waits for its response.
///
/// This is the seam between filling a request and invoking it, so callers can swap the
/// network for a test double.
pub trait Invoker {
    fn invoke_unary(
        &mut self,
        method: &MethodDescriptor,
        message: DynamicMessage,
        headers: Vec<(String, String)>,
    ) -> impl Future<Output = Result<UnaryResponse, GrpcRequestError>>;
}

/// A generic gRPC client for methods described at runtime.
#[derive(Debug, Clone)]
pub struct GrpcClient<S = Channel> {
    client: tonic::client::Grpc<S>,
}

impl<S> GrpcClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        let client = tonic::client::Grpc::new(service);
        Self { client }
    }

    /// Performs a Unary gRPC call (Single Request -> Single Response).
    ///
    /// # Returns
    /// * `Ok(Ok(response))` - Successful RPC execution.
    /// * `Ok(Err(Status))` - RPC executed, but server returned an error.
    /// * `Err(GrpcRequestError)` - Failed to send request or connect.
    pub async fn unary(
        &mut self,
        method: &MethodDescriptor,
        payload: DynamicMessage,
        headers: Vec<(String, String)>,
    ) -> Result<Result<tonic::Response<DynamicMessage>, Status>, GrpcRequestError> {
        self.ready().await?;

        let request = build_request(payload, headers)?;
        Ok(self
            .client
            .unary(request, http_path(method), codec(method))
            .await)
    }

    /// Performs a Server Streaming gRPC call (Single Request -> Stream of Responses).
    pub async fn server_streaming(
        &mut self,
        method: &MethodDescriptor,
        payload: DynamicMessage,
        headers: Vec<(String, String)>,
    ) -> Result<
        Result<impl Stream<Item = Result<DynamicMessage, Status>> + use<S>, Status>,
        GrpcRequestError,
    > {
        self.ready().await?;

        let request = build_request(payload, headers)?;
        match self
            .client
            .server_streaming(request, http_path(method), codec(method))
            .await
        {
            Ok(response) => Ok(Ok(response.into_inner())),
            Err(status) => Ok(Err(status)),
        }
    }

    /// Performs a Client Streaming gRPC call (Stream of Requests -> Single Response).
    pub async fn client_streaming(
        &mut self,
        method: &MethodDescriptor,
        payload_stream: impl Stream<Item = DynamicMessage> + Send + 'static,
        headers: Vec<(String, String)>,
    ) -> Result<Result<DynamicMessage, Status>, GrpcRequestError> {
        self.ready().await?;

        let request = build_request(payload_stream, headers)?;
        match self
            .client
            .client_streaming(request, http_path(method), codec(method))
            .await
        {
            Ok(response) => Ok(Ok(response.into_inner())),
            Err(status) => Ok(Err(status)),
        }
    }

    /// Performs a Bidirectional Streaming gRPC call (Stream of Requests -> Stream of Responses).
    pub async fn bidirectional_streaming<P>(
        &mut self,
        method: &MethodDescriptor,
        payload_stream: P,
        headers: Vec<(String, String)>,
    ) -> Result<
        Result<impl Stream<Item = Result<DynamicMessage, Status>> + use<S, P>, Status>,
        GrpcRequestError,
    >
    where
        P: Stream<Item = DynamicMessage> + Send + 'static,
    {
        self.ready().await?;

        let request = build_request(payload_stream, headers)?;
        match self
            .client
            .streaming(request, http_path(method), codec(method))
            .await
        {
            Ok(response) => Ok(Ok(response.into_inner())),
            Err(status) => Ok(Err(status)),
        }
    }

    async fn ready(&mut self) -> Result<(), GrpcRequestError> {
        self.client
            .ready()
            .await
            .map_err(|e| GrpcRequestError::ClientNotReady(e.into()))
    }
}

impl<S> Invoker for GrpcClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    async fn invoke_unary(
        &mut self,
        method: &MethodDescriptor,
        message: DynamicMessage,
        headers: Vec<(String, String)>,
    ) -> Result<UnaryResponse, GrpcRequestError> {
        let response = match self.unary(method, message, headers).await? {
            Ok(response) => {
                let (metadata, message, _) = response.into_parts();
                UnaryResponse {
                    message: Ok(message),
                    metadata,
                }
            }
            Err(status) => UnaryResponse {
                metadata: status.metadata().clone(),
                message: Err(status),
            },
        };

        Ok(response)
    }
}

fn codec(method: &MethodDescriptor) -> DynamicCodec {
    DynamicCodec::new(method.input(), method.output())
}

fn http_path(method: &MethodDescriptor) -> http::uri::PathAndQuery {
    let path = format!("/{}/{}", method.parent_service().full_name(), method.name());
    http::uri::PathAndQuery::from_str(&path).expect("valid gRPC path")
}

fn build_request<T>(
    payload: T,
    headers: Vec<(String, String)>,
) -> Result<tonic::Request<T>, GrpcRequestError> {
    let mut request = tonic::Request::new(payload);
    for (k, v) in headers {
        let key =
            MetadataKey::from_str(&k).map_err(|source| GrpcRequestError::InvalidMetadataKey {
                key: k.clone(),
                source,
            })?;
        let val = MetadataValue::from_str(&v)
            .map_err(|source| GrpcRequestError::InvalidMetadataValue { key: k, source })?;
        request.metadata_mut().insert(key, val);
    }
    Ok(request)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn invalid_header_keys_are_reported() {
        let err = build_request((), vec![("bad key".into(), "v".into())]).unwrap_err();

        assert!(matches!(
            err,
            GrpcRequestError::InvalidMetadataKey { key, .. } if key == "bad key"
        ));
    }

    #[test]
    fn headers_become_metadata() {
        let request = build_request((), vec![("x-token".into(), "abc".into())]).unwrap();

        assert_eq!(request.metadata().get("x-token").unwrap(), "abc");
    }
}
