//! # Reflection Client
//!
//! A client implementation for `grpc.reflection.v1`.
//!
//! The client builds a complete `FileDescriptorSet` for a symbol by asking the server for the
//! file that declares it, then following that file's imports until every dependency has been
//! fetched over the same bidirectional stream.
//!
//! Dropping a pending call drops the request sender as well, which closes the outbound half of
//! the stream; nothing is cached between calls.
//!
//! ## References
//!
//! * [gRPC Server Reflection Protocol](https://github.com/grpc/grpc/blob/master/doc/server-reflection.md)
use crate::BoxError;
use futures_util::stream::once;
use http_body::Body as HttpBody;
use prost::Message;
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::{Streaming, client::GrpcService};
use tonic_reflection::pb::v1::{
    ServerReflectionRequest, ServerReflectionResponse,
    server_reflection_client::ServerReflectionClient, server_reflection_request::MessageRequest,
    server_reflection_response::MessageResponse,
};

#[derive(Debug, thiserror::Error)]
pub enum ReflectionResolveError {
    #[error(
        "Failed to start a stream request with the reflection server, reflection might not be supported: '{0}'"
    )]
    ServerStreamInitFailed(#[source] tonic::Status),

    #[error("The server stream returned an error status: '{0}'")]
    ServerStreamFailure(#[source] tonic::Status),

    #[error("Reflection stream closed unexpectedly")]
    StreamClosed,

    #[error("Internal error: Failed to send request to stream")]
    SendFailed,

    #[error("Server returned reflection error code {code}: {message}")]
    ServerError { code: i32, message: String },

    #[error("Protocol error: Received unexpected response type: {0}")]
    UnexpectedResponseType(String),

    #[error("Failed to decode FileDescriptorProto: {0}")]
    DecodeError(#[from] prost::DecodeError),
}

impl ReflectionResolveError {
    /// Whether the server reported that the requested symbol or file does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ServerStreamFailure(status) => status.code() == tonic::Code::NotFound,
            Self::ServerError { code, .. } => *code == tonic::Code::NotFound as i32,
            _ => false,
        }
    }
}

// The host field of reflection requests is optional and servers ignore it in practice.
const EMPTY_HOST: &str = "";

/// A generic client for the gRPC Server Reflection Protocol.
#[derive(Debug, Clone)]
pub struct ReflectionClient<T = Channel> {
    client: ServerReflectionClient<T>,
}

impl<S> ReflectionClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(channel: S) -> Self {
        let client = ServerReflectionClient::new(channel);
        Self { client }
    }

    /// Fetches the file declaring `symbol` together with all of its transitive imports.
    ///
    /// # Returns
    ///
    /// * `Ok(fd_set)` - Every file needed to build a pool containing `symbol`.
    /// * `Err(ReflectionResolveError)` - The stream could not be opened, the server answered
    ///   with an error, or a descriptor failed to decode.
    pub async fn file_descriptor_set_containing_symbol(
        &mut self,
        symbol: &str,
    ) -> Result<FileDescriptorSet, ReflectionResolveError> {
        let (tx, rx) = mpsc::channel(100);

        let mut response_stream = self
            .client
            .server_reflection_info(ReceiverStream::new(rx))
            .await
            .map_err(ReflectionResolveError::ServerStreamInitFailed)?
            .into_inner();

        tx.send(request(MessageRequest::FileContainingSymbol(
            symbol.to_string(),
        )))
        .await
        .map_err(|_| ReflectionResolveError::SendFailed)?;

        let files = collect_descriptors(&mut response_stream, tx).await?;
        tracing::debug!(
            symbol,
            files = files.len(),
            "fetched descriptors via reflection"
        );

        Ok(FileDescriptorSet {
            file: files.into_values().collect(),
        })
    }

    /// Lists all services exposed by the server.
    pub async fn list_services(&mut self) -> Result<Vec<String>, ReflectionResolveError> {
        let req = request(MessageRequest::ListServices(String::new()));

        let mut response_stream = self
            .client
            .server_reflection_info(once(async { req }))
            .await
            .map_err(ReflectionResolveError::ServerStreamInitFailed)?
            .into_inner();

        let response = next_response(&mut response_stream).await?;

        match response.message_response {
            Some(MessageResponse::ListServicesResponse(resp)) => {
                Ok(resp.service.into_iter().map(|s| s.name).collect())
            }
            other => Err(unexpected(other)),
        }
    }
}

fn request(message: MessageRequest) -> ServerReflectionRequest {
    ServerReflectionRequest {
        host: EMPTY_HOST.to_string(),
        message_request: Some(message),
    }
}

async fn next_response(
    response_stream: &mut Streaming<ServerReflectionResponse>,
) -> Result<ServerReflectionResponse, ReflectionResolveError> {
    response_stream
        .message()
        .await
        .map_err(ReflectionResolveError::ServerStreamFailure)?
        .ok_or(ReflectionResolveError::StreamClosed)
}

fn unexpected(response: Option<MessageResponse>) -> ReflectionResolveError {
    match response {
        Some(MessageResponse::ErrorResponse(e)) => ReflectionResolveError::ServerError {
            code: e.error_code,
            message: e.error_message,
        },
        Some(other) => ReflectionResolveError::UnexpectedResponseType(format!("{other:?}")),
        None => ReflectionResolveError::UnexpectedResponseType("Empty Message".into()),
    }
}

async fn collect_descriptors(
    response_stream: &mut Streaming<ServerReflectionResponse>,
    request_channel: mpsc::Sender<ServerReflectionRequest>,
) -> Result<HashMap<String, FileDescriptorProto>, ReflectionResolveError> {
    let mut inflight = 1;
    let mut collected = HashMap::new();
    let mut requested = HashSet::new();

    while inflight > 0 {
        let response = next_response(response_stream).await?;
        inflight -= 1;

        let batch = match response.message_response {
            Some(MessageResponse::FileDescriptorResponse(res)) => res.file_descriptor_proto,
            other => return Err(unexpected(other)),
        };

        for raw in batch {
            let fd = FileDescriptorProto::decode(raw.as_ref())?;

            let Some(name) = fd.name.clone() else {
                continue;
            };
            if collected.contains_key(&name) {
                continue;
            }

            for dep in &fd.dependency {
                if !collected.contains_key(dep) && requested.insert(dep.clone()) {
                    request_channel
                        .send(request(MessageRequest::FileByFilename(dep.clone())))
                        .await
                        .map_err(|_| ReflectionResolveError::SendFailed)?;
                    inflight += 1;
                }
            }

            collected.insert(name, fd);
        }
    }

    Ok(collected)
}
