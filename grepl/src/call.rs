//! # Calls
//!
//! Dispatches a method to the handler matching its streaming shape:
//!
//! * Unary and server streaming methods take exactly one request.
//! * Client and bidirectional streaming methods take requests until the filler reports the end
//!   of its input.
use crate::formatter::FormattedString;
use futures_util::StreamExt;
use grepl_core::{
    fill::{FillError, Filler},
    grpc::{GrpcClient, Invoker},
    present::{Presenter, Shape},
    prost_reflect::{DynamicMessage, Kind, MethodDescriptor, ReflectMessage},
    resolver::TypeResolver,
    source::DescriptorSource,
    tonic::{Status, transport::Channel},
};

pub enum Output {
    Unary(Result<DynamicMessage, Status>),
    Streaming(Result<Vec<Result<DynamicMessage, Status>>, Status>),
}

impl Output {
    /// Prints every response through `presenter`, and failed statuses in red.
    pub fn print(self, presenter: &dyn Presenter, tabular: bool) -> anyhow::Result<()> {
        let print = |response: Result<DynamicMessage, Status>| -> anyhow::Result<()> {
            match response {
                Ok(message) => {
                    let text = presenter.format(&shape_of(message, tabular))?;
                    println!("{}", FormattedString(text));
                }
                Err(status) => println!("{}", FormattedString::from(status)),
            }
            Ok(())
        };

        match self {
            Output::Unary(response) => print(response),
            Output::Streaming(Ok(responses)) => responses.into_iter().try_for_each(print),
            Output::Streaming(Err(status)) => print(Err(status)),
        }
    }
}

pub async fn run<D, F>(
    client: &mut GrpcClient<Channel>,
    resolver: &mut TypeResolver<D>,
    filler: &mut F,
    method: &MethodDescriptor,
    headers: Vec<(String, String)>,
) -> anyhow::Result<Output>
where
    D: DescriptorSource,
    F: Filler,
{
    tracing::info!(method = method.full_name(), "calling");

    match (method.is_client_streaming(), method.is_server_streaming()) {
        (false, false) => {
            let request = fill_one(filler, resolver, method).await?;
            handle_unary(client, method, request, headers).await
        }
        (false, true) => {
            let request = fill_one(filler, resolver, method).await?;
            handle_server_stream(client, method, request, headers).await
        }
        (true, false) => {
            let requests = fill_all(filler, resolver, method).await?;
            handle_client_stream(client, method, requests, headers).await
        }
        (true, true) => {
            let requests = fill_all(filler, resolver, method).await?;
            handle_bidirectional_stream(client, method, requests, headers).await
        }
    }
}

// --- Handlers ---

async fn handle_unary(
    client: &mut impl Invoker,
    method: &MethodDescriptor,
    request: DynamicMessage,
    headers: Vec<(String, String)>,
) -> anyhow::Result<Output> {
    let response = client.invoke_unary(method, request, headers).await?;
    tracing::debug!(metadata = ?response.metadata, "unary response");
    Ok(Output::Unary(response.message))
}

async fn handle_server_stream(
    client: &mut GrpcClient<Channel>,
    method: &MethodDescriptor,
    request: DynamicMessage,
    headers: Vec<(String, String)>,
) -> anyhow::Result<Output> {
    match client.server_streaming(method, request, headers).await? {
        Ok(stream) => Ok(Output::Streaming(Ok(stream.collect().await))),
        Err(status) => Ok(Output::Streaming(Err(status))),
    }
}

async fn handle_client_stream(
    client: &mut GrpcClient<Channel>,
    method: &MethodDescriptor,
    requests: Vec<DynamicMessage>,
    headers: Vec<(String, String)>,
) -> anyhow::Result<Output> {
    let result = client
        .client_streaming(method, tokio_stream::iter(requests), headers)
        .await?;

    Ok(Output::Unary(result))
}

async fn handle_bidirectional_stream(
    client: &mut GrpcClient<Channel>,
    method: &MethodDescriptor,
    requests: Vec<DynamicMessage>,
    headers: Vec<(String, String)>,
) -> anyhow::Result<Output> {
    match client
        .bidirectional_streaming(method, tokio_stream::iter(requests), headers)
        .await?
    {
        Ok(stream) => Ok(Output::Streaming(Ok(stream.collect().await))),
        Err(status) => Ok(Output::Streaming(Err(status))),
    }
}

async fn fill_one<D: DescriptorSource, F: Filler>(
    filler: &mut F,
    resolver: &mut TypeResolver<D>,
    method: &MethodDescriptor,
) -> anyhow::Result<DynamicMessage> {
    match filler.fill(&method.input(), resolver).await {
        Ok(request) => Ok(request),
        Err(FillError::EndOfInput) => Err(anyhow::anyhow!(
            "No request message was provided for '{}'",
            method.full_name()
        )),
        Err(err) => Err(err.into()),
    }
}

async fn fill_all<D: DescriptorSource, F: Filler>(
    filler: &mut F,
    resolver: &mut TypeResolver<D>,
    method: &MethodDescriptor,
) -> anyhow::Result<Vec<DynamicMessage>> {
    let input = method.input();
    let mut requests = Vec::new();

    loop {
        match filler.fill(&input, resolver).await {
            Ok(request) => requests.push(request),
            Err(FillError::EndOfInput) => break,
            Err(err) => return Err(err.into()),
        }
    }

    tracing::debug!(count = requests.len(), "collected stream requests");
    Ok(requests)
}

/// Table output lists a message through its first repeated field when that field holds
/// messages. Anything else is rendered as a whole message.
fn shape_of(message: DynamicMessage, tabular: bool) -> Shape {
    let listable = tabular
        && message
            .descriptor()
            .fields()
            .find(|f| f.is_list())
            .is_some_and(|f| matches!(f.kind(), Kind::Message(_)));

    if listable {
        Shape::Listing(message)
    } else {
        Shape::Message(message)
    }
}
