//! # Dynamic Codec
//!
//! Implements `tonic::codec::Codec` over [`DynamicMessage`], so `tonic` can carry messages whose
//! types are only known at runtime.
//!
//! * **Encoder**: checks that the message is of the method's input type and writes its Protobuf
//!   encoding to the gRPC buffer.
//! * **Decoder**: reads the wire bytes into a [`DynamicMessage`] of the method's output type.
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor, ReflectMessage};
use tonic::{
    Status,
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
};

/// A codec holding the request and response descriptors of a single method.
pub struct DynamicCodec {
    request: MessageDescriptor,
    response: MessageDescriptor,
}

impl DynamicCodec {
    pub fn new(request: MessageDescriptor, response: MessageDescriptor) -> Self {
        Self { request, response }
    }
}

impl Codec for DynamicCodec {
    type Encode = DynamicMessage;
    type Decode = DynamicMessage;

    type Encoder = DynamicEncoder;
    type Decoder = DynamicDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        DynamicEncoder(self.request.clone())
    }

    fn decoder(&mut self) -> Self::Decoder {
        DynamicDecoder(self.response.clone())
    }
}

pub struct DynamicEncoder(MessageDescriptor);

impl Encoder for DynamicEncoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        if item.descriptor().full_name() != self.0.full_name() {
            return Err(Status::invalid_argument(format!(
                "Expected a '{}' request, got '{}'",
                self.0.full_name(),
                item.descriptor().full_name()
            )));
        }

        item.encode_raw(dst);
        Ok(())
    }
}

pub struct DynamicDecoder(MessageDescriptor);

impl Decoder for DynamicDecoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let mut message = DynamicMessage::new(self.0.clone());
        message
            .merge(src)
            .map_err(|e| Status::internal(format!("Failed to decode Protobuf bytes: {e}")))?;

        Ok(Some(message))
    }
}
