//! # Message Filling
//!
//! Fillers turn user input into a populated [`DynamicMessage`] for a given descriptor.
//!
//! * **[`InteractiveFiller`]**: Prompts for every field in declaration order, descending into
//!   nested messages, accumulating repeated and map fields, and resolving `Any` payloads.
//! * **[`SilentFiller`]**: Decodes a stream of JSON documents, one message per call.
//!
//! Both report an exhausted input with [`FillError::EndOfInput`]. That variant is a sentinel rather
//! than a failure: it means "there is nothing more to send", e.g. the end of a client stream.
mod interactive;
mod prompt;
mod silent;
mod value;

pub use interactive::InteractiveFiller;
pub use prompt::{LinePrompter, PromptError, Prompter};
pub use silent::SilentFiller;

use crate::{
    resolver::{ResolveError, TypeResolver},
    source::DescriptorSource,
};
use prost_reflect::{DynamicMessage, MessageDescriptor};
use serde::Deserialize;
use std::{future::Future, path::PathBuf};

/// Session scoped switches of the interactive filler.
///
/// Everything defaults to `false`, which means "fully automatic": descend into every nested
/// message and keep reading repeated values until the input says stop. At most one of the
/// `bytes_*` switches may be enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FillOptions {
    /// Ask before descending into each nested message.
    pub dig_manually: bool,
    /// Decode `bytes` fields as standard base64.
    pub bytes_as_base64: bool,
    /// Decode `bytes` fields as a quoted string literal with escape sequences (`"\x00\n"`).
    pub bytes_as_quoted_literals: bool,
    /// Treat `bytes` input as a path and use the file's contents.
    pub bytes_from_file: bool,
    /// Ask after each repeated element whether to add another one.
    pub add_repeated_manually: bool,
}

/// How `bytes` fields are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BytesEncoding {
    /// The UTF-8 bytes of the input, as typed.
    #[default]
    Raw,
    Base64,
    QuotedLiteral,
    File,
}

impl FillOptions {
    /// The selected `bytes` encoding, or an error when several are enabled.
    pub fn bytes_encoding(&self) -> Result<BytesEncoding, FillError> {
        let selected: Vec<BytesEncoding> = [
            (self.bytes_as_base64, BytesEncoding::Base64),
            (self.bytes_as_quoted_literals, BytesEncoding::QuotedLiteral),
            (self.bytes_from_file, BytesEncoding::File),
        ]
        .into_iter()
        .filter_map(|(enabled, encoding)| enabled.then_some(encoding))
        .collect();

        match selected.as_slice() {
            [] => Ok(BytesEncoding::Raw),
            [encoding] => Ok(*encoding),
            _ => Err(FillError::ConflictingBytesEncodings),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FillError {
    /// The input is exhausted before anything was read for this message.
    #[error("End of input")]
    EndOfInput,

    #[error("Invalid value for field '{path}': {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("Failed to read bytes for field '{path}' from '{}': {source}", .file.display())]
    BytesFile {
        path: String,
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to resolve the Any type of field '{path}': {source}")]
    Resolve {
        path: String,
        #[source]
        source: ResolveError,
    },

    #[error("Input does not match message '{message}': {source}")]
    CodecMismatch {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Only one of the bytes encodings (base64, quoted literals, file) can be enabled")]
    ConflictingBytesEncodings,

    #[error("Failed to read input: {0}")]
    Prompt(#[source] std::io::Error),
}

impl From<PromptError> for FillError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::EndOfInput => FillError::EndOfInput,
            PromptError::Io(err) => FillError::Prompt(err),
        }
    }
}

/// Produces one request message per call.
pub trait Filler {
    /// Builds a message of type `descriptor`.
    ///
    /// `resolver` is used to look up the payload types of `google.protobuf.Any` fields.
    fn fill<D: DescriptorSource>(
        &mut self,
        descriptor: &MessageDescriptor,
        resolver: &mut TypeResolver<D>,
    ) -> impl Future<Output = Result<DynamicMessage, FillError>>;
}
