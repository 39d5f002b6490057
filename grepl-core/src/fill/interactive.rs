//! # Interactive Filler
//!
//! Builds a message by prompting for one field at a time.
//!
//! The filler is a small state machine driving an explicit stack of frames, one frame per message
//! under construction. Descending into a nested message pushes a frame, finishing it pops the frame
//! and stores the result in its parent. Nothing recurses, so abandoning a fill at any depth simply
//! drops the stack.
//!
//! ```text
//! AwaitingField ──message──▶ Descending ──▶ AwaitingField (child frame)
//!       │  ▲                                      │
//!       │  └───────────── Ascending ◀──all fields visited / end of input
//!       │
//!       └──repeated/map──▶ Accumulating ──stop──▶ AwaitingField
//! ```
//!
//! End of input terminates the innermost scope: a repeated field stops accumulating, a nested
//! message is closed with whatever it holds, and the top level message is complete. Only when the
//! input ends before a single answer was read does the fill report [`FillError::EndOfInput`].
use super::{BytesEncoding, FillError, FillOptions, Filler, Prompter, value::decode_scalar};
use crate::{resolver::TypeResolver, source::DescriptorSource};
use prost::{Message, bytes::Bytes};
use prost_reflect::{
    DynamicMessage, FieldDescriptor, Kind, MessageDescriptor, OneofDescriptor, ReflectMessage,
    Value,
};
use std::collections::HashSet;

const ANY_TYPE: &str = "google.protobuf.Any";
const DEFAULT_TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// Prompts for every field of a message through a [`Prompter`].
#[derive(Debug)]
pub struct InteractiveFiller<P> {
    prompter: P,
    options: FillOptions,
    bytes: BytesEncoding,
}

impl<P: Prompter> InteractiveFiller<P> {
    /// Fails with [`FillError::ConflictingBytesEncodings`] when several bytes encodings are
    /// enabled.
    pub fn new(prompter: P, options: FillOptions) -> Result<Self, FillError> {
        let bytes = options.bytes_encoding()?;
        Ok(Self {
            prompter,
            options,
            bytes,
        })
    }

    pub fn options(&self) -> &FillOptions {
        &self.options
    }

    pub fn into_prompter(self) -> P {
        self.prompter
    }
}

impl<P: Prompter> Filler for InteractiveFiller<P> {
    async fn fill<D: DescriptorSource>(
        &mut self,
        descriptor: &MessageDescriptor,
        resolver: &mut TypeResolver<D>,
    ) -> Result<DynamicMessage, FillError> {
        let session = FillSession {
            prompter: &mut self.prompter,
            resolver,
            options: self.options,
            bytes: self.bytes,
            stack: vec![Frame::new(descriptor.clone(), String::new(), Origin::Root)],
            consumed_any: false,
        };

        session.run().await
    }
}

enum State {
    AwaitingField,
    Descending,
    Ascending,
    Accumulating,
    Complete(DynamicMessage),
}

#[derive(Clone)]
enum Step {
    Field(FieldDescriptor),
    /// Members of a oneof, collapsed into a single choice.
    Oneof(OneofDescriptor),
}

/// Where a finished frame goes.
enum Origin {
    Root,
    Field(FieldDescriptor),
    Element(FieldDescriptor),
    Any {
        field: FieldDescriptor,
        any: MessageDescriptor,
        type_url: String,
        element: bool,
    },
}

struct Frame {
    message: DynamicMessage,
    steps: Vec<Step>,
    cursor: usize,
    path: String,
    origin: Origin,
    /// Elements added to the repeated field under the cursor, while accumulating it.
    accumulated: Option<usize>,
    consumed: bool,
    exhausted: bool,
}

impl Frame {
    fn new(descriptor: MessageDescriptor, path: String, origin: Origin) -> Self {
        let mut steps = Vec::new();
        let mut oneofs = HashSet::new();

        for field in descriptor.fields() {
            match field.containing_oneof() {
                Some(oneof) if !oneof.is_synthetic() => {
                    if oneofs.insert(oneof.full_name().to_string()) {
                        steps.push(Step::Oneof(oneof));
                    }
                }
                _ => steps.push(Step::Field(field)),
            }
        }

        Self {
            message: DynamicMessage::new(descriptor),
            steps,
            cursor: 0,
            path,
            origin,
            accumulated: None,
            consumed: false,
            exhausted: false,
        }
    }

    fn current(&self) -> Option<Step> {
        self.steps.get(self.cursor).cloned()
    }

    fn advance(&mut self) {
        self.accumulated = None;
        self.cursor += 1;
    }

    fn child_path(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.path)
        }
    }
}

struct FillSession<'a, P, D> {
    prompter: &'a mut P,
    resolver: &'a mut TypeResolver<D>,
    options: FillOptions,
    bytes: BytesEncoding,
    stack: Vec<Frame>,
    consumed_any: bool,
}

impl<P: Prompter, D: DescriptorSource> FillSession<'_, P, D> {
    async fn run(mut self) -> Result<DynamicMessage, FillError> {
        let mut state = State::AwaitingField;

        loop {
            let step = match state {
                State::AwaitingField => self.await_field().await,
                State::Descending => {
                    tracing::trace!(path = %self.top().path, "descending");
                    Ok(State::AwaitingField)
                }
                State::Ascending => self.ascend(),
                State::Accumulating => self.accumulate().await,
                State::Complete(message) => return Ok(message),
            };

            state = match step {
                Ok(next) => next,
                Err(FillError::EndOfInput) => self.end_of_input()?,
                Err(err) => {
                    tracing::debug!(error = %err, "fill aborted");
                    return Err(err);
                }
            };
        }
    }

    fn top(&self) -> &Frame {
        self.stack
            .last()
            .expect("the fill stack is never empty before completion")
    }

    fn top_mut(&mut self) -> &mut Frame {
        self.stack
            .last_mut()
            .expect("the fill stack is never empty before completion")
    }

    async fn await_field(&mut self) -> Result<State, FillError> {
        let field = match self.top().current() {
            None => return Ok(State::Ascending),
            Some(Step::Oneof(oneof)) => {
                self.choose_oneof(&oneof)?;
                return Ok(State::AwaitingField);
            }
            Some(Step::Field(field)) => field,
        };

        if field.is_list() || field.is_map() {
            return self.enter_repeated(&field);
        }

        match field.kind() {
            Kind::Message(message) if message.full_name() == ANY_TYPE => {
                let path = self.top().child_path(field.name());
                self.read_any(&field, message, path, false).await
            }
            Kind::Message(message) => self.descend(&field, message),
            kind => {
                let path = self.top().child_path(field.name());
                let token = self.read(&prompt_for(&path, &kind))?;

                if !token.is_empty() {
                    let value = decode_scalar(&kind, &token, self.bytes, &path)?;
                    self.top_mut().message.set_field(&field, value);
                }

                self.top_mut().advance();
                Ok(State::AwaitingField)
            }
        }
    }

    fn choose_oneof(&mut self, oneof: &OneofDescriptor) -> Result<(), FillError> {
        let path = self.top().child_path(oneof.name());
        let fields: Vec<FieldDescriptor> = oneof.fields().collect();
        let names: Vec<&str> = fields.iter().map(|f| f.name()).collect();

        let index = self.prompter.select(&format!("{path} (oneof)"), &names)?;
        self.mark_consumed();

        let chosen = fields
            .get(index)
            .cloned()
            .ok_or_else(|| FillError::InvalidValue {
                path,
                reason: format!("no oneof member at index {index}"),
            })?;

        let frame = self.top_mut();
        frame.steps[frame.cursor] = Step::Field(chosen);
        Ok(())
    }

    fn descend(
        &mut self,
        field: &FieldDescriptor,
        message: MessageDescriptor,
    ) -> Result<State, FillError> {
        let path = self.top().child_path(field.name());

        if (self.options.dig_manually || self.is_recursive(&message))
            && !self.confirm(&format!("dig down into {path} ({})?", message.full_name()))?
        {
            self.top_mut().advance();
            return Ok(State::AwaitingField);
        }

        self.stack
            .push(Frame::new(message, path, Origin::Field(field.clone())));
        Ok(State::Descending)
    }

    fn enter_repeated(&mut self, field: &FieldDescriptor) -> Result<State, FillError> {
        if let Kind::Message(message) = field.kind()
            && !field.is_map()
            && self.is_recursive(&message)
        {
            let path = self.top().child_path(field.name());
            if !self.confirm(&format!("dig down into {path} ({})?", message.full_name()))? {
                self.top_mut().advance();
                return Ok(State::AwaitingField);
            }
        }

        self.top_mut().accumulated = Some(0);
        Ok(State::Accumulating)
    }

    async fn accumulate(&mut self) -> Result<State, FillError> {
        let frame = self.top();
        let (Some(Step::Field(field)), Some(count)) = (frame.current(), frame.accumulated) else {
            return Ok(State::AwaitingField);
        };
        let field_path = frame.child_path(field.name());
        let path = format!("{field_path}[{count}]");

        if count > 0
            && self.options.add_repeated_manually
            && !self.confirm(&format!("add one more element to {field_path}?"))?
        {
            self.top_mut().advance();
            return Ok(State::AwaitingField);
        }

        match field.kind() {
            Kind::Message(message) if !field.is_map() && message.full_name() == ANY_TYPE => {
                self.read_any(&field, message, path, true).await
            }
            Kind::Message(message) => {
                self.stack
                    .push(Frame::new(message, path, Origin::Element(field)));
                Ok(State::Descending)
            }
            kind => {
                let token = self.read(&prompt_for(&path, &kind))?;
                if token.is_empty() {
                    self.top_mut().advance();
                    return Ok(State::AwaitingField);
                }

                let value = decode_scalar(&kind, &token, self.bytes, &path)?;
                let frame = self.top_mut();
                if let Some(list) = frame.message.get_field_mut(&field).as_list_mut() {
                    list.push(value);
                }
                frame.accumulated = Some(count + 1);
                Ok(State::Accumulating)
            }
        }
    }

    async fn read_any(
        &mut self,
        field: &FieldDescriptor,
        any: MessageDescriptor,
        path: String,
        element: bool,
    ) -> Result<State, FillError> {
        let answer = self.read(&format!("{path} ({ANY_TYPE} type URL) => "))?;
        let url = answer.trim();

        if url.is_empty() {
            self.top_mut().advance();
            return Ok(State::AwaitingField);
        }

        let payload = self
            .resolver
            .resolve_by_url(url)
            .await
            .map_err(|source| FillError::Resolve {
                path: path.clone(),
                source,
            })?;

        let type_url = if url.contains('/') {
            url.to_string()
        } else {
            format!("{DEFAULT_TYPE_URL_PREFIX}{url}")
        };

        let origin = Origin::Any {
            field: field.clone(),
            any,
            type_url,
            element,
        };
        self.stack.push(Frame::new(payload, path, origin));
        Ok(State::Descending)
    }

    fn ascend(&mut self) -> Result<State, FillError> {
        let done = self
            .stack
            .pop()
            .expect("the fill stack is never empty before completion");
        let add_repeated_manually = self.options.add_repeated_manually;

        let Some(parent) = self.stack.last_mut() else {
            return Ok(State::Complete(done.message));
        };
        parent.consumed |= done.consumed;

        tracing::trace!(path = %done.path, "ascending");

        match done.origin {
            Origin::Root => Ok(State::Complete(done.message)),
            Origin::Field(field) => {
                if done.consumed {
                    let value = Value::Message(done.message);
                    parent.message.set_field(&field, value);
                }
                parent.advance();
                Ok(State::AwaitingField)
            }
            Origin::Element(field) => {
                // An element nobody typed anything for ends the repeated field.
                if !done.consumed && (done.exhausted || !add_repeated_manually) {
                    parent.advance();
                    return Ok(State::AwaitingField);
                }

                append_element(&mut parent.message, &field, done.message);
                parent.accumulated = parent.accumulated.map(|n| n + 1);
                Ok(State::Accumulating)
            }
            Origin::Any {
                field,
                any,
                type_url,
                element,
            } => {
                let packed = pack_any(any, type_url, &done.message);

                if element {
                    if let Some(list) = parent.message.get_field_mut(&field).as_list_mut() {
                        list.push(packed);
                    }
                    parent.accumulated = parent.accumulated.map(|n| n + 1);
                    Ok(State::Accumulating)
                } else {
                    parent.message.set_field(&field, packed);
                    parent.advance();
                    Ok(State::AwaitingField)
                }
            }
        }
    }

    /// Closes the innermost open scope after the input ran dry.
    fn end_of_input(&mut self) -> Result<State, FillError> {
        if !self.consumed_any {
            return Err(FillError::EndOfInput);
        }

        let frame = self.top_mut();
        tracing::trace!(path = %frame.path, "end of input");

        if frame.accumulated.is_some() {
            frame.advance();
            return Ok(State::AwaitingField);
        }

        frame.exhausted = true;
        frame.cursor = frame.steps.len();
        Ok(State::Ascending)
    }

    fn read(&mut self, prompt: &str) -> Result<String, FillError> {
        let answer = self.prompter.input(prompt)?;
        self.mark_consumed();
        Ok(answer)
    }

    fn confirm(&mut self, question: &str) -> Result<bool, FillError> {
        let answer = self.prompter.confirm(question)?;
        self.mark_consumed();
        Ok(answer)
    }

    fn mark_consumed(&mut self) {
        self.consumed_any = true;
        self.top_mut().consumed = true;
    }

    fn is_recursive(&self, message: &MessageDescriptor) -> bool {
        self.stack
            .iter()
            .any(|frame| frame.message.descriptor().full_name() == message.full_name())
    }
}

fn append_element(message: &mut DynamicMessage, field: &FieldDescriptor, element: DynamicMessage) {
    if field.is_map() {
        let entry = element.descriptor();
        let key = element
            .get_field(&entry.map_entry_key_field())
            .into_owned()
            .into_map_key();
        let value = element
            .get_field(&entry.map_entry_value_field())
            .into_owned();

        if let (Some(map), Some(key)) = (message.get_field_mut(field).as_map_mut(), key) {
            map.insert(key, value);
        }
    } else if let Some(list) = message.get_field_mut(field).as_list_mut() {
        list.push(Value::Message(element));
    }
}

fn pack_any(any: MessageDescriptor, type_url: String, payload: &DynamicMessage) -> Value {
    let mut packed = DynamicMessage::new(any);
    packed.set_field_by_name("type_url", Value::String(type_url));
    packed.set_field_by_name("value", Value::Bytes(Bytes::from(payload.encode_to_vec())));
    Value::Message(packed)
}

fn prompt_for(path: &str, kind: &Kind) -> String {
    match kind {
        Kind::Enum(descriptor) => {
            let values: Vec<String> = descriptor.values().map(|v| v.name().to_string()).collect();
            format!("{path} ({}: {}) => ", descriptor.name(), values.join("|"))
        }
        kind => format!("{path} ({}) => ", kind_name(kind)),
    }
}

fn kind_name(kind: &Kind) -> &str {
    match kind {
        Kind::Double => "double",
        Kind::Float => "float",
        Kind::Int32 => "int32",
        Kind::Int64 => "int64",
        Kind::Uint32 => "uint32",
        Kind::Uint64 => "uint64",
        Kind::Sint32 => "sint32",
        Kind::Sint64 => "sint64",
        Kind::Fixed32 => "fixed32",
        Kind::Fixed64 => "fixed64",
        Kind::Sfixed32 => "sfixed32",
        Kind::Sfixed64 => "sfixed64",
        Kind::Bool => "bool",
        Kind::String => "string",
        Kind::Bytes => "bytes",
        Kind::Message(m) => m.full_name(),
        Kind::Enum(e) => e.full_name(),
    }
}
