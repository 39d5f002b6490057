//! # Silent Filler
//!
//! Reads messages from a stream of concatenated or whitespace separated JSON documents, using the
//! canonical Protobuf JSON mapping. Each call to [`Filler::fill`] consumes one document.
use super::{FillError, Filler};
use crate::{registry, resolver::TypeResolver, source::DescriptorSource};
use prost_reflect::{DynamicMessage, Kind, MessageDescriptor};
use serde_json::{Deserializer, Map, StreamDeserializer, Value, de::IoRead};
use std::io::Read;

const ANY_TYPE: &str = "google.protobuf.Any";
const WELL_KNOWN_PREFIX: &str = "google.protobuf.";

/// A filler fed by JSON documents rather than prompts.
pub struct SilentFiller<R: Read> {
    documents: StreamDeserializer<'static, IoRead<R>, Value>,
}

impl<R: Read> SilentFiller<R> {
    pub fn new(reader: R) -> Self {
        Self {
            documents: Deserializer::from_reader(reader).into_iter(),
        }
    }
}

impl<R: Read> Filler for SilentFiller<R> {
    async fn fill<D: DescriptorSource>(
        &mut self,
        descriptor: &MessageDescriptor,
        resolver: &mut TypeResolver<D>,
    ) -> Result<DynamicMessage, FillError> {
        let codec_mismatch = |source| FillError::CodecMismatch {
            message: descriptor.full_name().to_string(),
            source,
        };

        let document = match self.documents.next() {
            None => return Err(FillError::EndOfInput),
            Some(document) => document.map_err(codec_mismatch)?,
        };

        let descriptor = with_any_types(descriptor, &document, resolver).await?;

        DynamicMessage::deserialize(descriptor, document).map_err(codec_mismatch)
    }
}

/// Makes the payload type of every `google.protobuf.Any` in `document` resolvable from
/// `descriptor`'s pool.
///
/// The JSON mapping of `google.protobuf.Any` looks payload types up in the pool of the message
/// being decoded, which may not contain types that only the resolver knows about. Only values in
/// `Any` position are considered, so `"@type"` keys inside a `Struct` or a map stay plain data.
async fn with_any_types<D: DescriptorSource>(
    descriptor: &MessageDescriptor,
    document: &Value,
    resolver: &mut TypeResolver<D>,
) -> Result<MessageDescriptor, FillError> {
    let mut pending = Vec::new();
    if let Value::Object(object) = document {
        collect_any_objects(object, descriptor, "", &mut pending);
    }

    if pending.is_empty() {
        return Ok(descriptor.clone());
    }

    let mut pool = descriptor.parent_pool().clone();
    while let Some((path, object)) = pending.pop() {
        let Some(Value::String(url)) = object.get("@type") else {
            continue;
        };

        let payload = resolver
            .resolve_by_url(url)
            .await
            .map_err(|source| FillError::Resolve {
                path: path.clone(),
                source,
            })?;

        registry::merge_file(&mut pool, &payload.parent_file())
            .map_err(|err| FillError::InvalidValue {
                path: path.clone(),
                reason: err.to_string(),
            })?;

        collect_in_payload(object, &payload, &path, &mut pending);
    }

    // Merging only ever adds files, so the type is still there.
    Ok(pool
        .get_message_by_name(descriptor.full_name())
        .unwrap_or_else(|| descriptor.clone()))
}

/// Walks `object` as a `message`, collecting every object found in `Any` position.
fn collect_any_objects<'a>(
    object: &'a Map<String, Value>,
    message: &MessageDescriptor,
    path: &str,
    out: &mut Vec<(String, &'a Map<String, Value>)>,
) {
    if message.full_name() == ANY_TYPE {
        out.push((path.to_string(), object));
        return;
    }
    // Other well-known types have their own JSON shapes and never hold an `Any`.
    if message.full_name().starts_with(WELL_KNOWN_PREFIX) {
        return;
    }

    for (key, child) in object {
        let Some(field) = message
            .get_field_by_json_name(key)
            .or_else(|| message.get_field_by_name(key))
        else {
            continue;
        };
        let Kind::Message(element) = field.kind() else {
            continue;
        };
        let child_path = join(path, key);

        match child {
            Value::Object(entries) if field.is_map() => {
                let Kind::Message(value_type) = element.map_entry_value_field().kind() else {
                    continue;
                };
                for (entry_key, entry) in entries {
                    if let Value::Object(entry) = entry {
                        let entry_path = format!("{child_path}[{entry_key}]");
                        collect_any_objects(entry, &value_type, &entry_path, out);
                    }
                }
            }
            Value::Array(items) if field.is_list() => {
                for (i, item) in items.iter().enumerate() {
                    if let Value::Object(item) = item {
                        collect_any_objects(item, &element, &format!("{child_path}[{i}]"), out);
                    }
                }
            }
            Value::Object(nested) => collect_any_objects(nested, &element, &child_path, out),
            _ => {}
        }
    }
}

/// Continues the walk inside a resolved `Any` payload.
fn collect_in_payload<'a>(
    object: &'a Map<String, Value>,
    payload: &MessageDescriptor,
    path: &str,
    out: &mut Vec<(String, &'a Map<String, Value>)>,
) {
    if payload.full_name() == ANY_TYPE {
        if let Some(Value::Object(inner)) = object.get("value") {
            collect_any_objects(inner, payload, &join(path, "value"), out);
        }
    } else {
        collect_any_objects(object, payload, path, out);
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}
