//! Colored rendering of descriptors, statuses and errors for the terminal.
use colored::*;
use grepl_core::{
    prost_reflect::{
        EnumDescriptor, FieldDescriptor, Kind, MessageDescriptor, MethodDescriptor,
        ServiceDescriptor,
    },
    source::Descriptor,
    tonic::Status,
};
use std::fmt::Display;

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

/// An error with a short bold headline, e.g. `GenericError("Call Failed", err)`.
pub struct GenericError<T: Display>(pub &'static str, pub T);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<Status> for FormattedString {
    fn from(status: Status) -> Self {
        FormattedString(format!(
            "{} code={:?} message={:?}",
            "gRPC Failed:".red().bold(),
            status.code(),
            status.message()
        ))
    }
}

impl<T: Display> From<GenericError<T>> for FormattedString {
    fn from(GenericError(msg, err): GenericError<T>) -> Self {
        FormattedString(format!("{}:\n\n'{}'", msg.red().bold(), err))
    }
}

impl From<anyhow::Error> for FormattedString {
    fn from(err: anyhow::Error) -> Self {
        let mut out = format!("{} {}", "Error:".red().bold(), err);
        for cause in err.chain().skip(1) {
            out.push_str(&format!("\n  caused by: {cause}"));
        }
        FormattedString(out)
    }
}

impl From<Descriptor> for FormattedString {
    fn from(descriptor: Descriptor) -> Self {
        match descriptor {
            Descriptor::MessageDescriptor(m) => m.into(),
            Descriptor::ServiceDescriptor(s) => s.into(),
            Descriptor::MethodDescriptor(m) => m.into(),
            Descriptor::EnumDescriptor(e) => e.into(),
        }
    }
}

impl From<ServiceDescriptor> for FormattedString {
    fn from(service: ServiceDescriptor) -> Self {
        let mut out = format!("{} {} {{\n", "service".cyan(), service.name().green());

        for method in service.methods() {
            out.push_str("  ");
            out.push_str(&FormattedString::from(method).0);
            out.push('\n');
        }
        out.push('}');
        FormattedString(out)
    }
}

impl From<MethodDescriptor> for FormattedString {
    fn from(method: MethodDescriptor) -> Self {
        let stream = |streaming: bool| {
            if streaming {
                format!("{} ", "stream".cyan())
            } else {
                String::new()
            }
        };

        FormattedString(format!(
            "{} {}({}{}) {} ({}{});",
            "rpc".cyan(),
            method.name().green(),
            stream(method.is_client_streaming()),
            method.input().full_name().yellow(),
            "returns".cyan(),
            stream(method.is_server_streaming()),
            method.output().full_name().yellow()
        ))
    }
}

impl From<MessageDescriptor> for FormattedString {
    fn from(message: MessageDescriptor) -> Self {
        let mut out = format!("{} {} {{\n", "message".cyan(), message.name().green());

        for oneof in message.oneofs().filter(|o| !o.is_synthetic()) {
            out.push_str(&format!("  {} {} {{\n", "oneof".cyan(), oneof.name()));
            for field in oneof.fields() {
                out.push_str(&format!("    {}\n", field_line(&field)));
            }
            out.push_str("  }\n");
        }

        for field in message
            .fields()
            .filter(|f| f.containing_oneof().is_none_or(|o| o.is_synthetic()))
        {
            out.push_str(&format!("  {}\n", field_line(&field)));
        }
        out.push('}');
        FormattedString(out)
    }
}

impl From<EnumDescriptor> for FormattedString {
    fn from(enum_desc: EnumDescriptor) -> Self {
        let mut out = format!("{} {} {{\n", "enum".cyan(), enum_desc.name().green());

        for val in enum_desc.values() {
            out.push_str(&format!(
                "  {} = {};\n",
                val.name(),
                val.number().to_string().purple()
            ));
        }
        out.push('}');

        FormattedString(out)
    }
}

fn field_line(field: &FieldDescriptor) -> String {
    let label = if field.is_list() {
        format!("{} ", "repeated".cyan())
    } else if field.containing_oneof().is_some_and(|o| o.is_synthetic()) {
        format!("{} ", "optional".cyan())
    } else {
        String::new()
    };

    let ty = match field.kind() {
        Kind::Message(entry) if field.is_map() => format!(
            "map<{}, {}>",
            type_name(&entry.map_entry_key_field().kind()),
            type_name(&entry.map_entry_value_field().kind())
        ),
        kind => type_name(&kind),
    };

    format!(
        "{label}{} {} = {};",
        ty.yellow(),
        field.name(),
        field.number()
    )
}

fn type_name(kind: &Kind) -> String {
    match kind {
        Kind::Double => "double".into(),
        Kind::Float => "float".into(),
        Kind::Int32 => "int32".into(),
        Kind::Int64 => "int64".into(),
        Kind::Uint32 => "uint32".into(),
        Kind::Uint64 => "uint64".into(),
        Kind::Sint32 => "sint32".into(),
        Kind::Sint64 => "sint64".into(),
        Kind::Fixed32 => "fixed32".into(),
        Kind::Fixed64 => "fixed64".into(),
        Kind::Sfixed32 => "sfixed32".into(),
        Kind::Sfixed64 => "sfixed64".into(),
        Kind::Bool => "bool".into(),
        Kind::String => "string".into(),
        Kind::Bytes => "bytes".into(),
        Kind::Message(m) => m.full_name().into(),
        Kind::Enum(e) => e.full_name().into(),
    }
}
