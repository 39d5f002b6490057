//! Decoding of single user tokens into field values.
use super::{BytesEncoding, FillError};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use prost::bytes::Bytes;
use prost_reflect::{Kind, Value};
use std::{fmt::Display, path::PathBuf, str::FromStr};

/// Decodes `token` as a value of the scalar, enum or bytes `kind`.
pub(super) fn decode_scalar(
    kind: &Kind,
    token: &str,
    bytes: BytesEncoding,
    path: &str,
) -> Result<Value, FillError> {
    let invalid = |reason: String| FillError::InvalidValue {
        path: path.to_string(),
        reason,
    };

    let value = match kind {
        Kind::Double => Value::F64(number(token).map_err(invalid)?),
        Kind::Float => Value::F32(number(token).map_err(invalid)?),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Value::I32(number(token).map_err(invalid)?),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(number(token).map_err(invalid)?),
        Kind::Uint32 | Kind::Fixed32 => Value::U32(number(token).map_err(invalid)?),
        Kind::Uint64 | Kind::Fixed64 => Value::U64(number(token).map_err(invalid)?),
        Kind::Bool => Value::Bool(
            token
                .parse()
                .map_err(|_| invalid(format!("expected 'true' or 'false', got '{token}'")))?,
        ),
        Kind::String => Value::String(token.to_string()),
        Kind::Bytes => Value::Bytes(decode_bytes(token, bytes, path)?),
        Kind::Enum(descriptor) => {
            let value = match descriptor.get_value_by_name(token) {
                Some(value) => value,
                None => token
                    .parse::<i32>()
                    .ok()
                    .and_then(|number| descriptor.get_value(number))
                    .ok_or_else(|| {
                        invalid(format!(
                            "'{token}' is not a value of enum {}",
                            descriptor.full_name()
                        ))
                    })?,
            };
            Value::EnumNumber(value.number())
        }
        Kind::Message(descriptor) => {
            return Err(invalid(format!(
                "message {} cannot be read from a single value",
                descriptor.full_name()
            )));
        }
    };

    Ok(value)
}

fn number<T>(token: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    token
        .trim()
        .parse()
        .map_err(|err| format!("'{token}' is not a valid number: {err}"))
}

fn decode_bytes(token: &str, encoding: BytesEncoding, path: &str) -> Result<Bytes, FillError> {
    let invalid = |reason: String| FillError::InvalidValue {
        path: path.to_string(),
        reason,
    };

    let bytes = match encoding {
        BytesEncoding::Raw => token.as_bytes().to_vec(),
        BytesEncoding::Base64 => BASE64
            .decode(token.trim())
            .map_err(|err| invalid(format!("invalid base64: {err}")))?,
        BytesEncoding::QuotedLiteral => unquote(token).map_err(invalid)?,
        BytesEncoding::File => {
            let file = PathBuf::from(token.trim());
            std::fs::read(&file).map_err(|source| FillError::BytesFile {
                path: path.to_string(),
                file,
                source,
            })?
        }
    };

    Ok(Bytes::from(bytes))
}

/// Interprets a single or double quoted literal with C style escapes.
pub(super) fn unquote(token: &str) -> Result<Vec<u8>, String> {
    let token = token.trim();
    let quote = match token.chars().next() {
        Some(q @ ('"' | '\'')) if token.len() >= 2 && token.ends_with(q) => q,
        _ => return Err(format!("expected a quoted literal, got {token}")),
    };

    let inner = &token[1..token.len() - 1];
    let mut out = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        if c == quote {
            return Err(format!("unescaped {quote} inside literal"));
        }
        if c != '\\' {
            let mut buf = [0; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        let escaped = chars
            .next()
            .ok_or_else(|| "literal ends with a lone backslash".to_string())?;
        let byte = match escaped {
            'n' => b'\n',
            'r' => b'\r',
            't' => b'\t',
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0c,
            'v' => 0x0b,
            '\\' => b'\\',
            '\'' => b'\'',
            '"' => b'"',
            'x' => {
                let hex: String = (0..2).filter_map(|_| chars.next()).collect();
                u8::from_str_radix(&hex, 16)
                    .map_err(|_| format!("invalid hex escape \\x{hex}"))?
            }
            '0'..='7' => {
                let mut octal = escaped.to_string();
                while octal.len() < 3 {
                    match chars.next_if(|c| c.is_digit(8)) {
                        Some(digit) => octal.push(digit),
                        None => break,
                    }
                }
                u8::from_str_radix(&octal, 8)
                    .map_err(|_| format!("octal escape \\{octal} is out of range"))?
            }
            other => return Err(format!("unknown escape sequence \\{other}")),
        };
        out.push(byte);
    }

    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unquote_handles_escapes() {
        assert_eq!(unquote(r#""a\x00b\n""#).unwrap(), b"a\x00b\n");
        assert_eq!(unquote(r"'\101\7'").unwrap(), b"A\x07");
        assert_eq!(unquote(r#""say \"hi\"""#).unwrap(), b"say \"hi\"");
        assert_eq!(unquote(r#""ñ""#).unwrap(), "ñ".as_bytes());
    }

    #[test]
    fn unquote_rejects_malformed_literals() {
        assert!(unquote("abc").is_err());
        assert!(unquote(r#""abc'"#).is_err());
        assert!(unquote(r#""a"b""#).is_err());
        assert!(unquote(r#""\q""#).is_err());
        assert!(unquote(r#""\777""#).is_err());
    }

    #[test]
    fn numbers_are_parsed_per_kind() {
        let value = decode_scalar(&Kind::Uint32, "42", BytesEncoding::Raw, "n").unwrap();
        assert_eq!(value, Value::U32(42));

        let err = decode_scalar(&Kind::Uint32, "-1", BytesEncoding::Raw, "n").unwrap_err();
        assert!(matches!(err, FillError::InvalidValue { path, .. } if path == "n"));
    }

    #[test]
    fn bytes_follow_the_selected_encoding() {
        let raw = decode_scalar(&Kind::Bytes, "hi", BytesEncoding::Raw, "b").unwrap();
        let b64 = decode_scalar(&Kind::Bytes, "aGk=", BytesEncoding::Base64, "b").unwrap();

        assert_eq!(raw, Value::Bytes(Bytes::from_static(b"hi")));
        assert_eq!(b64, raw);
    }
}
