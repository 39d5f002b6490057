//! # Presenting Responses
//!
//! Presenters render a closed set of response [`Shape`]s as text. Shapes are chosen by the caller,
//! so a presenter never has to guess what it was handed: the only structural checks left are the
//! ones a `Listing` needs (a repeated message field whose element type has fields).
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use prost_reflect::{
    DynamicMessage, FieldDescriptor, Kind, MapKey, ReflectMessage, SerializeOptions, Value,
};

/// What a presenter can be asked to render.
#[derive(Debug, Clone)]
pub enum Shape {
    /// A single pre-rendered value.
    Scalar(String),
    /// A whole message.
    Message(DynamicMessage),
    /// A message rendered through its first repeated message field, one row per element.
    Listing(DynamicMessage),
    /// Rows of plain text, e.g. package or service listings.
    Table(Table),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row. Missing cells are rendered empty, extra cells are dropped.
    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = row.into_iter().map(Into::into).collect();
        row.resize(self.header.len(), String::new());
        self.rows.push(row);
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PresentError {
    #[error("Value is not structured and cannot be rendered as a table")]
    NotStructured,
    #[error("Message '{0}' has no repeated field to list")]
    NoListableField(String),
    #[error("Elements of field '{0}' are not messages")]
    ElementsNotStructured(String),
    #[error("Element type '{0}' has no fields")]
    ElementHasNoFields(String),
    #[error("Failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait Presenter {
    fn format(&self, shape: &Shape) -> Result<String, PresentError>;
}

/// Pretty printed proto3 JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPresenter {
    /// Also print fields holding their default value.
    pub emit_defaults: bool,
}

impl JsonPresenter {
    pub fn new(emit_defaults: bool) -> Self {
        Self { emit_defaults }
    }

    fn options(&self) -> SerializeOptions {
        SerializeOptions::new().skip_default_fields(!self.emit_defaults)
    }
}

impl Presenter for JsonPresenter {
    fn format(&self, shape: &Shape) -> Result<String, PresentError> {
        let options = self.options();

        let json = match shape {
            Shape::Scalar(value) => return Ok(value.clone()),
            Shape::Message(message) => to_json(message, &options)?,
            Shape::Listing(message) => {
                let listing = Listing::of(message)?;
                serde_json::Value::Array(
                    listing
                        .elements
                        .iter()
                        .map(|element| to_json(element, &options))
                        .collect::<Result<_, _>>()?,
                )
            }
            Shape::Table(table) => serde_json::Value::Array(
                table
                    .rows
                    .iter()
                    .map(|row| {
                        table
                            .header
                            .iter()
                            .cloned()
                            .zip(row.iter().cloned().map(serde_json::Value::String))
                            .collect()
                    })
                    .collect(),
            ),
        };

        Ok(serde_json::to_string_pretty(&json)?)
    }
}

/// Column aligned plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TablePresenter;

impl Presenter for TablePresenter {
    fn format(&self, shape: &Shape) -> Result<String, PresentError> {
        let options = SerializeOptions::new();

        let table = match shape {
            Shape::Scalar(_) => return Err(PresentError::NotStructured),
            Shape::Table(table) => return Ok(render(table)),
            Shape::Message(message) => {
                let mut table = Table::new(["field", "value"]);
                for (field, value) in message.fields() {
                    let value = cell(value, &field.kind(), &options)?;
                    table.push_row([field.name().to_string(), value]);
                }
                table
            }
            Shape::Listing(message) => {
                let listing = Listing::of(message)?;
                let columns: Vec<FieldDescriptor> = listing.element_fields;
                let mut table = Table::new(columns.iter().map(|f| f.name()));

                for element in &listing.elements {
                    let row = columns
                        .iter()
                        .map(|field| cell(&element.get_field(field), &field.kind(), &options))
                        .collect::<Result<Vec<_>, _>>()?;
                    table.push_row(row);
                }
                table
            }
        };

        Ok(render(&table))
    }
}

struct Listing {
    element_fields: Vec<FieldDescriptor>,
    elements: Vec<DynamicMessage>,
}

impl Listing {
    /// Picks the first repeated field of `message` and checks that its elements are messages
    /// with at least one field.
    fn of(message: &DynamicMessage) -> Result<Self, PresentError> {
        let descriptor = message.descriptor();
        let field = descriptor
            .fields()
            .find(|f| f.is_list())
            .ok_or_else(|| PresentError::NoListableField(descriptor.full_name().to_string()))?;

        let Kind::Message(element) = field.kind() else {
            return Err(PresentError::ElementsNotStructured(
                field.full_name().to_string(),
            ));
        };

        let element_fields: Vec<FieldDescriptor> = element.fields().collect();
        if element_fields.is_empty() {
            return Err(PresentError::ElementHasNoFields(
                element.full_name().to_string(),
            ));
        }

        let value = message.get_field(&field);
        let elements = value
            .as_list()
            .unwrap_or_default()
            .iter()
            .filter_map(|v| v.as_message().cloned())
            .collect();

        Ok(Self {
            element_fields,
            elements,
        })
    }
}

fn to_json(
    message: &DynamicMessage,
    options: &SerializeOptions,
) -> Result<serde_json::Value, serde_json::Error> {
    message.serialize_with_options(serde_json::value::Serializer, options)
}

fn cell(value: &Value, kind: &Kind, options: &SerializeOptions) -> Result<String, PresentError> {
    let text = match value {
        Value::Bool(v) => v.to_string(),
        Value::I32(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::U32(v) => v.to_string(),
        Value::U64(v) => v.to_string(),
        Value::F32(v) => v.to_string(),
        Value::F64(v) => v.to_string(),
        Value::String(v) => v.clone(),
        Value::Bytes(v) => BASE64.encode(v),
        Value::EnumNumber(n) => kind
            .as_enum()
            .and_then(|e| e.get_value(*n))
            .map_or_else(|| n.to_string(), |v| v.name().to_string()),
        Value::Message(message) => to_json(message, options)?.to_string(),
        Value::List(items) => {
            let cells = items
                .iter()
                .map(|item| cell(item, kind, options))
                .collect::<Result<Vec<_>, _>>()?;
            format!("[{}]", cells.join(", "))
        }
        Value::Map(entries) => {
            let value_kind = kind
                .as_message()
                .map_or_else(|| kind.clone(), |entry| entry.map_entry_value_field().kind());

            let mut cells = entries
                .iter()
                .map(|(key, value)| {
                    let value = cell(value, &value_kind, options)?;
                    Ok(format!("{}: {value}", map_key(key)))
                })
                .collect::<Result<Vec<_>, PresentError>>()?;
            cells.sort();
            format!("{{{}}}", cells.join(", "))
        }
    };

    Ok(text)
}

fn map_key(key: &MapKey) -> String {
    match key {
        MapKey::Bool(v) => v.to_string(),
        MapKey::I32(v) => v.to_string(),
        MapKey::I64(v) => v.to_string(),
        MapKey::U32(v) => v.to_string(),
        MapKey::U64(v) => v.to_string(),
        MapKey::String(v) => v.clone(),
    }
}

fn render(table: &Table) -> String {
    let mut widths: Vec<usize> = table.header.iter().map(|h| h.chars().count()).collect();
    for row in &table.rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(&table.header)];
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    out.extend(table.rows.iter().map(|row| line(row)));
    out.join("\n")
}
