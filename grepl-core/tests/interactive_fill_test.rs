use fixtures::shop_source;
use grepl_core::{
    fill::{FillError, FillOptions, Filler, InteractiveFiller, LinePrompter},
    resolver::{ResolveError, TypeResolver},
    source::FileDescriptorSource,
};
use prost::{Message, bytes::Bytes};
use prost_reflect::{DynamicMessage, MapKey, ReflectMessage, Value};
use std::io::{self, Write};

mod fixtures;

async fn fill_with(
    message: &str,
    input: &str,
    options: FillOptions,
) -> Result<DynamicMessage, FillError> {
    let mut resolver = TypeResolver::new(shop_source());
    let descriptor = resolver.resolve_by_name(message).await.unwrap();

    let prompter = LinePrompter::new(input.as_bytes(), io::sink());
    let mut filler = InteractiveFiller::new(prompter, options)?;

    filler.fill(&descriptor, &mut resolver).await
}

async fn fill(message: &str, input: &str) -> Result<DynamicMessage, FillError> {
    fill_with(message, input, FillOptions::default()).await
}

fn field(message: &DynamicMessage, name: &str) -> Value {
    message
        .get_field_by_name(name)
        .unwrap_or_else(|| panic!("{name} is not a field"))
        .into_owned()
}

fn strings(values: &[&str]) -> Vec<Value> {
    values
        .iter()
        .map(|v| Value::String(v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_fills_scalars_repeated_and_nested_fields() {
    let input = "abc-1\n3\nSTATUS_ACTIVE\nred\nblue\n\n1.5\n2\n";

    let item = fill("shop.v1.Item", input).await.unwrap();

    assert_eq!(field(&item, "sku"), Value::String("abc-1".into()));
    assert_eq!(field(&item, "quantity"), Value::U32(3));
    assert_eq!(field(&item, "status"), Value::EnumNumber(1));
    let tags = Value::List(strings(&["red", "blue"]));
    assert_eq!(field(&item, "tags"), tags);

    let size = field(&item, "size");
    let size = size.as_message().unwrap();
    assert_eq!(field(size, "width"), Value::F64(1.5));
    assert_eq!(field(size, "height"), Value::F64(2.0));
}

#[tokio::test]
async fn test_repeated_scalars_accumulate_until_end_of_input() {
    let item = fill("shop.v1.Item", "x\n1\n2\na\nb\nc").await.unwrap();

    assert_eq!(field(&item, "status"), Value::EnumNumber(2));
    let tags = Value::List(strings(&["a", "b", "c"]));
    assert_eq!(field(&item, "tags"), tags);
    assert!(!item.has_field_by_name("size"));
}

#[tokio::test]
async fn test_empty_answers_leave_zero_values() {
    let item = fill("shop.v1.Item", "\n\n\n\n\n\n").await.unwrap();

    assert_eq!(field(&item, "sku"), Value::String(String::new()));
    assert_eq!(field(&item, "quantity"), Value::U32(0));
    assert_eq!(field(&item, "tags"), Value::List(vec![]));
}

#[tokio::test]
async fn test_nothing_read_is_end_of_input() {
    let err = fill("shop.v1.Item", "").await.unwrap_err();

    assert!(matches!(err, FillError::EndOfInput));
}

#[tokio::test]
async fn test_invalid_values_abort_with_the_field_path() {
    let quantity = fill("shop.v1.Item", "sku\n-1\n").await.unwrap_err();
    let status = fill("shop.v1.Item", "sku\n1\nSTATUS_NOPE\n")
        .await
        .unwrap_err();
    let width = fill("shop.v1.Item", "sku\n1\n\n\nwide\n")
        .await
        .unwrap_err();

    assert!(matches!(quantity, FillError::InvalidValue { path, .. } if path == "quantity"));
    assert!(matches!(status, FillError::InvalidValue { path, .. } if path == "status"));
    assert!(matches!(width, FillError::InvalidValue { path, .. } if path == "size.width"));
}

#[tokio::test]
async fn test_repeated_messages_accumulate_until_end_of_input() {
    let inventory = fill("shop.v1.Inventory", "A\n1\n\n\n\n\nB\n2\n\n\n\n\n")
        .await
        .unwrap();

    let items = field(&inventory, "items");
    let items = items.as_list().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(
        field(items[1].as_message().unwrap(), "sku"),
        Value::String("B".into())
    );
}

#[tokio::test]
async fn test_add_repeated_manually_confirms_each_element() {
    let options = FillOptions {
        add_repeated_manually: true,
        ..Default::default()
    };

    let inventory = fill_with(
        "shop.v1.Inventory",
        "A\n1\n\n\n\n\ny\nB\n2\n\n\n\n\nn\nleftover\n",
        options,
    )
    .await
    .unwrap();

    assert_eq!(field(&inventory, "items").as_list().unwrap().len(), 2);
}

#[tokio::test]
async fn test_map_entries_are_inserted() {
    let labels = fill("shop.v1.Labels", "a\n1\nb\n2\n").await.unwrap();

    let counts = field(&labels, "counts");
    let counts = counts.as_map().unwrap();
    assert_eq!(counts.len(), 2);
    assert_eq!(counts[&MapKey::String("a".into())], Value::I32(1));
    assert_eq!(counts[&MapKey::String("b".into())], Value::I32(2));
}

#[tokio::test]
async fn test_oneof_members_are_selected() {
    let options = FillOptions {
        bytes_as_quoted_literals: true,
        ..Default::default()
    };

    let payment = fill_with("shop.v1.Payment", "2\nV-42\n\"\\x00ab\"\n", options)
        .await
        .unwrap();

    assert!(!payment.has_field_by_name("card"));
    assert_eq!(field(&payment, "voucher"), Value::String("V-42".into()));
    assert_eq!(
        field(&payment, "receipt"),
        Value::Bytes(Bytes::from_static(b"\x00ab"))
    );
}

#[tokio::test]
async fn test_bytes_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[0xde, 0xad, 0xbe, 0xef]).unwrap();

    let options = FillOptions {
        bytes_from_file: true,
        ..Default::default()
    };
    let input = format!("card\n4111\n{}\n", file.path().display());

    let payment = fill_with("shop.v1.Payment", &input, options).await.unwrap();

    assert_eq!(field(&payment, "card"), Value::String("4111".into()));
    assert_eq!(
        field(&payment, "receipt"),
        Value::Bytes(Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]))
    );
}

#[tokio::test]
async fn test_missing_bytes_file() {
    let options = FillOptions {
        bytes_from_file: true,
        ..Default::default()
    };

    let input = "card\n4111\n/definitely/not/here\n";

    let err = fill_with("shop.v1.Payment", input, options)
        .await
        .unwrap_err();

    assert!(matches!(err, FillError::BytesFile { path, .. } if path == "receipt"));
}

#[tokio::test]
async fn test_base64_bytes() {
    let options = FillOptions {
        bytes_as_base64: true,
        ..Default::default()
    };

    let payment = fill_with("shop.v1.Payment", "card\n4111\naGk=\n", options)
        .await
        .unwrap();

    assert_eq!(
        field(&payment, "receipt"),
        Value::Bytes(Bytes::from_static(b"hi"))
    );
}

#[tokio::test]
async fn test_conflicting_bytes_encodings_are_rejected() {
    let options = FillOptions {
        bytes_as_base64: true,
        bytes_as_quoted_literals: true,
        ..Default::default()
    };

    let err = fill_with("shop.v1.Payment", "", options).await.unwrap_err();

    assert!(matches!(err, FillError::ConflictingBytesEncodings));
}

#[tokio::test]
async fn test_dig_manually_asks_before_descending() {
    let options = FillOptions {
        dig_manually: true,
        ..Default::default()
    };

    let item = fill_with("shop.v1.Item", "s\n1\n\n\nn\n", options)
        .await
        .unwrap();

    assert!(!item.has_field_by_name("size"));
}

#[tokio::test]
async fn test_recursive_messages_ask_before_each_level() {
    let node = fill("shop.v1.Node", "head\ny\ntail\nn\n").await.unwrap();

    let next = field(&node, "next");
    let next = next.as_message().unwrap();
    assert_eq!(field(next, "name"), Value::String("tail".into()));
    assert!(!next.has_field_by_name("next"));
}

#[tokio::test]
async fn test_recursive_messages_stop_at_end_of_input() {
    let node = fill("shop.v1.Node", "head\ny\ntail").await.unwrap();

    let next = field(&node, "next");
    assert_eq!(
        field(next.as_message().unwrap(), "name"),
        Value::String("tail".into())
    );
}

#[tokio::test]
async fn test_any_fields_are_resolved_and_packed() {
    let input = "hi\n\
                 type.googleapis.com/google.protobuf.Duration\n5\n\n\
                 shop.v1.Dimensions\n1\n2\n\
                 \n";

    let tagged = fill("shop.v1.Tagged", input).await.unwrap();

    let detail = field(&tagged, "detail");
    let detail = detail.as_message().unwrap();
    assert_eq!(
        field(detail, "type_url"),
        Value::String("type.googleapis.com/google.protobuf.Duration".into())
    );
    let packed = field(detail, "value").as_bytes().unwrap().clone();
    let duration = prost_types::Duration::decode(packed).unwrap();
    assert_eq!(duration.seconds, 5);

    let extras = field(&tagged, "extras");
    let extras = extras.as_list().unwrap();
    assert_eq!(extras.len(), 1);
    let extra = extras[0].as_message().unwrap();
    assert_eq!(
        field(extra, "type_url"),
        Value::String("type.googleapis.com/shop.v1.Dimensions".into())
    );

    let mut resolver = TypeResolver::new(shop_source());
    let dimensions = resolver
        .resolve_by_name("shop.v1.Dimensions")
        .await
        .unwrap();
    let packed = field(extra, "value").as_bytes().unwrap().clone();
    let dimensions = DynamicMessage::decode(dimensions, packed).unwrap();
    assert_eq!(field(&dimensions, "height"), Value::F64(2.0));
}

#[tokio::test]
async fn test_unknown_any_types_fail_to_resolve() {
    let err = fill("shop.v1.Tagged", "hi\nshop.v1.Nope\n")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FillError::Resolve { path, source: ResolveError::NotFound(_) } if path == "detail"
    ));
}

#[tokio::test]
async fn test_consecutive_fills_share_the_input() {
    let mut resolver = TypeResolver::new(shop_source());
    let item = resolver.resolve_by_name("shop.v1.Item").await.unwrap();
    let prompter = LinePrompter::new(&b"a\n1\n\n\n\n\nb\n2\n\n\n\n\n"[..], io::sink());
    let mut filler = InteractiveFiller::new(prompter, FillOptions::default()).unwrap();

    let first = filler.fill(&item, &mut resolver).await.unwrap();
    let second = filler.fill(&item, &mut resolver).await.unwrap();
    let end = filler.fill(&item, &mut resolver).await.unwrap_err();

    assert_eq!(field(&first, "sku"), Value::String("a".into()));
    assert_eq!(field(&second, "sku"), Value::String("b".into()));
    assert!(matches!(end, FillError::EndOfInput));
}

#[tokio::test]
async fn test_messages_without_fields_complete_immediately() {
    let source = FileDescriptorSource::from_pool(shop_source().pool().clone());
    let mut resolver = TypeResolver::new(source);
    let marker = resolver.resolve_by_name("shop.v1.Marker").await.unwrap();
    let prompter = LinePrompter::new(&b""[..], io::sink());
    let mut filler = InteractiveFiller::new(prompter, FillOptions::default()).unwrap();

    let message = filler.fill(&marker, &mut resolver).await.unwrap();

    assert_eq!(message.descriptor().full_name(), "shop.v1.Marker");
}
