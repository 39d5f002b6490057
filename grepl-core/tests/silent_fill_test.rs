use fixtures::shop_source;
use grepl_core::{
    fill::{FillError, Filler, SilentFiller},
    registry,
    resolver::TypeResolver,
};
use prost_reflect::{ReflectMessage, Value};

mod fixtures;

#[tokio::test]
async fn test_permissive_targets_accept_any_object() {
    let mut resolver = TypeResolver::new(shop_source());
    let structure = registry::find_message("google.protobuf.Struct").unwrap();
    let mut filler = SilentFiller::new(r#"{"foo":"bar"}"#.as_bytes());

    let message = filler.fill(&structure, &mut resolver).await.unwrap();

    assert_eq!(message.descriptor().full_name(), "google.protobuf.Struct");
    assert!(message.has_field_by_name("fields"));
}

#[tokio::test]
async fn test_unstructured_input_is_a_codec_mismatch() {
    let mut resolver = TypeResolver::new(shop_source());
    let structure = registry::find_message("google.protobuf.Struct").unwrap();
    let mut filler = SilentFiller::new("foo".as_bytes());

    let err = filler.fill(&structure, &mut resolver).await.unwrap_err();

    assert!(matches!(err, FillError::CodecMismatch { .. }));
}

#[tokio::test]
async fn test_shape_mismatch_is_a_codec_mismatch() {
    let mut resolver = TypeResolver::new(shop_source());
    let item = resolver.resolve_by_name("shop.v1.Item").await.unwrap();
    let mut filler = SilentFiller::new(r#"{"quantity":"many"}"#.as_bytes());

    let err = filler.fill(&item, &mut resolver).await.unwrap_err();

    assert!(matches!(err, FillError::CodecMismatch { message, .. } if message == "shop.v1.Item"));
}

#[tokio::test]
async fn test_documents_are_consumed_one_per_fill() {
    let mut resolver = TypeResolver::new(shop_source());
    let item = resolver.resolve_by_name("shop.v1.Item").await.unwrap();
    let input = r#"{"sku":"a","tags":["x","y"]}
                   {"sku":"b","status":"STATUS_ARCHIVED"}"#;
    let mut filler = SilentFiller::new(input.as_bytes());

    let first = filler.fill(&item, &mut resolver).await.unwrap();
    let second = filler.fill(&item, &mut resolver).await.unwrap();
    let end = filler.fill(&item, &mut resolver).await.unwrap_err();

    assert_eq!(first.get_field_by_name("sku").unwrap().as_str(), Some("a"));
    assert_eq!(
        second.get_field_by_name("status").unwrap().into_owned(),
        Value::EnumNumber(2)
    );
    assert!(matches!(end, FillError::EndOfInput));
}

#[tokio::test]
async fn test_any_payloads_are_resolved() {
    let mut resolver = TypeResolver::new(shop_source());
    let tagged = resolver.resolve_by_name("shop.v1.Tagged").await.unwrap();
    let input = r#"{
        "note": "x",
        "detail": { "@type": "type.googleapis.com/google.protobuf.Duration", "value": "1.5s" },
        "extras": [{ "@type": "type.googleapis.com/shop.v1.Dimensions", "width": 3 }]
    }"#;
    let mut filler = SilentFiller::new(input.as_bytes());

    let message = filler.fill(&tagged, &mut resolver).await.unwrap();

    let detail = message.get_field_by_name("detail").unwrap();
    assert_eq!(
        detail
            .as_message()
            .unwrap()
            .get_field_by_name("type_url")
            .unwrap()
            .as_str(),
        Some("type.googleapis.com/google.protobuf.Duration")
    );
    assert_eq!(
        message
            .get_field_by_name("extras")
            .unwrap()
            .as_list()
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_unknown_any_payloads_fail_to_resolve() {
    let mut resolver = TypeResolver::new(shop_source());
    let tagged = resolver.resolve_by_name("shop.v1.Tagged").await.unwrap();
    let input = r#"{ "detail": { "@type": "type.googleapis.com/shop.v1.Nope" } }"#;
    let mut filler = SilentFiller::new(input.as_bytes());

    let err = filler.fill(&tagged, &mut resolver).await.unwrap_err();

    assert!(matches!(err, FillError::Resolve { path, .. } if path == "detail"));
}

#[tokio::test]
async fn test_type_keys_inside_structs_are_plain_data() {
    let mut resolver = TypeResolver::new(shop_source());
    let structure = registry::find_message("google.protobuf.Struct").unwrap();
    let mut filler = SilentFiller::new(r#"{"@type":"not-a-type","foo":"bar"}"#.as_bytes());

    let message = filler.fill(&structure, &mut resolver).await.unwrap();

    let fields = message.get_field_by_name("fields").unwrap();
    assert_eq!(fields.as_map().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_payloads_in_repeated_anys_report_their_index() {
    let mut resolver = TypeResolver::new(shop_source());
    let tagged = resolver.resolve_by_name("shop.v1.Tagged").await.unwrap();
    let input = r#"{
        "extras": [
            { "@type": "type.googleapis.com/shop.v1.Dimensions", "width": 3 },
            { "@type": "type.googleapis.com/shop.v1.Nope" }
        ]
    }"#;
    let mut filler = SilentFiller::new(input.as_bytes());

    let err = filler.fill(&tagged, &mut resolver).await.unwrap_err();

    assert!(matches!(err, FillError::Resolve { path, .. } if path == "extras[1]"));
}

#[tokio::test]
async fn test_anys_nested_in_any_payloads_are_walked() {
    let mut resolver = TypeResolver::new(shop_source());
    let tagged = resolver.resolve_by_name("shop.v1.Tagged").await.unwrap();
    let input = r#"{
        "detail": {
            "@type": "type.googleapis.com/google.protobuf.Any",
            "value": { "@type": "type.googleapis.com/shop.v1.Nope" }
        }
    }"#;
    let mut filler = SilentFiller::new(input.as_bytes());

    let err = filler.fill(&tagged, &mut resolver).await.unwrap_err();

    assert!(matches!(err, FillError::Resolve { path, .. } if path == "detail.value"));
}
