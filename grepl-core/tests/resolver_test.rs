use fixtures::shop_source;
use grepl_core::{
    resolver::{ResolveError, TypeResolver},
    source::FileDescriptorSource,
};
use prost_reflect::DescriptorPool;

mod fixtures;

#[tokio::test]
async fn test_resolve_by_name_from_the_source() {
    let mut resolver = TypeResolver::new(shop_source());

    let item = resolver.resolve_by_name("shop.v1.Item").await.unwrap();

    assert_eq!(item.full_name(), "shop.v1.Item");
}

#[tokio::test]
async fn test_well_known_types_fall_back_to_the_registry() {
    // An empty source knows nothing, not even the well-known types.
    let mut resolver = TypeResolver::new(FileDescriptorSource::from_pool(DescriptorPool::new()));

    let timestamp = resolver
        .resolve_by_name("google.protobuf.Timestamp")
        .await
        .unwrap();

    assert_eq!(timestamp.full_name(), "google.protobuf.Timestamp");
}

#[tokio::test]
async fn test_resolve_by_url_strips_the_authority() {
    let mut resolver = TypeResolver::new(shop_source());

    let duration = resolver
        .resolve_by_url("type.googleapis.com/google.protobuf.Duration")
        .await
        .unwrap();
    let dimensions = resolver
        .resolve_by_url("example.com/schemas/shop.v1.Dimensions")
        .await
        .unwrap();

    assert_eq!(duration.full_name(), "google.protobuf.Duration");
    assert_eq!(dimensions.full_name(), "shop.v1.Dimensions");
}

#[tokio::test]
async fn test_unknown_types_are_not_found() {
    let mut resolver = TypeResolver::new(shop_source());

    let err = resolver
        .resolve_by_url("type.googleapis.com/shop.v1.Missing")
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::NotFound(name) if name == "shop.v1.Missing"));
}

#[tokio::test]
async fn test_non_message_symbols_are_rejected() {
    let mut resolver = TypeResolver::new(shop_source());

    let service = resolver
        .resolve_by_name("shop.v1.InventoryService")
        .await
        .unwrap_err();
    let status = resolver
        .resolve_by_name("shop.v1.Status")
        .await
        .unwrap_err();

    assert!(matches!(service, ResolveError::NotAMessage(_)));
    assert!(matches!(status, ResolveError::NotAMessage(_)));
}
