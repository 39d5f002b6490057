use fixtures::shop_source;
use grepl_core::idl::{DEFAULT_PACKAGE, IdlError, IdlNavigator};

mod fixtures;

async fn navigator() -> IdlNavigator {
    IdlNavigator::load(&mut shop_source())
        .await
        .expect("Failed to load the schema")
}

#[tokio::test]
async fn test_package_names_are_sorted_and_deterministic() {
    let idl = navigator().await;

    let packages = idl.package_names();

    assert_eq!(
        packages,
        vec![DEFAULT_PACKAGE, "google.protobuf", "shop.billing", "shop.v1"]
    );
    assert_eq!(packages, idl.package_names());
}

#[tokio::test]
async fn test_service_names() {
    let idl = navigator().await;

    assert_eq!(
        idl.service_names("shop.v1").unwrap(),
        vec!["InventoryService"]
    );
    assert_eq!(idl.service_names(DEFAULT_PACKAGE).unwrap(), vec!["Health"]);
    assert_eq!(idl.service_names(""), Err(IdlError::PackageUnselected));
    assert_eq!(
        idl.service_names("shop.v2"),
        Err(IdlError::UnknownPackageName("shop.v2".into()))
    );
}

#[tokio::test]
async fn test_rpcs_are_in_declaration_order() {
    let idl = navigator().await;

    let names: Vec<String> = idl
        .rpcs("shop.v1", "InventoryService")
        .unwrap()
        .iter()
        .map(|m| m.name().to_string())
        .collect();

    assert_eq!(names, vec!["GetItem", "ListItems", "Restock", "Replace"]);
}

#[tokio::test]
async fn test_selectors_are_checked_package_first() {
    let idl = navigator().await;

    assert_eq!(idl.rpcs("", ""), Err(IdlError::PackageUnselected));
    assert_eq!(idl.rpcs("", "Nope"), Err(IdlError::PackageUnselected));
    assert_eq!(
        idl.rpcs("nope", ""),
        Err(IdlError::UnknownPackageName("nope".into()))
    );
    assert_eq!(idl.rpcs("shop.v1", ""), Err(IdlError::ServiceUnselected));
    assert_eq!(
        idl.rpcs("shop.v1", "Nope"),
        Err(IdlError::UnknownServiceName("Nope".into()))
    );
    assert_eq!(
        idl.rpc("nope", "Nope", "Nope"),
        Err(IdlError::UnknownPackageName("nope".into()))
    );
    assert_eq!(
        idl.rpc("", "InventoryService", "GetItem"),
        Err(IdlError::PackageUnselected)
    );
}

#[tokio::test]
async fn test_rpc_lookup() {
    let idl = navigator().await;

    let restock = idl.rpc("shop.v1", "InventoryService", "Restock").unwrap();
    assert!(restock.is_client_streaming());
    assert!(!restock.is_server_streaming());
    assert_eq!(restock.input().full_name(), "shop.v1.Item");
    assert_eq!(restock.output().full_name(), "shop.v1.Inventory");

    let check = idl.rpc(DEFAULT_PACKAGE, "Health", "Check").unwrap();
    assert_eq!(check.input().full_name(), "Ping");

    assert_eq!(
        idl.rpc("shop.v1", "InventoryService", "Delete"),
        Err(IdlError::UnknownRpcName("Delete".into()))
    );
}

#[tokio::test]
async fn test_type_descriptor() {
    let idl = navigator().await;

    let invoice = idl.type_descriptor("shop.billing", "Invoice").unwrap();
    assert_eq!(invoice.full_name(), "shop.billing.Invoice");

    assert_eq!(
        idl.type_descriptor("shop.v1", "Invoice"),
        Err(IdlError::UnknownTypeName("Invoice".into()))
    );
    assert_eq!(
        idl.type_descriptor("", "Invoice"),
        Err(IdlError::PackageUnselected)
    );
    assert_eq!(
        idl.type_descriptor("shop.v9", "Invoice"),
        Err(IdlError::UnknownPackageName("shop.v9".into()))
    );
}

#[tokio::test]
async fn test_direct_lookups() {
    let idl = navigator().await;

    let method = idl.method("shop.billing.BillingService", "Charge").unwrap();
    assert_eq!(method.input().full_name(), "shop.billing.Invoice");

    assert_eq!(idl.service("Health").unwrap().name(), "Health");
    assert_eq!(idl.service(""), Err(IdlError::ServiceUnselected));
    assert!(idl.service("shop.v1.Nope").unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_message_names() {
    let idl = navigator().await;

    assert_eq!(idl.message_names("shop.billing").unwrap(), vec!["Invoice"]);
    assert_eq!(idl.message_names(DEFAULT_PACKAGE).unwrap(), vec!["Ping"]);
    assert_eq!(idl.message_names(""), Err(IdlError::PackageUnselected));
}
