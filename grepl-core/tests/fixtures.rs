#![allow(dead_code)]

use grepl_core::source::FileDescriptorSource;
use std::path::PathBuf;

pub const SCHEMA_FILES: &[&str] = &["inventory.proto", "billing.proto", "health.proto"];

pub fn testdata() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/testdata")
}

/// A source over every valid schema under `tests/testdata`.
pub fn shop_source() -> FileDescriptorSource {
    FileDescriptorSource::from_proto_files(&[testdata()], SCHEMA_FILES)
        .expect("test schemas should compile")
}
