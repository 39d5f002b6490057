//! # Descriptor Registry
//!
//! The process-wide pool of file descriptors that every consumer can fall back to.
//!
//! It starts out holding the Protobuf well-known types (`Any`, `Timestamp`, `Duration`, wrappers,
//! ...) and grows as descriptor sources resolve symbols. The pool sits behind a single mutex and
//! only two operations touch it: *register if absent* and *lookup*. Registration is idempotent, and
//! descriptors handed out earlier keep pointing at the snapshot they were resolved from.
use prost_reflect::{DescriptorError, DescriptorPool, FileDescriptor, MessageDescriptor};
use protox::{Compiler, file::GoogleFileResolver};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

/// Files compiled into every registry.
pub const WELL_KNOWN_FILES: &[&str] = &[
    "google/protobuf/any.proto",
    "google/protobuf/duration.proto",
    "google/protobuf/empty.proto",
    "google/protobuf/field_mask.proto",
    "google/protobuf/struct.proto",
    "google/protobuf/timestamp.proto",
    "google/protobuf/wrappers.proto",
];

static REGISTRY: OnceLock<Mutex<DescriptorPool>> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Failed to register file '{file}': '{source}'")]
    Register {
        file: String,
        #[source]
        source: DescriptorError,
    },
}

/// Registers `file` and its transitive imports, skipping any file already present.
///
/// Returns `true` when `file` itself was added by this call.
pub fn register_file(file: &FileDescriptor) -> Result<bool, RegistryError> {
    let mut pool = lock();
    let added = merge_file(&mut pool, file)?;

    if added {
        tracing::debug!(file = file.name(), "registered file descriptor");
    }

    Ok(added)
}

/// Looks up a message type by its fully qualified name.
pub fn find_message(full_name: &str) -> Option<MessageDescriptor> {
    lock().get_message_by_name(full_name)
}

/// Whether a file with this name has been registered.
pub fn contains_file(name: &str) -> bool {
    lock().get_file_by_name(name).is_some()
}

/// Adds `file` to `pool` after its dependencies, unless a file with the same name is already there.
pub(crate) fn merge_file(
    pool: &mut DescriptorPool,
    file: &FileDescriptor,
) -> Result<bool, RegistryError> {
    if pool.get_file_by_name(file.name()).is_some() {
        return Ok(false);
    }

    for dependency in file.dependencies() {
        merge_file(pool, &dependency)?;
    }

    pool.add_file_descriptor_proto(file.file_descriptor_proto().clone())
        .map_err(|source| RegistryError::Register {
            file: file.name().to_string(),
            source,
        })?;

    Ok(true)
}

fn lock() -> MutexGuard<'static, DescriptorPool> {
    // The pool is only ever replaced wholesale by `add_file_descriptor_proto`,
    // so a panic in another holder cannot leave it half-written.
    REGISTRY
        .get_or_init(|| Mutex::new(well_known_types()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn well_known_types() -> DescriptorPool {
    let mut compiler = Compiler::with_file_resolver(GoogleFileResolver::new());
    compiler
        .open_files(WELL_KNOWN_FILES)
        .expect("well-known types are bundled with protox");
    compiler.descriptor_pool()
}
