//! # File Descriptor Source
//!
//! Serves descriptors from schemas available locally, either as `.proto` sources compiled
//! in-process with `protox`, or as a binary `FileDescriptorSet` produced by `protoc`.
use super::{Descriptor, DescriptorSource, SourceError};
use crate::registry;
use prost_reflect::{DescriptorPool, FileDescriptor, MessageDescriptor};
use protox::Compiler;
use std::path::Path;

/// A descriptor source backed by a static, in-process descriptor pool.
#[derive(Debug, Clone)]
pub struct FileDescriptorSource {
    pool: DescriptorPool,
}

impl FileDescriptorSource {
    /// Compiles `files`, resolving their imports against `import_paths`.
    ///
    /// When no import path is given, the current directory is used. Well-known imports
    /// (`google/protobuf/*.proto`) are always available.
    ///
    /// # Returns
    ///
    /// * `Err(SourceError::Parse)` - naming the first file that is malformed or whose imports
    ///   cannot be located.
    pub fn from_proto_files<I, F>(import_paths: &[I], files: &[F]) -> Result<Self, SourceError>
    where
        I: AsRef<Path>,
        F: AsRef<Path>,
    {
        let includes: Vec<&Path> = if import_paths.is_empty() {
            vec![Path::new(".")]
        } else {
            import_paths.iter().map(AsRef::as_ref).collect()
        };

        let mut compiler = Compiler::new(&includes).map_err(|source| SourceError::Parse {
            file: includes
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(":"),
            source,
        })?;
        compiler.include_imports(true);

        for file in files {
            let file = file.as_ref();
            compiler.open_file(file).map_err(|source| SourceError::Parse {
                file: file.display().to_string(),
                source,
            })?;
        }

        let pool = compiler.descriptor_pool();
        tracing::debug!(files = pool.files().count(), "compiled proto files");

        Ok(Self { pool })
    }

    /// Decodes an encoded `FileDescriptorSet`.
    pub fn from_file_descriptor_set(bytes: &[u8]) -> Result<Self, SourceError> {
        let pool = DescriptorPool::decode(bytes)?;
        Ok(Self { pool })
    }

    /// Wraps an already built pool.
    pub fn from_pool(pool: DescriptorPool) -> Self {
        Self { pool }
    }

    /// The parsed schema.
    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Scans every parsed file in order and stops at the first one declaring `symbol`.
    fn scan(&self, symbol: &str) -> Option<Descriptor> {
        self.pool
            .files()
            .find_map(|file| find_in_file(&file, symbol))
    }
}

impl DescriptorSource for FileDescriptorSource {
    async fn find_symbol(&mut self, symbol: &str) -> Result<Descriptor, SourceError> {
        let descriptor = self
            .scan(symbol)
            .ok_or_else(|| SourceError::NotFound(symbol.to_string()))?;

        // A name clash with an earlier registration only affects `Any` payloads of this file.
        if let Err(err) = registry::register_file(&descriptor.parent_file()) {
            tracing::warn!(
                file = descriptor.parent_file().name(),
                error = %err,
                "skipped registering file descriptor"
            );
        }
        tracing::debug!(
            symbol,
            file = descriptor.parent_file().name(),
            "resolved symbol"
        );

        Ok(descriptor)
    }

    async fn list_services(&mut self) -> Result<Vec<String>, SourceError> {
        Ok(self
            .pool
            .services()
            .map(|s| s.full_name().to_string())
            .collect())
    }
}

fn find_in_file(file: &FileDescriptor, symbol: &str) -> Option<Descriptor> {
    let package = file.package_name();
    let local = if package.is_empty() {
        symbol
    } else {
        symbol.strip_prefix(package)?.strip_prefix('.')?
    };

    for service in file.services() {
        if service.name() == local {
            return Some(Descriptor::ServiceDescriptor(service));
        }
        if let Some(method) = service.methods().find(|m| m.full_name() == symbol) {
            return Some(Descriptor::MethodDescriptor(method));
        }
    }

    if let Some(descriptor) = file.enums().find(|e| e.full_name() == symbol) {
        return Some(Descriptor::EnumDescriptor(descriptor));
    }

    file.messages()
        .find_map(|message| find_in_message(message, symbol))
}

fn find_in_message(message: MessageDescriptor, symbol: &str) -> Option<Descriptor> {
    if message.full_name() == symbol {
        return Some(Descriptor::MessageDescriptor(message));
    }
    if !symbol.starts_with(message.full_name()) {
        return None;
    }
    if let Some(descriptor) = message.child_enums().find(|e| e.full_name() == symbol) {
        return Some(Descriptor::EnumDescriptor(descriptor));
    }
    message
        .child_messages()
        .find_map(|child| find_in_message(child, symbol))
}
