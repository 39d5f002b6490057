//! # IDL Navigation
//!
//! Exposes a schema as a three level namespace: packages → services → RPCs.
//!
//! Every lookup distinguishes a selector that was never provided (`*Unselected`) from one that
//! names something that does not exist (`Unknown*Name`). Checks run package first, then service,
//! then RPC, so the error always points at the outermost problem.
//!
//! Files without a `package` statement live in the default package, which is addressed with the
//! [`DEFAULT_PACKAGE`] sentinel since the empty string always means "nothing selected".
use crate::{
    registry,
    source::{DescriptorSource, SourceError},
};
use prost_reflect::{DescriptorPool, MessageDescriptor, MethodDescriptor, ServiceDescriptor};
use std::collections::BTreeSet;

/// How the default (empty) package is displayed and selected.
pub const DEFAULT_PACKAGE: &str = "''";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdlError {
    #[error("Package unselected")]
    PackageUnselected,
    #[error("Service unselected")]
    ServiceUnselected,
    #[error("Unknown package name '{0}'")]
    UnknownPackageName(String),
    #[error("Unknown service name '{0}'")]
    UnknownServiceName(String),
    #[error("Unknown RPC name '{0}'")]
    UnknownRpcName(String),
    #[error("Unknown type name '{0}'")]
    UnknownTypeName(String),
}

impl IdlError {
    /// A selector was left empty.
    pub fn is_unselected(&self) -> bool {
        matches!(self, Self::PackageUnselected | Self::ServiceUnselected)
    }

    /// A selector named something that does not exist.
    pub fn is_not_found(&self) -> bool {
        !self.is_unselected()
    }
}

/// Navigates the services of a resolved schema.
#[derive(Debug, Clone)]
pub struct IdlNavigator {
    pool: DescriptorPool,
}

impl IdlNavigator {
    pub fn new(pool: DescriptorPool) -> Self {
        Self { pool }
    }

    /// Builds a navigator over every service `source` can list.
    ///
    /// Each service is resolved individually and the files declaring it, with their imports,
    /// are merged into a single pool.
    pub async fn load<D: DescriptorSource>(source: &mut D) -> Result<Self, SourceError> {
        let mut pool = DescriptorPool::new();

        for service in source.list_services().await? {
            let descriptor = source.find_symbol(&service).await?;
            registry::merge_file(&mut pool, &descriptor.parent_file()).map_err(
                |registry::RegistryError::Register { source, .. }| SourceError::Descriptor(source),
            )?;
        }

        tracing::debug!(
            files = pool.files().count(),
            services = pool.services().count(),
            "loaded schema"
        );

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Every package in the schema, sorted and deduplicated.
    pub fn package_names(&self) -> Vec<String> {
        self.pool
            .files()
            .map(|file| display_package(file.package_name()).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// The names of the services declared in `pkg`.
    pub fn service_names(&self, pkg: &str) -> Result<Vec<String>, IdlError> {
        let package = self.resolve_package(pkg)?;

        Ok(self
            .pool
            .services()
            .filter(|s| s.package_name() == package)
            .map(|s| s.name().to_string())
            .collect())
    }

    /// The names of the top level messages declared in `pkg`, in declaration order.
    pub fn message_names(&self, pkg: &str) -> Result<Vec<String>, IdlError> {
        let package = self.resolve_package(pkg)?;

        Ok(self
            .pool
            .files()
            .filter(|file| file.package_name() == package)
            .flat_map(|file| file.messages().collect::<Vec<_>>())
            .map(|m| m.name().to_string())
            .collect())
    }

    /// The RPCs of `svc`, in declaration order.
    pub fn rpcs(&self, pkg: &str, svc: &str) -> Result<Vec<MethodDescriptor>, IdlError> {
        Ok(self.service_descriptor(pkg, svc)?.methods().collect())
    }

    /// A single RPC of `svc`.
    pub fn rpc(&self, pkg: &str, svc: &str, rpc: &str) -> Result<MethodDescriptor, IdlError> {
        self.service_descriptor(pkg, svc)?
            .methods()
            .find(|m| m.name() == rpc)
            .ok_or_else(|| IdlError::UnknownRpcName(rpc.to_string()))
    }

    /// The descriptor of message `msg` (a name relative to `pkg`).
    pub fn type_descriptor(&self, pkg: &str, msg: &str) -> Result<MessageDescriptor, IdlError> {
        let package = self.resolve_package(pkg)?;
        let full_name = qualify(package, msg);

        self.pool
            .get_message_by_name(&full_name)
            .ok_or_else(|| IdlError::UnknownTypeName(msg.to_string()))
    }

    /// Looks a service up by its fully qualified name.
    pub fn service(&self, fqsn: &str) -> Result<ServiceDescriptor, IdlError> {
        if fqsn.is_empty() {
            return Err(IdlError::ServiceUnselected);
        }
        self.pool
            .get_service_by_name(fqsn)
            .ok_or_else(|| IdlError::UnknownServiceName(fqsn.to_string()))
    }

    /// Looks an RPC up by its service's fully qualified name.
    pub fn method(&self, fqsn: &str, rpc: &str) -> Result<MethodDescriptor, IdlError> {
        self.service(fqsn)?
            .methods()
            .find(|m| m.name() == rpc)
            .ok_or_else(|| IdlError::UnknownRpcName(rpc.to_string()))
    }

    fn service_descriptor(&self, pkg: &str, svc: &str) -> Result<ServiceDescriptor, IdlError> {
        let package = self.resolve_package(pkg)?;
        let fqsn = fully_qualified_service_name(package, svc)?;

        self.pool
            .get_service_by_name(&fqsn)
            .ok_or_else(|| IdlError::UnknownServiceName(svc.to_string()))
    }

    /// Maps a package selector to the package name stored in descriptors.
    fn resolve_package<'a>(&self, pkg: &'a str) -> Result<&'a str, IdlError> {
        if pkg.is_empty() {
            return Err(IdlError::PackageUnselected);
        }

        let package = if pkg == DEFAULT_PACKAGE { "" } else { pkg };

        if self.pool.files().any(|file| file.package_name() == package) {
            Ok(package)
        } else {
            Err(IdlError::UnknownPackageName(pkg.to_string()))
        }
    }
}

/// Builds `pkg.svc`, or just `svc` for the default package.
pub fn fully_qualified_service_name(pkg: &str, svc: &str) -> Result<String, IdlError> {
    if svc.is_empty() {
        return Err(IdlError::ServiceUnselected);
    }
    let package = if pkg == DEFAULT_PACKAGE { "" } else { pkg };
    Ok(qualify(package, svc))
}

fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{package}.{name}")
    }
}

fn display_package(package: &str) -> &str {
    if package.is_empty() {
        DEFAULT_PACKAGE
    } else {
        package
    }
}
