//! Container Reader
//!
//! Name-based flag reads against one container, without caching a package
//! first.
//!
//! Two postures over one resolution path:
//! - [`ContainerReader::has_flag`] — existence probe, `false` on any failure
//! - [`ContainerReader::read_flag`] — strict read, typed error on any failure

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::error::{FlagStoreError, Result};
use crate::format::{FlagAttributes, StoredFlagType};
use crate::storage::{ContainerStorage, StorageFileProvider};

/// Result of resolving `(package, flag)` in a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found(bool),
    PackageMissing,
    FlagMissing,
}

/// One flag as listed from a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagEntry {
    pub package_name: String,
    pub flag_name: String,
    pub flag_type: StoredFlagType,
    pub value: bool,
    /// From the flag info file; `None` when the container has none
    pub is_read_write: Option<bool>,
}

/// Reads flags of a single container by name
#[derive(Debug, Clone)]
pub struct ContainerReader {
    storage: Arc<ContainerStorage>,
}

impl ContainerReader {
    /// Open `container` through the default provider
    pub fn open(container: &str) -> Result<Self> {
        Self::open_with(container, StorageFileProvider::default_provider())
    }

    pub fn open_with(container: &str, provider: &StorageFileProvider) -> Result<Self> {
        Ok(Self {
            storage: provider.container(container)?,
        })
    }

    pub fn container(&self) -> &str {
        self.storage.container()
    }

    /// Resolve a flag to its value, or say which name was missing
    ///
    /// Errors are reserved for corrupt files.
    pub fn try_resolve(&self, package_name: &str, flag_name: &str) -> Result<Resolution> {
        let Some(package) = self.storage.package_table().get(package_name)? else {
            return Ok(Resolution::PackageMissing);
        };
        let Some(flag) = self.storage.flag_table().get(package.package_id, flag_name)? else {
            return Ok(Resolution::FlagMissing);
        };

        let index = package
            .boolean_start_index
            .checked_add(u32::from(flag.flag_index))
            .ok_or_else(|| {
                FlagStoreError::InvalidStorageFileOffset(format!(
                    "Flag {} index overflows package {} start",
                    flag_name, package_name
                ))
            })?;
        let value = self.storage.flag_values().get(index)?;
        Ok(Resolution::Found(value))
    }

    /// Whether the container has `package_name.flag_name`
    ///
    /// Never fails; corrupt storage reads as absent and is logged.
    pub fn has_flag(&self, package_name: &str, flag_name: &str) -> bool {
        match self.try_resolve(package_name, flag_name) {
            Ok(Resolution::Found(_)) => true,
            Ok(_) => false,
            Err(e) => {
                warn!(
                    container = self.container(),
                    package = package_name,
                    flag = flag_name,
                    error = %e,
                    "Flag lookup hit corrupt storage"
                );
                false
            }
        }
    }

    /// Value of `package_name.flag_name`
    ///
    /// Callers are expected to have checked [`has_flag`](Self::has_flag);
    /// absence is an error here.
    pub fn read_flag(&self, package_name: &str, flag_name: &str) -> Result<bool> {
        match self.try_resolve(package_name, flag_name)? {
            Resolution::Found(value) => Ok(value),
            Resolution::PackageMissing => Err(FlagStoreError::PackageNotFound {
                container: self.container().to_string(),
                package: package_name.to_string(),
            }),
            Resolution::FlagMissing => Err(FlagStoreError::FlagNotFound {
                container: self.container().to_string(),
                package: package_name.to_string(),
                flag: flag_name.to_string(),
            }),
        }
    }

    /// Every flag in the container, sorted by package then flag name
    pub fn list_flags(&self) -> Result<Vec<FlagEntry>> {
        let mut packages = HashMap::new();
        for node in self.storage.package_table().iter() {
            let node = node?;
            let start = node.boolean_start_index;
            packages.insert(node.package_id, (node.package_name, start));
        }

        let mut flags = Vec::new();
        for node in self.storage.flag_table().iter() {
            let node = node?;
            let (package_name, start) = packages.get(&node.package_id).ok_or_else(|| {
                FlagStoreError::InvalidStorageFileOffset(format!(
                    "Flag {} refers to unknown package id {}",
                    node.flag_name, node.package_id
                ))
            })?;

            let index = start.saturating_add(u32::from(node.flag_index));
            let is_read_write = match self.storage.flag_info() {
                Some(info) => Some(info.get(index)?.contains(FlagAttributes::IS_READ_WRITE)),
                None => None,
            };

            flags.push(FlagEntry {
                package_name: package_name.clone(),
                flag_name: node.flag_name,
                flag_type: node.flag_type,
                value: self.storage.flag_values().get(index)?,
                is_read_write,
            });
        }

        flags.sort_by(|a, b| {
            a.package_name
                .cmp(&b.package_name)
                .then_with(|| a.flag_name.cmp(&b.flag_name))
        });
        Ok(flags)
    }
}

// =============================================================================
// Default-Provider Shortcuts
// =============================================================================

/// Existence probe against the default provider; `false` on any failure
pub fn has_flag(container: &str, package_name: &str, flag_name: &str) -> bool {
    ContainerReader::open(container)
        .map(|reader| reader.has_flag(package_name, flag_name))
        .unwrap_or(false)
}

/// Strict read against the default provider
pub fn read_flag(container: &str, package_name: &str, flag_name: &str) -> Result<bool> {
    ContainerReader::open(container)?.read_flag(package_name, flag_name)
}
