//! Package Module
//!
//! Loads one package of one container and reads its flags.
//!
//! ## Lifecycle
//! ```text
//!              load ok
//! Unloaded ──────────────► Loaded
//!     │
//!     │ load failed
//!     └──────────────────► Failed(error)
//!
//! `Failed` is terminal; every accessor returns the captured error.
//! ```
//!
//! A package keeps its container's `ContainerStorage` alive, so reads after
//! `load` touch only the mapped value bytes.

use std::sync::Arc;

use tracing::debug;

use crate::error::{FlagStoreError, Result};
use crate::storage::{ContainerStorage, StorageFileProvider};

/// A package resolved within a container
#[derive(Debug, Clone)]
pub struct LoadedPackage {
    package_name: String,
    package_id: u32,
    fingerprint: u64,
    has_fingerprint: bool,
    boolean_start_index: u32,
    storage: Arc<ContainerStorage>,
}

impl LoadedPackage {
    /// Load `package_name` from `container` using the default provider
    pub fn load(container: &str, package_name: &str) -> Result<Self> {
        let provider = StorageFileProvider::default_provider();
        Self::load_with(container, package_name, provider)
    }

    /// Load `package_name` from `container` using `provider`
    ///
    /// Steps:
    /// 1. Resolve the container's tables through the provider
    /// 2. Look up the package by name
    /// 3. Capture its fingerprint and boolean start index
    pub fn load_with(
        container: &str,
        package_name: &str,
        provider: &StorageFileProvider,
    ) -> Result<Self> {
        let storage = provider.container(container)?;
        let package = Self::from_storage(storage, package_name)?;
        package.ok_or_else(|| FlagStoreError::PackageNotFound {
            container: container.to_string(),
            package: package_name.to_string(),
        })
    }

    /// Find `package_name` in whichever container holds it
    ///
    /// Containers are searched in name order; the first match wins.
    pub fn load_any(package_name: &str, provider: &StorageFileProvider) -> Result<Self> {
        for container in provider.list_containers()? {
            let storage = provider.container(&container)?;
            if let Some(package) = Self::from_storage(storage, package_name)? {
                return Ok(package);
            }
        }

        Err(FlagStoreError::PackageNotFound {
            container: "<any>".to_string(),
            package: package_name.to_string(),
        })
    }

    fn from_storage(storage: Arc<ContainerStorage>, package_name: &str) -> Result<Option<Self>> {
        let Some(node) = storage.package_table().get(package_name)? else {
            return Ok(None);
        };

        debug!(
            container = storage.container(),
            package = package_name,
            package_id = node.package_id,
            start = node.boolean_start_index,
            "Loaded package"
        );

        Ok(Some(Self {
            package_name: node.package_name,
            package_id: node.package_id,
            fingerprint: node.fingerprint,
            has_fingerprint: storage.package_table().has_fingerprint(),
            boolean_start_index: node.boolean_start_index,
            storage,
        }))
    }

    pub fn container(&self) -> &str {
        self.storage.container()
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn package_id(&self) -> u32 {
        self.package_id
    }

    /// Fingerprint of the package's flag set (0 when the file predates fingerprints)
    pub fn package_fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Whether the storage files carry a real fingerprint for this package
    pub fn has_package_fingerprint(&self) -> bool {
        self.has_fingerprint
    }

    /// Value of the flag at `index` within this package
    ///
    /// Fast path. The index is only meaningful for the build it was computed
    /// against; compare `package_fingerprint()` first and fall back to
    /// [`boolean_flag_value_by_name`](Self::boolean_flag_value_by_name) on a mismatch.
    pub fn boolean_flag_value(&self, index: u32) -> Result<bool> {
        let global = self.boolean_start_index.checked_add(index).ok_or_else(|| {
            FlagStoreError::InvalidStorageFileOffset(format!(
                "Flag index {} overflows package start {}",
                index, self.boolean_start_index
            ))
        })?;
        self.storage.flag_values().get(global)
    }

    /// Value of `flag_name`, or `default` when the package has no such flag
    ///
    /// Re-resolves the name on every call, so it survives layout changes.
    pub fn boolean_flag_value_by_name(&self, flag_name: &str, default: bool) -> Result<bool> {
        match self.storage.flag_table().get(self.package_id, flag_name)? {
            Some(node) => self.boolean_flag_value(u32::from(node.flag_index)),
            None => Ok(default),
        }
    }
}

/// Outcome of a package load
#[derive(Debug, Clone)]
pub enum PackageState {
    Loaded(LoadedPackage),
    Failed(FlagStoreError),
}

/// Package handle that never fails to construct
///
/// A failed load is captured and returned from every accessor instead of
/// being raised at load time.
#[derive(Debug, Clone)]
pub struct PackageHandle {
    state: PackageState,
}

impl PackageHandle {
    pub fn load(container: &str, package_name: &str, provider: &StorageFileProvider) -> Self {
        LoadedPackage::load_with(container, package_name, provider).into()
    }

    pub fn state(&self) -> &PackageState {
        &self.state
    }

    /// The captured load error, if any
    pub fn error(&self) -> Option<&FlagStoreError> {
        match &self.state {
            PackageState::Loaded(_) => None,
            PackageState::Failed(e) => Some(e),
        }
    }

    pub fn package(&self) -> Result<&LoadedPackage> {
        match &self.state {
            PackageState::Loaded(package) => Ok(package),
            PackageState::Failed(e) => Err(e.clone()),
        }
    }

    pub fn boolean_flag_value(&self, index: u32) -> Result<bool> {
        self.package()?.boolean_flag_value(index)
    }

    pub fn boolean_flag_value_by_name(&self, flag_name: &str, default: bool) -> Result<bool> {
        self.package()?.boolean_flag_value_by_name(flag_name, default)
    }

    pub fn package_fingerprint(&self) -> Result<u64> {
        Ok(self.package()?.package_fingerprint())
    }
}

impl From<Result<LoadedPackage>> for PackageHandle {
    fn from(result: Result<LoadedPackage>) -> Self {
        let state = match result {
            Ok(package) => PackageState::Loaded(package),
            Err(e) => PackageState::Failed(e),
        };
        Self { state }
    }
}
