//! Storage File Provider
//!
//! Locates a container's files, maps them read-only and caches the parsed
//! tables per container.
//!
//! ## Responsibilities
//! - Probe the legacy layout, then the consolidated layout
//! - Distinguish "not present" from "present but unreadable"
//! - Keep one parsed `ContainerStorage` per container for the provider's lifetime

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use memmap2::Mmap;
use parking_lot::RwLock;
use tracing::debug;

use crate::config::StorageConfig;
use crate::error::{FlagStoreError, Result};
use crate::format::{FlagInfoList, FlagTable, FlagValueList, PackageTable};

use super::layout::{is_valid_container_name, StorageFiles, StorageLayout};

/// Parsed tables of one container, shared by every reader of it
#[derive(Debug)]
pub struct ContainerStorage {
    container: String,
    layout: StorageLayout,
    package_table: PackageTable,
    flag_table: FlagTable,
    flag_values: FlagValueList,
    flag_info: Option<FlagInfoList>,
}

impl ContainerStorage {
    /// Map and parse every file in `files`
    pub fn open(container: &str, files: &StorageFiles) -> Result<Self> {
        let package_table = PackageTable::from_bytes(map_storage_file(&files.package_map)?)?;
        let flag_table = FlagTable::from_bytes(map_storage_file(&files.flag_map)?)?;
        let flag_values = FlagValueList::from_bytes(map_storage_file(&files.flag_val)?)?;
        let flag_info = if files.flag_info.exists() {
            Some(FlagInfoList::from_bytes(map_storage_file(&files.flag_info)?)?)
        } else {
            None
        };

        // All files of a container come from the same build
        let owner = package_table.container();
        let mut others = vec![flag_table.container(), flag_values.container()];
        if let Some(info) = &flag_info {
            others.push(info.container());
        }
        if let Some(stray) = others.into_iter().find(|c| *c != owner) {
            return Err(FlagStoreError::MalformedHeader(format!(
                "Storage files of container {} disagree on container name ({} vs {})",
                container, owner, stray
            )));
        }

        Ok(Self {
            container: container.to_string(),
            layout: files.layout,
            package_table,
            flag_table,
            flag_values,
            flag_info,
        })
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn layout(&self) -> StorageLayout {
        self.layout
    }

    pub fn package_table(&self) -> &PackageTable {
        &self.package_table
    }

    pub fn flag_table(&self) -> &FlagTable {
        &self.flag_table
    }

    pub fn flag_values(&self) -> &FlagValueList {
        &self.flag_values
    }

    pub fn flag_info(&self) -> Option<&FlagInfoList> {
        self.flag_info.as_ref()
    }
}

/// Resolves containers to mapped, parsed storage
///
/// ## Concurrency:
/// - `containers`: RwLock-protected cache, the only mutable state
/// - Loads run outside the lock; racing loads of one container converge on
///   whichever entry is inserted first, so callers never see a partial entry
pub struct StorageFileProvider {
    config: StorageConfig,

    /// Loaded containers, never evicted
    containers: RwLock<HashMap<String, Arc<ContainerStorage>>>,
}

impl StorageFileProvider {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            containers: RwLock::new(HashMap::new()),
        }
    }

    /// Provider over the legacy roots only, with the default consolidated root
    pub fn with_roots(map_root: impl Into<PathBuf>, boot_root: impl Into<PathBuf>) -> Self {
        Self::new(
            StorageConfig::builder()
                .map_root(map_root)
                .boot_root(boot_root)
                .build(),
        )
    }

    /// Process-wide provider over the well-known roots
    pub fn default_provider() -> &'static StorageFileProvider {
        static DEFAULT: OnceLock<StorageFileProvider> = OnceLock::new();
        DEFAULT.get_or_init(|| StorageFileProvider::new(StorageConfig::default()))
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Find the layout holding `container`
    ///
    /// Errors:
    /// - `ContainerNotFound` — empty/invalid name, or storage exists but lacks it
    /// - `NewStorageSystemNotFound` — no storage root exists at all
    pub fn resolve(&self, container: &str) -> Result<StorageFiles> {
        if !is_valid_container_name(container) {
            return Err(FlagStoreError::ContainerNotFound(container.to_string()));
        }

        for layout in StorageLayout::PROBE_ORDER {
            if layout.contains(&self.config, container) {
                return Ok(layout.files(&self.config, container));
            }
        }

        if self.storage_root_exists() {
            Err(FlagStoreError::ContainerNotFound(container.to_string()))
        } else {
            Err(self.no_storage_system())
        }
    }

    /// Parsed tables for `container`, loading them on first use
    pub fn container(&self, container: &str) -> Result<Arc<ContainerStorage>> {
        if let Some(storage) = self.containers.read().get(container) {
            return Ok(Arc::clone(storage));
        }

        let files = self.resolve(container)?;
        debug!(container, layout = ?files.layout, "Loading container storage");
        let loaded = Arc::new(ContainerStorage::open(container, &files)?);

        let mut containers = self.containers.write();
        let storage = containers
            .entry(container.to_string())
            .or_insert(loaded);
        Ok(Arc::clone(storage))
    }

    pub fn package_table(&self, container: &str) -> Result<PackageTable> {
        Ok(self.container(container)?.package_table().clone())
    }

    pub fn flag_table(&self, container: &str) -> Result<FlagTable> {
        Ok(self.container(container)?.flag_table().clone())
    }

    pub fn flag_value_list(&self, container: &str) -> Result<FlagValueList> {
        Ok(self.container(container)?.flag_values().clone())
    }

    pub fn flag_info_list(&self, container: &str) -> Result<Option<FlagInfoList>> {
        Ok(self.container(container)?.flag_info().cloned())
    }

    /// Every container visible under either layout, sorted and de-duplicated
    pub fn list_containers(&self) -> Result<Vec<String>> {
        if !self.storage_root_exists() {
            return Err(self.no_storage_system());
        }

        let mut names: Vec<String> = StorageLayout::PROBE_ORDER
            .iter()
            .flat_map(|layout| layout.containers(&self.config))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Number of containers currently cached
    pub fn cached_container_count(&self) -> usize {
        self.containers.read().len()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn storage_root_exists(&self) -> bool {
        StorageLayout::PROBE_ORDER
            .iter()
            .any(|layout| layout.root_exists(&self.config))
    }

    fn no_storage_system(&self) -> FlagStoreError {
        FlagStoreError::NewStorageSystemNotFound(format!(
            "none of {}, {} exist",
            self.config.map_root.display(),
            self.config.consolidated_root.display()
        ))
    }
}

/// Map a storage file read-only into a shareable buffer
pub fn map_storage_file(path: &Path) -> Result<Bytes> {
    let file = File::open(path).map_err(|e| FlagStoreError::cannot_read(path, e))?;

    // SAFETY: storage files are immutable for the lifetime of the image and
    // are never written while mapped.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| FlagStoreError::cannot_read(path, e))?;

    debug!(path = %path.display(), len = mmap.len(), "Mapped storage file");
    Ok(Bytes::from_owner(mmap))
}
