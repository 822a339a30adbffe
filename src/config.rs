//! Configuration for flagstore
//!
//! Storage root locations with the well-known on-device defaults.

use std::path::PathBuf;

/// Default root of the legacy package/flag map files
pub const DEFAULT_MAP_ROOT: &str = "/metadata/aconfig/maps";

/// Default root of the legacy flag value files
pub const DEFAULT_BOOT_ROOT: &str = "/metadata/aconfig/boot";

/// Default root of the consolidated per-container directories
pub const DEFAULT_CONSOLIDATED_ROOT: &str = "/metadata/aconfig/containers";

/// Where a provider looks for storage files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    // -------------------------------------------------------------------------
    // Legacy Layout
    // -------------------------------------------------------------------------
    /// Directory holding `{container}.package.map` and `{container}.flag.map`
    pub map_root: PathBuf,

    /// Directory holding `{container}.val` and, optionally, `{container}.info`
    pub boot_root: PathBuf,

    // -------------------------------------------------------------------------
    // Consolidated Layout
    // -------------------------------------------------------------------------
    /// Directory holding one sub-directory per container:
    ///   {consolidated_root}/
    ///     └── {container}/
    ///           ├── package.map
    ///           ├── flag.map
    ///           ├── flag.val
    ///           └── flag.info   (optional)
    pub consolidated_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            map_root: PathBuf::from(DEFAULT_MAP_ROOT),
            boot_root: PathBuf::from(DEFAULT_BOOT_ROOT),
            consolidated_root: PathBuf::from(DEFAULT_CONSOLIDATED_ROOT),
        }
    }
}

impl StorageConfig {
    /// Create a new config builder
    pub fn builder() -> StorageConfigBuilder {
        StorageConfigBuilder::default()
    }
}

/// Builder for StorageConfig
#[derive(Default)]
pub struct StorageConfigBuilder {
    config: StorageConfig,
}

impl StorageConfigBuilder {
    /// Set the legacy map root
    pub fn map_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.map_root = path.into();
        self
    }

    /// Set the legacy boot (flag value) root
    pub fn boot_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.boot_root = path.into();
        self
    }

    /// Set the consolidated layout root
    pub fn consolidated_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.consolidated_root = path.into();
        self
    }

    pub fn build(self) -> StorageConfig {
        self.config
    }
}
