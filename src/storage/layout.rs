//! Storage Layouts
//!
//! The two on-disk arrangements a container's files can be found in.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::StorageConfig;

/// Legacy layout file suffixes
const PACKAGE_MAP_EXT: &str = ".package.map";
const FLAG_MAP_EXT: &str = ".flag.map";
const FLAG_VAL_EXT: &str = ".val";
const FLAG_INFO_EXT: &str = ".info";

/// Consolidated layout file names
const PACKAGE_MAP_FILE: &str = "package.map";
const FLAG_MAP_FILE: &str = "flag.map";
const FLAG_VAL_FILE: &str = "flag.val";
const FLAG_INFO_FILE: &str = "flag.info";

/// One of the supported root-directory arrangements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageLayout {
    /// `{map_root}/{c}.package.map`, `{map_root}/{c}.flag.map`,
    /// `{boot_root}/{c}.val`, `{boot_root}/{c}.info`
    Legacy,

    /// `{consolidated_root}/{c}/package.map`, `flag.map`, `flag.val`, `flag.info`
    Consolidated,
}

/// Paths of every file belonging to one container under one layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageFiles {
    pub layout: StorageLayout,
    pub package_map: PathBuf,
    pub flag_map: PathBuf,
    pub flag_val: PathBuf,
    /// Optional; absent on older images
    pub flag_info: PathBuf,
}

impl StorageLayout {
    /// Layouts in the order they are probed
    pub const PROBE_ORDER: [StorageLayout; 2] =
        [StorageLayout::Legacy, StorageLayout::Consolidated];

    /// Paths for `container` under this layout (existence not checked)
    pub fn files(self, config: &StorageConfig, container: &str) -> StorageFiles {
        match self {
            Self::Legacy => StorageFiles {
                layout: self,
                package_map: config.map_root.join(format!("{}{}", container, PACKAGE_MAP_EXT)),
                flag_map: config.map_root.join(format!("{}{}", container, FLAG_MAP_EXT)),
                flag_val: config.boot_root.join(format!("{}{}", container, FLAG_VAL_EXT)),
                flag_info: config.boot_root.join(format!("{}{}", container, FLAG_INFO_EXT)),
            },
            Self::Consolidated => {
                let dir = config.consolidated_root.join(container);
                StorageFiles {
                    layout: self,
                    package_map: dir.join(PACKAGE_MAP_FILE),
                    flag_map: dir.join(FLAG_MAP_FILE),
                    flag_val: dir.join(FLAG_VAL_FILE),
                    flag_info: dir.join(FLAG_INFO_FILE),
                }
            }
        }
    }

    /// Whether this layout's root directory is present at all
    pub fn root_exists(self, config: &StorageConfig) -> bool {
        self.root(config).is_dir()
    }

    /// Whether this layout holds files for `container`
    pub fn contains(self, config: &StorageConfig, container: &str) -> bool {
        self.files(config, container).package_map.is_file()
    }

    /// Containers present under this layout, in directory order
    pub fn containers(self, config: &StorageConfig) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.root(config)) else {
            return Vec::new();
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                match self {
                    Self::Legacy => name.strip_suffix(PACKAGE_MAP_EXT).map(str::to_string),
                    Self::Consolidated => entry
                        .path()
                        .join(PACKAGE_MAP_FILE)
                        .is_file()
                        .then_some(name),
                }
            })
            .filter(|name| is_valid_container_name(name))
            .collect()
    }

    fn root(self, config: &StorageConfig) -> &Path {
        match self {
            Self::Legacy => &config.map_root,
            Self::Consolidated => &config.consolidated_root,
        }
    }
}

/// Container names are single path components
pub(crate) fn is_valid_container_name(container: &str) -> bool {
    !container.is_empty()
        && container != "."
        && container != ".."
        && !container.contains(['/', '\\', '\0'])
}
