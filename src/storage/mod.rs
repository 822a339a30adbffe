//! Storage Module
//!
//! Finds and maps the files of a container.
//!
//! ## Responsibilities
//! - Resolve a container name to its files under one of two layouts
//! - Memory-map files read-only
//! - Cache parsed tables per container
//!
//! ## Layouts (probed in this order)
//! ```text
//! Legacy                         Consolidated
//! {map_root}/                    {consolidated_root}/
//!   ├── {c}.package.map            └── {c}/
//!   └── {c}.flag.map                     ├── package.map
//! {boot_root}/                           ├── flag.map
//!   ├── {c}.val                          ├── flag.val
//!   └── {c}.info   (optional)            └── flag.info   (optional)
//! ```

mod layout;
mod provider;

pub use layout::{StorageFiles, StorageLayout};
pub use provider::{map_storage_file, ContainerStorage, StorageFileProvider};
