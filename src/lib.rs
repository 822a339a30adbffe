//! # flagstore
//!
//! A read-only, memory-mapped feature-flag storage engine:
//! - Versioned binary tables (package map, flag map, flag values)
//! - SipHash-bucketed lookups with chained collisions inside the file
//! - Package fingerprints so callers can cache flag indices across builds
//! - Per-container caching of mapped, parsed tables
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │        LoadedPackage / PackageHandle / ContainerReader       │
//! │        (index reads, name reads, has_flag / read_flag)       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  StorageFileProvider                         │
//! │       (layout probing, mmap, per-container cache)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────┐
//!          ▼            ▼                 ▼
//!   ┌────────────┐ ┌────────────┐ ┌──────────────┐
//!   │  Package   │ │    Flag    │ │  Flag Value  │
//!   │   Table    │ │   Table    │ │     List     │
//!   └────────────┘ └────────────┘ └──────────────┘
//!          │            │                 │
//!          └────────────┴──── header ─────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod format;
pub mod package;
pub mod reader;
pub mod storage;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::StorageConfig;
pub use error::{ErrorCode, FlagStoreError, Result};
pub use package::{LoadedPackage, PackageHandle, PackageState};
pub use reader::{has_flag, read_flag, ContainerReader, FlagEntry, Resolution};
pub use storage::StorageFileProvider;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of flagstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
