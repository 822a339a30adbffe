//! Storage File Format
//!
//! Every storage file is a header followed by a type-specific body. All
//! integers are little-endian; strings are a `u32` length plus UTF-8 bytes.
//!
//! ## Common Header
//! ```text
//! ┌─────────────┬──────────────────────────┬──────────┬──────────────┐
//! │ Version (4) │ Container (4 + len)      │ Type (1) │ FileSize (4) │
//! └─────────────┴──────────────────────────┴──────────┴──────────────┘
//! ```
//!
//! ## Hash Table Files (package map, flag map)
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │ Header + Count (4) + BucketOffset (4) + NodeOffset │
//! ├────────────────────────────────────────────────────┤
//! │ Buckets: [u32; (node_offset - bucket_offset) / 4]  │
//! │   head node offset, or 0 / 0xFFFFFFFF when empty   │
//! ├────────────────────────────────────────────────────┤
//! │ Nodes: variable-size records, each ending with a   │
//! │   next_offset chaining it to the next colliding key │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! ## Flag Value / Flag Info Files
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │ Header + NumFlags (4) + ValueOffset (4)            │
//! ├────────────────────────────────────────────────────┤
//! │ One byte per flag, indexed by global flag index    │
//! └────────────────────────────────────────────────────┘
//! ```

mod flag_info;
mod flag_table;
mod flag_value;
mod header;
mod package_table;
mod siphash;

use serde::{Deserialize, Serialize};

use crate::error::{FlagStoreError, Result};

pub use flag_info::{FlagAttributes, FlagInfoHeader, FlagInfoList};
pub use flag_table::{FlagTable, FlagTableHeader, FlagTableIter, FlagTableNode, StoredFlagType};
pub use flag_value::{FlagValueHeader, FlagValueList};
pub use header::StorageHeader;
pub use package_table::{PackageTable, PackageTableHeader, PackageTableIter, PackageTableNode};
pub use siphash::{SipHasher, SipHasher13, SipHasher24};

// =============================================================================
// Shared Constants
// =============================================================================

/// Oldest storage file version this reader understands
pub const MIN_FILE_VERSION: u32 = 1;

/// Newest storage file version this reader understands
pub const MAX_FILE_VERSION: u32 = 2;

/// First version whose package nodes carry a fingerprint
pub const FINGERPRINT_FILE_VERSION: u32 = 2;

/// Chain terminator written by the compiler
const NO_NODE: u32 = 0;

/// Chain terminator as a signed `-1`
const NO_NODE_SIGNED: u32 = u32::MAX;

// =============================================================================
// File Types
// =============================================================================

/// Kind of storage file, stored as the byte after the container name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum StorageFileType {
    PackageMap = 0,
    FlagMap = 1,
    FlagVal = 2,
    FlagInfo = 3,
}

impl TryFrom<u8> for StorageFileType {
    type Error = FlagStoreError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::PackageMap),
            1 => Ok(Self::FlagMap),
            2 => Ok(Self::FlagVal),
            3 => Ok(Self::FlagInfo),
            _ => Err(FlagStoreError::MalformedHeader(format!(
                "Unknown storage file type: {}",
                value
            ))),
        }
    }
}

impl std::fmt::Display for StorageFileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PackageMap => "package_map",
            Self::FlagMap => "flag_map",
            Self::FlagVal => "flag_val",
            Self::FlagInfo => "flag_info",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Hashing
// =============================================================================

/// Bucket a key lands in for a table with `num_buckets` buckets
///
/// Uses SipHash-1-3 over the key followed by a `0xFF` terminator, the same
/// construction the table compiler uses when laying out buckets.
pub fn bucket_index(key: &[u8], num_buckets: u32) -> u32 {
    (SipHasher13::hash(key) % u64::from(num_buckets)) as u32
}

/// Decode a bucket slot or `next_offset` field into a node position
pub(crate) fn node_offset(raw: u32) -> Option<u32> {
    match raw {
        NO_NODE | NO_NODE_SIGNED => None,
        offset => Some(offset),
    }
}

// =============================================================================
// Byte Cursor
// =============================================================================

/// Bounds-checked little-endian cursor over a storage buffer
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                FlagStoreError::InvalidStorageFileOffset(format!(
                    "Read of {} bytes at offset {} exceeds buffer length {}",
                    len,
                    self.pos,
                    self.buf.len()
                ))
            })?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    /// Length-prefixed raw bytes, borrowed from the buffer
    pub(crate) fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    /// Length-prefixed UTF-8 string, borrowed from the buffer
    pub(crate) fn read_str(&mut self) -> Result<&'a str> {
        let at = self.pos;
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes).map_err(|e| {
            FlagStoreError::InvalidStorageFileOffset(format!(
                "String at offset {} is not valid UTF-8: {}",
                at, e
            ))
        })
    }
}

/// Check that a chain pointer lands inside the node region
pub(crate) fn check_node_offset(offset: u32, node_offset: u32, file_size: u32) -> Result<usize> {
    if offset < node_offset || offset >= file_size {
        return Err(FlagStoreError::InvalidStorageFileOffset(format!(
            "Node offset {} outside node region [{}, {})",
            offset, node_offset, file_size
        )));
    }
    Ok(offset as usize)
}
