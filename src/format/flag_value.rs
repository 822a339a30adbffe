//! Flag Value List
//!
//! Boolean flag values, one byte each, addressed by global flag index.

use bytes::Bytes;
use serde::Serialize;

use crate::error::{FlagStoreError, Result};

use super::header::{check_region, malformed};
use super::{ByteReader, StorageFileType, StorageHeader};

/// Flag value file header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagValueHeader {
    pub version: u32,
    pub container: String,
    pub file_type: StorageFileType,
    pub file_size: u32,
    pub num_flags: u32,
    pub boolean_value_offset: u32,
}

impl FlagValueHeader {
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::at(buf, 0);
        let common =
            StorageHeader::read_expecting(&mut reader, buf.len(), StorageFileType::FlagVal)?;
        let num_flags = reader.read_u32().map_err(malformed)?;
        let boolean_value_offset = reader.read_u32().map_err(malformed)?;

        let values_end = boolean_value_offset.checked_add(num_flags).ok_or_else(|| {
            FlagStoreError::MalformedHeader(format!(
                "Value region {} + {} overflows",
                boolean_value_offset, num_flags
            ))
        })?;
        check_region(
            "boolean value",
            reader.position(),
            boolean_value_offset,
            values_end,
            common.file_size,
        )?;

        Ok(Self {
            version: common.version,
            container: common.container,
            file_type: common.file_type,
            file_size: common.file_size,
            num_flags,
            boolean_value_offset,
        })
    }
}

/// Read-only boolean value array over an immutable buffer
#[derive(Debug, Clone)]
pub struct FlagValueList {
    header: FlagValueHeader,
    bytes: Bytes,
}

impl FlagValueList {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        let header = FlagValueHeader::from_bytes(&bytes)?;
        Ok(Self { header, bytes })
    }

    pub fn header(&self) -> &FlagValueHeader {
        &self.header
    }

    pub fn container(&self) -> &str {
        &self.header.container
    }

    /// Number of flags in the list
    pub fn size(&self) -> u32 {
        self.header.num_flags
    }

    /// Value at a global flag index; fails outside `[0, size())`
    pub fn get(&self, index: u32) -> Result<bool> {
        if index >= self.header.num_flags {
            return Err(FlagStoreError::InvalidStorageFileOffset(format!(
                "Flag index {} beyond the {} flags in the value list",
                index, self.header.num_flags
            )));
        }

        // Header validation guarantees the whole value region is in bounds
        let pos = self.header.boolean_value_offset as usize + index as usize;
        Ok(self.bytes[pos] == 1)
    }

    /// All values in index order
    pub fn values(&self) -> impl Iterator<Item = bool> + '_ {
        let start = self.header.boolean_value_offset as usize;
        let end = start + self.header.num_flags as usize;
        self.bytes[start..end].iter().map(|&b| b == 1)
    }
}
