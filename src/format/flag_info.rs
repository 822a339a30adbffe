//! Flag Info List
//!
//! Per-flag attribute byte, indexed like the value list.

use bitflags::bitflags;
use bytes::Bytes;
use serde::Serialize;

use crate::error::{FlagStoreError, Result};

use super::header::{check_region, malformed};
use super::{ByteReader, StorageFileType, StorageHeader};

bitflags! {
    /// Attribute bits stored for each flag
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FlagAttributes: u8 {
        const IS_READ_WRITE = 1 << 0;
        const HAS_SERVER_OVERRIDE = 1 << 1;
        const HAS_LOCAL_OVERRIDE = 1 << 2;
    }
}

/// Flag info file header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagInfoHeader {
    pub version: u32,
    pub container: String,
    pub file_type: StorageFileType,
    pub file_size: u32,
    pub num_flags: u32,
    pub boolean_flag_offset: u32,
}

impl FlagInfoHeader {
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::at(buf, 0);
        let common =
            StorageHeader::read_expecting(&mut reader, buf.len(), StorageFileType::FlagInfo)?;
        let num_flags = reader.read_u32().map_err(malformed)?;
        let boolean_flag_offset = reader.read_u32().map_err(malformed)?;

        let end = boolean_flag_offset.checked_add(num_flags).ok_or_else(|| {
            FlagStoreError::MalformedHeader(format!(
                "Attribute region {} + {} overflows",
                boolean_flag_offset, num_flags
            ))
        })?;
        check_region(
            "attribute",
            reader.position(),
            boolean_flag_offset,
            end,
            common.file_size,
        )?;

        Ok(Self {
            version: common.version,
            container: common.container,
            file_type: common.file_type,
            file_size: common.file_size,
            num_flags,
            boolean_flag_offset,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FlagInfoList {
    header: FlagInfoHeader,
    bytes: Bytes,
}

impl FlagInfoList {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        let header = FlagInfoHeader::from_bytes(&bytes)?;
        Ok(Self { header, bytes })
    }

    pub fn header(&self) -> &FlagInfoHeader {
        &self.header
    }

    pub fn container(&self) -> &str {
        &self.header.container
    }

    pub fn size(&self) -> u32 {
        self.header.num_flags
    }

    /// Attributes at a global flag index; unknown bits are dropped
    pub fn get(&self, index: u32) -> Result<FlagAttributes> {
        if index >= self.header.num_flags {
            return Err(FlagStoreError::InvalidStorageFileOffset(format!(
                "Flag index {} beyond the {} flags in the info list",
                index, self.header.num_flags
            )));
        }

        let pos = self.header.boolean_flag_offset as usize + index as usize;
        Ok(FlagAttributes::from_bits_truncate(self.bytes[pos]))
    }
}
