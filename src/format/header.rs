//! Common storage file header
//!
//! Parsed before anything else in a file; a declared size that disagrees
//! with the buffer length means the file is truncated or foreign.

use serde::Serialize;

use crate::error::{FlagStoreError, Result};

use super::{ByteReader, StorageFileType, MAX_FILE_VERSION, MIN_FILE_VERSION};

/// Fields shared by every storage file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageHeader {
    pub version: u32,
    pub container: String,
    pub file_type: StorageFileType,
    pub file_size: u32,
}

impl StorageHeader {
    /// Parse and validate the common header of any storage file
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::at(buf, 0);
        Self::read(&mut reader, buf.len())
    }

    /// Parse the common header, leaving `reader` at the type-specific trailer
    pub(crate) fn read(reader: &mut ByteReader<'_>, buf_len: usize) -> Result<Self> {
        let version = reader.read_u32().map_err(malformed)?;
        let container = reader.read_str().map_err(malformed)?.to_string();
        let file_type = StorageFileType::try_from(reader.read_u8().map_err(malformed)?)?;
        let file_size = reader.read_u32().map_err(malformed)?;

        if file_size as usize != buf_len {
            return Err(FlagStoreError::MalformedHeader(format!(
                "Declared file size {} does not match buffer length {}",
                file_size, buf_len
            )));
        }

        if !(MIN_FILE_VERSION..=MAX_FILE_VERSION).contains(&version) {
            return Err(FlagStoreError::UnsupportedVersion {
                found: version,
                max: MAX_FILE_VERSION,
            });
        }

        Ok(Self {
            version,
            container,
            file_type,
            file_size,
        })
    }

    /// Parse the common header and require a specific file type
    pub(crate) fn read_expecting(
        reader: &mut ByteReader<'_>,
        buf_len: usize,
        expected: StorageFileType,
    ) -> Result<Self> {
        let header = Self::read(reader, buf_len)?;
        if header.file_type != expected {
            return Err(FlagStoreError::MalformedHeader(format!(
                "Expected a {} file, found {}",
                expected, header.file_type
            )));
        }
        Ok(header)
    }
}

/// Reclassify a short read inside the header region
pub(crate) fn malformed(err: FlagStoreError) -> FlagStoreError {
    match err {
        FlagStoreError::InvalidStorageFileOffset(msg) => FlagStoreError::MalformedHeader(msg),
        other => other,
    }
}

/// Require `header_end <= start <= end <= file_size` for a table region
pub(crate) fn check_region(
    name: &str,
    header_end: usize,
    start: u32,
    end: u32,
    file_size: u32,
) -> Result<()> {
    if (start as usize) < header_end || start > end || end > file_size {
        return Err(FlagStoreError::MalformedHeader(format!(
            "Invalid {} region [{}, {}) for header ending at {} in file of {} bytes",
            name, start, end, header_end, file_size
        )));
    }
    Ok(())
}
