//! Flag Table
//!
//! Hash table from `(package id, flag name)` to the flag's index within its
//! package. The hashed key is `"{package_id}/{flag_name}"`.
//!
//! ## Node Layout
//! ```text
//! [PackageId u32][NameLen u32][Name][FlagType u16][FlagIndex u16][Next u32]
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{FlagStoreError, Result};

use super::header::{check_region, malformed};
use super::{
    bucket_index, check_node_offset, node_offset, ByteReader, StorageFileType, StorageHeader,
};

/// How a flag was declared, as recorded by the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum StoredFlagType {
    ReadWriteBoolean = 0,
    ReadOnlyBoolean = 1,
    FixedReadOnlyBoolean = 2,
}

impl TryFrom<u16> for StoredFlagType {
    type Error = FlagStoreError;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Self::ReadWriteBoolean),
            1 => Ok(Self::ReadOnlyBoolean),
            2 => Ok(Self::FixedReadOnlyBoolean),
            other => Err(FlagStoreError::UnknownFlagType(other)),
        }
    }
}

/// Flag map header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagTableHeader {
    pub version: u32,
    pub container: String,
    pub file_type: StorageFileType,
    pub file_size: u32,
    pub num_flags: u32,
    pub bucket_offset: u32,
    pub node_offset: u32,
}

impl FlagTableHeader {
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::at(buf, 0);
        let common =
            StorageHeader::read_expecting(&mut reader, buf.len(), StorageFileType::FlagMap)?;
        let num_flags = reader.read_u32().map_err(malformed)?;
        let bucket_offset = reader.read_u32().map_err(malformed)?;
        let node_offset = reader.read_u32().map_err(malformed)?;

        check_region(
            "bucket",
            reader.position(),
            bucket_offset,
            node_offset,
            common.file_size,
        )?;

        Ok(Self {
            version: common.version,
            container: common.container,
            file_type: common.file_type,
            file_size: common.file_size,
            num_flags,
            bucket_offset,
            node_offset,
        })
    }

    pub fn num_buckets(&self) -> u32 {
        (self.node_offset - self.bucket_offset) / 4
    }
}

/// One flag record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagTableNode {
    pub package_id: u32,
    pub flag_name: String,
    pub flag_type: StoredFlagType,
    /// Index local to the package; global index is `boolean_start_index + flag_index`
    pub flag_index: u16,
    pub next_offset: Option<u32>,
}

struct RawFlagNode<'a> {
    package_id: u32,
    flag_name: &'a str,
    flag_type: u16,
    flag_index: u16,
    next_offset: Option<u32>,
    end: usize,
}

impl<'a> RawFlagNode<'a> {
    fn parse(buf: &'a [u8], pos: usize) -> Result<Self> {
        let mut reader = ByteReader::at(buf, pos);
        let package_id = reader.read_u32()?;
        let flag_name = reader.read_str()?;
        let flag_type = reader.read_u16()?;
        let flag_index = reader.read_u16()?;
        let next_offset = node_offset(reader.read_u32()?);

        Ok(Self {
            package_id,
            flag_name,
            flag_type,
            flag_index,
            next_offset,
            end: reader.position(),
        })
    }

    fn to_node(&self) -> Result<FlagTableNode> {
        Ok(FlagTableNode {
            package_id: self.package_id,
            flag_name: self.flag_name.to_string(),
            flag_type: StoredFlagType::try_from(self.flag_type)?,
            flag_index: self.flag_index,
            next_offset: self.next_offset,
        })
    }
}

/// Bytes hashed to place a flag in its bucket
pub(crate) fn flag_key(package_id: u32, flag_name: &str) -> String {
    format!("{}/{}", package_id, flag_name)
}

/// Read-only flag map over an immutable buffer
#[derive(Debug, Clone)]
pub struct FlagTable {
    header: FlagTableHeader,
    bytes: Bytes,
}

impl FlagTable {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        let header = FlagTableHeader::from_bytes(&bytes)?;
        Ok(Self { header, bytes })
    }

    pub fn header(&self) -> &FlagTableHeader {
        &self.header
    }

    pub fn container(&self) -> &str {
        &self.header.container
    }

    /// Look up a flag by owning package id and name
    ///
    /// Absence is `Ok(None)`; a broken chain is an error.
    pub fn get(&self, package_id: u32, flag_name: &str) -> Result<Option<FlagTableNode>> {
        let num_buckets = self.header.num_buckets();
        if num_buckets == 0 {
            return Ok(None);
        }

        let key = flag_key(package_id, flag_name);
        let bucket = bucket_index(key.as_bytes(), num_buckets);
        let slot = self.header.bucket_offset as usize + bucket as usize * 4;
        let mut next = node_offset(ByteReader::at(&self.bytes, slot).read_u32()?);

        let mut steps = 0u32;
        while let Some(offset) = next {
            steps += 1;
            if steps > self.header.num_flags {
                return Err(FlagStoreError::InvalidStorageFileOffset(format!(
                    "Flag chain in bucket {} is longer than the {} flags in the file",
                    bucket, self.header.num_flags
                )));
            }

            let pos = check_node_offset(offset, self.header.node_offset, self.header.file_size)?;
            let node = RawFlagNode::parse(&self.bytes, pos)?;
            if node.package_id == package_id && node.flag_name == flag_name {
                return node.to_node().map(Some);
            }
            next = node.next_offset;
        }

        Ok(None)
    }

    /// Walk every node in file order
    pub fn iter(&self) -> FlagTableIter<'_> {
        FlagTableIter {
            table: self,
            pos: self.header.node_offset as usize,
            done: false,
        }
    }
}

/// Sequential iterator over the node region of a flag map
pub struct FlagTableIter<'a> {
    table: &'a FlagTable,
    pos: usize,
    done: bool,
}

impl<'a> Iterator for FlagTableIter<'a> {
    type Item = Result<FlagTableNode>;

    fn next(&mut self) -> Option<Self::Item> {
        let table = self.table;
        if self.done || self.pos >= table.header.file_size as usize {
            return None;
        }

        let parsed = RawFlagNode::parse(&table.bytes, self.pos).and_then(|node| {
            self.pos = node.end;
            node.to_node()
        });
        if parsed.is_err() {
            self.done = true;
        }
        Some(parsed)
    }
}
