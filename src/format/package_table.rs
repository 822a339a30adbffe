//! Package Table
//!
//! Hash table from package name to package id, boolean start index and
//! fingerprint.
//!
//! ## Node Layout
//! ```text
//! v1: [NameLen u32][Name][PackageId u32][BooleanStart u32][Next u32]
//! v2: [NameLen u32][Name][PackageId u32][Fingerprint u64][BooleanStart u32][Next u32]
//! ```

use bytes::Bytes;
use serde::Serialize;

use crate::error::{FlagStoreError, Result};

use super::header::{check_region, malformed};
use super::{
    bucket_index, check_node_offset, node_offset, ByteReader, StorageFileType, StorageHeader,
    FINGERPRINT_FILE_VERSION,
};

/// Package map header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageTableHeader {
    pub version: u32,
    pub container: String,
    pub file_type: StorageFileType,
    pub file_size: u32,
    pub num_packages: u32,
    pub bucket_offset: u32,
    pub node_offset: u32,
}

impl PackageTableHeader {
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::at(buf, 0);
        let common =
            StorageHeader::read_expecting(&mut reader, buf.len(), StorageFileType::PackageMap)?;
        let num_packages = reader.read_u32().map_err(malformed)?;
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
            num_packages,
            bucket_offset,
            node_offset,
        })
    }

    /// Bucket count, fixed by the compiler and derived from the offsets
    pub fn num_buckets(&self) -> u32 {
        (self.node_offset - self.bucket_offset) / 4
    }
}

/// One package record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageTableNode {
    pub package_name: String,
    pub package_id: u32,
    /// Build-time hash over the package's flag set; 0 in v1 files
    pub fingerprint: u64,
    pub boolean_start_index: u32,
    pub next_offset: Option<u32>,
}

/// Package record borrowed from the mapped buffer
struct RawPackageNode<'a> {
    package_name: &'a str,
    package_id: u32,
    fingerprint: u64,
    boolean_start_index: u32,
    next_offset: Option<u32>,
    /// Position just past this record
    end: usize,
}

impl<'a> RawPackageNode<'a> {
    fn parse(buf: &'a [u8], pos: usize, version: u32) -> Result<Self> {
        let mut reader = ByteReader::at(buf, pos);
        let package_name = reader.read_str()?;
        let package_id = reader.read_u32()?;
        let fingerprint = if version >= FINGERPRINT_FILE_VERSION {
            reader.read_u64()?
        } else {
            0
        };
        let boolean_start_index = reader.read_u32()?;
        let next_offset = node_offset(reader.read_u32()?);

        Ok(Self {
            package_name,
            package_id,
            fingerprint,
            boolean_start_index,
            next_offset,
            end: reader.position(),
        })
    }

    fn to_node(&self) -> PackageTableNode {
        PackageTableNode {
            package_name: self.package_name.to_string(),
            package_id: self.package_id,
            fingerprint: self.fingerprint,
            boolean_start_index: self.boolean_start_index,
            next_offset: self.next_offset,
        }
    }
}

/// Read-only package map over an immutable buffer
#[derive(Debug, Clone)]
pub struct PackageTable {
    header: PackageTableHeader,
    bytes: Bytes,
}

impl PackageTable {
    /// Validate the header and wrap the buffer; nodes are parsed lazily
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        let header = PackageTableHeader::from_bytes(&bytes)?;
        Ok(Self { header, bytes })
    }

    pub fn header(&self) -> &PackageTableHeader {
        &self.header
    }

    pub fn container(&self) -> &str {
        &self.header.container
    }

    /// Whether package nodes in this file carry a real fingerprint
    pub fn has_fingerprint(&self) -> bool {
        self.header.version >= FINGERPRINT_FILE_VERSION
    }

    /// Look up a package by name
    ///
    /// Returns:
    /// - `Ok(Some(node))` — package present
    /// - `Ok(None)` — package absent
    /// - `Err(..)` — a chain pointer leaves the node region or loops
    pub fn get(&self, package_name: &str) -> Result<Option<PackageTableNode>> {
        let num_buckets = self.header.num_buckets();
        if num_buckets == 0 {
            return Ok(None);
        }

        let bucket = bucket_index(package_name.as_bytes(), num_buckets);
        let slot = self.header.bucket_offset as usize + bucket as usize * 4;
        let mut next = node_offset(ByteReader::at(&self.bytes, slot).read_u32()?);

        let mut steps = 0u32;
        while let Some(offset) = next {
            steps += 1;
            if steps > self.header.num_packages {
                return Err(FlagStoreError::InvalidStorageFileOffset(format!(
                    "Package chain in bucket {} is longer than the {} packages in the file",
                    bucket, self.header.num_packages
                )));
            }

            let pos = check_node_offset(offset, self.header.node_offset, self.header.file_size)?;
            let node = RawPackageNode::parse(&self.bytes, pos, self.header.version)?;
            if node.package_name == package_name {
                return Ok(Some(node.to_node()));
            }
            next = node.next_offset;
        }

        Ok(None)
    }

    /// Walk every node in file order
    pub fn iter(&self) -> PackageTableIter<'_> {
        PackageTableIter {
            table: self,
            pos: self.header.node_offset as usize,
            done: false,
        }
    }
}

/// Sequential iterator over the node region of a package map
pub struct PackageTableIter<'a> {
    table: &'a PackageTable,
    pos: usize,
    done: bool,
}

impl<'a> Iterator for PackageTableIter<'a> {
    type Item = Result<PackageTableNode>;

    fn next(&mut self) -> Option<Self::Item> {
        let table = self.table;
        if self.done || self.pos >= table.header.file_size as usize {
            return None;
        }

        match RawPackageNode::parse(&table.bytes, self.pos, table.header.version) {
            Ok(node) => {
                self.pos = node.end;
                Some(Ok(node.to_node()))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
