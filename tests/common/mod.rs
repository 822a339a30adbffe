//! Shared fixtures for flagstore tests
//!
//! Encodes storage files the way the table compiler lays them out, plus the
//! "mockup" container used across the suites.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use flagstore::format::{bucket_index, StorageFileType, StoredFlagType};
use flagstore::StorageConfig;
use tempfile::TempDir;

// =============================================================================
// Fixture Descriptions
// =============================================================================

pub const CONTAINER: &str = "mockup";

pub const TEST_1: &str = "com.android.aconfig.storage.test_1";
pub const TEST_2: &str = "com.android.aconfig.storage.test_2";
pub const TEST_4: &str = "com.android.aconfig.storage.test_4";

#[derive(Debug, Clone)]
pub struct PackageFixture {
    pub name: &'static str,
    pub id: u32,
    pub fingerprint: u64,
    pub boolean_start_index: u32,
}

#[derive(Debug, Clone)]
pub struct FlagFixture {
    pub package_id: u32,
    pub name: &'static str,
    pub flag_type: StoredFlagType,
    pub flag_index: u16,
}

fn package(name: &'static str, id: u32, fingerprint: u64, start: u32) -> PackageFixture {
    PackageFixture {
        name,
        id,
        fingerprint,
        boolean_start_index: start,
    }
}

fn flag(package_id: u32, name: &'static str, flag_type: StoredFlagType, index: u16) -> FlagFixture {
    FlagFixture {
        package_id,
        name,
        flag_type,
        flag_index: index,
    }
}

pub fn mockup_packages() -> Vec<PackageFixture> {
    vec![
        package(TEST_1, 0, 0x1c3a_91f4_0b2d_7e65, 0),
        package(TEST_2, 1, 0x8f02_55ae_c4d1_3390, 3),
        package(TEST_4, 2, 0x47b9_e0c2_6a18_f5d3, 6),
    ]
}

pub fn mockup_flags() -> Vec<FlagFixture> {
    use StoredFlagType::*;
    vec![
        flag(0, "disabled_rw", ReadWriteBoolean, 0),
        flag(0, "enabled_ro", ReadOnlyBoolean, 1),
        flag(0, "enabled_rw", ReadWriteBoolean, 2),
        flag(1, "disabled_rw", ReadWriteBoolean, 0),
        flag(1, "enabled_fixed_ro", FixedReadOnlyBoolean, 1),
        flag(1, "enabled_ro", ReadOnlyBoolean, 2),
        flag(2, "enabled_fixed_ro", FixedReadOnlyBoolean, 0),
        flag(2, "enabled_rw", ReadWriteBoolean, 1),
    ]
}

pub const MOCKUP_VALUES: [bool; 8] = [false, true, true, false, true, true, true, true];

/// Attribute bytes: read-write flags carry bit 0
pub fn mockup_attributes() -> Vec<u8> {
    mockup_flags()
        .iter()
        .map(|f| u8::from(f.flag_type == StoredFlagType::ReadWriteBoolean))
        .collect()
}

// =============================================================================
// Encoders
// =============================================================================

const TABLE_PRIMES: [u32; 8] = [7, 17, 29, 53, 97, 193, 389, 769];

/// Bucket count for `entries` keys at a load factor of one half
pub fn table_size(entries: usize) -> u32 {
    TABLE_PRIMES
        .iter()
        .copied()
        .find(|&p| p as usize >= entries * 2)
        .expect("fixture too large")
}

fn push_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

/// Common header plus `trailer`, with the file size left as a placeholder
fn header_bytes(
    version: u32,
    container: &str,
    file_type: StorageFileType,
    trailer: &[u32],
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&version.to_le_bytes());
    push_str(&mut out, container);
    out.push(file_type as u8);
    out.extend_from_slice(&0u32.to_le_bytes());
    for field in trailer {
        out.extend_from_slice(&field.to_le_bytes());
    }
    out
}

/// Position of the file size field for a given container name
fn file_size_pos(container: &str) -> usize {
    4 + 4 + container.len() + 1
}

fn patch_u32(out: &mut [u8], pos: usize, value: u32) {
    out[pos..pos + 4].copy_from_slice(&value.to_le_bytes());
}

fn finish(mut out: Vec<u8>, container: &str) -> Vec<u8> {
    let size = out.len() as u32;
    patch_u32(&mut out, file_size_pos(container), size);
    out
}

/// Lay out a bucketed table: nodes sorted by bucket, chained within a bucket
fn hash_table_bytes(
    version: u32,
    container: &str,
    file_type: StorageFileType,
    keys: Vec<(u32, Vec<u8>)>,
    encode_node: impl Fn(usize, Option<u32>) -> Vec<u8>,
) -> Vec<u8> {
    let num_entries = keys.len();
    let num_buckets = table_size(num_entries);

    let mut order: Vec<(u32, usize)> = keys
        .iter()
        .map(|(_, key)| bucket_index(key, num_buckets))
        .zip(0..num_entries)
        .collect();
    order.sort_by_key(|&(bucket, _)| bucket);

    let header = header_bytes(version, container, file_type, &[num_entries as u32, 0, 0]);
    let bucket_offset = header.len() as u32;
    let node_offset = bucket_offset + num_buckets * 4;

    // Sizes do not depend on next_offset, so offsets can be computed first
    let sizes: Vec<u32> = order
        .iter()
        .map(|&(_, i)| encode_node(i, None).len() as u32)
        .collect();
    let mut offsets = Vec::with_capacity(order.len());
    let mut cursor = node_offset;
    for size in &sizes {
        offsets.push(cursor);
        cursor += size;
    }

    let mut buckets = vec![0u32; num_buckets as usize];
    let mut nodes = Vec::new();
    for (pos, &(bucket, i)) in order.iter().enumerate() {
        if buckets[bucket as usize] == 0 {
            buckets[bucket as usize] = offsets[pos];
        }
        let next = order
            .get(pos + 1)
            .filter(|&&(next_bucket, _)| next_bucket == bucket)
            .map(|_| offsets[pos + 1]);
        nodes.extend_from_slice(&encode_node(i, next));
    }

    let mut out = header;
    let trailer = file_size_pos(container) + 4;
    patch_u32(&mut out, trailer + 4, bucket_offset);
    patch_u32(&mut out, trailer + 8, node_offset);
    for bucket in buckets {
        out.extend_from_slice(&bucket.to_le_bytes());
    }
    out.extend_from_slice(&nodes);
    finish(out, container)
}

pub fn package_map_bytes(version: u32, container: &str, packages: &[PackageFixture]) -> Vec<u8> {
    let keys = packages
        .iter()
        .map(|p| (p.id, p.name.as_bytes().to_vec()))
        .collect();
    hash_table_bytes(version, container, StorageFileType::PackageMap, keys, |i, next| {
        let p = &packages[i];
        let mut node = Vec::new();
        push_str(&mut node, p.name);
        node.extend_from_slice(&p.id.to_le_bytes());
        if version >= 2 {
            node.extend_from_slice(&p.fingerprint.to_le_bytes());
        }
        node.extend_from_slice(&p.boolean_start_index.to_le_bytes());
        node.extend_from_slice(&next.unwrap_or(0).to_le_bytes());
        node
    })
}

pub fn flag_map_bytes(version: u32, container: &str, flags: &[FlagFixture]) -> Vec<u8> {
    let keys = flags
        .iter()
        .map(|f| {
            let key = format!("{}/{}", f.package_id, f.name);
            (f.package_id, key.into_bytes())
        })
        .collect();
    hash_table_bytes(version, container, StorageFileType::FlagMap, keys, |i, next| {
        let f = &flags[i];
        let mut node = Vec::new();
        node.extend_from_slice(&f.package_id.to_le_bytes());
        push_str(&mut node, f.name);
        node.extend_from_slice(&(f.flag_type as u16).to_le_bytes());
        node.extend_from_slice(&f.flag_index.to_le_bytes());
        node.extend_from_slice(&next.unwrap_or(0).to_le_bytes());
        node
    })
}

/// Value-style file: header, count, data offset, one byte per flag
fn byte_list_bytes(
    version: u32,
    container: &str,
    file_type: StorageFileType,
    data: &[u8],
) -> Vec<u8> {
    let mut out = header_bytes(version, container, file_type, &[data.len() as u32, 0]);
    let data_offset = out.len() as u32;
    let trailer = file_size_pos(container) + 4;
    patch_u32(&mut out, trailer + 4, data_offset);
    out.extend_from_slice(data);
    finish(out, container)
}

pub fn flag_val_bytes(version: u32, container: &str, values: &[bool]) -> Vec<u8> {
    let data: Vec<u8> = values.iter().map(|&v| u8::from(v)).collect();
    byte_list_bytes(version, container, StorageFileType::FlagVal, &data)
}

pub fn flag_info_bytes(version: u32, container: &str, attributes: &[u8]) -> Vec<u8> {
    byte_list_bytes(version, container, StorageFileType::FlagInfo, attributes)
}

pub fn mockup_package_map(version: u32) -> Vec<u8> {
    package_map_bytes(version, CONTAINER, &mockup_packages())
}

pub fn mockup_flag_map(version: u32) -> Vec<u8> {
    flag_map_bytes(version, CONTAINER, &mockup_flags())
}

pub fn mockup_flag_val(version: u32) -> Vec<u8> {
    flag_val_bytes(version, CONTAINER, &MOCKUP_VALUES)
}

pub fn mockup_flag_info(version: u32) -> Vec<u8> {
    flag_info_bytes(version, CONTAINER, &mockup_attributes())
}

// =============================================================================
// On-Disk Layouts
// =============================================================================

/// Temporary storage tree with legacy and consolidated roots
pub struct TestStorage {
    _temp: TempDir,
    pub map_root: PathBuf,
    pub boot_root: PathBuf,
    pub consolidated_root: PathBuf,
}

impl TestStorage {
    /// Empty roots; nothing written yet
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let map_root = temp.path().join("maps");
        let boot_root = temp.path().join("boot");
        let consolidated_root = temp.path().join("containers");
        fs::create_dir_all(&map_root).unwrap();
        fs::create_dir_all(&boot_root).unwrap();
        fs::create_dir_all(&consolidated_root).unwrap();
        Self {
            _temp: temp,
            map_root,
            boot_root,
            consolidated_root,
        }
    }

    /// Legacy layout holding the mockup container at `version`
    pub fn with_legacy_mockup(version: u32) -> Self {
        let storage = Self::new();
        storage.write_legacy(CONTAINER, version, true);
        storage
    }

    pub fn write_legacy(&self, container: &str, version: u32, with_info: bool) {
        let map = |ext: &str| self.map_root.join(format!("{}.{}", container, ext));
        let boot = |ext: &str| self.boot_root.join(format!("{}.{}", container, ext));

        let package_map = retag(mockup_package_map(version), container);
        let flag_map = retag(mockup_flag_map(version), container);
        let flag_val = retag(mockup_flag_val(version), container);

        write(&map("package.map"), &package_map);
        write(&map("flag.map"), &flag_map);
        write(&boot("val"), &flag_val);
        if with_info {
            write(&boot("info"), &retag(mockup_flag_info(version), container));
        }
    }

    pub fn write_consolidated(&self, container: &str, version: u32) {
        let dir = self.consolidated_root.join(container);
        fs::create_dir_all(&dir).unwrap();
        let package_map = retag(mockup_package_map(version), container);
        let flag_map = retag(mockup_flag_map(version), container);
        let flag_val = retag(mockup_flag_val(version), container);

        write(&dir.join("package.map"), &package_map);
        write(&dir.join("flag.map"), &flag_map);
        write(&dir.join("flag.val"), &flag_val);
    }

    pub fn config(&self) -> StorageConfig {
        StorageConfig::builder()
            .map_root(&self.map_root)
            .boot_root(&self.boot_root)
            .consolidated_root(&self.consolidated_root)
            .build()
    }
}

fn write(path: &Path, bytes: &[u8]) {
    fs::write(path, bytes).unwrap();
}

/// Re-encode a mockup file under another container name
///
/// The container name only lives in the header, but every offset after it
/// shifts, so the file is rebuilt rather than patched.
fn retag(bytes: Vec<u8>, container: &str) -> Vec<u8> {
    if container == CONTAINER {
        return bytes;
    }
    let version = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    match bytes[file_size_pos(CONTAINER) - 1] {
        0 => package_map_bytes(version, container, &mockup_packages()),
        1 => flag_map_bytes(version, container, &mockup_flags()),
        2 => flag_val_bytes(version, container, &MOCKUP_VALUES),
        _ => flag_info_bytes(version, container, &mockup_attributes()),
    }
}

/// Route tracing output through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
