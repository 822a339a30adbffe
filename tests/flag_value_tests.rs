//! Tests for flag value and flag info lists
//!
//! These tests verify:
//! - Reference values by global index
//! - Out-of-range indices are errors
//! - Attribute bits decode from the info list

mod common;

use common::*;
use flagstore::format::{FlagAttributes, FlagInfoList, FlagValueList};
use flagstore::FlagStoreError;

// =============================================================================
// Flag Value Tests
// =============================================================================

#[test]
fn test_reference_values() {
    let list = FlagValueList::from_bytes(mockup_flag_val(1)).unwrap();

    assert_eq!(list.size(), 8);
    for (index, expected) in MOCKUP_VALUES.iter().enumerate() {
        assert_eq!(
            list.get(index as u32).unwrap(),
            *expected,
            "index {}",
            index
        );
    }
}

#[test]
fn test_values_iterator() {
    let list = FlagValueList::from_bytes(mockup_flag_val(2)).unwrap();
    let values: Vec<bool> = list.values().collect();

    assert_eq!(values, MOCKUP_VALUES.to_vec());
}

#[test]
fn test_index_out_of_range() {
    let list = FlagValueList::from_bytes(mockup_flag_val(1)).unwrap();

    for index in [8u32, 9, u32::MAX] {
        let result = list.get(index);
        assert!(matches!(
            result,
            Err(FlagStoreError::InvalidStorageFileOffset(_))
        ));
    }
}

#[test]
fn test_only_one_is_true() {
    let mut bytes = mockup_flag_val(1);
    // 27 is the first value byte
    bytes[27] = 2;
    let list = FlagValueList::from_bytes(bytes).unwrap();

    assert!(!list.get(0).unwrap());
}

#[test]
fn test_empty_value_list() {
    let list = FlagValueList::from_bytes(flag_val_bytes(1, "empty", &[])).unwrap();

    assert_eq!(list.size(), 0);
    assert!(list.get(0).is_err());
    assert_eq!(list.values().count(), 0);
}

#[test]
fn test_value_list_rejects_other_file_types() {
    let result = FlagValueList::from_bytes(mockup_flag_info(1));
    assert!(matches!(result, Err(FlagStoreError::MalformedHeader(_))));
}

// =============================================================================
// Flag Info Tests
// =============================================================================

#[test]
fn test_reference_attributes() {
    let list = FlagInfoList::from_bytes(mockup_flag_info(1)).unwrap();

    assert_eq!(list.size(), 8);
    // disabled_rw, enabled_ro, enabled_rw of test_1
    assert_eq!(list.get(0).unwrap(), FlagAttributes::IS_READ_WRITE);
    assert_eq!(list.get(1).unwrap(), FlagAttributes::empty());
    assert_eq!(list.get(2).unwrap(), FlagAttributes::IS_READ_WRITE);
    // enabled_fixed_ro of test_4
    assert_eq!(list.get(6).unwrap(), FlagAttributes::empty());
}

#[test]
fn test_attribute_bits() {
    let attributes = [0b001u8, 0b011, 0b101, 0b1000_0100];
    let list = FlagInfoList::from_bytes(flag_info_bytes(1, CONTAINER, &attributes)).unwrap();

    assert_eq!(
        list.get(1).unwrap(),
        FlagAttributes::IS_READ_WRITE | FlagAttributes::HAS_SERVER_OVERRIDE
    );
    assert!(list.get(2).unwrap().contains(FlagAttributes::HAS_LOCAL_OVERRIDE));
    // Unknown high bits are dropped
    assert_eq!(list.get(3).unwrap(), FlagAttributes::HAS_LOCAL_OVERRIDE);
}

#[test]
fn test_info_index_out_of_range() {
    let list = FlagInfoList::from_bytes(mockup_flag_info(1)).unwrap();

    let result = list.get(8);
    assert!(matches!(
        result,
        Err(FlagStoreError::InvalidStorageFileOffset(_))
    ));
}
