//! Tests for the reader session on hand-built files

use std::io::Cursor;

use crate::extractor::control::TransferControl;
use crate::extractor::region::Region;
use crate::tiff::constants::tags;
use crate::tiff::errors::TiffError;
use crate::tiff::reader::TiffReader;
use super::test_utils::{create_test_bigtiff_buffer, create_test_tiff_buffer, test_pixels, CLASSIC_NEXT_POINTER};

#[test]
fn test_read_classic_file() {
    let mut reader = TiffReader::open(create_test_tiff_buffer()).unwrap();
    assert!(!reader.is_big_tiff());
    assert_eq!(reader.layer_count().unwrap(), 1);

    let ifd = reader.directory(0).unwrap();
    assert_eq!(ifd.get_dimensions(), Some((4, 2)));
    assert_eq!(ifd.get_entry(tags::SOFTWARE).and_then(|e| e.value.as_ascii()), Some("tiffkit"));
    assert_eq!(ifd.next_ifd_offset, 0);
    assert_eq!(ifd.next_ifd_pointer_position, CLASSIC_NEXT_POINTER as u64);

    let decoded = reader.read_layer(0, &TransferControl::none()).unwrap();
    assert_eq!((decoded.width, decoded.height), (4, 2));
    assert_eq!(decoded.data, test_pixels());
}

#[test]
fn test_read_bigtiff_file() {
    let mut reader = TiffReader::open(create_test_bigtiff_buffer()).unwrap();
    assert!(reader.is_big_tiff());

    let ifd = reader.directory(0).unwrap();
    assert_eq!(ifd.get_entry(tags::SOFTWARE).and_then(|e| e.value.as_ascii()), Some("tiffkit big"));
    assert_eq!(ifd.get_tag_value(tags::ROWS_PER_STRIP), Some(2));

    let region = reader.read_region(0, &Region::new(1, 0, 2, 2), &TransferControl::none()).unwrap();
    assert_eq!(region.data, vec![1, 2, 5, 6]);
}

#[test]
fn test_missing_layer_is_out_of_range() {
    let mut reader = TiffReader::open(create_test_tiff_buffer()).unwrap();
    assert!(matches!(reader.directory(1), Err(TiffError::IndexOutOfRange(_))));
    // The session stays usable
    assert!(reader.select_layer(0).is_ok());
    assert!(reader.select_layer(0).is_ok());
    assert_eq!(reader.current_layer(), Some(0));
}

#[test]
fn test_directory_loop_is_corrupt() {
    let mut bytes = create_test_tiff_buffer().into_inner();
    bytes[CLASSIC_NEXT_POINTER..CLASSIC_NEXT_POINTER + 4].copy_from_slice(&8u32.to_le_bytes());

    let mut reader = TiffReader::open(Cursor::new(bytes)).unwrap();
    assert!(reader.directory(0).is_ok());
    assert!(matches!(reader.layer_count(), Err(TiffError::CorruptData(_))));
}

#[test]
fn test_implausible_entry_count_is_corrupt() {
    let mut bytes = create_test_tiff_buffer().into_inner();
    bytes[8..10].copy_from_slice(&60000u16.to_le_bytes());

    let mut reader = TiffReader::open(Cursor::new(bytes)).unwrap();
    assert!(matches!(reader.directory(0), Err(TiffError::CorruptData(_))));
}

#[test]
fn test_unknown_field_type_is_unsupported() {
    let mut bytes = create_test_tiff_buffer().into_inner();
    // Type field of the first entry
    bytes[12..14].copy_from_slice(&99u16.to_le_bytes());

    let mut reader = TiffReader::open(Cursor::new(bytes)).unwrap();
    assert!(matches!(reader.directory(0), Err(TiffError::UnsupportedFormat(_))));
}

#[test]
fn test_bad_header_is_rejected() {
    let mut bytes = create_test_tiff_buffer().into_inner();
    bytes[2] = 41;
    assert!(matches!(TiffReader::open(Cursor::new(bytes)), Err(TiffError::InvalidHeader(_))));
}

#[test]
fn test_truncated_strip_is_corrupt() {
    let mut bytes = create_test_tiff_buffer().into_inner();
    bytes.truncate(bytes.len() - 3);

    let mut reader = TiffReader::open(Cursor::new(bytes)).unwrap();
    let result = reader.read_layer(0, &TransferControl::none());
    assert!(matches!(result, Err(TiffError::CorruptData(_))));
}
