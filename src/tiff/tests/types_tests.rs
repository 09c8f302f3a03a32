//! Tests for the TIFF types module

use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::tags;
use crate::tiff::header::TiffVariant;
use crate::tiff::ifd::IFD;
use crate::tiff::types::TIFF;
use crate::tiff::value::TagValue;

#[test]
fn test_tiff_creation() {
    let tiff = TIFF::new(TiffVariant::Classic, ByteOrder::LittleEndian);
    assert!(!tiff.is_big_tiff());
    assert_eq!(tiff.ifd_count(), 0);
    assert!(tiff.main_ifd().is_none());
}

#[test]
fn test_tiff_with_ifds() {
    let mut tiff = TIFF::new(TiffVariant::Big, ByteOrder::BigEndian);

    // Create main IFD
    let mut main_ifd = IFD::new(0, 16);
    main_ifd.set(tags::IMAGE_WIDTH, TagValue::Long(vec![1024]));
    main_ifd.set(tags::IMAGE_LENGTH, TagValue::Long(vec![768]));
    tiff.ifds.push(main_ifd);

    // Create an overview IFD (subfile type 1)
    let mut overview_ifd = IFD::new(1, 100);
    overview_ifd.set(tags::NEW_SUBFILE_TYPE, TagValue::Long(vec![1]));
    overview_ifd.set(tags::IMAGE_WIDTH, TagValue::Long(vec![512]));
    overview_ifd.set(tags::IMAGE_LENGTH, TagValue::Long(vec![384]));
    tiff.ifds.push(overview_ifd);

    // A page, not an overview
    let mut page_ifd = IFD::new(2, 200);
    page_ifd.set(tags::NEW_SUBFILE_TYPE, TagValue::Long(vec![2]));
    tiff.ifds.push(page_ifd);

    assert!(tiff.is_big_tiff());
    assert_eq!(tiff.ifd_count(), 3);
    assert_eq!(tiff.main_ifd().and_then(|ifd| ifd.get_dimensions()), Some((1024, 768)));

    let overviews = tiff.overviews();
    assert_eq!(overviews.len(), 1);
    assert_eq!(overviews[0].get_dimensions(), Some((512, 384)));

    let text = tiff.to_string();
    assert!(text.contains("BigTIFF"));
    assert!(text.contains("Overviews: 1"));
}
