use std::io::Cursor;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

/// File position of the next-IFD pointer in `create_test_tiff_buffer`
pub const CLASSIC_NEXT_POINTER: usize = 8 + 2 + 9 * 12;

/// Pixel bytes stored in both test buffers (4x2, 8-bit gray)
pub fn test_pixels() -> Vec<u8> {
    (0..8).collect()
}

/// Creates a little-endian classic TIFF with one uncompressed strip
///
/// Software is 8 bytes long, so it lives after the directory.
pub fn create_test_tiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    // TIFF header (little-endian)
    buffer.extend_from_slice(b"II");
    buffer.write_u16::<LittleEndian>(42).unwrap();     // TIFF magic number
    buffer.write_u32::<LittleEndian>(8).unwrap();      // IFD offset

    let software_offset = (CLASSIC_NEXT_POINTER + 4) as u32;
    let pixel_offset = software_offset + 8;

    // IFD at offset 8
    buffer.write_u16::<LittleEndian>(9).unwrap();      // Entry count
    let entries: [(u16, u16, u32, u32); 9] = [
        (256, 3, 1, 4),                     // ImageWidth
        (257, 3, 1, 2),                     // ImageLength
        (258, 3, 1, 8),                     // BitsPerSample
        (259, 3, 1, 1),                     // Compression: none
        (262, 3, 1, 1),                     // BlackIsZero
        (273, 4, 1, pixel_offset),          // StripOffsets
        (278, 3, 1, 2),                     // RowsPerStrip
        (279, 4, 1, 8),                     // StripByteCounts
        (305, 2, 8, software_offset),       // Software (deferred)
    ];
    for (tag, field_type, count, value) in entries {
        buffer.write_u16::<LittleEndian>(tag).unwrap();
        buffer.write_u16::<LittleEndian>(field_type).unwrap();
        buffer.write_u32::<LittleEndian>(count).unwrap();
        if field_type == 3 {
            // SHORT values sit left-justified in the value field
            buffer.write_u16::<LittleEndian>(value as u16).unwrap();
            buffer.write_u16::<LittleEndian>(0).unwrap();
        } else {
            buffer.write_u32::<LittleEndian>(value).unwrap();
        }
    }

    // Next IFD offset (0 = no more IFDs)
    buffer.write_u32::<LittleEndian>(0).unwrap();

    buffer.extend_from_slice(b"tiffkit\0");
    buffer.extend(test_pixels());

    Cursor::new(buffer)
}

/// Creates a big-endian BigTIFF with one uncompressed strip
pub fn create_test_bigtiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    // BigTIFF header (big-endian)
    buffer.extend_from_slice(b"MM");
    buffer.write_u16::<BigEndian>(43).unwrap();     // BigTIFF version
    buffer.write_u16::<BigEndian>(8).unwrap();      // Offset size
    buffer.write_u16::<BigEndian>(0).unwrap();      // Reserved
    buffer.write_u64::<BigEndian>(16).unwrap();     // IFD offset

    let software_offset: u64 = 16 + 8 + 8 * 20 + 8;
    let pixel_offset = software_offset + 12;

    // IFD at offset 16
    buffer.write_u64::<BigEndian>(8).unwrap();      // Entry count
    let entries: [(u16, u16, u64, u64); 8] = [
        (256, 3, 1, 4),                     // ImageWidth
        (257, 3, 1, 2),                     // ImageLength
        (258, 3, 1, 8),                     // BitsPerSample
        (259, 3, 1, 1),                     // Compression: none
        (273, 16, 1, pixel_offset),         // StripOffsets (LONG8)
        (278, 4, 1, 2),                     // RowsPerStrip
        (279, 16, 1, 8),                    // StripByteCounts (LONG8)
        (305, 2, 12, software_offset),      // Software (deferred)
    ];
    for (tag, field_type, count, value) in entries {
        buffer.write_u16::<BigEndian>(tag).unwrap();
        buffer.write_u16::<BigEndian>(field_type).unwrap();
        buffer.write_u64::<BigEndian>(count).unwrap();
        match field_type {
            3 => {
                buffer.write_u16::<BigEndian>(value as u16).unwrap();
                buffer.extend_from_slice(&[0; 6]);
            }
            4 => {
                buffer.write_u32::<BigEndian>(value as u32).unwrap();
                buffer.extend_from_slice(&[0; 4]);
            }
            _ => buffer.write_u64::<BigEndian>(value).unwrap(),
        }
    }

    // Next IFD offset (0 = no more IFDs)
    buffer.write_u64::<BigEndian>(0).unwrap();

    buffer.extend_from_slice(b"tiffkit big\0");
    buffer.extend(test_pixels());

    Cursor::new(buffer)
}
