//! TIFF file header
//!
//! The header fixes the byte order and the offset width for the whole file:
//!
//! ```text
//! classic: "II"|"MM"  42  first-IFD(4)
//! BigTIFF: "II"|"MM"  43  offset-size(2)=8  reserved(2)=0  first-IFD(8)
//! ```

use std::io::SeekFrom;

use log::debug;

use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::seekable::{SeekableReader, SeekableWriter};
use crate::tiff::constants::header;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::validation;

/// Standard (32-bit offsets) or Big (64-bit offsets) container layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiffVariant {
    #[default]
    Classic,
    Big,
}

impl TiffVariant {
    pub fn is_big_tiff(&self) -> bool {
        *self == TiffVariant::Big
    }

    /// Version number written after the byte order marker
    pub fn version(&self) -> u16 {
        match self {
            TiffVariant::Classic => header::TIFF_VERSION,
            TiffVariant::Big => header::BIG_TIFF_VERSION,
        }
    }

    /// Width of offset and inline value fields
    pub fn offset_size(&self) -> u64 {
        match self {
            TiffVariant::Classic => 4,
            TiffVariant::Big => 8,
        }
    }

    /// Width of the directory entry count field
    pub fn count_size(&self) -> u64 {
        match self {
            TiffVariant::Classic => 2,
            TiffVariant::Big => 8,
        }
    }

    /// Size of one directory entry: tag(2) type(2) count value-or-offset
    pub fn entry_size(&self) -> u64 {
        4 + 2 * self.offset_size()
    }

    /// Total header length, including the first-IFD pointer
    pub fn header_size(&self) -> u64 {
        match self {
            TiffVariant::Classic => 8,
            TiffVariant::Big => 16,
        }
    }

    /// File position of the first-IFD pointer
    pub fn first_ifd_pointer_position(&self) -> u64 {
        match self {
            TiffVariant::Classic => 4,
            TiffVariant::Big => 8,
        }
    }

    /// Picks the variant for a layer of `raw_size` uncompressed bytes
    pub fn for_raw_size(raw_size: u64) -> Self {
        if raw_size >= header::BIGTIFF_THRESHOLD {
            TiffVariant::Big
        } else {
            TiffVariant::Classic
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TiffVariant::Classic => "TIFF",
            TiffVariant::Big => "BigTIFF",
        }
    }
}

/// The decoded file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    pub byte_order: ByteOrder,
    pub variant: TiffVariant,
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Reads and validates the header at the start of `reader`
    pub fn read(reader: &mut dyn SeekableReader) -> TiffResult<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let byte_order = ByteOrder::detect(reader)?;
        let handler = byte_order.create_handler();

        let version = handler.read_u16(reader)?;
        let variant = match version {
            header::TIFF_VERSION => TiffVariant::Classic,
            header::BIG_TIFF_VERSION => {
                let offset_size = handler.read_u16(reader)?;
                let reserved = handler.read_u16(reader)?;
                validation::validate_bigtiff_header(offset_size, reserved)?;
                TiffVariant::Big
            }
            other => {
                return Err(TiffError::InvalidHeader(format!(
                    "unsupported version {} at offset 2",
                    other
                )))
            }
        };

        let first_ifd_offset = if variant.is_big_tiff() {
            handler.read_u64(reader)?
        } else {
            u64::from(handler.read_u32(reader)?)
        };

        debug!("Header: {} {}, first IFD at {}", variant.name(), byte_order.name(), first_ifd_offset);

        Ok(TiffHeader {
            byte_order,
            variant,
            first_ifd_offset,
        })
    }

    /// Writes the header at the current position with a zero first-IFD pointer
    ///
    /// The pointer is patched once the first directory has been placed.
    pub fn write(
        byte_order: ByteOrder,
        variant: TiffVariant,
        writer: &mut dyn SeekableWriter,
    ) -> TiffResult<()> {
        let handler = byte_order.create_handler();
        writer.write_all(&byte_order.marker())?;
        handler.write_u16(writer, variant.version())?;

        if variant.is_big_tiff() {
            handler.write_u16(writer, header::BIGTIFF_OFFSET_SIZE)?;
            handler.write_u16(writer, 0)?;
        }

        write_offset(handler.as_ref(), writer, variant, 0)?;
        Ok(())
    }
}

/// Writes a 4- or 8-byte offset field for `variant`
pub fn write_offset(
    handler: &dyn ByteOrderHandler,
    writer: &mut dyn SeekableWriter,
    variant: TiffVariant,
    value: u64,
) -> TiffResult<()> {
    if variant.is_big_tiff() {
        handler.write_u64(writer, value)?;
    } else {
        let value = u32::try_from(value).map_err(|_| {
            TiffError::GenericError(format!("offset {} does not fit a classic TIFF; use BigTIFF", value))
        })?;
        handler.write_u32(writer, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_variant_geometry() {
        assert_eq!(TiffVariant::Classic.entry_size(), 12);
        assert_eq!(TiffVariant::Big.entry_size(), 20);
        assert_eq!(TiffVariant::Big.header_size(), 16);
        assert_eq!(TiffVariant::for_raw_size((1 << 30) - 1), TiffVariant::Classic);
        assert_eq!(TiffVariant::for_raw_size(1 << 30), TiffVariant::Big);
    }

    #[test]
    fn test_write_then_read_big_header() {
        let mut cursor = Cursor::new(Vec::new());
        TiffHeader::write(ByteOrder::BigEndian, TiffVariant::Big, &mut cursor).unwrap();
        let bytes = cursor.get_ref().clone();
        assert_eq!(&bytes[..8], &[0x4D, 0x4D, 0x00, 0x2B, 0x00, 0x08, 0x00, 0x00]);
        assert_eq!(bytes.len(), 16);

        let parsed = TiffHeader::read(&mut cursor).unwrap();
        assert_eq!(parsed.variant, TiffVariant::Big);
        assert_eq!(parsed.byte_order, ByteOrder::BigEndian);
        assert_eq!(parsed.first_ifd_offset, 0);
    }

    #[test]
    fn test_bad_version_is_invalid_header() {
        let mut cursor = Cursor::new(vec![0x49, 0x49, 0x2C, 0x00, 8, 0, 0, 0]);
        assert!(matches!(TiffHeader::read(&mut cursor), Err(TiffError::InvalidHeader(_))));
    }

    #[test]
    fn test_bigtiff_offset_size_must_be_eight() {
        let mut cursor = Cursor::new(vec![0x49, 0x49, 0x2B, 0x00, 4, 0, 0, 0, 16, 0, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(TiffHeader::read(&mut cursor), Err(TiffError::InvalidHeader(_))));
    }

    #[test]
    fn test_bigtiff_reserved_must_be_zero() {
        let mut cursor = Cursor::new(vec![0x4D, 0x4D, 0x00, 0x2B, 0, 8, 0, 1, 0, 0, 0, 0, 0, 0, 0, 16]);
        assert!(matches!(TiffHeader::read(&mut cursor), Err(TiffError::InvalidHeader(_))));

        let mut valid = Cursor::new(vec![0x4D, 0x4D, 0x00, 0x2B, 0, 8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 16]);
        let header = TiffHeader::read(&mut valid).unwrap();
        assert!(header.variant.is_big_tiff());
        assert_eq!(header.first_ifd_offset, 16);
    }

    #[test]
    fn test_bad_marker_is_invalid_header() {
        let mut cursor = Cursor::new(vec![0x49, 0x4D, 0x2A, 0x00, 8, 0, 0, 0]);
        assert!(matches!(TiffHeader::read(&mut cursor), Err(TiffError::InvalidHeader(_))));
    }

    #[test]
    fn test_classic_offset_overflow() {
        let mut cursor = Cursor::new(Vec::new());
        let handler = ByteOrder::LittleEndian.create_handler();
        let result = write_offset(handler.as_ref(), &mut cursor, TiffVariant::Classic, 1 << 33);
        assert!(result.is_err());
    }
}
