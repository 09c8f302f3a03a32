//! Directory codec
//!
//! Parses and serializes one Image File Directory against the classic
//! (12-byte entries, 4-byte offsets) or Big (20-byte entries, 8-byte
//! offsets) layout. A value whose `count * type_size` fits the offset field
//! is stored inline; anything larger lives elsewhere in the file and the
//! entry holds its offset.

use std::collections::BTreeMap;
use std::io::{Cursor, Seek, SeekFrom};

use log::{debug, trace, warn};

use crate::io::byte_order::ByteOrderHandler;
use crate::io::seekable::{SeekableReader, SeekableWriter};
use crate::io::source::TiffSource;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::header::{write_offset, TiffVariant};
use crate::tiff::ifd::{IFDEntry, IFD};
use crate::tiff::validation;
use crate::tiff::value::{FieldType, TagValue};
use crate::utils::tag_utils;

/// A value that has to be fetched from elsewhere in the file
struct DeferredRead {
    tag: u16,
    field_type: FieldType,
    count: usize,
    offset: u64,
}

/// Where a directory landed in the output
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenDirectory {
    /// File position of the entry count field
    pub position: u64,
    /// File position of this directory's next-IFD pointer
    pub next_pointer_position: u64,
    /// Per tag, the file position of its value bytes (inline field or deferred area)
    pub value_positions: BTreeMap<u16, u64>,
    /// First byte after the directory and its deferred values
    pub end: u64,
}

/// Reads the directory at `position`
///
/// Deferred values are fetched in ascending file-offset order once all fixed
/// entries have been parsed.
pub fn read_directory<R: SeekableReader>(
    source: &mut TiffSource<R>,
    variant: TiffVariant,
    position: u64,
    number: usize,
) -> TiffResult<IFD> {
    debug!("Reading IFD #{} at offset {}", number, position);
    validation::validate_ifd_offset(position, variant.header_size(), source.file_size())?;

    source.seek(position)?;
    let entry_count = if variant.is_big_tiff() {
        source.read_u64()?
    } else {
        u64::from(source.read_u16()?)
    };

    let entries_start = position + variant.count_size();
    let entry_size = variant.entry_size();
    validation::validate_entry_count(entry_count, entry_size, entries_start, source.file_size())?;
    debug!("IFD #{} has {} entries", number, entry_count);

    // Entries plus the trailing next-IFD pointer in a single read
    let block_len = entry_count * entry_size + variant.offset_size();
    let block = source.read_bytes_at(entries_start, block_len as usize)?;
    let handler = source.handler();

    let mut ifd = IFD::new(number, position);
    let mut deferred = Vec::new();
    let mut cursor = Cursor::new(block.as_slice());
    let field_width = variant.offset_size() as usize;

    for index in 0..entry_count {
        let tag = handler.read_u16(&mut cursor)?;
        let type_code = handler.read_u16(&mut cursor)?;
        let count = read_field(handler, &mut cursor, variant)?;

        let field_start = cursor.position() as usize;
        let field = &block[field_start..field_start + field_width];
        cursor.seek(SeekFrom::Current(field_width as i64))?;

        let field_type = FieldType::from_code(type_code).map_err(|_| {
            TiffError::UnsupportedFormat(format!(
                "tag {} ({}) has unknown field type {} (entry {} of IFD at {})",
                tag, tag_utils::get_tag_name(tag), type_code, index, position
            ))
        })?;

        if field_type.is_big_tiff_only() && !variant.is_big_tiff() {
            return Err(TiffError::UnsupportedFormat(format!(
                "tag {} uses BigTIFF-only type {} in a classic TIFF",
                tag, tag_utils::get_field_type_name(type_code)
            )));
        }

        let byte_len = count.checked_mul(field_type.size() as u64).ok_or_else(|| {
            TiffError::CorruptData(format!("tag {} count {} overflows", tag, count))
        })?;

        if ifd.has_tag(tag) {
            warn!("Duplicate tag {} in IFD #{}, keeping the last entry", tag, number);
        }

        if byte_len <= variant.offset_size() {
            let value = TagValue::decode(field_type, count as usize, field, handler)?;
            ifd.add_entry(IFDEntry::new(tag, value));
        } else {
            let offset = read_field(handler, &mut Cursor::new(field), variant)?;
            if byte_len > source.file_size() {
                return Err(TiffError::CorruptData(format!(
                    "tag {} declares {} bytes of values, larger than the file",
                    tag, byte_len
                )));
            }
            trace!("Tag {} deferred: {} bytes at {}", tag, byte_len, offset);
            deferred.push(DeferredRead {
                tag,
                field_type,
                count: count as usize,
                offset,
            });
        }
    }

    ifd.next_ifd_pointer_position = entries_start + entry_count * entry_size;
    ifd.next_ifd_offset = read_field(handler, &mut cursor, variant)?;

    deferred.sort_by_key(|read| read.offset);
    for read in deferred {
        let len = read.count * read.field_type.size();
        let bytes = source.read_bytes_at(read.offset, len)?;
        let value = TagValue::decode(read.field_type, read.count, &bytes, source.handler())?;
        let mut entry = IFDEntry::new(read.tag, value);
        entry.value_offset = Some(read.offset);
        ifd.add_entry(entry);
    }

    debug!("IFD #{} read, next IFD at {}", number, ifd.next_ifd_offset);
    Ok(ifd)
}

/// Reads a count or offset field of the variant's width
fn read_field(
    handler: &dyn ByteOrderHandler,
    reader: &mut dyn SeekableReader,
    variant: TiffVariant,
) -> TiffResult<u64> {
    if variant.is_big_tiff() {
        Ok(handler.read_u64(reader)?)
    } else {
        Ok(u64::from(handler.read_u32(reader)?))
    }
}

/// Writes `ifd` at the current position (word-aligned) with a zero next pointer
///
/// Entries go out in ascending tag order. Deferred values follow the
/// directory block in the same order, each starting on a word boundary.
pub fn write_directory(
    writer: &mut dyn SeekableWriter,
    handler: &dyn ByteOrderHandler,
    variant: TiffVariant,
    ifd: &IFD,
) -> TiffResult<WrittenDirectory> {
    let mut position = writer.stream_position()?;
    if position % 2 == 1 {
        writer.write_all(&[0])?;
        position += 1;
    }

    let entry_count = ifd.entry_count() as u64;
    if !variant.is_big_tiff() && entry_count > u64::from(u16::MAX) {
        return Err(TiffError::GenericError(format!(
            "{} entries do not fit a classic TIFF directory",
            entry_count
        )));
    }

    let entries_start = position + variant.count_size();
    let next_pointer_position = entries_start + entry_count * variant.entry_size();
    let mut deferred_cursor = next_pointer_position + variant.offset_size();

    // Lay out the deferred area before emitting any entry
    let mut encoded = Vec::with_capacity(ifd.entry_count());
    let mut value_positions = BTreeMap::new();
    for (index, entry) in ifd.entries().enumerate() {
        if entry.field_type().is_big_tiff_only() && !variant.is_big_tiff() {
            return Err(TiffError::UnsupportedFormat(format!(
                "tag {} has BigTIFF-only type {} in a classic TIFF",
                entry.tag, tag_utils::get_field_type_name(entry.field_type().code())
            )));
        }

        let bytes = entry.value.encode(handler)?;
        if entry.is_value_inline(variant.is_big_tiff()) {
            let field_position = entries_start + index as u64 * variant.entry_size() + 4 + variant.offset_size();
            value_positions.insert(entry.tag, field_position);
            encoded.push((entry, bytes, None));
        } else {
            let value_position = deferred_cursor;
            deferred_cursor += bytes.len() as u64;
            deferred_cursor += deferred_cursor % 2;
            value_positions.insert(entry.tag, value_position);
            encoded.push((entry, bytes, Some(value_position)));
        }
    }

    debug!("Writing IFD #{} at {} with {} entries", ifd.number, position, entry_count);

    if variant.is_big_tiff() {
        handler.write_u64(writer, entry_count)?;
    } else {
        handler.write_u16(writer, entry_count as u16)?;
    }

    let field_width = variant.offset_size() as usize;
    for (entry, bytes, deferred_at) in &encoded {
        trace!("Writing entry: {}", entry.description());
        handler.write_u16(writer, entry.tag)?;
        handler.write_u16(writer, entry.field_type().code())?;
        write_offset(handler, writer, variant, entry.count())?;

        match deferred_at {
            Some(value_position) => write_offset(handler, writer, variant, *value_position)?,
            None => {
                let mut field = bytes.clone();
                field.resize(field_width, 0);
                writer.write_all(&field)?;
            }
        }
    }

    write_offset(handler, writer, variant, 0)?;

    for (_, bytes, deferred_at) in &encoded {
        if deferred_at.is_some() {
            writer.write_all(bytes)?;
            if bytes.len() % 2 == 1 {
                writer.write_all(&[0])?;
            }
        }
    }

    let end = writer.stream_position()?;
    debug!("IFD #{} occupies {}..{}", ifd.number, position, end);

    Ok(WrittenDirectory {
        position,
        next_pointer_position,
        value_positions,
        end,
    })
}

/// Overwrites the offset field at `pointer_position`, then returns to the previous position
pub fn patch_pointer(
    writer: &mut dyn SeekableWriter,
    handler: &dyn ByteOrderHandler,
    variant: TiffVariant,
    pointer_position: u64,
    value: u64,
) -> TiffResult<()> {
    trace!("Patching pointer at {} -> {}", pointer_position, value);
    let resume = writer.stream_position()?;
    writer.seek(SeekFrom::Start(pointer_position))?;
    write_offset(handler, writer, variant, value)?;
    writer.seek(SeekFrom::Start(resume))?;
    Ok(())
}

/// Overwrites a previously written value array in place
///
/// `value` must encode to the same length as the original.
pub fn patch_value(
    writer: &mut dyn SeekableWriter,
    handler: &dyn ByteOrderHandler,
    value_position: u64,
    value: &TagValue,
) -> TiffResult<()> {
    let bytes = value.encode(handler)?;
    trace!("Patching {} bytes at {}", bytes.len(), value_position);
    let resume = writer.stream_position()?;
    writer.seek(SeekFrom::Start(value_position))?;
    writer.write_all(&bytes)?;
    writer.seek(SeekFrom::Start(resume))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::byte_order::ByteOrder;
    use crate::tiff::constants::tags;
    use crate::tiff::header::TiffHeader;

    fn sample_ifd() -> IFD {
        let mut ifd = IFD::new(0, 0);
        ifd.set(tags::IMAGE_WIDTH, TagValue::Short(vec![4]));
        ifd.set(tags::IMAGE_LENGTH, TagValue::Short(vec![4]));
        ifd.set(tags::BITS_PER_SAMPLE, TagValue::Short(vec![8, 8, 8]));
        ifd.set(tags::SOFTWARE, TagValue::Ascii("tiffkit".to_string()));
        ifd.set(tags::X_RESOLUTION, TagValue::Rational(vec![(72, 1)]));
        ifd
    }

    fn write_file(byte_order: ByteOrder, variant: TiffVariant, ifd: &IFD) -> (Vec<u8>, WrittenDirectory) {
        let mut cursor = Cursor::new(Vec::new());
        let handler = byte_order.create_handler();
        TiffHeader::write(byte_order, variant, &mut cursor).unwrap();
        let written = write_directory(&mut cursor, handler.as_ref(), variant, ifd).unwrap();
        patch_pointer(&mut cursor, handler.as_ref(), variant,
                      variant.first_ifd_pointer_position(), written.position).unwrap();
        (cursor.into_inner(), written)
    }

    #[test]
    fn test_inline_and_deferred_values_survive() {
        for &variant in &[TiffVariant::Classic, TiffVariant::Big] {
            for &byte_order in &[ByteOrder::LittleEndian, ByteOrder::BigEndian] {
                let ifd = sample_ifd();
                let (bytes, written) = write_file(byte_order, variant, &ifd);

                let mut source = TiffSource::new(Cursor::new(bytes), byte_order).unwrap();
                let parsed = read_directory(&mut source, variant, written.position, 0).unwrap();

                let expected: Vec<_> = ifd.entries().map(|e| (e.tag, e.value.clone())).collect();
                let actual: Vec<_> = parsed.entries().map(|e| (e.tag, e.value.clone())).collect();
                assert_eq!(actual, expected);
                assert_eq!(parsed.next_ifd_offset, 0);
                assert_eq!(parsed.next_ifd_pointer_position, written.next_pointer_position);
            }
        }
    }

    #[test]
    fn test_deferred_values_are_word_aligned() {
        let (bytes, written) = write_file(ByteOrder::LittleEndian, TiffVariant::Classic, &sample_ifd());
        // BitsPerSample (6 bytes) deferred right after the directory block
        let bps = written.value_positions[&tags::BITS_PER_SAMPLE];
        assert_eq!(bps, written.next_pointer_position + 4);
        // XResolution (8 bytes) and Software ("tiffkit\0") follow, each on an even offset
        for tag in [tags::BITS_PER_SAMPLE, tags::X_RESOLUTION, tags::SOFTWARE] {
            assert_eq!(written.value_positions[&tag] % 2, 0);
        }
        assert_eq!(written.end as usize, bytes.len());
    }

    #[test]
    fn test_inline_field_position_is_reported() {
        let (bytes, written) = write_file(ByteOrder::LittleEndian, TiffVariant::Classic, &sample_ifd());
        // ImageWidth is the first entry: SHORT 4 stored in the value field
        let position = written.value_positions[&tags::IMAGE_WIDTH] as usize;
        assert_eq!(&bytes[position..position + 2], &[4, 0]);
    }

    #[test]
    fn test_unknown_field_type_is_unsupported() {
        // II 42 ifd@8: one entry tag 256 type 99
        let mut bytes = vec![0x49, 0x49, 42, 0, 8, 0, 0, 0, 1, 0];
        bytes.extend_from_slice(&[0, 1, 99, 0, 1, 0, 0, 0, 0, 0, 0, 0]);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        let mut source = TiffSource::new(Cursor::new(bytes), ByteOrder::LittleEndian).unwrap();
        let result = read_directory(&mut source, TiffVariant::Classic, 8, 0);
        assert!(matches!(result, Err(TiffError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_implausible_entry_count_is_corrupt() {
        let mut bytes = vec![0x49, 0x49, 42, 0, 8, 0, 0, 0, 0xFF, 0xFF];
        bytes.extend_from_slice(&[0u8; 16]);
        let mut source = TiffSource::new(Cursor::new(bytes), ByteOrder::LittleEndian).unwrap();
        let result = read_directory(&mut source, TiffVariant::Classic, 8, 0);
        assert!(matches!(result, Err(TiffError::CorruptData(_))));
    }

    #[test]
    fn test_long8_rejected_in_classic_file() {
        let mut ifd = IFD::new(0, 0);
        ifd.set(tags::STRIP_OFFSETS, TagValue::Long8(vec![1]));
        let mut cursor = Cursor::new(Vec::new());
        let handler = ByteOrder::LittleEndian.create_handler();
        let result = write_directory(&mut cursor, handler.as_ref(), TiffVariant::Classic, &ifd);
        assert!(matches!(result, Err(TiffError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_patch_value_in_place() {
        let mut ifd = IFD::new(0, 0);
        ifd.set(tags::STRIP_OFFSETS, TagValue::Long(vec![0, 0]));
        let mut cursor = Cursor::new(Vec::new());
        let handler = ByteOrder::LittleEndian.create_handler();
        TiffHeader::write(ByteOrder::LittleEndian, TiffVariant::Classic, &mut cursor).unwrap();
        let written = write_directory(&mut cursor, handler.as_ref(), TiffVariant::Classic, &ifd).unwrap();
        patch_value(&mut cursor, handler.as_ref(), written.value_positions[&tags::STRIP_OFFSETS],
                    &TagValue::Long(vec![100, 200])).unwrap();
        patch_pointer(&mut cursor, handler.as_ref(), TiffVariant::Classic, 4, written.position).unwrap();

        let mut source = TiffSource::new(Cursor::new(cursor.into_inner()), ByteOrder::LittleEndian).unwrap();
        let parsed = read_directory(&mut source, TiffVariant::Classic, written.position, 0).unwrap();
        assert_eq!(parsed.get_tag_values(tags::STRIP_OFFSETS), Some(vec![100, 200]));
    }
}
