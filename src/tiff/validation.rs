//! TIFF validation utilities
//!
//! This module provides validation functions for TIFF files
//! to ensure data integrity and prevent errors when processing
//! potentially malformed files.

use log::{error, warn};
use std::io::SeekFrom;

use crate::io::seekable::SeekableReader;
use crate::tiff::constants::header;
use crate::tiff::errors::{TiffError, TiffResult};

/// Validates an IFD offset to ensure it's within reasonable bounds
///
/// # Arguments
/// * `offset` - The offset to validate
/// * `header_size` - Size of the file header; no directory can start inside it
/// * `file_size` - The file size for validation
pub fn validate_ifd_offset(offset: u64, header_size: u64, file_size: u64) -> TiffResult<()> {
    if offset >= file_size || offset < header_size {
        return Err(TiffError::CorruptData(format!(
            "Invalid IFD offset: {} (file size: {})",
            offset, file_size
        )));
    }

    Ok(())
}

/// Checks that a directory with `entry_count` entries fits in the file
///
/// # Arguments
/// * `entry_count` - Declared number of entries
/// * `entry_size` - 12 (classic) or 20 (BigTIFF) bytes per entry
/// * `entries_start` - File position of the first entry
/// * `file_size` - The file size for validation
pub fn validate_entry_count(
    entry_count: u64,
    entry_size: u64,
    entries_start: u64,
    file_size: u64,
) -> TiffResult<()> {
    let end = entry_count
        .checked_mul(entry_size)
        .and_then(|len| len.checked_add(entries_start));

    match end {
        Some(end) if end <= file_size => Ok(()),
        _ => {
            error!("Directory at {} declares {} entries, file is {} bytes",
                   entries_start, entry_count, file_size);
            Err(TiffError::CorruptData(format!(
                "directory at offset {} declares {} entries, which exceeds the file size {}",
                entries_start, entry_count, file_size
            )))
        }
    }
}

/// Gets the file size for validation purposes
///
/// # Arguments
/// * `reader` - The seekable reader to use
///
/// # Returns
/// The file size or u64::MAX if it couldn't be determined
pub fn get_file_size(reader: &mut dyn SeekableReader) -> TiffResult<u64> {
    let current_position = reader.stream_position()?;
    let file_size = match reader.seek(SeekFrom::End(0)) {
        Ok(size) => size,
        Err(e) => {
            warn!("Could not determine file size: {}", e);
            u64::MAX
        }
    };
    reader.seek(SeekFrom::Start(current_position))?;

    Ok(file_size)
}

/// Validates the BigTIFF header
///
/// BigTIFF has specific header requirements beyond the standard TIFF:
/// after the version number (43) comes the offset size (must be 8) and a
/// reserved value (must be 0).
pub fn validate_bigtiff_header(offset_size: u16, reserved: u16) -> TiffResult<()> {
    if offset_size != header::BIGTIFF_OFFSET_SIZE || reserved != 0 {
        error!("Invalid BigTIFF header: offset_size={}, reserved={}", offset_size, reserved);
        return Err(TiffError::InvalidHeader(format!(
            "BigTIFF offset size {} / reserved {} (expected 8 / 0)",
            offset_size, reserved
        )));
    }

    Ok(())
}
