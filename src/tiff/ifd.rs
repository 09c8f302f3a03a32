//! Image File Directory (IFD) structures and methods
//!
//! This module implements the core TIFF IFD (Image File Directory) structures
//! that store metadata about images in a TIFF file. IFDs are organized as
//! collections of tag entries, with each tag describing an aspect of the image.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, trace};

use crate::tiff::constants::tags;
use crate::tiff::value::{FieldType, TagValue};
use crate::utils::tag_utils;

/// Represents an Image File Directory (IFD) in a TIFF file
///
/// An IFD contains metadata about an image, stored as a series of tag entries
/// kept in ascending tag order. TIFF files can contain multiple IFDs, each
/// describing a separate layer (page, overview, mask).
#[derive(Debug, Clone, PartialEq)]
pub struct IFD {
    /// IFD number (0-based layer index)
    pub number: usize,
    /// Offset to this IFD in the file
    pub offset: u64,
    /// File position of the pointer to the next IFD
    pub next_ifd_pointer_position: u64,
    /// Value of the next-IFD pointer (0 = last directory)
    pub next_ifd_offset: u64,
    entries: BTreeMap<u16, IFDEntry>,
}

/// Represents an entry in an Image File Directory (IFD)
///
/// The value is always decoded; `value_offset` records where a deferred value
/// lived on disk (None when it was stored inline or has not been written).
#[derive(Debug, Clone, PartialEq)]
pub struct IFDEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Decoded values
    pub value: TagValue,
    /// File offset of the value array when it is not inline
    pub value_offset: Option<u64>,
}

impl IFDEntry {
    /// Creates a new IFD entry from a decoded value
    pub fn new(tag: u16, value: TagValue) -> Self {
        trace!("Creating IFD entry: tag={} ({}), type={}, count={}",
               tag, tag_utils::get_tag_name(tag),
               tag_utils::get_field_type_name(value.field_type().code()), value.count());

        Self {
            tag,
            value,
            value_offset: None,
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.value.field_type()
    }

    pub fn count(&self) -> u64 {
        self.value.count()
    }

    /// Determines if the value is stored inline in the entry's offset field
    ///
    /// TIFF format allows small values to be stored directly in the IFD entry
    /// rather than requiring a separate data area.
    pub fn is_value_inline(&self, is_big_tiff: bool) -> bool {
        let inline_size = if is_big_tiff { 8 } else { 4 };
        self.value.byte_len() <= inline_size
    }

    /// Returns a human-readable description of this entry
    pub fn description(&self) -> String {
        let tag_name = tag_utils::get_tag_name(self.tag);
        let field_type_name = tag_utils::get_field_type_name(self.field_type().code());

        format!("Tag: {} ({}), Type: {} ({}), Count: {}, Value: {}",
                self.tag, tag_name, self.field_type().code(), field_type_name,
                self.count(), tag_utils::format_value(self.tag, &self.value))
    }
}

impl IFD {
    /// Creates a new IFD
    ///
    /// Initializes an empty Image File Directory with the specified
    /// number (index) and file offset.
    pub fn new(number: usize, offset: u64) -> Self {
        debug!("Creating new IFD #{} at offset {}", number, offset);

        Self {
            number,
            offset,
            next_ifd_pointer_position: 0,
            next_ifd_offset: 0,
            entries: BTreeMap::new(),
        }
    }

    /// Adds an entry to this IFD, replacing any entry with the same tag
    pub fn add_entry(&mut self, entry: IFDEntry) {
        trace!("Adding entry to IFD #{}: {}", self.number, entry.description());
        self.entries.insert(entry.tag, entry);
    }

    /// Convenience wrapper around [`IFD::add_entry`]
    pub fn set(&mut self, tag: u16, value: TagValue) {
        self.add_entry(IFDEntry::new(tag, value));
    }

    pub fn remove(&mut self, tag: u16) -> Option<IFDEntry> {
        self.entries.remove(&tag)
    }

    /// Gets the first value of a tag as an integer
    pub fn get_tag_value(&self, tag: u16) -> Option<u64> {
        let value = self.entries.get(&tag).and_then(|entry| entry.value.first_u64());

        if let Some(val) = value {
            trace!("Found tag {} ({}) in IFD #{}: {}", tag, tag_utils::get_tag_name(tag), self.number, val);
        }

        value
    }

    /// Gets all values of a tag as integers
    pub fn get_tag_values(&self, tag: u16) -> Option<Vec<u64>> {
        self.entries.get(&tag).map(|entry| entry.value.as_u64_vec())
    }

    /// Checks if this IFD has a specific tag
    pub fn has_tag(&self, tag: u16) -> bool {
        self.entries.contains_key(&tag)
    }

    /// Gets an IFD entry by tag
    pub fn get_entry(&self, tag: u16) -> Option<&IFDEntry> {
        self.entries.get(&tag)
    }

    /// Gets the dimensions of the image described by this IFD
    pub fn get_dimensions(&self) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH)?;
        Some((width, height))
    }

    /// Returns number of samples per pixel (default 1 if not specified)
    pub fn get_samples_per_pixel(&self) -> u64 {
        self.get_tag_value(tags::SAMPLES_PER_PIXEL).unwrap_or(1)
    }

    /// Whether NewSubfileType marks this layer as a reduced-resolution subfile
    pub fn is_reduced_resolution(&self) -> bool {
        self.get_tag_value(tags::NEW_SUBFILE_TYPE)
            .map(|flags| flags & crate::tiff::constants::subfile_type::REDUCED_RESOLUTION != 0)
            .unwrap_or(false)
    }

    /// Entries in ascending tag order
    pub fn entries(&self) -> impl Iterator<Item = &IFDEntry> {
        self.entries.values()
    }

    /// Gets the number of entries in this IFD
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        writeln!(f, "  Number of entries: {}", self.entries.len())?;

        if let Some((width, height)) = self.get_dimensions() {
            writeln!(f, "  Dimensions: {}x{}", width, height)?;
        }

        writeln!(f, "  Samples per pixel: {}", self.get_samples_per_pixel())?;

        writeln!(f, "  Tags:")?;
        for entry in self.entries.values() {
            let tag_name = tag_utils::get_tag_name(entry.tag);
            let field_type_name = tag_utils::get_field_type_name(entry.field_type().code());

            writeln!(f, "    {} ({}): {} [{} x{}]",
                     entry.tag, tag_name, tag_utils::format_value(entry.tag, &entry.value),
                     field_type_name, entry.count())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_sorted_and_replaced() {
        let mut ifd = IFD::new(0, 8);
        ifd.set(tags::IMAGE_LENGTH, TagValue::Long(vec![20]));
        ifd.set(tags::IMAGE_WIDTH, TagValue::Long(vec![10]));
        ifd.set(tags::IMAGE_WIDTH, TagValue::Short(vec![12]));

        let order: Vec<u16> = ifd.entries().map(|e| e.tag).collect();
        assert_eq!(order, vec![tags::IMAGE_WIDTH, tags::IMAGE_LENGTH]);
        assert_eq!(ifd.get_dimensions(), Some((12, 20)));
    }

    #[test]
    fn test_inline_threshold() {
        let entry = IFDEntry::new(tags::BITS_PER_SAMPLE, TagValue::Short(vec![8, 8, 8]));
        assert!(!entry.is_value_inline(false));
        assert!(entry.is_value_inline(true));

        let entry = IFDEntry::new(tags::BITS_PER_SAMPLE, TagValue::Short(vec![8, 8]));
        assert!(entry.is_value_inline(false));
    }

    #[test]
    fn test_reduced_resolution_flag() {
        let mut ifd = IFD::new(1, 100);
        assert!(!ifd.is_reduced_resolution());
        ifd.set(tags::NEW_SUBFILE_TYPE, TagValue::Long(vec![1]));
        assert!(ifd.is_reduced_resolution());
    }
}
