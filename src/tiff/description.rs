//! Caller-side description of an image to write
//!
//! `ImageDescription` says what the pixels are and how they should be laid
//! out on disk; `WriterOptions` picks byte order and container variant.

use std::collections::BTreeMap;

use log::warn;

use crate::compression::{Compression, Predictor};
use crate::io::byte_order::ByteOrder;
use crate::io::fill_order::FillOrder;
use crate::tiff::constants::{header, photometric, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::header::TiffVariant;
use crate::tiff::layout::{Organization, PixelLayout, PlanarConfig, SampleFormat};
use crate::tiff::value::TagValue;

/// Target size of one strip when the caller does not choose RowsPerStrip
const DEFAULT_STRIP_BYTES: u64 = 8192;

/// When to write a BigTIFF container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BigTiffMode {
    /// BigTIFF once the raw image size reaches 1 GiB
    #[default]
    Auto,
    Always,
    Never,
}

impl BigTiffMode {
    pub fn variant_for(&self, raw_size: u64) -> TiffVariant {
        match self {
            BigTiffMode::Auto => TiffVariant::for_raw_size(raw_size),
            BigTiffMode::Always => TiffVariant::Big,
            BigTiffMode::Never => TiffVariant::Classic,
        }
    }
}

/// File-level writer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    pub byte_order: ByteOrder,
    pub bigtiff: BigTiffMode,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            byte_order: ByteOrder::LittleEndian,
            bigtiff: BigTiffMode::Auto,
        }
    }
}

/// Geometry, sample description and storage choices for one layer
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDescription {
    pub width: u64,
    pub height: u64,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    pub sample_format: SampleFormat,
    pub photometric: u16,
    pub planar: PlanarConfig,
    pub compression: Compression,
    pub predictor: Predictor,
    pub fill_order: FillOrder,
    /// None picks strips of roughly 8 KiB
    pub organization: Option<Organization>,
    /// NewSubfileType flags (0 = full-resolution image)
    pub subfile_type: u64,
    /// Non-structural tags carried verbatim (GeoTIFF keys, ColorMap, ...)
    pub extra_tags: BTreeMap<u16, TagValue>,
}

impl ImageDescription {
    /// Uncompressed, chunky, unsigned samples stored in strips
    pub fn new(width: u64, height: u64, samples_per_pixel: u16, bits_per_sample: u16) -> Self {
        ImageDescription {
            width,
            height,
            samples_per_pixel,
            bits_per_sample,
            sample_format: SampleFormat::Unsigned,
            photometric: if samples_per_pixel >= 3 { photometric::RGB } else { photometric::BLACK_IS_ZERO },
            planar: PlanarConfig::Chunky,
            compression: Compression::None,
            predictor: Predictor::None,
            fill_order: FillOrder::MsbFirst,
            organization: None,
            subfile_type: 0,
            extra_tags: BTreeMap::new(),
        }
    }

    /// Describes the same pixels as an existing layer
    pub fn from_layout(layout: &PixelLayout) -> Self {
        let mut description = ImageDescription::new(
            layout.width, layout.height, layout.samples_per_pixel, layout.bits_per_sample);
        description.sample_format = layout.sample_format;
        if let Some(code) = layout.photometric {
            description.photometric = code;
        }
        description
    }

    pub fn with_sample_format(mut self, format: SampleFormat) -> Self {
        self.sample_format = format;
        self
    }

    pub fn with_photometric(mut self, code: u16) -> Self {
        self.photometric = code;
        self
    }

    pub fn with_planar(mut self, planar: PlanarConfig) -> Self {
        self.planar = planar;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_predictor(mut self, predictor: Predictor) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn with_fill_order(mut self, fill_order: FillOrder) -> Self {
        self.fill_order = fill_order;
        self
    }

    pub fn with_strips(mut self, rows_per_strip: u64) -> Self {
        self.organization = Some(Organization::Strips { rows_per_strip });
        self
    }

    pub fn with_tiles(mut self, tile_width: u64, tile_height: u64) -> Self {
        self.organization = Some(Organization::Tiles { tile_width, tile_height });
        self
    }

    pub fn with_subfile_type(mut self, flags: u64) -> Self {
        self.subfile_type = flags;
        self
    }

    /// Adds a tag to carry verbatim; structural tags are derived and ignored here
    pub fn with_tag(mut self, tag: u16, value: TagValue) -> Self {
        if tags::STRUCTURAL.contains(&tag) {
            warn!("Ignoring structural tag {} in extra tags", tag);
        } else {
            self.extra_tags.insert(tag, value);
        }
        self
    }

    /// Uncompressed size of the pixel data in bytes
    pub fn raw_size(&self) -> u64 {
        let bits = self.width
            .saturating_mul(self.height)
            .saturating_mul(u64::from(self.samples_per_pixel) * u64::from(self.bits_per_sample));
        bits.div_ceil(8)
    }

    fn default_rows_per_strip(&self) -> u64 {
        let row_bytes = self.width
            .saturating_mul(u64::from(self.samples_per_pixel) * u64::from(self.bits_per_sample))
            .div_ceil(8)
            .max(1);
        (DEFAULT_STRIP_BYTES / row_bytes).clamp(1, self.height.max(1))
    }

    /// Checks the description and derives the on-disk layout with empty tables
    pub fn layout(&self) -> TiffResult<PixelLayout> {
        if self.width == 0 || self.height == 0 || self.samples_per_pixel == 0 {
            return Err(TiffError::GenericError(format!(
                "cannot write a {}x{} image with {} samples per pixel",
                self.width, self.height, self.samples_per_pixel
            )));
        }
        if self.bits_per_sample == 0 || self.bits_per_sample % 8 != 0 || self.bits_per_sample > 64 {
            return Err(TiffError::UnsupportedFormat(format!(
                "writing {}-bit samples",
                self.bits_per_sample
            )));
        }
        if self.predictor != Predictor::None && self.compression != Compression::Lzw {
            return Err(TiffError::UnsupportedFormat(format!(
                "predictor {:?} requires LZW compression, not {}",
                self.predictor, self.compression
            )));
        }

        let organization = match self.organization {
            Some(Organization::Strips { rows_per_strip }) if rows_per_strip == 0 => {
                return Err(TiffError::GenericError("RowsPerStrip must be at least 1".to_string()))
            }
            Some(Organization::Tiles { tile_width, tile_height }) => {
                if tile_width == 0 || tile_height == 0 {
                    return Err(TiffError::GenericError(format!(
                        "tile size {}x{}",
                        tile_width, tile_height
                    )));
                }
                if tile_width % 16 != 0 || tile_height % 16 != 0 {
                    warn!("Tile size {}x{} is not a multiple of 16", tile_width, tile_height);
                }
                Organization::Tiles { tile_width, tile_height }
            }
            Some(strips) => strips,
            None => Organization::Strips { rows_per_strip: self.default_rows_per_strip() },
        };

        let mut layout = PixelLayout {
            width: self.width,
            height: self.height,
            samples_per_pixel: self.samples_per_pixel,
            bits_per_sample: self.bits_per_sample,
            sample_format: self.sample_format,
            photometric: Some(self.photometric),
            planar: self.planar,
            compression: self.compression,
            predictor: self.predictor,
            fill_order: self.fill_order,
            organization,
            offsets: Vec::new(),
            byte_counts: Vec::new(),
        };
        let count = usize::try_from(layout.checked_unit_count()?).map_err(|_| {
            TiffError::GenericError(format!("{}x{} image has too many units", self.width, self.height))
        })?;
        layout.offsets = vec![0; count];
        layout.byte_counts = vec![0; count];
        Ok(layout)
    }

    /// Container variant `options` call for with this image
    pub fn variant(&self, options: &WriterOptions) -> TiffVariant {
        let variant = options.bigtiff.variant_for(self.raw_size());
        if variant == TiffVariant::Classic && self.raw_size() >= header::BIGTIFF_THRESHOLD {
            warn!("{} bytes of pixel data in a classic TIFF", self.raw_size());
        }
        variant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_strips_target_eight_kilobytes() {
        let layout = ImageDescription::new(1024, 100, 1, 8).layout().unwrap();
        assert_eq!(layout.organization, Organization::Strips { rows_per_strip: 8 });
        assert_eq!(layout.unit_count(), 13);
        assert_eq!(layout.offsets.len(), 13);

        let small = ImageDescription::new(4, 4, 1, 8).layout().unwrap();
        assert_eq!(small.organization, Organization::Strips { rows_per_strip: 4 });
    }

    #[test]
    fn test_predictor_needs_lzw() {
        let description = ImageDescription::new(8, 8, 1, 8)
            .with_compression(Compression::PackBits)
            .with_predictor(Predictor::Horizontal);
        assert!(matches!(description.layout(), Err(TiffError::UnsupportedFormat(_))));
        assert!(description.with_compression(Compression::Lzw).layout().is_ok());
    }

    #[test]
    fn test_oversized_image_is_an_error() {
        let description = ImageDescription::new(u64::MAX / 2, 4, 3, 16);
        assert_eq!(description.variant(&WriterOptions::default()), TiffVariant::Big);
        assert!(description.layout().is_err());
    }

    #[test]
    fn test_sub_byte_samples_rejected() {
        assert!(matches!(ImageDescription::new(8, 8, 1, 4).layout(), Err(TiffError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_bigtiff_mode() {
        let huge = ImageDescription::new(32768, 32768, 1, 8);
        assert_eq!(huge.variant(&WriterOptions::default()), TiffVariant::Big);

        let small = ImageDescription::new(16, 16, 1, 8);
        assert_eq!(small.variant(&WriterOptions::default()), TiffVariant::Classic);
        let forced = WriterOptions { bigtiff: BigTiffMode::Always, ..WriterOptions::default() };
        assert_eq!(small.variant(&forced), TiffVariant::Big);
    }

    #[test]
    fn test_structural_extra_tags_ignored() {
        let description = ImageDescription::new(4, 4, 1, 8)
            .with_tag(tags::IMAGE_WIDTH, TagValue::Short(vec![99]))
            .with_tag(tags::GDAL_NODATA, TagValue::Ascii("0".to_string()));
        assert_eq!(description.extra_tags.len(), 1);
        assert!(description.extra_tags.contains_key(&tags::GDAL_NODATA));
    }
}
