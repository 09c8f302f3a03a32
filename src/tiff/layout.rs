//! Pixel layout resolver
//!
//! Turns a directory's tag set into a [`PixelLayout`]: image geometry,
//! sample description, codec selection and the strip or tile table. All
//! address arithmetic for strips and tiles lives here.

use std::fmt;

use log::{debug, warn};

use crate::compression::{Compression, Predictor, UnitGeometry};
use crate::io::fill_order::FillOrder;
use crate::tiff::constants::{planar_config, sample_format, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::value::TagValue;

/// How the samples of a pixel are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanarConfig {
    /// Samples interleaved per pixel (RGBRGB...)
    #[default]
    Chunky,
    /// One plane per sample (RRR...GGG...BBB...)
    Planar,
}

impl PlanarConfig {
    pub fn from_code(code: u64) -> TiffResult<Self> {
        match u16::try_from(code) {
            Ok(planar_config::CHUNKY) => Ok(PlanarConfig::Chunky),
            Ok(planar_config::PLANAR) => Ok(PlanarConfig::Planar),
            _ => Err(TiffError::UnsupportedFormat(format!("planar configuration {}", code))),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            PlanarConfig::Chunky => planar_config::CHUNKY,
            PlanarConfig::Planar => planar_config::PLANAR,
        }
    }
}

/// Interpretation of sample bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    #[default]
    Unsigned,
    Signed,
    Float,
    Void,
}

impl SampleFormat {
    pub fn from_code(code: u64) -> Self {
        match u16::try_from(code) {
            Ok(sample_format::UNSIGNED) => SampleFormat::Unsigned,
            Ok(sample_format::SIGNED) => SampleFormat::Signed,
            Ok(sample_format::IEEEFP) => SampleFormat::Float,
            Ok(sample_format::VOID) => SampleFormat::Void,
            _ => {
                warn!("Unknown SampleFormat {}, treating samples as untyped", code);
                SampleFormat::Void
            }
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            SampleFormat::Unsigned => sample_format::UNSIGNED,
            SampleFormat::Signed => sample_format::SIGNED,
            SampleFormat::Float => sample_format::IEEEFP,
            SampleFormat::Void => sample_format::VOID,
        }
    }
}

/// Strip or tile organization, with the unit dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Organization {
    Strips { rows_per_strip: u64 },
    Tiles { tile_width: u64, tile_height: u64 },
}

/// Everything needed to address and decode the pixel data of one layer
#[derive(Debug, Clone, PartialEq)]
pub struct PixelLayout {
    pub width: u64,
    pub height: u64,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    pub sample_format: SampleFormat,
    pub photometric: Option<u16>,
    pub planar: PlanarConfig,
    pub compression: Compression,
    pub predictor: Predictor,
    pub fill_order: FillOrder,
    pub organization: Organization,
    /// Strip or tile offsets, plane-major for planar layouts
    pub offsets: Vec<u64>,
    /// Compressed size of each strip or tile
    pub byte_counts: Vec<u64>,
}

impl PixelLayout {
    pub fn is_tiled(&self) -> bool {
        matches!(self.organization, Organization::Tiles { .. })
    }

    /// Width of one strip or tile in pixels
    pub fn unit_width(&self) -> u64 {
        match self.organization {
            Organization::Strips { .. } => self.width,
            Organization::Tiles { tile_width, .. } => tile_width,
        }
    }

    /// Nominal height of one strip or tile in rows
    pub fn unit_height(&self) -> u64 {
        match self.organization {
            Organization::Strips { rows_per_strip } => rows_per_strip.min(self.height).max(1),
            Organization::Tiles { tile_height, .. } => tile_height,
        }
    }

    pub fn units_across(&self) -> u64 {
        div_ceil(self.width, self.unit_width())
    }

    pub fn units_down(&self) -> u64 {
        div_ceil(self.height, self.unit_height())
    }

    /// Number of sample planes stored separately
    pub fn planes(&self) -> u64 {
        match self.planar {
            PlanarConfig::Chunky => 1,
            PlanarConfig::Planar => u64::from(self.samples_per_pixel),
        }
    }

    pub fn units_per_plane(&self) -> u64 {
        self.units_across() * self.units_down()
    }

    /// Expected length of the offset and byte-count tables
    pub fn unit_count(&self) -> u64 {
        self.units_per_plane() * self.planes()
    }

    /// Samples stored per pixel inside one unit
    pub fn samples_per_unit_pixel(&self) -> u16 {
        match self.planar {
            PlanarConfig::Chunky => self.samples_per_pixel,
            PlanarConfig::Planar => 1,
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits_per_sample).div_ceil(8)
    }

    /// Bytes between horizontally adjacent pixels inside one unit
    pub fn pixel_stride(&self) -> usize {
        usize::from(self.samples_per_unit_pixel()) * self.bytes_per_sample()
    }

    /// Whether every sample occupies whole bytes
    pub fn is_byte_aligned(&self) -> bool {
        self.bits_per_sample % 8 == 0
    }

    /// Bytes in one row of a unit (rows are padded to whole bytes)
    pub fn unit_row_bytes(&self) -> usize {
        let bits = self.unit_width()
            * u64::from(self.samples_per_unit_pixel())
            * u64::from(self.bits_per_sample);
        div_ceil(bits, 8) as usize
    }

    /// Rows actually stored in unit `index`; the last strip may be short
    pub fn unit_rows(&self, index: usize) -> usize {
        match self.organization {
            Organization::Strips { .. } => {
                let unit_height = self.unit_height();
                let row_in_plane = index as u64 % self.units_per_plane();
                let start = row_in_plane * unit_height;
                unit_height.min(self.height.saturating_sub(start)) as usize
            }
            Organization::Tiles { tile_height, .. } => tile_height as usize,
        }
    }

    /// Decoded size and row shape of unit `index`
    pub fn unit_geometry(&self, index: usize) -> UnitGeometry {
        UnitGeometry::new(self.unit_row_bytes(), self.unit_rows(index))
    }

    /// Index into the offset table of the unit holding pixel (x, y) in `plane`
    pub fn unit_index(&self, plane: u64, x: u64, y: u64) -> usize {
        let unit_row = y / self.unit_height();
        let unit_col = x / self.unit_width();
        (plane * self.units_per_plane() + unit_row * self.units_across() + unit_col) as usize
    }

    /// Byte offset of pixel (x, y) inside its decoded unit
    pub fn offset_in_unit(&self, x: u64, y: u64) -> usize {
        let row = (y % self.unit_height()) as usize;
        let col = (x % self.unit_width()) as usize;
        row * self.unit_row_bytes() + col * self.pixel_stride()
    }

    /// Checks that the geometry products fit in 64 bits and returns the unit count
    ///
    /// Every other geometry helper assumes a layout that passed this check.
    pub fn checked_unit_count(&self) -> TiffResult<u64> {
        let overflow = || TiffError::CorruptData(format!(
            "{}x{} image with {} samples of {} bits overflows its geometry",
            self.width, self.height, self.samples_per_pixel, self.bits_per_sample
        ));

        let pixel_bits = u64::from(self.samples_per_pixel) * u64::from(self.bits_per_sample);
        self.width
            .checked_mul(self.height)
            .and_then(|pixels| pixels.checked_mul(pixel_bits))
            .ok_or_else(overflow)?;

        let unit_bits = self.unit_width()
            .checked_mul(self.unit_height())
            .and_then(|pixels| pixels.checked_mul(pixel_bits))
            .ok_or_else(overflow)?;
        if usize::try_from(unit_bits.div_ceil(8)).is_err() {
            return Err(overflow());
        }

        self.units_across()
            .checked_mul(self.units_down())
            .and_then(|units| units.checked_mul(self.planes()))
            .ok_or_else(overflow)
    }

    /// Uncompressed size of the whole image in bytes
    pub fn raw_size(&self) -> u64 {
        let bits = self.width
            * self.height
            * u64::from(self.samples_per_pixel)
            * u64::from(self.bits_per_sample);
        div_ceil(bits, 8)
    }

    /// Writes the structural tags describing this layout into `ifd`
    ///
    /// Offset and byte-count tables are written from `offsets`/`byte_counts`
    /// in the width `is_big_tiff` calls for.
    pub fn apply_to(&self, ifd: &mut IFD, is_big_tiff: bool) {
        let dimension = |value: u64| -> TagValue {
            if value <= u64::from(u16::MAX) {
                TagValue::Short(vec![value as u16])
            } else {
                TagValue::Long(vec![value as u32])
            }
        };

        ifd.set(tags::IMAGE_WIDTH, dimension(self.width));
        ifd.set(tags::IMAGE_LENGTH, dimension(self.height));
        ifd.set(tags::BITS_PER_SAMPLE,
                TagValue::Short(vec![self.bits_per_sample; usize::from(self.samples_per_pixel)]));
        ifd.set(tags::COMPRESSION, TagValue::Short(vec![self.compression.code()]));
        if let Some(photometric) = self.photometric {
            ifd.set(tags::PHOTOMETRIC_INTERPRETATION, TagValue::Short(vec![photometric]));
        }
        if self.fill_order != FillOrder::MsbFirst {
            ifd.set(tags::FILL_ORDER, TagValue::Short(vec![self.fill_order.code()]));
        }
        ifd.set(tags::SAMPLES_PER_PIXEL, TagValue::Short(vec![self.samples_per_pixel]));
        ifd.set(tags::PLANAR_CONFIGURATION, TagValue::Short(vec![self.planar.code()]));
        if self.predictor != Predictor::None {
            ifd.set(tags::PREDICTOR, TagValue::Short(vec![self.predictor.code()]));
        }
        if self.sample_format != SampleFormat::Unsigned {
            ifd.set(tags::SAMPLE_FORMAT,
                    TagValue::Short(vec![self.sample_format.code(); usize::from(self.samples_per_pixel)]));
        }

        let offsets = TagValue::offsets(self.offsets.clone(), is_big_tiff);
        let byte_counts = TagValue::offsets(self.byte_counts.clone(), is_big_tiff);
        match self.organization {
            Organization::Strips { rows_per_strip } => {
                ifd.set(tags::ROWS_PER_STRIP, TagValue::Long(vec![rows_per_strip.min(u64::from(u32::MAX)) as u32]));
                ifd.set(tags::STRIP_OFFSETS, offsets);
                ifd.set(tags::STRIP_BYTE_COUNTS, byte_counts);
            }
            Organization::Tiles { tile_width, tile_height } => {
                ifd.set(tags::TILE_WIDTH, dimension(tile_width));
                ifd.set(tags::TILE_LENGTH, dimension(tile_height));
                ifd.set(tags::TILE_OFFSETS, offsets);
                ifd.set(tags::TILE_BYTE_COUNTS, byte_counts);
            }
        }
    }
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Size: {}x{}, {} x {}-bit samples ({:?})",
                 self.width, self.height, self.samples_per_pixel, self.bits_per_sample, self.sample_format)?;
        writeln!(f, "  Planar: {:?}, compression: {}, predictor: {:?}, fill order: {:?}",
                 self.planar, self.compression, self.predictor, self.fill_order)?;
        match self.organization {
            Organization::Strips { rows_per_strip } => writeln!(
                f, "  Strips: {} rows each, {} units", rows_per_strip, self.unit_count())?,
            Organization::Tiles { tile_width, tile_height } => writeln!(
                f, "  Tiles: {}x{}, {} across, {} down, {} units",
                tile_width, tile_height, self.units_across(), self.units_down(), self.unit_count())?,
        }
        Ok(())
    }
}

fn div_ceil(value: u64, divisor: u64) -> u64 {
    if divisor == 0 {
        0
    } else {
        value.div_ceil(divisor)
    }
}

fn required(ifd: &IFD, tag: u16) -> TiffResult<u64> {
    ifd.get_tag_value(tag).ok_or(TiffError::MissingTag(tag))
}

fn required_array(ifd: &IFD, tag: u16) -> TiffResult<Vec<u64>> {
    ifd.get_tag_values(tag).ok_or(TiffError::MissingTag(tag))
}

/// Resolves the layout of the layer described by `ifd`
pub fn resolve(ifd: &IFD) -> TiffResult<PixelLayout> {
    let width = required(ifd, tags::IMAGE_WIDTH)?;
    let height = required(ifd, tags::IMAGE_LENGTH)?;

    let bits = ifd.get_tag_values(tags::BITS_PER_SAMPLE).unwrap_or_else(|| vec![1]);
    let bits_per_sample = match bits.first() {
        Some(&first) if bits.iter().all(|&b| b == first) => first,
        Some(_) => {
            return Err(TiffError::UnsupportedFormat(format!(
                "mixed bits per sample {:?}",
                bits
            )))
        }
        None => return Err(TiffError::MissingTag(tags::BITS_PER_SAMPLE)),
    };
    if bits_per_sample == 0 || bits_per_sample > 64 {
        return Err(TiffError::UnsupportedFormat(format!("{} bits per sample", bits_per_sample)));
    }
    let bits_per_sample = bits_per_sample as u16;

    let compression = Compression::from_code(ifd.get_tag_value(tags::COMPRESSION).unwrap_or(1))?;
    let planar = PlanarConfig::from_code(ifd.get_tag_value(tags::PLANAR_CONFIGURATION).unwrap_or(1))?;
    let predictor = Predictor::from_code(ifd.get_tag_value(tags::PREDICTOR).unwrap_or(1))?;
    let fill_order = FillOrder::from_code(ifd.get_tag_value(tags::FILL_ORDER).unwrap_or(1))?;
    let sample_format = ifd
        .get_tag_value(tags::SAMPLE_FORMAT)
        .map(SampleFormat::from_code)
        .unwrap_or_default();
    let photometric = ifd
        .get_tag_value(tags::PHOTOMETRIC_INTERPRETATION)
        .map(|code| code as u16);

    let tiled = ifd.has_tag(tags::TILE_WIDTH) || ifd.has_tag(tags::TILE_OFFSETS);
    let (organization, offsets, byte_counts) = if tiled {
        let tile_width = required(ifd, tags::TILE_WIDTH)?;
        let tile_height = required(ifd, tags::TILE_LENGTH)?;
        if tile_width == 0 || tile_height == 0 {
            return Err(TiffError::CorruptData(format!("tile size {}x{}", tile_width, tile_height)));
        }
        (
            Organization::Tiles { tile_width, tile_height },
            required_array(ifd, tags::TILE_OFFSETS)?,
            required_array(ifd, tags::TILE_BYTE_COUNTS)?,
        )
    } else {
        let rows_per_strip = required(ifd, tags::ROWS_PER_STRIP)?;
        if rows_per_strip == 0 {
            return Err(TiffError::CorruptData("RowsPerStrip is 0".to_string()));
        }
        (
            Organization::Strips { rows_per_strip },
            required_array(ifd, tags::STRIP_OFFSETS)?,
            required_array(ifd, tags::STRIP_BYTE_COUNTS)?,
        )
    };

    let mut layout = PixelLayout {
        width,
        height,
        samples_per_pixel: 1,
        bits_per_sample,
        sample_format,
        photometric,
        planar,
        compression,
        predictor,
        fill_order,
        organization,
        offsets,
        byte_counts,
    };

    layout.samples_per_pixel = match ifd.get_tag_value(tags::SAMPLES_PER_PIXEL) {
        Some(0) => return Err(TiffError::CorruptData("SamplesPerPixel is 0".to_string())),
        Some(samples) => u16::try_from(samples).map_err(|_| {
            TiffError::UnsupportedFormat(format!("{} samples per pixel", samples))
        })?,
        None => infer_samples_per_pixel(&layout)?,
    };

    if bits.len() > 1 && bits.len() != usize::from(layout.samples_per_pixel) {
        warn!("BitsPerSample lists {} values for {} samples", bits.len(), layout.samples_per_pixel);
    }

    let expected = usize::try_from(layout.checked_unit_count()?).map_err(|_| {
        TiffError::CorruptData(format!("{}x{} image has too many units", width, height))
    })?;
    if layout.offsets.len() != expected || layout.byte_counts.len() != expected {
        return Err(TiffError::CorruptData(format!(
            "expected {} strip/tile entries, found {} offsets and {} byte counts",
            expected,
            layout.offsets.len(),
            layout.byte_counts.len()
        )));
    }

    if layout.predictor != Predictor::None && layout.compression != Compression::Lzw {
        warn!("Predictor {:?} declared with {} compression; ignoring it", layout.predictor, layout.compression);
        layout.predictor = Predictor::None;
    }

    debug!("Resolved layout: {}x{} {} units ({})", width, height, expected,
           if layout.is_tiled() { "tiles" } else { "strips" });
    Ok(layout)
}

/// Best-effort recovery of a missing SamplesPerPixel
///
/// Only attempted for uncompressed chunky data, where a unit's byte count is
/// exactly its pixel count times the pixel size.
fn infer_samples_per_pixel(layout: &PixelLayout) -> TiffResult<u16> {
    let missing = TiffError::MissingTag(tags::SAMPLES_PER_PIXEL);
    if layout.compression != Compression::None
        || layout.planar != PlanarConfig::Chunky
        || !layout.is_byte_aligned()
    {
        return Err(missing);
    }

    let first_count = match layout.byte_counts.first() {
        Some(&count) => count,
        None => return Err(missing),
    };

    let sample_bytes = u64::from(layout.bits_per_sample / 8);
    let divisor = match layout.unit_width()
        .checked_mul(layout.unit_height())
        .and_then(|pixels| pixels.checked_mul(sample_bytes))
    {
        Some(divisor) => divisor,
        None => return Err(missing),
    };
    if divisor == 0 || first_count == 0 || first_count % divisor != 0 {
        return Err(missing);
    }

    let samples = first_count / divisor;
    match u16::try_from(samples) {
        Ok(samples) => {
            warn!("SamplesPerPixel missing; inferred {} from strip/tile size", samples);
            Ok(samples)
        }
        Err(_) => Err(missing),
    }
}
