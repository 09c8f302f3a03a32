//! Region/subsampling mapper
//!
//! Turns a requested [`Region`] into the ordered sequence of
//! [`TransferUnit`]s that copy decoded source bytes into a pixel-interleaved
//! destination buffer. Planning never touches the file, so it is the same
//! for every compression scheme.

use log::debug;

use crate::extractor::region::Region;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::layout::{PixelLayout, PlanarConfig};

/// One contiguous copy from a decoded strip/tile into the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferUnit {
    /// Index into the strip/tile tables
    pub unit_index: usize,
    /// Byte offset of the first source sample inside the decoded unit
    pub offset_in_unit: usize,
    /// Number of bytes to copy
    pub len: usize,
    /// Source pixel of the first sample
    pub src_x: u64,
    pub src_y: u64,
    /// Destination pixel of the first sample
    pub dest_x: u64,
    pub dest_y: u64,
    /// Band of the first sample
    pub band: u16,
    /// Number of samples covered
    pub samples: usize,
}

impl TransferUnit {
    /// Byte offset of this unit's first sample in a pixel-interleaved buffer
    /// `dest_width` pixels wide
    pub fn dest_offset(&self, dest_width: u64, samples_per_pixel: u16, bytes_per_sample: usize) -> usize {
        let sample = (self.dest_y * dest_width + self.dest_x) * u64::from(samples_per_pixel)
            + u64::from(self.band);
        sample as usize * bytes_per_sample
    }
}

/// Lazy iterator over the transfers of one region
///
/// Units come out in ascending destination row order; within a row, plane by
/// plane, left to right. Row-subsampling skips whole source rows.
pub struct TransferPlan<'a> {
    layout: &'a PixelLayout,
    region: Region,
    dest_width: u64,
    dest_height: u64,
    row: u64,
    plane: u64,
    /// Source column offset (contiguous runs) or destination column (otherwise)
    cursor: u64,
}

/// Plans the transfer of `region` out of an image laid out as `layout`
pub fn plan(layout: &PixelLayout, region: Region) -> TiffResult<TransferPlan<'_>> {
    region.validate(layout.width, layout.height)?;
    if !layout.is_byte_aligned() {
        return Err(TiffError::UnsupportedFormat(format!(
            "region transfer of {}-bit samples",
            layout.bits_per_sample
        )));
    }

    debug!("Planning transfer of {} from {}x{} image", region, layout.width, layout.height);
    Ok(TransferPlan {
        layout,
        region,
        dest_width: region.dest_width(),
        dest_height: region.dest_height(),
        row: 0,
        plane: 0,
        cursor: 0,
    })
}

impl<'a> TransferPlan<'a> {
    pub fn dest_width(&self) -> u64 {
        self.dest_width
    }

    pub fn dest_height(&self) -> u64 {
        self.dest_height
    }

    /// Whether a whole run of pixels can move as one unit
    fn contiguous(&self) -> bool {
        self.layout.planar == PlanarConfig::Chunky && self.region.x_step == 1
    }

    fn next_row_segment(&mut self, src_y: u64) -> Option<TransferUnit> {
        if self.cursor >= self.region.width {
            return None;
        }
        let layout = self.layout;
        let src_x = self.region.x + self.cursor;
        let unit_width = layout.unit_width();
        let unit_end = (src_x / unit_width + 1) * unit_width;
        let pixels = self.region.end_x().min(unit_end) - src_x;

        let unit = TransferUnit {
            unit_index: layout.unit_index(0, src_x, src_y),
            offset_in_unit: layout.offset_in_unit(src_x, src_y),
            len: pixels as usize * layout.pixel_stride(),
            src_x,
            src_y,
            dest_x: self.cursor,
            dest_y: self.row,
            band: 0,
            samples: pixels as usize * usize::from(layout.samples_per_pixel),
        };
        self.cursor += pixels;
        Some(unit)
    }

    fn next_sample(&mut self, src_y: u64) -> Option<TransferUnit> {
        if self.cursor >= self.dest_width {
            return None;
        }
        let layout = self.layout;
        let src_x = self.region.x + self.cursor * self.region.x_step;
        let (band, samples) = match layout.planar {
            PlanarConfig::Chunky => (0, usize::from(layout.samples_per_pixel)),
            PlanarConfig::Planar => (self.plane as u16, 1),
        };

        let unit = TransferUnit {
            unit_index: layout.unit_index(self.plane, src_x, src_y),
            offset_in_unit: layout.offset_in_unit(src_x, src_y),
            len: samples * layout.bytes_per_sample(),
            src_x,
            src_y,
            dest_x: self.cursor,
            dest_y: self.row,
            band,
            samples,
        };
        self.cursor += 1;
        Some(unit)
    }
}

impl<'a> Iterator for TransferPlan<'a> {
    type Item = TransferUnit;

    fn next(&mut self) -> Option<TransferUnit> {
        while self.row < self.dest_height {
            if self.plane < self.layout.planes() {
                let src_y = self.region.y + self.row * self.region.y_step;
                let unit = if self.contiguous() {
                    self.next_row_segment(src_y)
                } else {
                    self.next_sample(src_y)
                };
                if unit.is_some() {
                    return unit;
                }
                self.plane += 1;
                self.cursor = 0;
            } else {
                self.plane = 0;
                self.row += 1;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{Compression, Predictor};
    use crate::io::fill_order::FillOrder;
    use crate::tiff::layout::{Organization, SampleFormat};

    fn layout(width: u64, height: u64, samples: u16, planar: PlanarConfig, organization: Organization) -> PixelLayout {
        let mut layout = PixelLayout {
            width,
            height,
            samples_per_pixel: samples,
            bits_per_sample: 8,
            sample_format: SampleFormat::Unsigned,
            photometric: None,
            planar,
            compression: Compression::None,
            predictor: Predictor::None,
            fill_order: FillOrder::MsbFirst,
            organization,
            offsets: Vec::new(),
            byte_counts: Vec::new(),
        };
        let count = layout.unit_count() as usize;
        layout.offsets = vec![0; count];
        layout.byte_counts = vec![0; count];
        layout
    }

    #[test]
    fn test_chunky_rows_split_at_tile_edges() {
        let layout = layout(10, 4, 3, PlanarConfig::Chunky,
                            Organization::Tiles { tile_width: 4, tile_height: 4 });
        let units: Vec<_> = plan(&layout, Region::new(2, 1, 7, 1)).unwrap().collect();

        let spans: Vec<_> = units.iter().map(|u| (u.unit_index, u.src_x, u.len)).collect();
        assert_eq!(spans, vec![(0, 2, 6), (1, 4, 12), (2, 8, 3)]);
        assert_eq!(units[1].offset_in_unit, 4 * 3);
        assert_eq!(units[1].dest_offset(7, 3, 1), 2 * 3);
    }

    #[test]
    fn test_strip_rows_are_single_units() {
        let layout = layout(6, 5, 1, PlanarConfig::Chunky, Organization::Strips { rows_per_strip: 2 });
        let units: Vec<_> = plan(&layout, Region::full(6, 5)).unwrap().collect();
        assert_eq!(units.len(), 5);
        assert_eq!(units.iter().map(|u| u.unit_index).collect::<Vec<_>>(), vec![0, 0, 1, 1, 2]);
        assert!(units.iter().all(|u| u.len == 6));
        assert_eq!(units[3].offset_in_unit, 6);
    }

    #[test]
    fn test_subsampling_skips_rows_and_pixels() {
        let layout = layout(5, 5, 2, PlanarConfig::Chunky, Organization::Strips { rows_per_strip: 5 });
        let plan = plan(&layout, Region::full(5, 5).with_step(2, 3)).unwrap();
        assert_eq!((plan.dest_width(), plan.dest_height()), (3, 2));

        let coords: Vec<_> = plan.map(|u| (u.src_x, u.src_y, u.len)).collect();
        assert_eq!(coords, vec![(0, 0, 2), (2, 0, 2), (4, 0, 2), (0, 3, 2), (2, 3, 2), (4, 3, 2)]);
    }

    #[test]
    fn test_planar_units_are_single_samples() {
        let layout = layout(2, 1, 3, PlanarConfig::Planar, Organization::Strips { rows_per_strip: 1 });
        let units: Vec<_> = plan(&layout, Region::full(2, 1)).unwrap().collect();
        assert_eq!(units.len(), 6);
        assert!(units.iter().all(|u| u.samples == 1 && u.len == 1));

        // Band 1, pixel 1 comes from the second plane's strip
        let unit = units[3];
        assert_eq!((unit.band, unit.dest_x, unit.unit_index), (1, 1, 1));
        assert_eq!(unit.dest_offset(2, 3, 1), 4);
    }

    #[test]
    fn test_region_outside_image_is_rejected() {
        let layout = layout(4, 4, 1, PlanarConfig::Chunky, Organization::Strips { rows_per_strip: 4 });
        assert!(matches!(plan(&layout, Region::new(2, 2, 3, 1)), Err(TiffError::IndexOutOfRange(_))));
    }

    #[test]
    fn test_sub_byte_samples_are_unsupported() {
        let mut layout = layout(8, 1, 1, PlanarConfig::Chunky, Organization::Strips { rows_per_strip: 1 });
        layout.bits_per_sample = 1;
        assert!(matches!(plan(&layout, Region::full(8, 1)), Err(TiffError::UnsupportedFormat(_))));
    }
}
