//! Raw transfer engine
//!
//! Executes [`TransferUnit`]s against an open source: fetches and decodes
//! strips/tiles (fill order, codec, predictor), copies the planned byte
//! ranges out, and converts samples to native byte order. The writer uses
//! [`gather_unit`] to run the same addressing in reverse.

use std::collections::HashMap;

use log::{debug, trace};

use crate::compression::{predictor, Compression, CompressionFactory, CompressionHandler, Predictor, PredictorLayout};
use crate::extractor::mapper::TransferUnit;
use crate::io::byte_order::swap_sample_bytes;
use crate::io::fill_order::FillOrder;
use crate::io::seekable::SeekableReader;
use crate::io::source::TiffSource;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::layout::{PixelLayout, PlanarConfig};

/// Copies planned units out of one layer, caching decoded strips/tiles
///
/// Only the units of the current row band (one strip, or one row of tiles
/// across all planes) are kept decoded at a time.
pub struct TransferEngine<'a, R: SeekableReader> {
    source: &'a mut TiffSource<R>,
    layout: &'a PixelLayout,
    handler: Box<dyn CompressionHandler>,
    cache: HashMap<usize, Vec<u8>>,
    cached_band: Option<u64>,
}

impl<'a, R: SeekableReader> TransferEngine<'a, R> {
    pub fn new(source: &'a mut TiffSource<R>, layout: &'a PixelLayout) -> Self {
        TransferEngine {
            source,
            layout,
            handler: CompressionFactory::create_handler(layout.compression),
            cache: HashMap::new(),
            cached_band: None,
        }
    }

    /// Whether units can be sliced straight out of the file
    fn reads_direct(&self) -> bool {
        self.layout.compression == Compression::None && self.layout.fill_order == FillOrder::MsbFirst
    }

    /// Reads and fully decodes unit `index`; samples stay in file byte order
    pub fn decode_unit(&mut self, index: usize) -> TiffResult<Vec<u8>> {
        let layout = self.layout;
        let (offset, byte_count) = unit_entry(layout, index)?;
        let geometry = layout.unit_geometry(index);

        if byte_count == 0 {
            debug!("Unit {} has no data, filling {} bytes with zeros", index, geometry.len());
            return Ok(vec![0u8; geometry.len()]);
        }

        let length = usize::try_from(byte_count).map_err(|_| {
            TiffError::CorruptData(format!("unit {} byte count {} too large", index, byte_count))
        })?;
        let mut raw = self.source.read_bytes_at(offset, length)?;
        layout.fill_order.apply(&mut raw);

        let mut data = self.handler.decompress(&raw, geometry)?;
        trace!("Unit {}: {} -> {} bytes ({})", index, raw.len(), data.len(), self.handler.name());

        if layout.predictor == Predictor::Horizontal {
            if !layout.is_byte_aligned() {
                return Err(TiffError::UnsupportedFormat(format!(
                    "horizontal predictor on {}-bit samples",
                    layout.bits_per_sample
                )));
            }
            predictor::decode(&mut data, geometry, predictor_layout(layout, &*self.source))?;
        }
        Ok(data)
    }

    /// Copies `unit` into `dest` (exactly `unit.len` bytes) in native byte order
    pub fn copy(&mut self, unit: &TransferUnit, dest: &mut [u8]) -> TiffResult<()> {
        if dest.len() != unit.len {
            return Err(TiffError::GenericError(format!(
                "destination slice of {} bytes for a {}-byte transfer",
                dest.len(),
                unit.len
            )));
        }

        if self.reads_direct() {
            self.copy_direct(unit, dest)?;
        } else {
            self.copy_cached(unit, dest)?;
        }

        if !self.source.byte_order().is_native() {
            swap_sample_bytes(dest, self.layout.bytes_per_sample());
        }
        Ok(())
    }

    fn copy_direct(&mut self, unit: &TransferUnit, dest: &mut [u8]) -> TiffResult<()> {
        let (offset, byte_count) = unit_entry(self.layout, unit.unit_index)?;
        if byte_count == 0 {
            dest.fill(0);
            return Ok(());
        }

        let end = unit.offset_in_unit as u64 + unit.len as u64;
        if end > byte_count {
            return Err(TiffError::CorruptData(format!(
                "unit {} holds {} bytes, transfer needs {}",
                unit.unit_index, byte_count, end
            )));
        }
        let bytes = self.source.read_bytes_at(offset + unit.offset_in_unit as u64, unit.len)?;
        dest.copy_from_slice(&bytes);
        Ok(())
    }

    fn copy_cached(&mut self, unit: &TransferUnit, dest: &mut [u8]) -> TiffResult<()> {
        let band = unit.src_y / self.layout.unit_height();
        if self.cached_band != Some(band) {
            self.cache.clear();
            self.cached_band = Some(band);
        }

        if !self.cache.contains_key(&unit.unit_index) {
            let data = self.decode_unit(unit.unit_index)?;
            self.cache.insert(unit.unit_index, data);
        }

        let data = self.cache.get(&unit.unit_index).ok_or_else(|| {
            TiffError::GenericError(format!("unit {} missing from cache", unit.unit_index))
        })?;
        let bytes = data
            .get(unit.offset_in_unit..unit.offset_in_unit + unit.len)
            .ok_or_else(|| {
                TiffError::CorruptData(format!(
                    "unit {} decoded to {} bytes, transfer needs {}",
                    unit.unit_index,
                    data.len(),
                    unit.offset_in_unit + unit.len
                ))
            })?;
        dest.copy_from_slice(bytes);
        Ok(())
    }
}

fn unit_entry(layout: &PixelLayout, index: usize) -> TiffResult<(u64, u64)> {
    match (layout.offsets.get(index), layout.byte_counts.get(index)) {
        (Some(&offset), Some(&count)) => Ok((offset, count)),
        _ => Err(TiffError::IndexOutOfRange(format!(
            "unit {} of {}",
            index,
            layout.offsets.len()
        ))),
    }
}

fn predictor_layout<R: SeekableReader>(layout: &PixelLayout, source: &TiffSource<R>) -> PredictorLayout {
    PredictorLayout {
        samples: usize::from(layout.samples_per_unit_pixel()),
        bytes_per_sample: layout.bytes_per_sample(),
        byte_order: source.byte_order(),
    }
}

/// Assembles unit `index` from a full pixel-interleaved image buffer
///
/// The inverse of reading: rows and columns outside the image (the padding
/// of edge tiles) are zero. Samples are copied as-is, without byte swapping.
pub fn gather_unit(layout: &PixelLayout, samples: &[u8], index: usize) -> TiffResult<Vec<u8>> {
    if !layout.is_byte_aligned() {
        return Err(TiffError::UnsupportedFormat(format!(
            "writing {}-bit samples",
            layout.bits_per_sample
        )));
    }

    let bps = layout.bytes_per_sample();
    let spp = usize::from(layout.samples_per_pixel);
    let width = layout.width as usize;
    let expected = layout.raw_size() as usize;
    if samples.len() != expected {
        return Err(TiffError::GenericError(format!(
            "sample buffer holds {} bytes, image needs {}",
            samples.len(),
            expected
        )));
    }

    let geometry = layout.unit_geometry(index);
    let mut unit = vec![0u8; geometry.len()];

    let per_plane = layout.units_per_plane() as usize;
    let plane = index / per_plane;
    let within = index % per_plane;
    let across = layout.units_across() as usize;
    let x0 = (within % across) * layout.unit_width() as usize;
    let y0 = (within / across) * layout.unit_height() as usize;
    let x1 = (x0 + layout.unit_width() as usize).min(width);

    for row in 0..geometry.rows {
        let y = y0 + row;
        if y as u64 >= layout.height {
            break;
        }
        let dest = row * geometry.row_bytes;
        match layout.planar {
            PlanarConfig::Chunky => {
                let src = (y * width + x0) * spp * bps;
                let len = (x1 - x0) * spp * bps;
                unit[dest..dest + len].copy_from_slice(&samples[src..src + len]);
            }
            PlanarConfig::Planar => {
                for x in x0..x1 {
                    let src = ((y * width + x) * spp + plane) * bps;
                    let at = dest + (x - x0) * bps;
                    unit[at..at + bps].copy_from_slice(&samples[src..src + bps]);
                }
            }
        }
    }
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::mapper;
    use crate::extractor::region::Region;
    use crate::io::byte_order::ByteOrder;
    use crate::tiff::layout::{Organization, SampleFormat};
    use std::io::Cursor;

    fn tiled_layout(planar: PlanarConfig) -> PixelLayout {
        let mut layout = PixelLayout {
            width: 3,
            height: 3,
            samples_per_pixel: 2,
            bits_per_sample: 8,
            sample_format: SampleFormat::Unsigned,
            photometric: None,
            planar,
            compression: Compression::None,
            predictor: Predictor::None,
            fill_order: FillOrder::MsbFirst,
            organization: Organization::Tiles { tile_width: 2, tile_height: 2 },
            offsets: Vec::new(),
            byte_counts: Vec::new(),
        };
        let count = layout.unit_count() as usize;
        layout.offsets = vec![0; count];
        layout.byte_counts = vec![0; count];
        layout
    }

    #[test]
    fn test_gather_pads_edge_tiles() {
        let layout = tiled_layout(PlanarConfig::Chunky);
        let samples: Vec<u8> = (0..18).collect();
        // Tile 1 covers column 2 of rows 0-1
        assert_eq!(gather_unit(&layout, &samples, 1).unwrap(), vec![4, 5, 0, 0, 10, 11, 0, 0]);
        // Tile 3 covers pixel (2, 2) only
        assert_eq!(gather_unit(&layout, &samples, 3).unwrap(), vec![16, 17, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_gather_planar_picks_one_band() {
        let layout = tiled_layout(PlanarConfig::Planar);
        let samples: Vec<u8> = (0..18).collect();
        // Second plane, first tile: odd samples of pixels (0,0) (1,0) (0,1) (1,1)
        assert_eq!(gather_unit(&layout, &samples, 4).unwrap(), vec![1, 3, 7, 9]);
    }

    #[test]
    fn test_copy_from_stored_tiles() {
        let mut layout = tiled_layout(PlanarConfig::Chunky);
        let samples: Vec<u8> = (0..18).collect();
        let mut file = Vec::new();
        for index in 0..4 {
            layout.offsets[index] = file.len() as u64;
            let unit = gather_unit(&layout, &samples, index).unwrap();
            layout.byte_counts[index] = unit.len() as u64;
            file.extend(unit);
        }

        let mut source = TiffSource::new(Cursor::new(file), ByteOrder::LittleEndian).unwrap();
        let region = Region::new(1, 1, 2, 2);
        let units: Vec<_> = mapper::plan(&layout, region).unwrap().collect();
        let mut engine = TransferEngine::new(&mut source, &layout);
        let mut dest = vec![0u8; 8];
        for unit in &units {
            let at = unit.dest_offset(2, 2, 1);
            engine.copy(unit, &mut dest[at..at + unit.len]).unwrap();
        }
        assert_eq!(dest, vec![8, 9, 10, 11, 14, 15, 16, 17]);
    }

    #[test]
    fn test_empty_unit_reads_as_zeros() {
        let mut layout = tiled_layout(PlanarConfig::Chunky);
        layout.compression = Compression::PackBits;
        let mut source = TiffSource::new(Cursor::new(Vec::new()), ByteOrder::BigEndian).unwrap();
        let mut engine = TransferEngine::new(&mut source, &layout);
        assert_eq!(engine.decode_unit(0).unwrap(), vec![0u8; 8]);
        assert!(matches!(engine.decode_unit(9), Err(TiffError::IndexOutOfRange(_))));
    }
}
