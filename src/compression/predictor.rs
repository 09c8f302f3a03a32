//! Horizontal differencing predictor (Predictor = 2)
//!
//! Each sample is stored as the difference from the same band's sample in
//! the previous pixel of the same row. The first pixel of every row is
//! stored as-is, so no state carries across rows.

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::predictor;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::UnitGeometry;

/// Prediction scheme declared by the Predictor tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Predictor {
    #[default]
    None,
    Horizontal,
}

impl Predictor {
    pub fn from_code(code: u64) -> TiffResult<Self> {
        match u16::try_from(code) {
            Ok(predictor::NONE) => Ok(Predictor::None),
            Ok(predictor::HORIZONTAL_DIFFERENCING) => Ok(Predictor::Horizontal),
            _ => Err(TiffError::UnsupportedFormat(format!("predictor {}", code))),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Predictor::None => predictor::NONE,
            Predictor::Horizontal => predictor::HORIZONTAL_DIFFERENCING,
        }
    }
}

/// Sample layout the predictor walks over
#[derive(Debug, Clone, Copy)]
pub struct PredictorLayout {
    /// Samples interleaved per pixel within the unit (1 for planar units)
    pub samples: usize,
    pub bytes_per_sample: usize,
    /// Byte order of the sample values in the buffer
    pub byte_order: ByteOrder,
}

impl PredictorLayout {
    fn check(&self) -> TiffResult<()> {
        match self.bytes_per_sample {
            1 | 2 | 4 | 8 => Ok(()),
            other => Err(TiffError::UnsupportedFormat(format!(
                "horizontal predictor on {}-bit samples",
                other * 8
            ))),
        }
    }

    fn read(&self, bytes: &[u8]) -> u64 {
        match self.byte_order {
            ByteOrder::BigEndian => BigEndian::read_uint(bytes, bytes.len()),
            ByteOrder::LittleEndian => LittleEndian::read_uint(bytes, bytes.len()),
        }
    }

    fn write(&self, bytes: &mut [u8], value: u64) {
        let width = bytes.len();
        match self.byte_order {
            ByteOrder::BigEndian => BigEndian::write_uint(bytes, value, width),
            ByteOrder::LittleEndian => LittleEndian::write_uint(bytes, value, width),
        }
    }

    fn mask(&self) -> u64 {
        if self.bytes_per_sample >= 8 {
            u64::MAX
        } else {
            (1u64 << (8 * self.bytes_per_sample)) - 1
        }
    }
}

/// Undoes differencing in place (after decompression)
pub fn decode(data: &mut [u8], geometry: UnitGeometry, layout: PredictorLayout) -> TiffResult<()> {
    layout.check()?;
    let width = layout.bytes_per_sample;
    let stride = layout.samples * width;
    let mask = layout.mask();

    for row in data.chunks_mut(geometry.row_bytes).take(geometry.rows) {
        if width == 1 {
            for i in stride..row.len() {
                row[i] = row[i].wrapping_add(row[i - stride]);
            }
            continue;
        }

        let mut pos = stride;
        while pos + width <= row.len() {
            let left = layout.read(&row[pos - stride..pos - stride + width]);
            let delta = layout.read(&row[pos..pos + width]);
            layout.write(&mut row[pos..pos + width], left.wrapping_add(delta) & mask);
            pos += width;
        }
    }
    Ok(())
}

/// Applies differencing in place (before compression)
pub fn encode(data: &mut [u8], geometry: UnitGeometry, layout: PredictorLayout) -> TiffResult<()> {
    layout.check()?;
    let width = layout.bytes_per_sample;
    let stride = layout.samples * width;
    let mask = layout.mask();

    for row in data.chunks_mut(geometry.row_bytes).take(geometry.rows) {
        if row.len() < stride + width {
            continue;
        }

        if width == 1 {
            for i in (stride..row.len()).rev() {
                row[i] = row[i].wrapping_sub(row[i - stride]);
            }
            continue;
        }

        let mut pos = (row.len() / width - 1) * width;
        while pos >= stride {
            let left = layout.read(&row[pos - stride..pos - stride + width]);
            let value = layout.read(&row[pos..pos + width]);
            layout.write(&mut row[pos..pos + width], value.wrapping_sub(left) & mask);
            pos -= width;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(samples: usize, bytes_per_sample: usize, byte_order: ByteOrder) -> PredictorLayout {
        PredictorLayout { samples, bytes_per_sample, byte_order }
    }

    #[test]
    fn test_each_row_restarts() {
        // Two rows of 3 single-band pixels, differenced independently
        let mut data = vec![10, 1, 1, 50, 255, 2];
        let geometry = UnitGeometry::new(3, 2);
        decode(&mut data, geometry, layout(1, 1, ByteOrder::LittleEndian)).unwrap();
        assert_eq!(data, vec![10, 11, 12, 50, 49, 51]);
    }

    #[test]
    fn test_bands_are_independent() {
        let original = vec![1, 100, 3, 90, 6, 80];
        let mut data = original.clone();
        let geometry = UnitGeometry::new(6, 1);
        let layout = layout(2, 1, ByteOrder::LittleEndian);
        encode(&mut data, geometry, layout).unwrap();
        assert_eq!(data, vec![1, 100, 2, 246, 3, 246]);
        decode(&mut data, geometry, layout).unwrap();
        assert_eq!(data, original);
    }

    #[test]
    fn test_sixteen_bit_big_endian_wraps() {
        // 0xFFFF then 0x0001: difference wraps to 0x0002
        let original = vec![0xFF, 0xFF, 0x00, 0x01];
        let mut data = original.clone();
        let geometry = UnitGeometry::new(4, 1);
        let layout = layout(1, 2, ByteOrder::BigEndian);
        encode(&mut data, geometry, layout).unwrap();
        assert_eq!(data, vec![0xFF, 0xFF, 0x00, 0x02]);
        decode(&mut data, geometry, layout).unwrap();
        assert_eq!(data, original);
    }

    #[test]
    fn test_thirty_two_bit_little_endian() {
        let values: [u32; 3] = [7, 3, u32::MAX];
        let original: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut data = original.clone();
        let geometry = UnitGeometry::new(12, 1);
        let layout = layout(1, 4, ByteOrder::LittleEndian);
        encode(&mut data, geometry, layout).unwrap();
        let deltas: Vec<u8> = [7u32, 3u32.wrapping_sub(7), u32::MAX - 3]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        assert_eq!(data, deltas);
        decode(&mut data, geometry, layout).unwrap();
        assert_eq!(data, original);
    }

    #[test]
    fn test_odd_sample_width_is_unsupported() {
        let mut data = vec![0u8; 6];
        let result = decode(&mut data, UnitGeometry::new(6, 1), layout(1, 3, ByteOrder::LittleEndian));
        assert!(matches!(result, Err(TiffError::UnsupportedFormat(_))));
    }
}
