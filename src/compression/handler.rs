//! Compression handler trait definition

use crate::tiff::errors::TiffResult;

/// Shape of one strip or tile as the codec sees it
///
/// PackBits runs are bounded by `row_bytes`; decoders produce exactly
/// `rows * row_bytes` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitGeometry {
    pub row_bytes: usize,
    pub rows: usize,
}

impl UnitGeometry {
    pub fn new(row_bytes: usize, rows: usize) -> Self {
        UnitGeometry { row_bytes, rows }
    }

    /// Decoded size of the unit in bytes
    pub fn len(&self) -> usize {
        self.row_bytes * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Strategy trait for handling different compression methods
pub trait CompressionHandler: Send + Sync {
    /// Decompress one unit
    fn decompress(&self, data: &[u8], geometry: UnitGeometry) -> TiffResult<Vec<u8>>;

    /// Compress one unit of exactly `geometry.len()` bytes
    fn compress(&self, data: &[u8], geometry: UnitGeometry) -> TiffResult<Vec<u8>>;

    /// Get the name of this compression method
    fn name(&self) -> &'static str;

    /// Get the compression code
    fn code(&self) -> u64;
}
