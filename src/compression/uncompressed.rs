//! Handler for uncompressed data

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::{CompressionHandler, UnitGeometry};

/// Uncompressed data handler (compression code 1)
pub struct UncompressedHandler;

impl CompressionHandler for UncompressedHandler {
    fn decompress(&self, data: &[u8], geometry: UnitGeometry) -> TiffResult<Vec<u8>> {
        if data.len() < geometry.len() {
            return Err(TiffError::CorruptData(format!(
                "uncompressed unit holds {} bytes, expected {}",
                data.len(),
                geometry.len()
            )));
        }
        Ok(data[..geometry.len()].to_vec())
    }

    fn compress(&self, data: &[u8], _geometry: UnitGeometry) -> TiffResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn name(&self) -> &'static str {
        "Uncompressed"
    }

    fn code(&self) -> u64 {
        u64::from(compression::NONE)
    }
}
