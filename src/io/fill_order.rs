//! Bit order within bytes (FillOrder tag)

use crate::tiff::constants::fill_order;
use crate::tiff::errors::{TiffError, TiffResult};

/// Logical order of bits within each byte of pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillOrder {
    /// Most significant bit first (FillOrder = 1)
    #[default]
    MsbFirst,
    /// Least significant bit first (FillOrder = 2)
    LsbFirst,
}

impl FillOrder {
    pub fn from_code(code: u64) -> TiffResult<Self> {
        match code as u16 {
            fill_order::MSB_FIRST => Ok(FillOrder::MsbFirst),
            fill_order::LSB_FIRST => Ok(FillOrder::LsbFirst),
            _ => Err(TiffError::UnsupportedFormat(format!("FillOrder value {}", code))),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            FillOrder::MsbFirst => fill_order::MSB_FIRST,
            FillOrder::LsbFirst => fill_order::LSB_FIRST,
        }
    }

    /// Normalizes (or denormalizes) a buffer in place
    ///
    /// Bit reversal is its own inverse, so the same call serves reading and
    /// writing.
    pub fn apply(&self, data: &mut [u8]) {
        if *self == FillOrder::LsbFirst {
            for byte in data.iter_mut() {
                *byte = byte.reverse_bits();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_fill_order() {
        let mut data = vec![0b0000_0001, 0b1100_0000, 0xFF];
        FillOrder::LsbFirst.apply(&mut data);
        assert_eq!(data, vec![0b1000_0000, 0b0000_0011, 0xFF]);
    }

    #[test]
    fn test_normal_fill_order_is_identity() {
        let mut data = vec![1, 2, 3];
        FillOrder::MsbFirst.apply(&mut data);
        assert_eq!(data, vec![1, 2, 3]);
    }

    #[test]
    fn test_unknown_fill_order_code() {
        assert!(FillOrder::from_code(3).is_err());
    }
}
