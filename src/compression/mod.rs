//! Compression handling for TIFF files
//!
//! This module implements strategies for the supported compression methods:
//! none, LZW and PackBits, plus the horizontal differencing predictor.

mod handler;
mod uncompressed;
mod factory;
pub mod lzw;
pub mod packbits;
pub mod predictor;

pub use handler::{CompressionHandler, UnitGeometry};
pub use uncompressed::UncompressedHandler;
pub use factory::{Compression, CompressionFactory};
pub use lzw::LzwHandler;
pub use packbits::PackBitsHandler;
pub use predictor::{Predictor, PredictorLayout};
