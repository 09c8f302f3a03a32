//! Factory for creating compression handlers

use std::fmt;

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::utils::tag_utils;
use super::handler::CompressionHandler;
use super::lzw::LzwHandler;
use super::packbits::PackBitsHandler;
use super::uncompressed::UncompressedHandler;

/// The compression schemes this crate can read and write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Lzw,
    PackBits,
}

impl Compression {
    /// Maps a Compression tag value, rejecting schemes without a codec here
    pub fn from_code(code: u64) -> TiffResult<Self> {
        match u16::try_from(code) {
            Ok(compression::NONE) => Ok(Compression::None),
            Ok(compression::LZW) => Ok(Compression::Lzw),
            Ok(compression::PACKBITS) => Ok(Compression::PackBits),
            _ => Err(TiffError::UnsupportedFormat(format!(
                "compression {} ({})",
                code,
                tag_utils::get_compression_name(code)
            ))),
        }
    }

    /// Parses a user-facing name (`none`, `lzw`, `packbits`)
    pub fn from_name(name: &str) -> TiffResult<Self> {
        match name.to_lowercase().as_str() {
            "uncompressed" | "none" => Ok(Compression::None),
            "lzw" => Ok(Compression::Lzw),
            "packbits" => Ok(Compression::PackBits),
            _ => Err(TiffError::GenericError(format!("Unknown compression type: {}", name))),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Compression::None => compression::NONE,
            Compression::Lzw => compression::LZW,
            Compression::PackBits => compression::PACKBITS,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", tag_utils::get_compression_name(u64::from(self.code())))
    }
}

/// Factory for creating compression handlers
pub struct CompressionFactory;

impl CompressionFactory {
    /// Create a compression handler for the given scheme
    pub fn create_handler(compression: Compression) -> Box<dyn CompressionHandler> {
        match compression {
            Compression::None => Box::new(UncompressedHandler),
            Compression::Lzw => Box::new(LzwHandler),
            Compression::PackBits => Box::new(PackBitsHandler),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_codes_match_scheme() {
        for scheme in [Compression::None, Compression::Lzw, Compression::PackBits] {
            let handler = CompressionFactory::create_handler(scheme);
            assert_eq!(handler.code(), u64::from(scheme.code()));
        }
    }

    #[test]
    fn test_deflate_is_unsupported() {
        let result = Compression::from_code(8);
        assert!(matches!(result, Err(TiffError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_names() {
        assert_eq!(Compression::from_name("PackBits").unwrap(), Compression::PackBits);
        assert!(Compression::from_name("jpeg").is_err());
        assert_eq!(Compression::Lzw.to_string(), "LZW");
    }
}
