//! Custom error types for TIFF processing

use std::fmt;
use std::io;

/// TIFF-specific error types
#[derive(Debug)]
pub enum TiffError {
    /// I/O error from the underlying source or sink
    IoError(io::Error),
    /// Bad byte order marker, version, or BigTIFF header fields
    InvalidHeader(String),
    /// Unknown field type, unsupported compression, mixed bit depths, ...
    UnsupportedFormat(String),
    /// A mandatory tag is absent and could not be inferred
    MissingTag(u16),
    /// Malformed codec stream or implausible directory structure
    CorruptData(String),
    /// Requested layer or region lies outside the file or image
    IndexOutOfRange(String),
    /// A cooperative abort was requested between transfer units
    Aborted,
    /// Generic error with message
    GenericError(String),
}

impl fmt::Display for TiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TiffError::IoError(e) => write!(f, "I/O error: {}", e),
            TiffError::InvalidHeader(msg) => write!(f, "Invalid TIFF header: {}", msg),
            TiffError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            TiffError::MissingTag(tag) => write!(
                f,
                "Missing required tag: {} ({})",
                tag,
                crate::utils::tag_utils::get_tag_name(*tag)
            ),
            TiffError::CorruptData(msg) => write!(f, "Corrupt data: {}", msg),
            TiffError::IndexOutOfRange(msg) => write!(f, "Index out of range: {}", msg),
            TiffError::Aborted => write!(f, "Operation aborted"),
            TiffError::GenericError(msg) => write!(f, "TIFF error: {}", msg),
        }
    }
}

impl std::error::Error for TiffError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TiffError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TiffError {
    fn from(error: io::Error) -> Self {
        TiffError::IoError(error)
    }
}

/// Result type for TIFF operations
pub type TiffResult<T> = Result<T, TiffError>;

impl From<String> for TiffError {
    fn from(msg: String) -> Self {
        TiffError::GenericError(msg)
    }
}
